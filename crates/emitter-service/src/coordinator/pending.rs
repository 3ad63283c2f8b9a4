//! Pending request records and the caller's reply handle

use chrono::Utc;
use emitter_core::{EmitterError, EmitterResult, Request, RequestId, RequestType, ResponseMessage};
use std::collections::HashSet;
use std::sync::Weak;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::coordinator::CoordinatorInner;
use super::outcome::{Outcome, Reply, Resolution};

/// Coordination record, owned by the coordinator's pending map
pub(crate) struct PendingRequest {
    request: Request,
    /// Replies in arrival order (append-only)
    collected: Vec<Reply>,
    /// Node uids that already replied
    responders: HashSet<String>,
    deadline: Instant,
    /// Fires the timeout; aborted when the record leaves the map
    timer: Option<DeadlineTimer>,
    sink: oneshot::Sender<Resolution>,
}

/// Aborts the deadline task when dropped
struct DeadlineTimer(AbortHandle);

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// What happened to an incoming reply
pub(crate) enum Recorded {
    Accepted { complete: bool },
    Duplicate,
    /// Arrived at or after the deadline; the request must time out
    Late,
}

impl PendingRequest {
    pub(crate) fn new(
        request: Request,
        deadline: Instant,
        sink: oneshot::Sender<Resolution>,
    ) -> Self {
        Self {
            request,
            collected: Vec::new(),
            responders: HashSet::new(),
            deadline,
            timer: None,
            sink,
        }
    }

    pub(crate) fn arm(&mut self, timer: AbortHandle) {
        self.timer = Some(DeadlineTimer(timer));
    }

    /// Append a reply; a node answers at most once per request
    pub(crate) fn record(&mut self, response: ResponseMessage) -> Recorded {
        if Instant::now() >= self.deadline {
            return Recorded::Late;
        }

        if let Some(uid) = &response.uid {
            if !self.responders.insert(uid.clone()) {
                return Recorded::Duplicate;
            }
        }

        self.collected.push(Reply {
            uid: response.uid,
            data: response.data,
        });

        Recorded::Accepted {
            complete: self.is_complete(),
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.request
            .expected_replies
            .is_some_and(|expected| self.collected.len() >= expected)
    }

    /// Consume the record into its resolution
    pub(crate) fn resolve(self, outcome: Outcome) -> (Resolution, oneshot::Sender<Resolution>) {
        let elapsed_ms = (Utc::now() - self.request.created_at).num_milliseconds();
        tracing::debug!(
            request_id = %self.request.id,
            kind = %self.request.kind(),
            outcome = %outcome,
            replies = self.collected.len(),
            elapsed_ms = elapsed_ms,
            "Request resolved"
        );

        let resolution = Resolution {
            request_id: self.request.id,
            kind: self.request.command.kind(),
            outcome,
            replies: self.collected,
        };
        (resolution, self.sink)
    }
}

/// Handle on an issued request
///
/// Owns the request's deadline. Dropping the handle before the request resolved
/// abandons it: the record is removed and later replies are discarded.
pub struct PendingReply {
    pub(crate) id: RequestId,
    pub(crate) kind: RequestType,
    pub(crate) deadline: Instant,
    pub(crate) rx: oneshot::Receiver<Resolution>,
    pub(crate) coordinator: Weak<CoordinatorInner>,
}

impl PendingReply {
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> RequestType {
        self.kind
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait for the request to resolve, at the latest at its deadline
    ///
    /// Fails only with [`EmitterError::Closed`] when the coordinator shut down first.
    pub async fn wait(mut self) -> EmitterResult<Resolution> {
        if let Ok(received) = tokio::time::timeout_at(self.deadline, &mut self.rx).await {
            return received.map_err(|_| EmitterError::Closed);
        }

        let expired = self
            .coordinator
            .upgrade()
            .and_then(|inner| inner.expire(&self.id));

        match expired {
            Some(resolution) => Ok(resolution),
            // The last expected reply won the race and is already in the channel
            None => (&mut self.rx).await.map_err(|_| EmitterError::Closed),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if let Some(inner) = self.coordinator.upgrade() {
            inner.abandon(&self.id);
        }
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("deadline", &self.deadline)
            .finish()
    }
}
