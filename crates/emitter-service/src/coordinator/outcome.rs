//! Resolution types

use emitter_core::{RequestId, RequestType, Value};
use std::fmt;

/// How a request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The expected number of nodes replied
    Complete,
    /// The deadline fired first; the replies are whatever arrived in time
    TimedOut,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::TimedOut => f.write_str("timed_out"),
        }
    }
}

/// One node's reply
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Replying node, when it identified itself
    pub uid: Option<String>,
    pub data: Option<Value>,
}

/// Raw result of a coordinated request
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub request_id: RequestId,
    pub kind: RequestType,
    pub outcome: Outcome,
    /// Replies in arrival order
    pub replies: Vec<Reply>,
}

/// Aggregated result of a cluster command
///
/// The emitter never knows how many gateway nodes are alive, so a closed window
/// is an ordinary result and callers must look at which variant they got.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterReply<T> {
    /// Every expected node replied
    Complete { value: T, responders: usize },
    /// The window closed; `value` aggregates the `responders` nodes that made it
    TimedOut { value: T, responders: usize },
}

impl<T> ClusterReply<T> {
    pub(crate) fn new(outcome: Outcome, value: T, responders: usize) -> Self {
        match outcome {
            Outcome::Complete => Self::Complete { value, responders },
            Outcome::TimedOut => Self::TimedOut { value, responders },
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Complete { .. } => Outcome::Complete,
            Self::TimedOut { .. } => Outcome::TimedOut,
        }
    }

    /// Number of nodes whose reply is included
    #[must_use]
    pub fn responders(&self) -> usize {
        match self {
            Self::Complete { responders, .. } | Self::TimedOut { responders, .. } => *responders,
        }
    }

    #[must_use]
    pub fn value(&self) -> &T {
        match self {
            Self::Complete { value, .. } | Self::TimedOut { value, .. } => value,
        }
    }

    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Complete { value, .. } | Self::TimedOut { value, .. } => value,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ClusterReply<U> {
        match self {
            Self::Complete { value, responders } => ClusterReply::Complete {
                value: f(value),
                responders,
            },
            Self::TimedOut { value, responders } => ClusterReply::TimedOut {
                value: f(value),
                responders,
            },
        }
    }
}
