//! Simulated socket.io gateway nodes
//!
//! A node listens on the broadcast and request channels of one namespace, keeps
//! a local set of sockets, and answers cluster requests on the response channel
//! the way a real gateway adapter would.

use emitter_core::{
    decode, ChannelRouter, DecodedBroadcast, MessageHandler, MessagePublisher, MessageSubscriber,
    RequestMessage, RequestType, ResponseMessage, Value, WireOptions,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::bus::{BusClient, MemoryBus};

/// How a node treats requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBehavior {
    /// Answer every request once
    Responsive,
    /// Never answer
    Silent,
    /// Answer every request twice
    Duplicate,
    /// Answer after a delay
    Delayed(Duration),
}

/// A client socket connected to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSocket {
    pub id: String,
    pub rooms: Vec<String>,
}

impl SimSocket {
    /// A socket is always in the room named after its id
    pub fn new(id: &str, rooms: &[&str]) -> Self {
        let mut all = vec![id.to_string()];
        all.extend(rooms.iter().map(|r| (*r).to_string()));
        Self {
            id: id.to_string(),
            rooms: all,
        }
    }

    fn matches(&self, opts: &WireOptions) -> bool {
        let included = opts.rooms.is_empty() || self.rooms.iter().any(|r| opts.rooms.contains(r));
        let excluded = self.rooms.iter().any(|r| opts.except.contains(r));
        included && !excluded
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::from("id"), Value::from(self.id.as_str())),
            (
                Value::from("rooms"),
                Value::Array(self.rooms.iter().map(|r| Value::from(r.as_str())).collect()),
            ),
        ])
    }
}

struct NodeState {
    uid: String,
    namespace: String,
    router: ChannelRouter,
    behavior: NodeBehavior,
    client: Weak<BusClient>,
    sockets: Mutex<Vec<SimSocket>>,
    broadcasts: Mutex<Vec<DecodedBroadcast>>,
    requests: Mutex<Vec<RequestMessage>>,
}

/// A running simulated node
pub struct GatewayNode {
    state: Arc<NodeState>,
    client: Arc<BusClient>,
}

impl GatewayNode {
    /// Attach a node to the bus, serving `namespace`
    pub async fn start(
        bus: &Arc<MemoryBus>,
        uid: &str,
        namespace: &str,
        behavior: NodeBehavior,
        sockets: Vec<SimSocket>,
    ) -> anyhow::Result<Self> {
        let client = bus.client();
        let router = ChannelRouter::default();
        let state = Arc::new(NodeState {
            uid: uid.to_string(),
            namespace: namespace.to_string(),
            router: router.clone(),
            behavior,
            client: Arc::downgrade(&client),
            sockets: Mutex::new(sockets),
            broadcasts: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        });

        let broadcasts = format!("{}*", router.channel_for(namespace, None));
        client
            .psubscribe(&broadcasts, Arc::new(BroadcastListener(state.clone())))
            .await?;
        client
            .psubscribe(
                &router.request_channel_for(namespace),
                Arc::new(RequestListener(state.clone())),
            )
            .await?;

        Ok(Self { state, client })
    }

    pub fn uid(&self) -> &str {
        &self.state.uid
    }

    /// Broadcasts this node received, decoded
    pub fn broadcasts(&self) -> Vec<DecodedBroadcast> {
        self.state.broadcasts.lock().clone()
    }

    /// Requests this node received
    pub fn requests(&self) -> Vec<RequestMessage> {
        self.state.requests.lock().clone()
    }

    pub fn sockets(&self) -> Vec<SimSocket> {
        self.state.sockets.lock().clone()
    }

    /// Detach from the bus
    pub async fn stop(&self) -> anyhow::Result<()> {
        MessageSubscriber::close(self.client.as_ref()).await?;
        Ok(())
    }
}

struct BroadcastListener(Arc<NodeState>);

impl MessageHandler for BroadcastListener {
    fn on_message(&self, channel: &str, payload: &[u8]) {
        match decode(payload) {
            Ok(broadcast) => self.0.broadcasts.lock().push(broadcast),
            Err(e) => tracing::warn!(channel = %channel, error = %e, "Undecodable broadcast"),
        }
    }
}

struct RequestListener(Arc<NodeState>);

impl MessageHandler for RequestListener {
    fn on_message(&self, _channel: &str, payload: &[u8]) {
        let Ok(request) = RequestMessage::decode(payload) else {
            return;
        };
        self.0.requests.lock().push(request.clone());

        let copies = match self.0.behavior {
            NodeBehavior::Silent => return,
            NodeBehavior::Duplicate => 2,
            NodeBehavior::Responsive | NodeBehavior::Delayed(_) => 1,
        };
        let delay = match self.0.behavior {
            NodeBehavior::Delayed(delay) => Some(delay),
            _ => None,
        };

        let data = self.0.handle(&request);
        let mut response = ResponseMessage::new(request.request_id.clone()).with_uid(&self.0.uid);
        if let Some(data) = data {
            response = response.with_data(data);
        }
        let Ok(payload) = response.encode() else {
            return;
        };
        let channel = self
            .0
            .router
            .response_channel_for(&self.0.namespace, &request.request_id);
        let client = self.0.client.clone();

        // Reply asynchronously, like a node doing real work
        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let Some(client) = client.upgrade() else {
                return;
            };
            for _ in 0..copies {
                if let Err(e) = client.publish(&channel, &payload).await {
                    tracing::warn!(error = %e, "Gateway reply failed");
                }
            }
        });
    }
}

impl NodeState {
    /// Apply a request locally; `None` is a bare acknowledgement
    fn handle(&self, request: &RequestMessage) -> Option<Value> {
        let mut sockets = self.sockets.lock();
        match request.kind {
            RequestType::FetchSockets => {
                let list = sockets
                    .iter()
                    .filter(|s| s.matches(&request.opts))
                    .map(SimSocket::to_value)
                    .collect();
                Some(Value::Array(list))
            }
            RequestType::RemoteJoin => {
                for socket in sockets.iter_mut().filter(|s| s.matches(&request.opts)) {
                    for room in &request.rooms {
                        if !socket.rooms.contains(room) {
                            socket.rooms.push(room.clone());
                        }
                    }
                }
                None
            }
            RequestType::RemoteLeave => {
                for socket in sockets.iter_mut().filter(|s| s.matches(&request.opts)) {
                    socket.rooms.retain(|r| !request.rooms.contains(r));
                }
                None
            }
            RequestType::RemoteDisconnect => {
                sockets.retain(|s| !s.matches(&request.opts));
                None
            }
            RequestType::EmitWithAck => {
                let acks = sockets
                    .iter()
                    .filter(|s| s.matches(&request.opts))
                    .map(|s| Value::from(format!("{}:ack", s.id)))
                    .collect();
                Some(Value::Array(acks))
            }
            RequestType::ServerSideEmit => {
                let event = request
                    .data
                    .as_ref()
                    .and_then(|data| data.first())
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Some(Value::from(format!("{}:{event}", self.uid)))
            }
        }
    }
}
