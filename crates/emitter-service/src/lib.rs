//! # emitter-service
//!
//! Application layer: the caller-facing [`Emitter`] and the request/response
//! [`Coordinator`] that aggregates replies from an unknown number of gateway nodes.
//!
//! ## Example
//!
//! ```ignore
//! use emitter_common::AppConfig;
//! use emitter_service::Emitter;
//!
//! let emitter = Emitter::connect(&AppConfig::from_env()?).await?;
//!
//! emitter.of("/chat").to("room1").emit("message", vec!["hello".into()]).await?;
//!
//! let sockets = emitter.of("/chat").fetch_sockets().await?;
//! if !sockets.is_complete() {
//!     tracing::warn!(nodes = sockets.responders(), "fetch window closed before every node replied");
//! }
//! ```

pub mod coordinator;
pub mod emitter;

pub use coordinator::{ClusterReply, Coordinator, Outcome, PendingReply, Reply, Resolution};
pub use emitter::{BroadcastOperator, Emitter, ReplyWindow};

#[cfg(test)]
pub(crate) mod test_support;
