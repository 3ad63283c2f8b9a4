//! Request/response coordination
//!
//! Each request lives in the pending map from the moment it is issued until it is
//! resolved. Removal from the map is the resolution barrier: whichever of "last
//! expected reply" and "deadline" removes the record resolves the request, and the
//! other finds nothing to do.

mod coordinator;
mod outcome;
mod pending;

pub use coordinator::Coordinator;
pub use outcome::{ClusterReply, Outcome, Reply, Resolution};
pub use pending::PendingReply;
