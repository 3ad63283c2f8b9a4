//! Caller-facing emitter API

mod emitter;
mod operator;

pub use emitter::{Emitter, ReplyWindow};
pub use operator::BroadcastOperator;
