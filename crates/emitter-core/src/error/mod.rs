//! Error taxonomy shared by every emitter crate

mod emitter_error;

pub use emitter_error::{EmitterError, EmitterResult, EncodingError, PublishError, SubscribeError};
