//! Integration test utilities for the emitter
//!
//! An in-memory pub/sub bus with Redis glob semantics, simulated gateway nodes
//! that answer cluster requests, and helpers for the Redis-backed tests.

pub mod bus;
pub mod gateway;

pub use bus::{glob_match, BusClient, MemoryBus};
pub use gateway::{GatewayNode, NodeBehavior, SimSocket};
pub use helpers::*;
