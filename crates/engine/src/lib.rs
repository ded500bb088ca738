//! Service layer for the tabtrail engine.
//!
//! This crate provides:
//! - The visit recorder: a debounce state machine behind a
//!   single-consumer queue, serializing concurrent navigation events
//! - The retention sweeper: startup + fixed-interval cleanup jobs
//! - The boundary facade exposed to query callers, converting every
//!   internal fault into a structured result

pub mod api;
pub mod recorder;
pub mod sweeper;

pub use api::{ApiResult, Engine};
pub use recorder::{Debounce, RecorderHandle};
