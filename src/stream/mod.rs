//! Streaming pipeline: deltas in, decoded events out.

pub mod accumulator;
pub mod multiplexer;
pub mod partial;

pub use accumulator::{AccumulatedCall, AccumulatedResponse, StreamAccumulator};
pub use multiplexer::{FinishGuard, OutputStream, OutputSubscriber};
pub use partial::parse_partial_json;
