//! Per-request engines that drive providers to completion.
//!
//! Each request runs as one cooperative task: it resolves a provider, drives
//! it to its terminal event, relays every intermediate batch through a
//! bounded channel to the peer, and settles exactly once through the request
//! state machine.

mod batch;
mod file;
mod state;
mod text;

pub use batch::{spawn_match_relay, MatchBatcher, MATCH_BATCH_SIZE};
pub use file::FileSearchCoordinator;
pub use state::{RequestState, RequestTracker};
pub use text::TextSearchCoordinator;
