//! Cross-process search-provider dispatcher.
//!
//! Sits between a host process issuing search requests and a set of pluggable
//! search providers (file-name, file-index, full-text, plus one privileged
//! internal engine). Owns provider registration, request routing, query
//! revival across the serialization boundary, streaming result relay,
//! cancellation propagation, and the provider-scoped cache invalidation hook.

pub mod cache;
pub mod classify;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod peer;
pub mod provider;
pub mod query;
pub mod registry;
pub mod types;

pub use crate::dispatch::{ProviderRegistration, SearchDispatcher};
pub use crate::error::{Result, SearchError};
pub use crate::peer::SearchPeer;
pub use crate::types::{
    MatchPreview, ProviderHandle, SearchCompletion, SearchRange, SearchStats, SessionId,
    TextSearchMatch,
};
