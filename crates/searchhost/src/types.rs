//! Identifiers and result types shared across the dispatcher.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque identifier for one registered provider instance.
///
/// Handles come from a monotonic counter and are never reused within a
/// process lifetime, so a stale handle can never alias a newer registration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProviderHandle(pub u64);

impl fmt::Display for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one in-flight request scoped to a handle.
///
/// Sessions only route streamed batches back to the correct logical request;
/// cancellation travels separately.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based line/character span of a text match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRange {
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
}

/// Preview context delivered with a text match. `range` locates the match
/// within `text`, not within the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPreview {
    pub text: String,
    pub range: SearchRange,
}

/// One text match: resource, location, and preview context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSearchMatch {
    pub uri: Url,
    pub range: SearchRange,
    pub preview: MatchPreview,
}

/// Aggregated statistics for one settled request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub match_count: u64,
    pub elapsed_ms: u64,
}

/// Terminal outcome of one search request. Produced exactly once per
/// request; incremental match batches may precede it but never follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCompletion {
    pub limit_hit: bool,
    pub cancelled: bool,
    pub stats: SearchStats,
}

impl SearchCompletion {
    pub fn success(stats: SearchStats, limit_hit: bool) -> Self {
        Self {
            limit_hit,
            cancelled: false,
            stats,
        }
    }

    /// A cancelled request settles as a benign partial outcome, not an error.
    pub fn cancelled(stats: SearchStats) -> Self {
        Self {
            limit_hit: false,
            cancelled: true,
            stats,
        }
    }
}
