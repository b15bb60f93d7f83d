use crate::types::ProviderHandle;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The transport-safe query was structurally malformed. A protocol-level
    /// fault: rejected immediately, never retried.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// The handle resolves to no registered provider. Distinct from a search
    /// that ran and failed.
    #[error("no search provider registered for handle {0}")]
    ProviderNotFound(ProviderHandle),

    /// A provider reported an error while producing results. Retry policy,
    /// if any, belongs to the caller.
    #[error("search provider error: {0}")]
    Provider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
