//! The dispatcher boundary: provider registration, request routing, and the
//! cache invalidation relay.


use std::sync::{Arc, Weak};

use tokio_util::sync::CancellationToken;

use crate::cache::QueryResultCache;
use crate::coordinator::{FileSearchCoordinator, TextSearchCoordinator};
use crate::error::{Result, SearchError};
use crate::peer::SearchPeer;
use crate::provider::{
    FileIndexProvider, FileSearchProvider, InternalFileSearchProvider, TextSearchProvider,
};
use crate::query::{revive_query, RawSearchQuery, TextPattern};
use crate::registry::ProviderRegistry;
use crate::types::{ProviderHandle, SearchCompletion, SessionId};

/// Disposer for one provider registration.
///
/// Disposing removes the mapping and notifies the peer that the handle is
/// retired. Dropping the value without calling [`dispose`](Self::dispose)
/// leaves the registration in place; handles are plain values and may be
/// mirrored elsewhere.
pub struct ProviderRegistration {
    handle: ProviderHandle,
    dispatcher: Weak<DispatcherInner>,
}

impl ProviderRegistration {
    pub fn handle(&self) -> ProviderHandle {
        self.handle
    }

    pub fn dispose(self) {
        if let Some(inner) = self.dispatcher.upgrade() {
            inner.unregister(self.handle);
        }
    }
}

struct DispatcherInner {
    registry: ProviderRegistry,
    cache: Arc<QueryResultCache>,
    peer: Arc<dyn SearchPeer>,
}

impl DispatcherInner {
    fn unregister(&self, handle: ProviderHandle) {
        if self.registry.remove(handle) {
            self.peer.unregister_provider(handle);
            tracing::debug!("unregistered search provider {}", handle);
        }
    }
}

/// Cross-process search-provider dispatcher.
///
/// Owns the registry and the index query-result cache, and streams results
/// to the caller side through the peer delegate. Requests across different
/// handles and sessions run concurrently; each request is one cooperative
/// task.
pub struct SearchDispatcher {
    inner: Arc<DispatcherInner>,
}

impl SearchDispatcher {
    pub fn new(peer: Arc<dyn SearchPeer>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry: ProviderRegistry::new(),
                cache: Arc::new(QueryResultCache::new()),
                peer,
            }),
        }
    }

    pub fn register_text_search_provider(
        &self,
        scheme: &str,
        provider: Arc<dyn TextSearchProvider>,
    ) -> ProviderRegistration {
        let handle = self.inner.registry.register_text(provider);
        tracing::debug!("registered text search provider {} for {}", handle, scheme);
        self.registration(handle)
    }

    pub fn register_file_search_provider(
        &self,
        scheme: &str,
        provider: Arc<dyn FileSearchProvider>,
    ) -> ProviderRegistration {
        let handle = self.inner.registry.register_file(provider);
        tracing::debug!("registered file search provider {} for {}", handle, scheme);
        self.registration(handle)
    }

    pub fn register_file_index_provider(
        &self,
        scheme: &str,
        provider: Arc<dyn FileIndexProvider>,
    ) -> ProviderRegistration {
        let handle = self.inner.registry.register_index(provider);
        tracing::debug!("registered file index provider {} for {}", handle, scheme);
        self.registration(handle)
    }

    /// Install the privileged built-in engine in its dedicated slot. A
    /// previous occupant is displaced and retired like any disposal.
    pub fn register_internal_file_search_provider(
        &self,
        scheme: &str,
        provider: Arc<dyn InternalFileSearchProvider>,
    ) -> ProviderRegistration {
        let (handle, displaced) = self.inner.registry.register_internal(provider);
        if let Some(displaced) = displaced {
            self.inner.peer.unregister_provider(displaced);
        }
        tracing::debug!(
            "registered internal file search provider {} for {}",
            handle,
            scheme
        );
        self.registration(handle)
    }

    fn registration(&self, handle: ProviderHandle) -> ProviderRegistration {
        ProviderRegistration {
            handle,
            dispatcher: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a registration. Unknown handles are a no-op; the peer is
    /// notified only when a mapping was actually removed.
    pub fn unregister_provider(&self, handle: ProviderHandle) {
        self.inner.unregister(handle);
    }

    /// Run one file search. Batches stream to the peer's `handle_file_match`
    /// for this (handle, session) pair; the returned completion resolves
    /// only after every batch has been forwarded.
    pub async fn provide_file_search_results(
        &self,
        handle: ProviderHandle,
        session: SessionId,
        raw_query: RawSearchQuery,
        token: CancellationToken,
    ) -> Result<SearchCompletion> {
        let provider = self
            .inner
            .registry
            .resolve_file(handle)
            .ok_or(SearchError::ProviderNotFound(handle))?;
        let query = revive_query(raw_query)?;
        let coordinator =
            FileSearchCoordinator::new(self.inner.peer.clone(), self.inner.cache.clone());
        coordinator.run(provider, handle, session, query, token).await
    }

    /// Run one text search. Resolves to `Ok(None)` when no text provider is
    /// registered under the handle or the provider lacks the capability.
    pub async fn provide_text_search_results(
        &self,
        handle: ProviderHandle,
        session: SessionId,
        pattern: TextPattern,
        raw_query: RawSearchQuery,
        token: CancellationToken,
    ) -> Result<Option<SearchCompletion>> {
        let Some(provider) = self.inner.registry.resolve_text(handle) else {
            return Ok(None);
        };
        let query = revive_query(raw_query)?;
        let coordinator = TextSearchCoordinator::new(self.inner.peer.clone());
        coordinator
            .run(provider, handle, session, pattern, query, token)
            .await
    }

    /// Forward a cache invalidation: the internal provider first when one is
    /// registered, then the index manager's own cache. Unknown keys are a
    /// no-op everywhere.
    pub async fn clear_cache(&self, cache_key: &str) {
        if let Some(internal) = self.inner.registry.internal() {
            internal.clear_cache(cache_key);
        }
        self.inner.cache.clear(cache_key);
    }
}
