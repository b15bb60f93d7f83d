//! Handle-keyed provider registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::provider::{
    FileIndexProvider, FileSearchProvider, InternalFileSearchProvider, TextSearchProvider,
};
use crate::types::ProviderHandle;

/// A file-search provider resolved to its registered kind.
///
/// Resolution order is the internal slot (exact handle), then batch
/// providers, then index providers. A live handle resolves to exactly one
/// arm because every kind draws handles from the same counter.
#[derive(Clone)]
pub enum ResolvedFileProvider {
    Internal(Arc<dyn InternalFileSearchProvider>),
    Batch(Arc<dyn FileSearchProvider>),
    Index(Arc<dyn FileIndexProvider>),
}

/// Registry of all providers keyed by handle.
///
/// Removal deletes the entry outright rather than nulling a slot, so a
/// disposed handle can never resolve again. Resolution hands out `Arc`
/// clones, which keeps resolve-then-use atomic with respect to concurrent
/// disposal: a request either completes against the pre-dispose provider or
/// fails cleanly with provider-not-found.
#[derive(Default)]
pub struct ProviderRegistry {
    next_handle: AtomicU64,
    text: RwLock<HashMap<ProviderHandle, Arc<dyn TextSearchProvider>>>,
    file: RwLock<HashMap<ProviderHandle, Arc<dyn FileSearchProvider>>>,
    index: RwLock<HashMap<ProviderHandle, Arc<dyn FileIndexProvider>>>,
    internal: RwLock<Option<(ProviderHandle, Arc<dyn InternalFileSearchProvider>)>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_handle(&self) -> ProviderHandle {
        ProviderHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn register_text(&self, provider: Arc<dyn TextSearchProvider>) -> ProviderHandle {
        let handle = self.allocate_handle();
        self.text.write().insert(handle, provider);
        handle
    }

    pub fn register_file(&self, provider: Arc<dyn FileSearchProvider>) -> ProviderHandle {
        let handle = self.allocate_handle();
        self.file.write().insert(handle, provider);
        handle
    }

    pub fn register_index(&self, provider: Arc<dyn FileIndexProvider>) -> ProviderHandle {
        let handle = self.allocate_handle();
        self.index.write().insert(handle, provider);
        handle
    }

    /// Install the single privileged internal provider. Returns the new
    /// handle and the handle it displaced, if the slot was occupied.
    pub fn register_internal(
        &self,
        provider: Arc<dyn InternalFileSearchProvider>,
    ) -> (ProviderHandle, Option<ProviderHandle>) {
        let handle = self.allocate_handle();
        let displaced = self
            .internal
            .write()
            .replace((handle, provider))
            .map(|(old, _)| old);
        (handle, displaced)
    }

    pub fn resolve_file(&self, handle: ProviderHandle) -> Option<ResolvedFileProvider> {
        if let Some((internal_handle, provider)) = self.internal.read().as_ref() {
            if *internal_handle == handle {
                return Some(ResolvedFileProvider::Internal(provider.clone()));
            }
        }
        if let Some(provider) = self.file.read().get(&handle) {
            return Some(ResolvedFileProvider::Batch(provider.clone()));
        }
        if let Some(provider) = self.index.read().get(&handle) {
            return Some(ResolvedFileProvider::Index(provider.clone()));
        }
        None
    }

    pub fn resolve_text(&self, handle: ProviderHandle) -> Option<Arc<dyn TextSearchProvider>> {
        self.text.read().get(&handle).cloned()
    }

    /// The currently installed internal provider, if any.
    pub fn internal(&self) -> Option<Arc<dyn InternalFileSearchProvider>> {
        self.internal
            .read()
            .as_ref()
            .map(|(_, provider)| provider.clone())
    }

    /// Remove whatever is registered under `handle`. Removing an unknown
    /// handle is a no-op; returns whether a mapping was actually removed.
    pub fn remove(&self, handle: ProviderHandle) -> bool {
        if self.text.write().remove(&handle).is_some() {
            return true;
        }
        if self.file.write().remove(&handle).is_some() {
            return true;
        }
        if self.index.write().remove(&handle).is_some() {
            return true;
        }
        let mut internal = self.internal.write();
        if internal.as_ref().is_some_and(|(occupant, _)| *occupant == handle) {
            *internal = None;
            return true;
        }
        false
    }
}
