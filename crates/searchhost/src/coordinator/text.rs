//! Text search coordination: one per-request engine per provider.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SearchError};
use crate::peer::SearchPeer;
use crate::provider::{FolderSearchOptions, TextSearchProvider};
use crate::query::{SearchQuery, TextPattern};
use crate::types::{ProviderHandle, SearchCompletion, SearchStats, SessionId};

pub struct TextSearchCoordinator {
    peer: Arc<dyn SearchPeer>,
}

impl TextSearchCoordinator {
    pub fn new(peer: Arc<dyn SearchPeer>) -> Self {
        Self { peer }
    }

    /// Drive one text-search request. Returns `Ok(None)` without touching
    /// the peer when the provider lacks the text-search capability.
    pub async fn run(
        &self,
        provider: Arc<dyn TextSearchProvider>,
        handle: ProviderHandle,
        session: SessionId,
        pattern: TextPattern,
        query: SearchQuery,
        token: CancellationToken,
    ) -> Result<Option<SearchCompletion>> {
        if !provider.supports_text_search() {
            return Ok(None);
        }

        let started = Instant::now();
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

        // Progress events are relayed one-for-one. The relay observes the
        // cancellation token itself, so matches queued after cancellation is
        // observed never reach the peer; matches already delivered are not
        // retracted.
        let peer = self.peer.clone();
        let relay_token = token.clone();
        let relay = tokio::spawn(async move {
            let mut relayed: u64 = 0;
            loop {
                tokio::select! {
                    _ = relay_token.cancelled() => break,
                    result = progress_rx.recv() => {
                        let Some(result) = result else {
                            break;
                        };
                        peer.handle_text_match(handle, session, result);
                        relayed += 1;
                    }
                }
            }
            relayed
        });

        let mut limit_hit = false;
        let mut cancelled = false;
        let mut failure: Option<SearchError> = None;

        for folder in &query.folder_queries {
            if token.is_cancelled() {
                cancelled = true;
                break;
            }
            let options = FolderSearchOptions::for_folder(&query, folder);
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    cancelled = true;
                    break;
                }
                result = provider.provide_text_search_results(
                    &pattern,
                    &options,
                    progress_tx.clone(),
                    &token,
                ) => result,
            };
            match outcome {
                Ok(completion) => limit_hit |= completion.limit_hit,
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        drop(progress_tx);
        let relayed = relay.await.unwrap_or(0);

        if let Some(error) = failure {
            return Err(error);
        }

        let stats = SearchStats {
            match_count: relayed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        Ok(Some(SearchCompletion {
            limit_hit,
            cancelled: cancelled || token.is_cancelled(),
            stats,
        }))
    }
}
