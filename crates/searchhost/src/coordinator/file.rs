//! File search coordination.
//!
//! Routes one request to the resolved provider kind and adapts each
//! production model (internal event stream, batch callback, index
//! enumeration) into batched peer delivery with a single terminal outcome.

use std::sync::Arc;
use std::time::Instant;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cache::QueryResultCache;
use crate::classify::{classify, EventClass, RawFileMatch};
use crate::coordinator::batch::{spawn_match_relay, MatchBatcher};
use crate::coordinator::state::{RequestState, RequestTracker};
use crate::error::{Result, SearchError};
use crate::peer::SearchPeer;
use crate::provider::{
    FileIndexProvider, FileSearchProvider, FolderSearchOptions, InternalFileSearchProvider,
    NativeFileQuery,
};
use crate::query::SearchQuery;
use crate::registry::ResolvedFileProvider;
use crate::types::{ProviderHandle, SearchCompletion, SearchStats, SessionId};

/// Cancellation check mask for tight candidate loops; checks every 1024
/// items.
const CANCEL_CHECK_MASK: usize = 0x3ff;

/// How one internal-engine request ended.
enum Terminal {
    Success { limit_hit: bool },
    Failure(String),
    Cancelled,
    /// Stream ended without a terminal event.
    Disconnected,
}

pub struct FileSearchCoordinator {
    peer: Arc<dyn SearchPeer>,
    cache: Arc<QueryResultCache>,
}

impl FileSearchCoordinator {
    pub fn new(peer: Arc<dyn SearchPeer>, cache: Arc<QueryResultCache>) -> Self {
        Self { peer, cache }
    }

    /// Drive one file-search request to completion.
    pub async fn run(
        &self,
        provider: ResolvedFileProvider,
        handle: ProviderHandle,
        session: SessionId,
        query: SearchQuery,
        token: CancellationToken,
    ) -> Result<SearchCompletion> {
        match provider {
            ResolvedFileProvider::Internal(engine) => {
                self.run_internal(engine, handle, session, query, token).await
            }
            ResolvedFileProvider::Batch(provider) => {
                self.run_batch(provider, handle, session, query, token).await
            }
            ResolvedFileProvider::Index(provider) => {
                self.run_index(provider, handle, session, query, token).await
            }
        }
    }

    /// Internal engine path: consume the event stream, classify each event,
    /// forward match batches, and settle exactly once on the terminal event
    /// or on cancellation.
    async fn run_internal(
        &self,
        engine: Arc<dyn InternalFileSearchProvider>,
        handle: ProviderHandle,
        session: SessionId,
        query: SearchQuery,
        token: CancellationToken,
    ) -> Result<SearchCompletion> {
        let started = Instant::now();
        let native = NativeFileQuery::from_query(&query);
        let mut events = engine.search(native, &token);

        let (batch_tx, relay) = spawn_match_relay(self.peer.clone(), handle, session);
        let tracker = RequestTracker::new();
        let mut match_count: u64 = 0;
        let mut terminal = Terminal::Disconnected;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    if tracker.try_settle(RequestState::Cancelled) {
                        terminal = Terminal::Cancelled;
                    }
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        tracker.try_settle(RequestState::Failed);
                        break;
                    };
                    match classify(&event) {
                        EventClass::Matches(found) => {
                            tracker.begin_streaming();
                            let resources: Vec<_> =
                                found.iter().filter_map(resolve_match_uri).collect();
                            let dropped = found.len() - resources.len();
                            if dropped > 0 {
                                tracing::warn!(
                                    "dropped {} file matches with unresolvable paths",
                                    dropped
                                );
                            }
                            match_count += resources.len() as u64;
                            if !resources.is_empty() {
                                let _ = batch_tx.send(resources).await;
                            }
                        }
                        EventClass::Message(message) => {
                            tracing::debug!("search engine [{}/{}]: {}", handle, session, message);
                        }
                        EventClass::Success { limit_hit } => {
                            if tracker.try_settle(RequestState::Succeeded) {
                                terminal = Terminal::Success { limit_hit };
                            }
                            break;
                        }
                        EventClass::Failure { message } => {
                            if tracker.try_settle(RequestState::Failed) {
                                terminal = Terminal::Failure(message);
                            }
                            break;
                        }
                        EventClass::Unrecognized => {
                            tracing::warn!(
                                "dropping unrecognized search engine event for handle {}",
                                handle
                            );
                        }
                    }
                }
            }
        }

        // Every batch produced before the terminal event must reach the peer
        // before the request resolves.
        drop(batch_tx);
        let _ = relay.await;

        let stats = SearchStats {
            match_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        match terminal {
            Terminal::Success { limit_hit } => Ok(SearchCompletion::success(stats, limit_hit)),
            Terminal::Failure(message) => Err(SearchError::Provider(message)),
            Terminal::Cancelled => Ok(SearchCompletion::cancelled(stats)),
            Terminal::Disconnected => Err(SearchError::Provider(
                "search engine stream ended without a completion event".to_string(),
            )),
        }
    }

    /// Batch-callback path: the provider returns a full candidate list per
    /// folder; the engine applies the result limit and flushes batches.
    async fn run_batch(
        &self,
        provider: Arc<dyn FileSearchProvider>,
        handle: ProviderHandle,
        session: SessionId,
        query: SearchQuery,
        token: CancellationToken,
    ) -> Result<SearchCompletion> {
        let started = Instant::now();
        let (batch_tx, relay) = spawn_match_relay(self.peer.clone(), handle, session);
        let mut batcher = MatchBatcher::new(batch_tx);
        let tracker = RequestTracker::new();

        let pattern = query.file_pattern.clone().unwrap_or_default();
        let max_results = query.max_results.unwrap_or(usize::MAX);
        let mut match_count: usize = 0;
        let mut limit_hit = false;
        let mut failure: Option<SearchError> = None;

        limit_hit |= push_matching_extra_files(&query, &mut batcher, &mut match_count, max_results)
            .await;

        'folders: for folder in &query.folder_queries {
            if limit_hit || token.is_cancelled() {
                break;
            }
            let options = FolderSearchOptions::for_folder(&query, folder);
            tracker.begin_streaming();

            let provided = tokio::select! {
                _ = token.cancelled() => None,
                result = provider.provide_file_search_results(&pattern, &options, &token) => {
                    Some(result)
                }
            };
            let results = match provided {
                Some(Ok(results)) => results,
                Some(Err(error)) => {
                    if tracker.try_settle(RequestState::Failed) {
                        failure = Some(error);
                    }
                    break;
                }
                None => break,
            };

            for resource in results {
                if token.is_cancelled() {
                    break 'folders;
                }
                if match_count >= max_results {
                    limit_hit = true;
                    break 'folders;
                }
                match_count += 1;
                batcher.push(resource).await;
            }
        }

        batcher.flush().await;
        drop(batcher);
        let _ = relay.await;

        let stats = SearchStats {
            match_count: match_count as u64,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        if let Some(error) = failure {
            return Err(error);
        }
        if token.is_cancelled() {
            tracker.try_settle(RequestState::Cancelled);
            return Ok(SearchCompletion::cancelled(stats));
        }
        tracker.try_settle(RequestState::Succeeded);
        Ok(SearchCompletion::success(stats, limit_hit))
    }

    /// Index path: the provider contributes raw listings; include/exclude
    /// globs and the file pattern are applied here, with cache reuse keyed
    /// by the query's cache key.
    async fn run_index(
        &self,
        provider: Arc<dyn FileIndexProvider>,
        handle: ProviderHandle,
        session: SessionId,
        query: SearchQuery,
        token: CancellationToken,
    ) -> Result<SearchCompletion> {
        let started = Instant::now();
        let (batch_tx, relay) = spawn_match_relay(self.peer.clone(), handle, session);
        let mut batcher = MatchBatcher::new(batch_tx);
        let tracker = RequestTracker::new();

        let max_results = query.max_results.unwrap_or(usize::MAX);
        let mut match_count: usize = 0;
        let mut limit_hit = false;
        let mut failure: Option<SearchError> = None;
        let mut cancelled = false;

        limit_hit |= push_matching_extra_files(&query, &mut batcher, &mut match_count, max_results)
            .await;

        'folders: for folder in &query.folder_queries {
            if limit_hit || token.is_cancelled() {
                break;
            }
            let options = FolderSearchOptions::for_folder(&query, folder);
            let filter = match FolderFilter::compile(&options, query.file_pattern.as_deref()) {
                Ok(filter) => filter,
                Err(error) => {
                    tracker.try_settle(RequestState::Failed);
                    failure = Some(error);
                    break;
                }
            };
            tracker.begin_streaming();

            let candidates =
                match self.candidates_for_folder(&*provider, &query, &options, &token).await {
                    Ok(Some(candidates)) => candidates,
                    Ok(None) => {
                        cancelled = true;
                        break;
                    }
                    Err(error) => {
                        if tracker.try_settle(RequestState::Failed) {
                            failure = Some(error);
                        }
                        break;
                    }
                };

            let mut matched: Vec<Url> = Vec::new();
            for (index, candidate) in candidates.iter().enumerate() {
                if index & CANCEL_CHECK_MASK == 0 && token.is_cancelled() {
                    cancelled = true;
                    break 'folders;
                }
                let relative = relative_path(&options.folder, candidate);
                if filter.matches(&relative) {
                    matched.push(candidate.clone());
                }
            }

            if query.sort_by_score {
                let pattern = filter.pattern.clone().unwrap_or_default();
                matched.sort_by_key(|resource| {
                    std::cmp::Reverse(match_score(
                        &relative_path(&options.folder, resource),
                        &pattern,
                    ))
                });
            }

            for resource in matched {
                if match_count >= max_results {
                    limit_hit = true;
                    break 'folders;
                }
                match_count += 1;
                batcher.push(resource).await;
            }
        }

        batcher.flush().await;
        drop(batcher);
        let _ = relay.await;

        let stats = SearchStats {
            match_count: match_count as u64,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        if let Some(error) = failure {
            return Err(error);
        }
        if cancelled || token.is_cancelled() {
            tracker.try_settle(RequestState::Cancelled);
            return Ok(SearchCompletion::cancelled(stats));
        }
        tracker.try_settle(RequestState::Succeeded);
        Ok(SearchCompletion::success(stats, limit_hit))
    }

    /// Fetch or reuse the raw candidate listing for one folder. `Ok(None)`
    /// means the request was cancelled while waiting on the provider.
    async fn candidates_for_folder(
        &self,
        provider: &dyn FileIndexProvider,
        query: &SearchQuery,
        options: &FolderSearchOptions,
        token: &CancellationToken,
    ) -> Result<Option<Arc<Vec<Url>>>> {
        if let Some(cache_key) = &query.cache_key {
            if let Some(cached) = self.cache.get(cache_key, options.folder.as_str()) {
                tracing::debug!(
                    "index candidates for {} served from cache key {}",
                    options.folder,
                    cache_key
                );
                return Ok(Some(cached));
            }
        }

        let listed = tokio::select! {
            _ = token.cancelled() => return Ok(None),
            result = provider.provide_file_index(options, token) => result?,
        };
        let listed = Arc::new(listed);
        if let Some(cache_key) = &query.cache_key {
            self.cache
                .insert(cache_key, options.folder.as_str(), listed.clone());
        }
        Ok(Some(listed))
    }
}

/// Extra file resources ride along with every file search; they are matched
/// against the file pattern directly, ahead of any folder enumeration.
async fn push_matching_extra_files(
    query: &SearchQuery,
    batcher: &mut MatchBatcher,
    match_count: &mut usize,
    max_results: usize,
) -> bool {
    let pattern = query
        .file_pattern
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    for resource in &query.extra_file_resources {
        if !pattern.is_empty() && !resource.path().to_lowercase().contains(&pattern) {
            continue;
        }
        if *match_count >= max_results {
            return true;
        }
        *match_count += 1;
        batcher.push(resource.clone()).await;
    }
    false
}

fn resolve_match_uri(found: &RawFileMatch) -> Option<Url> {
    Url::from_file_path(&found.path)
        .ok()
        .or_else(|| Url::parse(&found.path).ok())
}

fn relative_path(folder: &Url, resource: &Url) -> String {
    resource
        .path()
        .strip_prefix(folder.path())
        .map(|stripped| stripped.trim_start_matches('/').to_string())
        .unwrap_or_else(|| resource.path().to_string())
}

/// Earlier pattern hits in shorter paths rank higher. Full fuzzy scoring is
/// the external matcher's job; this only orders an index listing usefully.
fn match_score(relative: &str, pattern: &str) -> i64 {
    let position = if pattern.is_empty() {
        0
    } else {
        relative.to_lowercase().find(pattern).unwrap_or(relative.len()) as i64
    };
    -(position * 1000 + relative.len() as i64)
}

/// Compiled include/exclude/pattern filter for one folder of an index
/// search.
#[derive(Debug)]
struct FolderFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    pattern: Option<String>,
}

impl FolderFilter {
    fn compile(options: &FolderSearchOptions, file_pattern: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: build_glob_set(&options.include_pattern)?,
            exclude: build_glob_set(&options.exclude_pattern)?,
            pattern: file_pattern
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_lowercase),
        })
    }

    fn matches(&self, relative: &str) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(relative) {
                return false;
            }
        }
        if let Some(include) = &self.include {
            if !include.is_match(relative) {
                return false;
            }
        }
        if let Some(pattern) = &self.pattern {
            if !relative.to_lowercase().contains(pattern.as_str()) {
                return false;
            }
        }
        true
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|error| SearchError::MalformedQuery(format!("invalid glob: {error}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|error| SearchError::MalformedQuery(format!("invalid glob set: {error}")))?;
    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{revive_query, RawFolderQuery, RawSearchQuery, UriComponents};

    fn options_for(include: &[&str], exclude: &[&str]) -> FolderSearchOptions {
        let mut folder = RawFolderQuery::new(UriComponents::file("/workspace"));
        folder.include_pattern = include.iter().map(|p| p.to_string()).collect();
        folder.exclude_pattern = exclude.iter().map(|p| p.to_string()).collect();
        let query = revive_query(RawSearchQuery {
            folder_queries: vec![folder],
            ..RawSearchQuery::default()
        })
        .expect("revive");
        FolderSearchOptions::for_folder(&query, &query.folder_queries[0])
    }

    #[test]
    fn exclude_wins_over_include() {
        let options = options_for(&["src/**"], &["src/generated/**"]);
        let filter = FolderFilter::compile(&options, None).expect("compile");

        assert!(filter.matches("src/main.rs"));
        assert!(!filter.matches("src/generated/bindings.rs"));
        assert!(!filter.matches("docs/readme.md"));
    }

    #[test]
    fn file_pattern_is_a_case_insensitive_substring() {
        let options = options_for(&[], &[]);
        let filter = FolderFilter::compile(&options, Some("Main")).expect("compile");

        assert!(filter.matches("src/main.rs"));
        assert!(!filter.matches("src/lib.rs"));
    }

    #[test]
    fn invalid_glob_is_a_protocol_error() {
        let options = options_for(&["src/[oops"], &[]);
        let error = FolderFilter::compile(&options, None).expect_err("must reject");
        assert!(matches!(error, SearchError::MalformedQuery(_)));
    }

    #[test]
    fn earlier_and_shorter_hits_score_higher() {
        assert!(match_score("main.rs", "main") > match_score("src/main.rs", "main"));
        assert!(match_score("src/main.rs", "main") > match_score("src/domain/main.rs", "main"));
    }

    #[test]
    fn relative_paths_are_folder_scoped() {
        let folder = Url::from_file_path("/workspace/app").expect("url");
        let resource = Url::from_file_path("/workspace/app/src/main.rs").expect("url");
        assert_eq!(relative_path(&folder, &resource), "src/main.rs");
    }
}
