//! Provider seams: the closed set of search capabilities the dispatcher
//! drives.
//!
//! Providers come in four kinds with distinct production models:
//! - file-name providers return a full candidate list per folder (batch),
//! - index providers enumerate raw listings the dispatcher filters itself,
//! - text providers emit incremental matches through a progress sender,
//! - the single internal engine streams loosely typed events classified by
//!   [`crate::classify`].

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Result;
use crate::query::{FolderQuery, SearchQuery, TextPattern};
use crate::types::TextSearchMatch;

/// Options handed to a provider for one folder of a search request, with
/// folder-scoped overrides already merged over the global query options.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderSearchOptions {
    pub folder: Url,
    pub include_pattern: Vec<String>,
    pub exclude_pattern: Vec<String>,
    pub file_encoding: Option<String>,
    pub disregard_ignore_files: bool,
    pub follow_symlinks: bool,
    pub max_results: Option<usize>,
}

impl FolderSearchOptions {
    pub fn for_folder(query: &SearchQuery, folder: &FolderQuery) -> Self {
        let mut include_pattern = query.include_pattern.clone();
        include_pattern.extend(folder.include_pattern.iter().cloned());
        let mut exclude_pattern = query.exclude_pattern.clone();
        exclude_pattern.extend(folder.exclude_pattern.iter().cloned());

        Self {
            folder: folder.folder.clone(),
            include_pattern,
            exclude_pattern,
            file_encoding: folder.file_encoding.clone(),
            disregard_ignore_files: folder
                .disregard_ignore_files
                .unwrap_or(query.disregard_ignore_files),
            follow_symlinks: query.follow_symlinks,
            max_results: query.max_results,
        }
    }
}

/// File-name search provider: a single batch entry producing the candidate
/// list for one folder. The engine applies batching and the result limit.
#[async_trait]
pub trait FileSearchProvider: Send + Sync {
    async fn provide_file_search_results(
        &self,
        pattern: &str,
        options: &FolderSearchOptions,
        token: &CancellationToken,
    ) -> Result<Vec<Url>>;
}

/// Index-backed provider: contributes raw file listings only. All
/// include/exclude/pattern filtering happens in the dispatcher's engine.
#[async_trait]
pub trait FileIndexProvider: Send + Sync {
    async fn provide_file_index(
        &self,
        options: &FolderSearchOptions,
        token: &CancellationToken,
    ) -> Result<Vec<Url>>;
}

/// Completion a text provider reports once its progress stream is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextProviderCompletion {
    pub limit_hit: bool,
}

/// Full-text search provider driven through a per-request engine.
#[async_trait]
pub trait TextSearchProvider: Send + Sync {
    /// Whether this provider implements text search at all. Requests against
    /// a provider without the capability resolve to an empty result.
    fn supports_text_search(&self) -> bool {
        true
    }

    /// Produce matches for one folder, emitting each through `progress`.
    /// Returns aggregated completion or an error the coordinator surfaces as
    /// a failed outcome.
    async fn provide_text_search_results(
        &self,
        pattern: &TextPattern,
        options: &FolderSearchOptions,
        progress: mpsc::UnboundedSender<TextSearchMatch>,
        token: &CancellationToken,
    ) -> Result<TextProviderCompletion>;
}

/// Provider-native form of a file query: folder roots flattened to plain
/// path strings the internal engine understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NativeFileQuery {
    pub folder_roots: Vec<String>,
    pub file_pattern: Option<String>,
    pub include_pattern: Vec<String>,
    pub exclude_pattern: Vec<String>,
    pub max_results: Option<usize>,
    pub cache_key: Option<String>,
    pub disregard_ignore_files: bool,
    pub use_external_matcher: bool,
}

impl NativeFileQuery {
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            folder_roots: query
                .folder_queries
                .iter()
                .map(|fq| folder_root_string(&fq.folder))
                .collect(),
            file_pattern: query.file_pattern.clone(),
            include_pattern: query.include_pattern.clone(),
            exclude_pattern: query.exclude_pattern.clone(),
            max_results: query.max_results,
            cache_key: query.cache_key.clone(),
            disregard_ignore_files: query.disregard_ignore_files,
            use_external_matcher: query.use_external_matcher,
        }
    }
}

fn folder_root_string(folder: &Url) -> String {
    folder
        .to_file_path()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| folder.to_string())
}

/// The privileged built-in search engine, registered in a single dedicated
/// slot. Its event stream carries loosely typed payloads; see
/// [`crate::classify`] for the shapes.
pub trait InternalFileSearchProvider: Send + Sync {
    /// Start a search and hand back the engine's event stream.
    fn search(
        &self,
        query: NativeFileQuery,
        token: &CancellationToken,
    ) -> mpsc::UnboundedReceiver<serde_json::Value>;

    /// Drop any cached results stored under `cache_key`. Unknown keys are a
    /// no-op.
    fn clear_cache(&self, cache_key: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{revive_query, RawFolderQuery, RawSearchQuery, UriComponents};

    fn query_with_overrides() -> SearchQuery {
        let mut folder = RawFolderQuery::new(UriComponents::file("/workspace/app"));
        folder.include_pattern = vec!["src/**".to_string()];
        folder.disregard_ignore_files = Some(true);

        revive_query(RawSearchQuery {
            include_pattern: vec!["**/*.rs".to_string()],
            exclude_pattern: vec!["target/**".to_string()],
            folder_queries: vec![folder],
            disregard_ignore_files: false,
            ..RawSearchQuery::default()
        })
        .expect("revive")
    }

    #[test]
    fn folder_options_merge_over_global_options() {
        let query = query_with_overrides();
        let options = FolderSearchOptions::for_folder(&query, &query.folder_queries[0]);

        assert_eq!(
            options.include_pattern,
            vec!["**/*.rs".to_string(), "src/**".to_string()]
        );
        assert_eq!(options.exclude_pattern, vec!["target/**".to_string()]);
        assert!(options.disregard_ignore_files, "folder override wins");
    }

    #[test]
    fn native_query_flattens_folder_roots_to_paths() {
        let query = query_with_overrides();
        let native = NativeFileQuery::from_query(&query);
        assert_eq!(native.folder_roots, vec!["/workspace/app".to_string()]);
    }

    #[test]
    fn non_file_roots_flatten_to_uri_strings() {
        let query = revive_query(RawSearchQuery {
            folder_queries: vec![RawFolderQuery::new(UriComponents {
                scheme: "remote".to_string(),
                authority: "box".to_string(),
                path: "/srv".to_string(),
                query: String::new(),
                fragment: String::new(),
            })],
            ..RawSearchQuery::default()
        })
        .expect("revive");

        let native = NativeFileQuery::from_query(&query);
        assert_eq!(native.folder_roots, vec!["remote://box/srv".to_string()]);
    }
}
