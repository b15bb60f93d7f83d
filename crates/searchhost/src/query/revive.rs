//! Reconstruction of fully-typed queries from their transport-safe form.

use url::Url;

use crate::error::{Result, SearchError};

use super::raw::{RawFolderQuery, RawSearchQuery, UriComponents};

/// One folder root with its overrides, fully revived.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderQuery {
    pub folder: Url,
    pub include_pattern: Vec<String>,
    pub exclude_pattern: Vec<String>,
    pub file_encoding: Option<String>,
    pub disregard_ignore_files: Option<bool>,
}

/// A revived search request: every resource identifier resolvable.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub file_pattern: Option<String>,
    pub include_pattern: Vec<String>,
    pub exclude_pattern: Vec<String>,
    pub folder_queries: Vec<FolderQuery>,
    pub extra_file_resources: Vec<Url>,
    pub max_results: Option<usize>,
    pub cache_key: Option<String>,
    pub disregard_ignore_files: bool,
    pub follow_symlinks: bool,
    pub sort_by_score: bool,
    pub use_external_matcher: bool,
}

impl UriComponents {
    /// Rebuild the resource identifier this component set denotes.
    ///
    /// Fails only when the components are structurally malformed; folder
    /// existence is never checked here.
    pub fn revive(&self) -> Result<Url> {
        if self.scheme.is_empty() {
            return Err(SearchError::MalformedQuery(
                "uri components missing scheme".to_string(),
            ));
        }
        let mut text = format!("{}://{}{}", self.scheme, self.authority, self.path);
        if !self.query.is_empty() {
            text.push('?');
            text.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            text.push('#');
            text.push_str(&self.fragment);
        }
        Url::parse(&text)
            .map_err(|error| SearchError::MalformedQuery(format!("invalid uri components: {error}")))
    }
}

/// Revive a transport-safe query. Pure and total for well-formed input;
/// folder queries keep their order.
pub fn revive_query(raw: RawSearchQuery) -> Result<SearchQuery> {
    let folder_queries = raw
        .folder_queries
        .into_iter()
        .map(revive_folder_query)
        .collect::<Result<Vec<_>>>()?;
    let extra_file_resources = raw
        .extra_file_resources
        .iter()
        .map(UriComponents::revive)
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchQuery {
        file_pattern: raw.file_pattern,
        include_pattern: raw.include_pattern,
        exclude_pattern: raw.exclude_pattern,
        folder_queries,
        extra_file_resources,
        max_results: raw.max_results,
        cache_key: raw.cache_key,
        disregard_ignore_files: raw.disregard_ignore_files,
        follow_symlinks: raw.follow_symlinks,
        sort_by_score: raw.sort_by_score,
        use_external_matcher: raw.use_external_matcher,
    })
}

fn revive_folder_query(raw: RawFolderQuery) -> Result<FolderQuery> {
    Ok(FolderQuery {
        folder: raw.folder.revive()?,
        include_pattern: raw.include_pattern,
        exclude_pattern: raw.exclude_pattern,
        file_encoding: raw.file_encoding,
        disregard_ignore_files: raw.disregard_ignore_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_folders(paths: &[&str]) -> RawSearchQuery {
        RawSearchQuery {
            folder_queries: paths
                .iter()
                .map(|path| RawFolderQuery::new(UriComponents::file(*path)))
                .collect(),
            ..RawSearchQuery::default()
        }
    }

    #[test]
    fn folder_queries_keep_count_and_order() {
        let raw = raw_with_folders(&["/workspace/a", "/workspace/b", "/workspace/c"]);
        let revived = revive_query(raw).expect("revive");

        assert_eq!(revived.folder_queries.len(), 3);
        let paths: Vec<_> = revived
            .folder_queries
            .iter()
            .map(|fq| fq.folder.path().to_string())
            .collect();
        assert_eq!(paths, vec!["/workspace/a", "/workspace/b", "/workspace/c"]);
    }

    #[test]
    fn revived_root_is_a_resolvable_url() {
        let revived = UriComponents::file("/workspace/project").revive().expect("revive");
        assert_eq!(revived.scheme(), "file");
        assert_eq!(
            revived.to_file_path().expect("file path"),
            std::path::PathBuf::from("/workspace/project")
        );
    }

    #[test]
    fn missing_scheme_is_a_protocol_error() {
        let mut components = UriComponents::file("/workspace");
        components.scheme = String::new();

        let error = components.revive().expect_err("must reject");
        assert!(matches!(error, SearchError::MalformedQuery(_)));
    }

    #[test]
    fn extra_file_resources_are_revived() {
        let raw = RawSearchQuery {
            extra_file_resources: vec![UriComponents::file("/workspace/open-editor.rs")],
            ..RawSearchQuery::default()
        };

        let revived = revive_query(raw).expect("revive");
        assert_eq!(revived.extra_file_resources.len(), 1);
        assert_eq!(revived.extra_file_resources[0].path(), "/workspace/open-editor.rs");
    }

    #[test]
    fn query_and_fragment_round_trip() {
        let components = UriComponents {
            scheme: "remote".to_string(),
            authority: "host:22".to_string(),
            path: "/srv/data".to_string(),
            query: "ref=main".to_string(),
            fragment: "L10".to_string(),
        };

        let revived = components.revive().expect("revive");
        assert_eq!(revived.query(), Some("ref=main"));
        assert_eq!(revived.fragment(), Some("L10"));
    }
}
