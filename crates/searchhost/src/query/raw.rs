use serde::{Deserialize, Serialize};

/// Portable pieces of a resource identifier as they travel across the
/// serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriComponents {
    pub scheme: String,
    #[serde(default)]
    pub authority: String,
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub fragment: String,
}

impl UriComponents {
    /// Components for a plain filesystem path.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            scheme: "file".to_string(),
            authority: String::new(),
            path: path.into(),
            query: String::new(),
            fragment: String::new(),
        }
    }
}

/// One folder root plus its folder-scoped option overrides, in transport
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFolderQuery {
    pub folder: UriComponents,
    #[serde(default)]
    pub include_pattern: Vec<String>,
    #[serde(default)]
    pub exclude_pattern: Vec<String>,
    #[serde(default)]
    pub file_encoding: Option<String>,
    #[serde(default)]
    pub disregard_ignore_files: Option<bool>,
}

impl RawFolderQuery {
    pub fn new(folder: UriComponents) -> Self {
        Self {
            folder,
            include_pattern: Vec::new(),
            exclude_pattern: Vec::new(),
            file_encoding: None,
            disregard_ignore_files: None,
        }
    }
}

/// A normalized search request in its transport-safe form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchQuery {
    #[serde(default)]
    pub file_pattern: Option<String>,
    #[serde(default)]
    pub include_pattern: Vec<String>,
    #[serde(default)]
    pub exclude_pattern: Vec<String>,
    #[serde(default)]
    pub folder_queries: Vec<RawFolderQuery>,
    #[serde(default)]
    pub extra_file_resources: Vec<UriComponents>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub disregard_ignore_files: bool,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub sort_by_score: bool,
    #[serde(default)]
    pub use_external_matcher: bool,
}

/// Content pattern for text search. Needs no revival; only resource
/// identifiers change shape across the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPattern {
    pub pattern: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default)]
    pub is_case_sensitive: bool,
    #[serde(default)]
    pub is_word_match: bool,
}

impl TextPattern {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }
}
