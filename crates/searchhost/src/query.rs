//! Transport-safe query representation and revival.
//!
//! Queries cross the serialization boundary with every resource identifier
//! reduced to portable [`UriComponents`]. The reviver reconstructs each
//! folder root and extra file resource into a resolvable [`url::Url`]
//! without touching the filesystem.

mod raw;
mod revive;

pub use raw::{RawFolderQuery, RawSearchQuery, TextPattern, UriComponents};
pub use revive::{revive_query, FolderQuery, SearchQuery};
