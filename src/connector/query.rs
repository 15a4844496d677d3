//! Query families accepted by connectors.
//!
//! Every connector accepts exactly one family. The family check happens at
//! the connection boundary before the backend is touched.

use std::fmt;

use crate::connectors::file_finder::FileSearchResult;
use crate::connectors::smtp::MailDelivery;

/// Discriminant of a query family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    FileSearch,
    Mail,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileSearch => f.write_str("file_search"),
            Self::Mail => f.write_str("mail"),
        }
    }
}

// ── File search ─────────────────────────────────────────────────────

/// "Search these folders/patterns for files."
///
/// Folders may be absolute or relative to the connector's base path and may
/// contain glob wildcards (`*`, `?`, `[...]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSearchQuery {
    pub folders: Vec<String>,
    /// Overrides the base path reported in the result.
    pub base_path: Option<String>,
}

impl FileSearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folders.push(folder.into());
        self
    }

    pub fn with_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders.extend(folders.into_iter().map(Into::into));
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }
}

// ── Mail ────────────────────────────────────────────────────────────

/// Deliver an already assembled message through a mail transport.
#[derive(Debug, Clone)]
pub struct MailQuery {
    pub message: lettre::Message,
}

impl MailQuery {
    pub fn new(message: lettre::Message) -> Self {
        Self { message }
    }
}

// ── Tagged union ────────────────────────────────────────────────────

/// A query in any family.
#[derive(Debug, Clone)]
pub enum Query {
    FileSearch(FileSearchQuery),
    Mail(MailQuery),
}

impl Query {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::FileSearch(_) => QueryKind::FileSearch,
            Self::Mail(_) => QueryKind::Mail,
        }
    }
}

impl From<FileSearchQuery> for Query {
    fn from(query: FileSearchQuery) -> Self {
        Self::FileSearch(query)
    }
}

impl From<MailQuery> for Query {
    fn from(query: MailQuery) -> Self {
        Self::Mail(query)
    }
}

/// Capability implemented by each concrete query type: its family tag and a
/// checked projection out of [`Query`].
pub trait QueryFamily {
    const KIND: QueryKind;

    fn from_query(query: &Query) -> Option<&Self>;
}

impl QueryFamily for FileSearchQuery {
    const KIND: QueryKind = QueryKind::FileSearch;

    fn from_query(query: &Query) -> Option<&Self> {
        match query {
            Query::FileSearch(q) => Some(q),
            _ => None,
        }
    }
}

impl QueryFamily for MailQuery {
    const KIND: QueryKind = QueryKind::Mail;

    fn from_query(query: &Query) -> Option<&Self> {
        match query {
            Query::Mail(q) => Some(q),
            _ => None,
        }
    }
}

/// Result of a query, one variant per family.
#[derive(Debug)]
pub enum QueryResult {
    Files(FileSearchResult),
    Delivered(MailDelivery),
}

impl From<FileSearchResult> for QueryResult {
    fn from(result: FileSearchResult) -> Self {
        Self::Files(result)
    }
}

impl From<MailDelivery> for QueryResult {
    fn from(delivery: MailDelivery) -> Self {
        Self::Delivered(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        let query: Query = FileSearchQuery::new().with_folder("data").into();
        assert_eq!(query.kind(), QueryKind::FileSearch);
        assert_eq!(query.kind().to_string(), "file_search");
    }

    #[test]
    fn projection_rejects_foreign_family() {
        let query: Query = FileSearchQuery::new().into();
        assert!(FileSearchQuery::from_query(&query).is_some());
        assert!(MailQuery::from_query(&query).is_none());
    }

    #[test]
    fn builder_keeps_folder_order() {
        let query = FileSearchQuery::new()
            .with_folder("b")
            .with_folders(["a", "c"])
            .with_base_path("/srv");
        assert_eq!(query.folders, vec!["b", "a", "c"]);
        assert_eq!(query.base_path.as_deref(), Some("/srv"));
    }
}
