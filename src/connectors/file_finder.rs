//! File finder connector.
//!
//! Turns caller-supplied folders and patterns into a minimal set of absolute
//! search roots and hands them to a [`SearchPrimitive`]:
//!
//! 1. Relative folders are joined onto the connector's base path.
//! 2. An empty folder list searches the base path itself.
//! 3. Literal folders that are not existing directories are dropped.
//! 4. Exact duplicates are dropped, then entries matched by another
//!    wildcard entry.
//!
//! Folders that all turn out missing give an empty, successful result.

use std::fmt;
use std::path::Path;

use crate::config::FileFinderConfig;
use crate::connector::{ConnectorBackend, FileSearchQuery};
use crate::error::ConnectorError;
use crate::finder::{FileMatches, Finder, SearchPrimitive, glob, path};

/// Vendor folder below the installation root.
pub const VENDOR_FOLDER: &str = "vendor";

/// Result of a file search.
#[derive(Debug)]
pub struct FileSearchResult {
    /// Base path relative results should be read against.
    pub base_path: String,
    /// Roots handed to the search primitive. Empty when nothing was searched.
    pub roots: Vec<String>,
    pub matches: FileMatches,
}

/// Filesystem search connector.
pub struct FileFinderConnector {
    config: FileFinderConfig,
    base_path: Option<String>,
    search: Box<dyn SearchPrimitive>,
}

impl fmt::Debug for FileFinderConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFinderConnector")
            .field("config", &self.config)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl FileFinderConnector {
    /// Connector backed by the recursive [`Finder`].
    pub fn new(config: FileFinderConfig) -> Self {
        Self::with_search(config, Finder::new())
    }

    pub fn with_search(config: FileFinderConfig, search: impl SearchPrimitive + 'static) -> Self {
        Self {
            config,
            base_path: None,
            search: Box::new(search),
        }
    }

    pub fn config(&self) -> &FileFinderConfig {
        &self.config
    }

    /// Base path resolved at connect time.
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    fn installation_root(&self) -> Result<String, String> {
        match self.config.installation_root.as_deref() {
            Some(root) if path::is_absolute(root) => Ok(path::normalize(root)),
            Some(root) => Ok(path::join(&current_dir()?, root)),
            None => current_dir(),
        }
    }

    fn resolve_base_path(&self) -> Result<String, String> {
        let root = self.installation_root()?;
        if self.config.use_vendor_folder_as_base {
            return Ok(path::join(&root, VENDOR_FOLDER));
        }
        Ok(match self.config.base_path.as_deref().filter(|p| !p.is_empty()) {
            Some(base) if path::is_absolute(base) => path::normalize(base),
            Some(base) => path::join(&root, base),
            None => root,
        })
    }
}

fn current_dir() -> Result<String, String> {
    std::env::current_dir()
        .map(|dir| path::normalize(&dir.to_string_lossy()))
        .map_err(|e| format!("cannot determine the working directory: {e}"))
}

/// Compute the final search roots.
///
/// `connector_base` anchors relative folders; `effective_base` is searched
/// when no folder is given.
pub fn resolve_search_roots(
    connector_base: &str,
    effective_base: &str,
    folders: &[String],
) -> Vec<String> {
    let mut roots: Vec<String> = folders
        .iter()
        .map(|folder| {
            if path::is_absolute(folder) {
                path::normalize(folder)
            } else {
                path::join(connector_base, folder)
            }
        })
        .collect();

    if roots.is_empty() {
        roots.push(path::normalize(effective_base));
    }

    roots.retain(|root| path::has_wildcard(root) || Path::new(root).is_dir());

    let mut unique: Vec<String> = Vec::with_capacity(roots.len());
    for root in roots {
        if !unique.contains(&root) {
            unique.push(root);
        }
    }

    eliminate_subsumed(unique)
}

/// Drop every root matched by another wildcard root. A root that was already
/// dropped no longer removes others. An existing directory is searched as a
/// literal path, so it never acts as a pattern even when its name holds glob
/// characters.
pub fn eliminate_subsumed(roots: Vec<String>) -> Vec<String> {
    let mut kept = vec![true; roots.len()];
    for (i, pattern) in roots.iter().enumerate() {
        if !kept[i] || !path::has_wildcard(pattern) || Path::new(pattern).is_dir() {
            continue;
        }
        let Ok(glob) = glob::GlobPattern::new(pattern) else {
            continue;
        };
        for (j, candidate) in roots.iter().enumerate() {
            if i != j && kept[j] && glob.is_match(candidate) {
                kept[j] = false;
            }
        }
    }
    roots
        .into_iter()
        .zip(kept)
        .filter_map(|(root, keep)| keep.then_some(root))
        .collect()
}

impl ConnectorBackend for FileFinderConnector {
    type Query = FileSearchQuery;
    type Output = FileSearchResult;

    fn perform_connect(&mut self, alias: &str) -> Result<(), ConnectorError> {
        let base = self
            .resolve_base_path()
            .map_err(|reason| ConnectorError::ConnectionFailed {
                connector: alias.to_string(),
                reason,
            })?;
        tracing::debug!(connector = %alias, base_path = %base, "Resolved base path");
        self.base_path = Some(base);
        Ok(())
    }

    fn perform_query(
        &mut self,
        alias: &str,
        query: &FileSearchQuery,
    ) -> Result<FileSearchResult, ConnectorError> {
        let Some(connector_base) = self.base_path.clone() else {
            return Err(ConnectorError::ConnectionFailed {
                connector: alias.to_string(),
                reason: "base path not resolved".into(),
            });
        };
        let base_path = query.base_path.clone().unwrap_or_else(|| connector_base.clone());

        let roots = resolve_search_roots(&connector_base, &base_path, &query.folders);
        if roots.is_empty() {
            tracing::debug!(connector = %alias, "No existing folder to search");
            return Ok(FileSearchResult {
                base_path,
                roots,
                matches: FileMatches::empty(),
            });
        }

        tracing::debug!(connector = %alias, roots = ?roots, "Searching");
        let matches = self
            .search
            .search(&roots)
            .map_err(|e| ConnectorError::QueryFailed {
                connector: alias.to_string(),
                source: Box::new(e),
            })?;

        Ok(FileSearchResult {
            base_path,
            roots,
            matches,
        })
    }

    fn perform_disconnect(&mut self) -> Result<(), ConnectorError> {
        self.base_path = None;
        Ok(())
    }
}
