//! Native directory search primitive.
//!
//! [`Finder`] collects search roots (appended across calls), expands glob
//! roots into the directories they match and exposes every file and folder
//! below the roots as a lazy, depth-first sequence of [`FileEntry`] values.
//! A literal root that does not exist, or a glob root that matches no
//! directory, is an error.

pub mod glob;
pub mod path;

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::GlobPattern;

/// A file or directory yielded by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Path relative to the search root it was found under, `/`-separated.
    pub relative_path: String,
    pub is_dir: bool,
    pub size: u64,
}

impl FileEntry {
    /// Get just the filename (last component).
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.relative_path)
    }
}

/// Search primitive consumed by the file connector.
pub trait SearchPrimitive: Send {
    /// Search below `roots` (absolute, possibly containing glob syntax).
    fn search(&self, roots: &[String]) -> io::Result<FileMatches>;
}

/// Recursive directory search.
#[derive(Debug, Clone)]
pub struct Finder {
    roots: Vec<PathBuf>,
    files_only: bool,
    max_depth: Option<usize>,
    ignore_dot_files: bool,
    follow_links: bool,
}

impl Default for Finder {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            files_only: false,
            max_depth: None,
            ignore_dot_files: true,
            follow_links: false,
        }
    }
}

impl Finder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield files only, skipping directory entries.
    pub fn files_only(mut self) -> Self {
        self.files_only = true;
        self
    }

    /// Do not descend more than `depth` levels below a root (0 = root only).
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Include entries whose name starts with `.`.
    pub fn include_dot_files(mut self) -> Self {
        self.ignore_dot_files = false;
        self
    }

    /// Descend into symlinked directories. Each physical directory is
    /// still visited once.
    pub fn follow_links(mut self) -> Self {
        self.follow_links = true;
        self
    }

    /// Add search roots. Glob roots are expanded to the directories they
    /// match; earlier roots are kept.
    pub fn in_dirs<S: AsRef<str>>(&mut self, roots: &[S]) -> io::Result<&mut Self> {
        for root in roots {
            let root = root.as_ref();
            if Path::new(root).is_dir() {
                self.roots.push(PathBuf::from(root));
                continue;
            }
            let mut expanded = if path::has_wildcard(root) {
                expand_glob(root)?
            } else {
                Vec::new()
            };
            if expanded.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("The \"{root}\" directory does not exist"),
                ));
            }
            expanded.sort();
            self.roots.append(&mut expanded);
        }
        Ok(self)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Lazy sequence over everything below the current roots.
    pub fn matches(&self) -> FileMatches {
        FileMatches {
            pending_roots: self.roots.iter().cloned().collect(),
            stack: Vec::new(),
            files_only: self.files_only,
            max_depth: self.max_depth,
            ignore_dot_files: self.ignore_dot_files,
            follow_links: self.follow_links,
            visited: HashSet::new(),
        }
    }
}

impl SearchPrimitive for Finder {
    fn search(&self, roots: &[String]) -> io::Result<FileMatches> {
        let mut finder = self.clone();
        finder.in_dirs(roots)?;
        Ok(finder.matches())
    }
}

/// Expand a glob root into the directories it matches, one component at a
/// time (wildcards never cross `/`).
fn expand_glob(pattern: &str) -> io::Result<Vec<PathBuf>> {
    let normalized = path::normalize(pattern);
    let (start, rest) = match normalized.find('/') {
        Some(0) => ("/".to_string(), &normalized[1..]),
        Some(pos) if path::is_absolute(&normalized) => {
            (normalized[..=pos].to_string(), &normalized[pos + 1..])
        }
        _ => (".".to_string(), normalized.as_str()),
    };

    let mut current = vec![PathBuf::from(start)];
    for component in rest.split('/').filter(|c| !c.is_empty()) {
        let mut next = Vec::new();
        if path::has_wildcard(component) {
            let glob = GlobPattern::component(component)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            for dir in &current {
                let Ok(entries) = fs::read_dir(dir) else {
                    continue;
                };
                for entry in entries {
                    let entry = entry?;
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    if name.starts_with('.') && !component.starts_with('.') {
                        continue;
                    }
                    let candidate = entry.path();
                    if glob.is_match(&name) && candidate.is_dir() {
                        next.push(candidate);
                    }
                }
            }
        } else {
            for dir in &current {
                let candidate = dir.join(component);
                if candidate.is_dir() {
                    next.push(candidate);
                }
            }
        }
        if next.is_empty() {
            return Ok(next);
        }
        current = next;
    }

    Ok(current)
}

struct Frame {
    root: PathBuf,
    entries: fs::ReadDir,
    depth: usize,
}

/// Lazy depth-first iterator over search matches.
///
/// Symlinked directories are reported but only entered when following
/// links.
pub struct FileMatches {
    pending_roots: VecDeque<PathBuf>,
    stack: Vec<Frame>,
    files_only: bool,
    max_depth: Option<usize>,
    ignore_dot_files: bool,
    follow_links: bool,
    /// Canonical directories already entered while following links.
    visited: HashSet<PathBuf>,
}

impl std::fmt::Debug for FileMatches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMatches")
            .field("pending_roots", &self.pending_roots)
            .field("open_dirs", &self.stack.len())
            .finish()
    }
}

impl FileMatches {
    /// A sequence that yields nothing.
    pub fn empty() -> Self {
        Self {
            pending_roots: VecDeque::new(),
            stack: Vec::new(),
            files_only: false,
            max_depth: None,
            ignore_dot_files: true,
            follow_links: false,
            visited: HashSet::new(),
        }
    }

    /// Whether `dir` has not been entered yet. Always true unless links
    /// are followed.
    fn first_visit(&mut self, dir: &Path) -> bool {
        if !self.follow_links {
            return true;
        }
        fs::canonicalize(dir).is_ok_and(|real| self.visited.insert(real))
    }
}

impl Iterator for FileMatches {
    type Item = io::Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                let root = self.pending_roots.pop_front()?;
                if !self.first_visit(&root) {
                    continue;
                }
                match fs::read_dir(&root) {
                    Ok(entries) => self.stack.push(Frame {
                        root,
                        entries,
                        depth: 0,
                    }),
                    Err(e) => return Some(Err(e)),
                }
                continue;
            };

            let entry = match frame.entries.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(entry)) => entry,
            };
            let root = frame.root.clone();
            let depth = frame.depth;

            if self.ignore_dot_files && entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            let is_link = match entry.file_type() {
                Ok(file_type) => file_type.is_symlink(),
                Err(e) => return Some(Err(e)),
            };
            // Dangling links are reported as the link itself.
            let metadata = match fs::metadata(&path).or_else(|_| fs::symlink_metadata(&path)) {
                Ok(m) => m,
                Err(e) => return Some(Err(e)),
            };
            let is_dir = metadata.is_dir();

            if is_dir
                && (!is_link || self.follow_links)
                && self.max_depth.is_none_or(|max| depth < max)
                && self.first_visit(&path)
            {
                match fs::read_dir(&path) {
                    Ok(entries) => self.stack.push(Frame {
                        root: root.clone(),
                        entries,
                        depth: depth + 1,
                    }),
                    Err(e) => return Some(Err(e)),
                }
            }

            if is_dir && self.files_only {
                continue;
            }

            let relative_path = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");

            return Some(Ok(FileEntry {
                path,
                relative_path,
                is_dir,
                size: if is_dir { 0 } else { metadata.len() },
            }));
        }
    }
}
