//! String-level path helpers.
//!
//! Search roots may contain glob syntax, so they are handled as strings with
//! `/` separators rather than as `PathBuf`s.

/// Characters that make a path a pattern.
const WILDCARDS: &[char] = &['*', '?', '['];

/// Whether the path contains glob syntax.
pub fn has_wildcard(path: &str) -> bool {
    path.contains(WILDCARDS)
}

/// Whether the path is absolute: `/...`, `\...` or a drive prefix like `C:/`.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || drive_prefix(path).is_some()
}

/// Normalize a path lexically (no filesystem access).
///
/// Backslashes become `/`, repeated separators collapse, `.` is dropped and
/// `..` removes the preceding component. `..` never climbs above the root of
/// an absolute path. A trailing separator is removed.
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let (prefix, rest) = match drive_prefix(&unified) {
        Some(drive) => (format!("{drive}/"), &unified[drive.len()..]),
        None if unified.starts_with('/') => ("/".to_string(), unified.as_str()),
        None => (String::new(), unified.as_str()),
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if prefix.is_empty() {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if prefix.is_empty() && joined.is_empty() && !path.is_empty() {
        return ".".to_string();
    }
    format!("{prefix}{joined}")
}

/// Join a relative path onto a base and normalize the result.
pub fn join(base: &str, relative: &str) -> String {
    normalize(&format!("{base}/{relative}"))
}

/// `C:` style drive prefix, if any.
fn drive_prefix(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    let is_drive = bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/' || bytes[2] == b'\\');
    is_drive.then(|| &path[..2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/a/b/c/../../d"), "/a/d");
        assert_eq!(normalize("/a/./b/./c"), "/a/b/c");
        assert_eq!(normalize("/a/../../.."), "/");
    }

    #[test]
    fn normalize_unifies_separators() {
        assert_eq!(normalize("C:\\data\\files\\"), "C:/data/files");
        assert_eq!(normalize("//srv//share///x/"), "/srv/share/x");
    }

    #[test]
    fn normalize_keeps_leading_parent_on_relative() {
        assert_eq!(normalize("../a/./b"), "../a/b");
        assert_eq!(normalize("a/.."), ".");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_leaves_globs_alone() {
        assert_eq!(normalize("/data/*/in/../out"), "/data/*/out");
    }

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("/etc"));
        assert!(is_absolute("\\\\server\\share"));
        assert!(is_absolute("D:/x"));
        assert!(is_absolute("d:\\x"));
        assert!(!is_absolute("data/x"));
        assert!(!is_absolute("./x"));
        assert!(!is_absolute("ab:/x"));
    }

    #[test]
    fn join_normalizes() {
        assert_eq!(join("/base/", "sub\\dir"), "/base/sub/dir");
        assert_eq!(join("/base", "../other"), "/other");
    }

    #[test]
    fn wildcard_detection() {
        assert!(has_wildcard("/a/*"));
        assert!(has_wildcard("/a/?"));
        assert!(has_wildcard("/a/[ab]"));
        assert!(!has_wildcard("/a/b"));
    }
}
