//! `fnmatch`-style glob patterns compiled to regular expressions.
//!
//! Supported syntax: `*`, `?`, bracket classes (`[abc]`, `[a-z]`, `[!x]`,
//! `[^x]`) and `\` escapes. An unterminated `[` is a literal.

use regex::Regex;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    /// Whole-path pattern: `*` and `?` also match `/`, like `fnmatch`
    /// without `FNM_PATHNAME`.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::compile(pattern, ".*", ".")
    }

    /// Single path component pattern: wildcards never cross `/`.
    pub fn component(pattern: &str) -> Result<Self, regex::Error> {
        Self::compile(pattern, "[^/]*", "[^/]")
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    fn compile(pattern: &str, star: &str, any: &str) -> Result<Self, regex::Error> {
        let source = format!("^{}$", translate(pattern, star, any));
        Ok(Self {
            regex: Regex::new(&source)?,
        })
    }
}

fn translate(pattern: &str, star: &str, any: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(star),
            '?' => out.push_str(any),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            '[' => match bracket_class(&chars[i..]) {
                Some((class, consumed)) => {
                    out.push_str(&class);
                    i += consumed;
                    continue;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out
}

/// Translate a bracket class starting at `chars[0] == '['`.
///
/// Returns the regex class and the number of pattern chars consumed, or
/// `None` when the class is unterminated.
fn bracket_class(chars: &[char]) -> Option<(String, usize)> {
    let mut i = 1;
    let mut class = String::from("[");

    if matches!(chars.get(i), Some('!') | Some('^')) {
        class.push('^');
        i += 1;
    }
    // A `]` right after the opening (or negation) is a literal member.
    if chars.get(i) == Some(&']') {
        class.push_str(r"\]");
        i += 1;
    }

    while i < chars.len() {
        match chars[i] {
            ']' => {
                class.push(']');
                return Some((class, i + 1));
            }
            '-' => class.push('-'),
            c => class.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        GlobPattern::new(pattern).unwrap().is_match(text)
    }

    #[test]
    fn star_crosses_separators_in_path_mode() {
        assert!(matches("/a/*", "/a/b"));
        assert!(matches("/a/*", "/a/b/c"));
        assert!(!matches("/a/*", "/b/a"));
    }

    #[test]
    fn star_stays_in_component_mode() {
        let glob = GlobPattern::component("*.d").unwrap();
        assert!(glob.is_match("conf.d"));
        assert!(!glob.is_match("x/conf.d"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(matches("/logs/202?", "/logs/2024"));
        assert!(!matches("/logs/202?", "/logs/20245"));
    }

    #[test]
    fn bracket_classes() {
        assert!(matches("/v[0-9]", "/v3"));
        assert!(!matches("/v[0-9]", "/vx"));
        assert!(matches("/v[!0-9]", "/vx"));
        assert!(matches("/v[^0-9]", "/vx"));
        assert!(matches("/[]]", "/]"));
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        assert!(matches("/a[b", "/a[b"));
        assert!(!matches("/a[b", "/ab"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("/data/v1.0+(x)", "/data/v1.0+(x)"));
        assert!(!matches("/data/v1.0", "/data/v1x0"));
    }

    #[test]
    fn escaped_wildcard_is_literal() {
        assert!(matches(r"/a/\*", "/a/*"));
        assert!(!matches(r"/a/\*", "/a/b"));
    }

    #[test]
    fn pattern_matches_itself_through_star() {
        // "/a/*" also matches the literal string "/a/*x".
        assert!(matches("/a/*", "/a/*x"));
    }
}
