//! Name filters for directory listings.
//!
//! Filesystem protocols send DOS-style search expressions. Three reserved
//! markers are translated into shell wildcards before matching:
//!
//! | Marker | Meaning                                   |
//! |--------|-------------------------------------------|
//! | `<`    | `*`                                       |
//! | `>`    | `?`                                       |
//! | `"`    | any single character except a marker     |

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Class substituted for the `"` marker
const ANY_BUT_MARKER: &str = "[!<>\"]";

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Nothing,
    /// Lowercased needle
    Substring(String),
    Glob(Pattern),
}

/// A compiled name filter
#[derive(Debug, Clone)]
pub struct NamePattern {
    matcher: Matcher,
}

impl NamePattern {
    /// Filter that accepts every name
    pub fn any() -> Self {
        Self {
            matcher: Matcher::Any,
        }
    }

    /// Compile a search expression.
    ///
    /// Expressions without wildcards match as case-insensitive substrings;
    /// with wildcards they must match the whole name, case-insensitively.
    pub fn new(expression: &str) -> Self {
        if matches!(expression, "" | "*" | "*.*" | "<") {
            return Self::any();
        }

        if !expression.contains(|c: char| matches!(c, '*' | '?' | '<' | '>' | '"')) {
            return Self {
                matcher: Matcher::Substring(expression.to_lowercase()),
            };
        }

        let translated = translate(expression);
        let matcher = match Pattern::new(&translated) {
            Ok(pattern) => Matcher::Glob(pattern),
            Err(e) => {
                tracing::debug!("Invalid search pattern {:?}: {}", expression, e);
                Matcher::Nothing
            }
        };

        Self { matcher }
    }

    /// Build from an optional expression; `None` accepts everything
    pub fn from_option(expression: Option<&str>) -> Self {
        expression.map(Self::new).unwrap_or_else(Self::any)
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Nothing => false,
            Matcher::Substring(needle) => name.to_lowercase().contains(needle.as_str()),
            Matcher::Glob(pattern) => pattern.matches_with(name, MATCH_OPTIONS),
        }
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        Self::any()
    }
}

/// Translate a search expression into glob syntax
fn translate(expression: &str) -> String {
    let mut glob = String::with_capacity(expression.len());
    let mut buf = [0u8; 4];

    for c in expression.chars() {
        match c {
            '*' | '<' => glob.push('*'),
            '?' | '>' => glob.push('?'),
            '"' => glob.push_str(ANY_BUT_MARKER),
            other => glob.push_str(&Pattern::escape(other.encode_utf8(&mut buf))),
        }
    }

    glob
}
