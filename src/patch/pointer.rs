use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("pointer {0:?} must be empty or start with '/'")]
    MissingLeadingSlash(String),
    #[error("pointer {0:?} contains a '~' not followed by 0 or 1")]
    InvalidEscape(String),
}

/// A parsed JSON pointer (RFC 6901). The empty pointer addresses the whole document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> Result<Self, PointerError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = path.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(path.to_owned()));
        };
        let tokens = rest
            .split('/')
            .map(|raw| unescape(raw).ok_or_else(|| PointerError::InvalidEscape(path.to_owned())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Parent tokens and the final token, or `None` for the root.
    pub fn split_last(&self) -> Option<(&[String], &str)> {
        self.tokens
            .split_last()
            .map(|(last, parent)| (parent, last.as_str()))
    }

    /// True when `other` lies strictly below this pointer.
    pub fn is_proper_prefix_of(&self, other: &JsonPointer) -> bool {
        other.tokens.len() > self.tokens.len() && other.tokens.starts_with(&self.tokens)
    }
}

impl FromStr for JsonPointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

/// Parses an array index token: decimal digits, no sign, no leading zero.
pub fn parse_index(token: &str) -> Option<usize> {
    let valid = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if valid {
        token.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tokens_and_escapes() {
        let pointer = JsonPointer::parse("/rounds/0/actions/-").unwrap();
        assert_eq!(pointer.tokens(), ["rounds", "0", "actions", "-"]);

        let escaped = JsonPointer::parse("/a~1b/m~0n").unwrap();
        assert_eq!(escaped.tokens(), ["a/b", "m~n"]);
        assert_eq!(escaped.to_string(), "/a~1b/m~0n");

        assert!(JsonPointer::parse("").unwrap().is_root());
        assert_eq!(JsonPointer::parse("/").unwrap().tokens(), [""]);
    }

    #[test]
    fn rejects_malformed_pointers() {
        assert_eq!(
            JsonPointer::parse("players/0"),
            Err(PointerError::MissingLeadingSlash("players/0".into()))
        );
        assert!(matches!(
            JsonPointer::parse("/a~2"),
            Err(PointerError::InvalidEscape(_))
        ));
        assert!(matches!(
            JsonPointer::parse("/a~"),
            Err(PointerError::InvalidEscape(_))
        ));
    }

    #[test]
    fn index_tokens_are_strict() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index("-"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index(""), None);
    }

    #[test]
    fn prefix_relation_is_strict() {
        let rounds: JsonPointer = "/rounds".parse().unwrap();
        let first: JsonPointer = "/rounds/0".parse().unwrap();
        assert!(rounds.is_proper_prefix_of(&first));
        assert!(!first.is_proper_prefix_of(&rounds));
        assert!(!rounds.is_proper_prefix_of(&rounds));
    }
}
