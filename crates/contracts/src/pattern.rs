//! FilePattern - compiled matcher for source file identifiers
//!
//! Plain patterns are shell globs matched against the whole identifier.
//! Patterns prefixed with `regex:` are unanchored regular expressions.

use std::fmt;

use regex::Regex;

use crate::ContractError;

/// Prefix selecting regular-expression syntax.
pub const REGEX_PREFIX: &str = "regex:";

/// A compiled file pattern
#[derive(Clone)]
pub enum FilePattern {
    /// Shell glob (`*.log`, `app-?.log`, `/var/log/[ab]*.log`)
    Glob(glob::Pattern),
    /// Regular expression, matches anywhere in the identifier
    Regex(Regex),
}

impl FilePattern {
    /// Compile a raw pattern string
    ///
    /// # Errors
    /// Returns [`ContractError::InvalidPattern`] for empty or malformed patterns.
    pub fn compile(raw: &str) -> Result<Self, ContractError> {
        if raw.is_empty() {
            return Err(ContractError::invalid_pattern(raw, "pattern cannot be empty"));
        }

        match raw.strip_prefix(REGEX_PREFIX) {
            Some(expr) => Regex::new(expr)
                .map(Self::Regex)
                .map_err(|e| ContractError::invalid_pattern(raw, e.to_string())),
            None => glob::Pattern::new(raw)
                .map(Self::Glob)
                .map_err(|e| ContractError::invalid_pattern(raw, e.to_string())),
        }
    }

    /// Test a file identifier
    #[inline]
    pub fn matches(&self, file_id: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(file_id),
            Self::Regex(regex) => regex.is_match(file_id),
        }
    }

    /// Source text, without the `regex:` prefix
    pub fn as_str(&self) -> &str {
        match self {
            Self::Glob(pattern) => pattern.as_str(),
            Self::Regex(regex) => regex.as_str(),
        }
    }
}

impl fmt::Debug for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glob(_) => write!(f, "Glob({:?})", self.as_str()),
            Self::Regex(_) => write!(f, "Regex({:?})", self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matches_whole_identifier() {
        let all_logs = FilePattern::compile("*.log").unwrap();
        assert!(all_logs.matches("app-1.log"));
        assert!(all_logs.matches("/var/log/syslog.log"));
        assert!(!all_logs.matches("app-1.log.gz"));

        let app_logs = FilePattern::compile("app-*.log").unwrap();
        assert!(app_logs.matches("app-1.log"));
        assert!(!app_logs.matches("web-1.log"));
    }

    #[test]
    fn test_regex_prefix_is_unanchored() {
        let pattern = FilePattern::compile(r"regex:access\.log").unwrap();
        assert!(matches!(pattern, FilePattern::Regex(_)));
        assert!(pattern.matches("/var/log/nginx/access.log"));
        assert!(pattern.matches("access.log.1"));
        assert!(!pattern.matches("error.log"));
        assert_eq!(pattern.as_str(), r"access\.log");
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        assert!(matches!(
            FilePattern::compile(""),
            Err(ContractError::InvalidPattern { .. })
        ));
        assert!(matches!(
            FilePattern::compile("regex:("),
            Err(ContractError::InvalidPattern { .. })
        ));
        assert!(matches!(
            FilePattern::compile("[unclosed"),
            Err(ContractError::InvalidPattern { .. })
        ));
    }
}
