//! Identifier validation.
//!
//! Identifiers (table and column names) pass through to generated SQL without
//! quoting, so validation is the sole defense against injection through the
//! identifier position. The accepted grammar is one or more segments of
//! `[A-Za-z0-9_]+` joined by single dots, which covers both bare names
//! (`title`) and qualified references (`posts.title`).

use crate::error::{Error, Result};

/// Validate an identifier, returning it unchanged on success.
///
/// Rejects the empty string, leading/trailing/doubled dots, and any character
/// outside `[A-Za-z0-9_.]`.
pub fn check_identifier(ident: &str) -> Result<&str> {
    if ident.is_empty() {
        return Err(Error::unsafe_identifier(ident));
    }
    for segment in ident.split('.') {
        if segment.is_empty() {
            return Err(Error::unsafe_identifier(ident));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::unsafe_identifier(ident));
        }
    }
    Ok(ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(check_identifier("posts").is_ok());
        assert!(check_identifier("created_at").is_ok());
        assert!(check_identifier("col2").is_ok());
        assert!(check_identifier("_private").is_ok());
    }

    #[test]
    fn accepts_qualified_names() {
        assert!(check_identifier("posts.title").is_ok());
        assert!(check_identifier("a.b.c").is_ok());
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(check_identifier("title; DROP TABLE posts").is_err());
        assert!(check_identifier("title--").is_err());
        assert!(check_identifier("a b").is_err());
        assert!(check_identifier("`posts`").is_err());
        assert!(check_identifier("\"posts\"").is_err());
    }

    #[test]
    fn rejects_malformed_dots() {
        assert!(check_identifier("").is_err());
        assert!(check_identifier(".").is_err());
        assert!(check_identifier(".posts").is_err());
        assert!(check_identifier("posts.").is_err());
        assert!(check_identifier("a..b").is_err());
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(check_identifier("tàble").is_err());
    }
}
