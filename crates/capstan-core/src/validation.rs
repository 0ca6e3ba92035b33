//! Shared validation utilities for identifiers across the codebase
//!
//! This module provides consistent validation logic for string-based identifiers
//! like extension type names, session ids and storage keys.

/// Validation rules for string identifiers
#[derive(Debug, Clone, Copy)]
pub struct IdentifierRules {
    /// Maximum allowed length in characters
    pub max_length: usize,
    /// Whether to allow dots (.) in the identifier
    pub allow_dots: bool,
    /// Whether to allow colons (:) in the identifier
    pub allow_colons: bool,
    /// Whether to allow forward slashes (/) in the identifier
    pub allow_slashes: bool,
    /// Whether to check for path traversal sequences (../ and ./)
    pub check_path_traversal: bool,
    /// Whether to trim whitespace before validation
    pub trim_whitespace: bool,
}

impl IdentifierRules {
    /// Rules for the type strings used as factory-map keys and in
    /// configuration `type` fields.
    ///
    /// - Max length: 64 characters
    /// - Allows: alphanumeric, `_`, `-`, `.`, `:`
    /// - Never trimmed: a key with surrounding whitespace would silently
    ///   fail to match configuration entries
    pub const TYPE_NAME: Self = Self {
        max_length: 64,
        allow_dots: true,
        allow_colons: true,
        allow_slashes: false,
        check_path_traversal: true,
        trim_whitespace: false,
    };

    /// Rules for session identifiers handed to plugins.
    pub const SESSION_ID: Self = Self {
        max_length: 128,
        allow_dots: true,
        allow_colons: false,
        allow_slashes: false,
        check_path_traversal: true,
        trim_whitespace: false,
    };

    /// Rules for keys written to the database and cache stores.
    ///
    /// The additional characters (`.`, `:` and `/`) enable namespacing
    /// patterns like `audit:session-1` or `kv/default/user`.
    pub const STORAGE_KEY: Self = Self {
        max_length: 256,
        allow_dots: true,
        allow_colons: true,
        allow_slashes: true,
        check_path_traversal: true,
        trim_whitespace: false,
    };

    /// Validate a string against these rules
    ///
    /// Returns the validated string (trimmed if `trim_whitespace` is set).
    pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
        let processed = if self.trim_whitespace {
            input.trim()
        } else {
            input
        };

        if processed.is_empty() {
            return Err(ValidationError::Empty);
        }

        if !self.trim_whitespace && input.trim().is_empty() {
            return Err(ValidationError::WhitespaceOnly);
        }

        if !self.trim_whitespace && input != input.trim() {
            return Err(ValidationError::LeadingTrailingWhitespace);
        }

        if processed.len() > self.max_length {
            return Err(ValidationError::TooLong {
                length: processed.len(),
                max: self.max_length,
            });
        }

        if self.check_path_traversal && (processed.contains("../") || processed.contains("./")) {
            return Err(ValidationError::PathTraversal);
        }

        for ch in processed.chars() {
            let is_valid = ch.is_alphanumeric()
                || ch == '_'
                || ch == '-'
                || (ch == '.' && self.allow_dots)
                || (ch == ':' && self.allow_colons)
                || (ch == '/' && self.allow_slashes);

            if !is_valid {
                return Err(ValidationError::InvalidChar {
                    char: ch,
                    input: processed.to_string(),
                });
            }
        }

        Ok(processed.to_string())
    }
}

/// Errors that can occur during identifier validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Identifier cannot be empty")]
    Empty,
    #[error("Identifier cannot be whitespace-only")]
    WhitespaceOnly,
    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,
    #[error("Identifier too long: {length} characters (max {max})")]
    TooLong { length: usize, max: usize },
    #[error("Identifier '{input}' contains invalid character '{char}'")]
    InvalidChar { char: char, input: String },
    #[error("Identifier cannot contain path traversal sequences (../)")]
    PathTraversal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_rules() {
        let rules = IdentifierRules::TYPE_NAME;

        assert!(rules.validate("filesystem-tools").is_ok());
        assert!(rules.validate("in-memory").is_ok());
        assert!(rules.validate("acme:audit.v2").is_ok());

        assert!(matches!(rules.validate(""), Err(ValidationError::Empty)));
        assert!(matches!(
            rules.validate("   "),
            Err(ValidationError::WhitespaceOnly)
        ));
        assert!(matches!(
            rules.validate(" noop"),
            Err(ValidationError::LeadingTrailingWhitespace)
        ));
        assert!(matches!(
            rules.validate("tools/fs"),
            Err(ValidationError::InvalidChar { char: '/', .. })
        ));

        let long_name = "a".repeat(65);
        assert!(matches!(
            rules.validate(&long_name),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_storage_key_rules() {
        let rules = IdentifierRules::STORAGE_KEY;

        assert!(rules.validate("kv/default/user").is_ok());
        assert!(rules.validate("audit:session-1").is_ok());

        assert!(matches!(
            rules.validate("kv/../secrets"),
            Err(ValidationError::PathTraversal)
        ));
        assert!(matches!(
            rules.validate("key with spaces"),
            Err(ValidationError::InvalidChar { .. })
        ));
    }

    #[test]
    fn test_session_id_rules() {
        let rules = IdentifierRules::SESSION_ID;

        assert!(rules.validate("session_abc123").is_ok());
        assert!(rules.validate("s-1.2").is_ok());
        assert!(matches!(
            rules.validate("session:1"),
            Err(ValidationError::InvalidChar { char: ':', .. })
        ));
    }
}
