use std::path::Path;
use thiserror::Error;

/// Unified error type for version-keeper operations
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Malformed version ({field}): {reason}")]
    Malformed { field: String, reason: String },

    #[error("Cannot read version file '{path}': {reason}")]
    StoreRead { path: String, reason: String },

    #[error("Cannot write version file '{path}': {reason}")]
    StoreWrite { path: String, reason: String },

    #[error("Version source '{provider}' unavailable: {reason}")]
    SourceUnavailable { provider: String, reason: String },

    #[error("Operation '{operation}' is not allowed in '{mode}' mode")]
    InvalidMode { operation: String, mode: String },

    #[error("Unknown token '{{{token}}}' in format '{template}'")]
    UnknownToken { token: String, template: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in version-keeper
pub type Result<T> = std::result::Result<T, VersionError>;

impl VersionError {
    /// Create a malformed-version error naming the offending field
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        VersionError::Malformed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn store_read(path: &Path, reason: impl ToString) -> Self {
        VersionError::StoreRead {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn store_write(path: &Path, reason: impl ToString) -> Self {
        VersionError::StoreWrite {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a source error with the provider description as context
    pub fn source_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        VersionError::SourceUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_mode(operation: impl Into<String>, mode: impl ToString) -> Self {
        VersionError::InvalidMode {
            operation: operation.into(),
            mode: mode.to_string(),
        }
    }

    pub fn unknown_token(token: impl Into<String>, template: impl Into<String>) -> Self {
        VersionError::UnknownToken {
            token: token.into(),
            template: template.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display() {
        let err = VersionError::malformed("major", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Malformed version (major): must not be negative"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VersionError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_store_errors_name_the_file() {
        let path = PathBuf::from("/tmp/version.toml");
        let read = VersionError::store_read(&path, "bad toml");
        let write = VersionError::store_write(&path, "read-only");

        assert!(read.to_string().contains("/tmp/version.toml"));
        assert!(read.to_string().contains("bad toml"));
        assert!(write.to_string().contains("/tmp/version.toml"));
        assert!(write.to_string().contains("read-only"));
    }

    #[test]
    fn test_source_error_names_the_provider() {
        let err = VersionError::source_unavailable("command `git describe`", "timed out");
        let msg = err.to_string();
        assert!(msg.contains("git describe"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_unknown_token_keeps_braces() {
        let err = VersionError::unknown_token("build", "{major}.{build}");
        assert_eq!(
            err.to_string(),
            "Unknown token '{build}' in format '{major}.{build}'"
        );
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (VersionError::malformed("x", "y"), "Malformed version"),
            (
                VersionError::store_read(Path::new("f"), "y"),
                "Cannot read version file",
            ),
            (
                VersionError::store_write(Path::new("f"), "y"),
                "Cannot write version file",
            ),
            (
                VersionError::source_unavailable("p", "y"),
                "Version source",
            ),
            (VersionError::invalid_mode("absorb", "config"), "Operation"),
            (VersionError::unknown_token("x", "y"), "Unknown token"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
