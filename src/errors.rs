use std::path::PathBuf;

use thiserror::Error;

/// Run-level errors. Per-plugin problems never surface here; they are
/// captured as [`crate::ValidationResult`]s instead.
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// The manifest document is not valid JSON/YAML.
    #[error("cannot parse manifest {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    /// The manifest parsed but violates its schema (missing fields,
    /// duplicate names, bad source paths).
    #[error("manifest schema violation: {message}")]
    SchemaViolation { message: String },

    /// A plugin source does not resolve to a directory.
    #[error("plugin directory not found: {}", path.display())]
    PluginNotFound { path: PathBuf },

    /// A manifest entry points at a remote source, which has no directory
    /// to resolve.
    #[error("plugin source is not a local directory: {location}")]
    NotLocal { location: String },

    /// Filesystem I/O error unrelated to plugin content.
    #[error("IO error on {}: {source}", path.display())]
    InternalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bad command-line usage, including a missing manifest file.
    #[error("{message}")]
    Invocation { message: String },

    /// Configuration file could not be read or is invalid.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl ValidatorError {
    /// Process exit code for this error: 2 for invocation and
    /// configuration problems, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            ValidatorError::Invocation { .. } | ValidatorError::Config { .. } => 2,
            _ => 1,
        }
    }
}

/// Convenience alias for `Result<T, ValidatorError>`.
pub type Result<T> = std::result::Result<T, ValidatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_exits_with_two() {
        let err = ValidatorError::Invocation {
            message: "manifest not found".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn schema_violation_exits_with_one() {
        let err = ValidatorError::SchemaViolation {
            message: "duplicate plugin name \"a\"".into(),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("duplicate plugin name"));
    }

    #[test]
    fn manifest_parse_mentions_path() {
        let err = ValidatorError::ManifestParse {
            path: PathBuf::from("market.json"),
            message: "expected value".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot parse manifest market.json: expected value"
        );
    }
}
