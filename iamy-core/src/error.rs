//! Error types for loading, dumping and encoding IAM resources.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by the IAMY core.
///
/// Unmatched files in a tree are not errors: the loader skips them and
/// records them in its [`LoadReport`](crate::LoadReport).
#[derive(Debug, Error)]
pub enum IamyError {
    /// An account directory name is neither `<alias>-<id>` nor `<id>`.
    #[error("Can't create account name from '{input}'")]
    MalformedAccountIdentifier { input: String },

    /// The path matcher produced a kind outside user/group/role/policy.
    #[error("Unexpected entity kind '{kind}'")]
    UnknownEntityKind { kind: String },

    /// A policy document could not be decoded.
    #[error("Invalid policy document: {message}")]
    InvalidPolicyDocument { message: String },

    /// A resource file body failed to (de)serialize.
    #[error("Invalid YAML document {}: {source}", path.display())]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A path template is missing a placeholder or repeats one.
    #[error("Invalid path template '{template}': {reason}")]
    InvalidPathTemplate { template: String, reason: String },

    /// A resource's IAM path or name cannot be rendered into a file path.
    #[error("Invalid resource path '{path}' for '{name}': {reason}")]
    InvalidResourcePath {
        path: String,
        name: String,
        reason: String,
    },

    /// Filesystem operation failed.
    #[error("Failed to {operation} {}: {source}", path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any of the above, raised while handling a specific file.
    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<IamyError>,
    },
}

impl IamyError {
    pub fn file_system(
        operation: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn policy_document(message: impl Into<String>) -> Self {
        Self::InvalidPolicyDocument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_document(path: impl AsRef<Path>, source: serde_yaml::Error) -> Self {
        Self::InvalidDocument {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attach the file being processed, unless the error already names one.
    pub(crate) fn in_file(self, path: impl AsRef<Path>) -> Self {
        match self {
            Self::FileSystem { .. } | Self::InvalidDocument { .. } | Self::InFile { .. } => self,
            other => Self::InFile {
                path: path.as_ref().to_path_buf(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, IamyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_system_error_names_path() {
        let err = IamyError::file_system(
            "read",
            "acct/user/bob.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("read"));
        assert!(msg.contains("acct/user/bob.yaml"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_in_file_wraps_codec_errors_only_once() {
        let err = IamyError::MalformedAccountIdentifier {
            input: "docs".to_string(),
        }
        .in_file("docs/user/x.yaml")
        .in_file("other.yaml");

        match &err {
            IamyError::InFile { path, source } => {
                assert_eq!(path, Path::new("docs/user/x.yaml"));
                assert!(matches!(
                    **source,
                    IamyError::MalformedAccountIdentifier { .. }
                ));
            }
            other => panic!("Expected InFile, got {other:?}"),
        }
        assert!(err.to_string().starts_with("docs/user/x.yaml: "));
    }
}
