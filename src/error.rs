//! Error types for Sharebox.
//!
//! Request-level failures have their own closed enums next to the component
//! that produces them (`PathError`, `ListError`, `ArchiveError`, `Denied`,
//! `OpError`). `ShareboxError` covers startup: configuration, logging and
//! share-root creation.

use thiserror::Error;

/// Common error type for Sharebox.
#[derive(Error, Debug)]
pub enum ShareboxError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration values.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for Sharebox operations.
pub type Result<T> = std::result::Result<T, ShareboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ShareboxError::Config("missing share path".to_string());
        assert_eq!(err.to_string(), "configuration error: missing share path");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ShareboxError::Validation("compression level out of range".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: compression level out of range"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShareboxError = io_err.into();
        assert!(matches!(err, ShareboxError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(ShareboxError::Config("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
