//! Error types for persistence operations.

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Error type for reading and writing switcher files.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON serialization failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// RON parsing failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// File extension has no known format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the load limit
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// Actual size on disk
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// Saved with an incompatible format version
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build writes
        expected: String,
        /// Version stored in the file
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IoError::UnsupportedFormat("txt".to_string());
        assert_eq!(err.to_string(), "Unsupported file format: txt");
    }

    #[test]
    fn test_file_too_large_display() {
        let err = IoError::FileTooLarge {
            size: 2048,
            limit: 1024,
        };
        let err_str = err.to_string();
        assert!(err_str.contains("2048"));
        assert!(err_str.contains("1024"));
    }

    #[test]
    fn test_version_mismatch_display() {
        let err = IoError::VersionMismatch {
            expected: "1.0.0".to_string(),
            found: "0.1.0".to_string(),
        };
        assert_eq!(err.to_string(), "Version mismatch: expected 1.0.0, found 0.1.0");
    }
}
