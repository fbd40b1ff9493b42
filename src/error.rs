//! Error types for beadchip

use thiserror::Error;

/// Result type alias for beadchip operations
pub type Result<T> = std::result::Result<T, BeadchipError>;

/// Error types that can occur while decoding bead-array files
#[derive(Debug, Error)]
pub enum BeadchipError {
    /// I/O error from the storage layer (open, seek, read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural violation: bad magic, unsupported file version, non-empty
    /// reserved field, out-of-range value
    #[error("Format error: {msg}")]
    Format {
        /// Error message
        msg: String,
    },

    /// Fewer bytes were available than the field or array requires
    #[error("Unexpected end of data while reading {context}: expected {expected} bytes, got {actual}")]
    Truncated {
        /// What was being decoded
        context: &'static str,
        /// Number of bytes required
        expected: usize,
        /// Number of bytes actually available
        actual: usize,
    },

    /// A field expected to hold a decimal number did not parse
    #[error("Invalid numeric value in {field}: {value:?}")]
    Encoding {
        /// Field name
        field: &'static str,
        /// Raw field content
        value: String,
    },

    /// The file (or a record inside it) is too old or too new for the
    /// requested field or layout
    #[error("{what} not supported for version {version}")]
    VersionUnsupported {
        /// Field or layout that was requested
        what: &'static str,
        /// Version found in the file
        version: i32,
    },

    /// Accessor called on a genotype-call store after `close()`
    #[error("GTC store has been closed")]
    Closed,

    /// Delimited-text manifest error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BeadchipError {
    /// Shorthand for a [`BeadchipError::Format`] error.
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        BeadchipError::Format { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_truncated() {
        let err = BeadchipError::Truncated {
            context: "int32",
            expected: 4,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected end of data while reading int32: expected 4 bytes, got 1"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BeadchipError = io_err.into();
        assert!(matches!(err, BeadchipError::Io(_)));
    }
}
