//! Descriptor codec error types

use thiserror::Error;

/// Errors raised while decoding or encoding USB descriptors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// Input shorter than the layout requires
    #[error("Buffer too small: needed {needed}, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Layout string contains a letter the codec does not understand
    #[error("Invalid layout character '{0}'")]
    InvalidLayout(char),

    /// Value count does not match the layout when encoding
    #[error("Layout expects {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// Descriptor type byte does not match what the parser expected
    #[error("Unexpected descriptor type {found:#04x} (expected {expected:#04x})")]
    UnexpectedType { expected: u8, found: u8 },

    /// Length byte is smaller than the descriptor's fixed part
    #[error("Invalid descriptor length {length} (minimum {minimum})")]
    InvalidLength { length: usize, minimum: usize },

    /// Sub-descriptor claims more bytes than remain in the buffer
    #[error("Truncated descriptor at offset {offset}: length {length}, {remaining} bytes remaining")]
    Truncated {
        offset: usize,
        length: usize,
        remaining: usize,
    },

    /// A repeated element exceeds its protocol maximum
    #[error("Too many {what}: {count} (max: {max})")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },
}

/// Type alias for codec results
pub type Result<T> = std::result::Result<T, DescriptorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DescriptorError::BufferTooSmall {
            needed: 18,
            available: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("needed 18"));
        assert!(msg.contains("got 4"));
    }

    #[test]
    fn test_unexpected_type_display() {
        let err = DescriptorError::UnexpectedType {
            expected: 0x02,
            found: 0x04,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected descriptor type 0x04 (expected 0x02)"
        );
    }
}
