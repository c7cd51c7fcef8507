//! Common error types used throughout clsrs.

/// Common error type for type-level parsing and validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A codec name reported by the demuxer is not part of the
    /// compatibility-level vocabulary.
    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    /// A media-type code outside the 0..=3 range.
    #[error("invalid media-type code: {0}")]
    InvalidMediaType(u8),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new UnknownCodec error.
    pub fn unknown_codec<S: Into<String>>(name: S) -> Self {
        Self::UnknownCodec(name.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_codec("wmv3");
        assert_eq!(err.to_string(), "unknown codec: wmv3");

        let err = Error::InvalidMediaType(7);
        assert_eq!(err.to_string(), "invalid media-type code: 7");
    }
}
