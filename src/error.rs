use thiserror::Error;

/// Errors returned when assembling a [`Formatter`](crate::Formatter).
#[non_exhaustive]
#[derive(Error, Debug, PartialEq)]
pub enum BuildError {
    #[error("duration for unit {0:?} must be positive")]
    NonPositiveUnit(String),
    #[error("duration for unit {0:?} is not finite")]
    NonFiniteUnit(String),
    #[error("duration for unit {0:?} does not reduce to 64-bit terms")]
    UnrepresentableUnit(String),
    #[error("repeated unit {0:?}")]
    DuplicateUnit(String),
    #[error("bad format unit {0:?}")]
    UnknownFormatUnit(String),
}

/// Errors returned when parsing or formatting a span.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid character at index {index}: {excerpt:?}")]
    InvalidCharacter { index: usize, excerpt: String },
    #[error("the value is outside of the representable range")]
    Overflow,
    #[error("no format units available")]
    NoFormatUnits,
}

impl Error {
    /// An `InvalidCharacter` at a byte offset of `text`, carrying up to
    /// ten characters from that offset as context.
    pub(crate) fn invalid_character(text: &str, index: usize) -> Self {
        let excerpt = text[index..].chars().take(10).collect();
        Self::InvalidCharacter { index, excerpt }
    }
}
