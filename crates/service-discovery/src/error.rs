//! Error types for service discovery

use thiserror::Error;

use crate::attribute::Kind;

/// Service discovery error type
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed filter expression text
    #[error("filter syntax error: {0}")]
    FilterSyntax(#[from] ParseError),

    /// A service URI failed validation
    #[error("invalid service URI: {0}")]
    InvalidUri(String),

    /// A kind-specific accessor was called on a value of another kind
    #[error("attribute value is {actual}, expected {expected}")]
    ValueKind {
        /// The kind the accessor requires
        expected: Kind,
        /// The kind the value actually has
        actual: Kind,
    },

    /// A provider-reported failure during query execution
    #[error("discovery provider error: {0}")]
    Provider(String),
}

/// A syntax error raised while parsing a filter expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input contained a code point that is not legal at its position.
    #[error("unexpected character at offset {0}")]
    UnexpectedCharacter(usize),

    /// The input ended before the expression was complete.
    #[error("unexpected end of filter string")]
    UnexpectedEnd,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
