//! Error types for encoding and decoding.
//!
//! [`ParseError`] covers structural problems with the wire grammar and is
//! cheap to clone and compare. [`RespError`] is what the public entry points
//! return: it adds I/O failures, marshaling failures and errors raised by
//! caller-supplied marshal/unmarshal contracts.

use thiserror::Error;

/// Boxed error returned by caller-supplied marshal contracts.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading the wire grammar.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A delimiter or declared-length payload is not fully buffered yet.
    ///
    /// Streaming callers may retry once more input has arrived.
    #[error("incomplete input")]
    Incomplete,

    /// The buffered bytes do not start with the expected type marker.
    #[error("expected prefix {:?}, got {:?}", String::from_utf8_lossy(.expected), String::from_utf8_lossy(.got))]
    UnexpectedPrefix { expected: Vec<u8>, got: Vec<u8> },

    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// A line ended in CR that was not followed by LF, or a bulk string
    /// payload was not followed by CRLF.
    #[error("expected delimiter \"\\r\\n\", got {:?}", String::from_utf8_lossy(.0))]
    InvalidTerminator(Vec<u8>),

    /// A bulk string body shorter or longer than its declared length.
    #[error("bulk string expected {expected} bytes but got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Invalid UTF-8 in a simple string or error message
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Arrays nested deeper than the decoder allows
    #[error("maximum nesting depth exceeded: {0}")]
    NestingTooDeep(usize),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl ParseError {
    /// Returns true if more input could turn this failure into a success.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::Incomplete)
    }
}

/// Errors returned by the encode and decode entry points.
#[derive(Debug, Error)]
pub enum RespError {
    /// The input violated the wire grammar
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The byte source or sink failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The generic marshaler has no rule for this type
    #[error("could not marshal value of type {0}")]
    UnsupportedType(&'static str),

    /// An unsigned integer does not fit the wire's signed 64-bit range
    #[error("integer {0} does not fit in a signed 64-bit integer")]
    IntegerOverflow(u64),

    /// A simple string or error message contains CR or LF
    #[error("line payload contains CR or LF at byte {0}")]
    LineBreak(usize),

    /// A chain of references was longer than the marshaler follows
    #[error("reference chain deeper than {0} hops")]
    PointerDepth(usize),

    /// A caller-supplied marshal contract failed
    #[error(transparent)]
    Delegate(BoxError),

    /// A caller-supplied unmarshal hook rejected a decoded value
    #[error("could not unmarshal into {target}: {source}")]
    Unmarshal {
        target: &'static str,
        #[source]
        source: BoxError,
    },
}

impl RespError {
    /// Returns true if the error only signals that more input is needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, RespError::Parse(e) if e.is_incomplete())
    }
}

/// Result type for encode and decode operations.
pub type RespResult<T> = Result<T, RespError>;
