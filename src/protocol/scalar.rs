//! Scalar Codecs
//!
//! One small value type per wire-grammar kind. Each implements [`Marshal`]
//! (append its wire form to a [`Pool`]) and [`Unmarshal`] (read exactly one
//! value of its kind from the pool's buffered input).
//!
//! | Type            | Wire form                    |
//! |-----------------|------------------------------|
//! | `SimpleString`  | `+<bytes>\r\n`               |
//! | `SimpleError`   | `-<message>\r\n`             |
//! | `Integer`       | `:<i64>\r\n`                 |
//! | `BulkString`    | `$<len>\r\n<bytes>\r\n`, `$-1\r\n` |
//! | `ArrayHeader`   | `*<count>\r\n`               |
//!
//! `ArrayHeader` only covers the header line; the elements that follow it on
//! the stream are read or written separately.

use crate::protocol::error::{ParseError, RespResult};
use crate::protocol::pool::Pool;
use crate::protocol::types::{prefix, CRLF, NIL_BULK_STRING};
use bytes::Bytes;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Types that can write their own wire encoding.
///
/// This is also the override point for caller types: a type whose
/// [`ToValue`](crate::marshal::ToValue) returns
/// [`Value::Marshaler`](crate::marshal::Value::Marshaler) is encoded by
/// calling `marshal_into` directly, bypassing every structural rule.
pub trait Marshal {
    /// Appends the wire form of `self` to the pool's output buffer.
    ///
    /// Implementations must only append. They must not call
    /// [`Pool::acquire`] or [`Pool::reset`] on `pool`, which may already
    /// hold the caller's bytes.
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()>;

    /// Encodes `self` as a standalone frame, reusing `pool` when given.
    fn marshal(&self, pool: Option<&mut Pool>) -> RespResult<Bytes> {
        let mut pool = Pool::acquire(pool);
        self.marshal_into(&mut pool)?;
        Ok(pool.take_output())
    }
}

/// Types that can read their own wire encoding.
pub trait Unmarshal {
    /// Consumes one encoded value from the front of the pool's buffered input.
    fn unmarshal_from(&mut self, pool: &mut Pool) -> RespResult<()>;

    /// Decodes `input`, reusing `pool` when given.
    fn unmarshal(&mut self, input: &[u8], pool: Option<&mut Pool>) -> RespResult<()> {
        let mut pool = Pool::acquire(pool);
        pool.feed(input);
        self.unmarshal_from(&mut pool)
    }
}

/// The simple string kind. An empty payload is the empty string.
///
/// The payload is arbitrary bytes but may not contain CR or LF; encoding
/// such a payload fails with [`RespError::LineBreak`](crate::protocol::error::RespError::LineBreak).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleString(pub Vec<u8>);

impl SimpleString {
    pub fn new(s: impl Into<Vec<u8>>) -> Self {
        SimpleString(s.into())
    }
}

impl Marshal for SimpleString {
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()> {
        pool.write_line(prefix::SIMPLE_STRING, &self.0)
    }
}

impl Unmarshal for SimpleString {
    fn unmarshal_from(&mut self, pool: &mut Pool) -> RespResult<()> {
        pool.expect_prefix(&[prefix::SIMPLE_STRING])?;
        let line = pool.read_line()?;
        self.0.clear();
        self.0.extend_from_slice(line);
        Ok(())
    }
}

/// The error kind: an application error message carried on the wire.
///
/// This is distinct from [`RespError`](crate::protocol::error::RespError),
/// which reports codec failures. Like [`SimpleString`], the message must
/// be a single line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleError(pub String);

impl SimpleError {
    pub fn new(message: impl Into<String>) -> Self {
        SimpleError(message.into())
    }
}

impl Marshal for SimpleError {
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()> {
        pool.write_line(prefix::ERROR, self.0.as_bytes())
    }
}

impl Unmarshal for SimpleError {
    fn unmarshal_from(&mut self, pool: &mut Pool) -> RespResult<()> {
        pool.expect_prefix(&[prefix::ERROR])?;
        let line = pool.read_line()?;
        let message =
            std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
        self.0.clear();
        self.0.push_str(message);
        Ok(())
    }
}

/// The integer kind.
///
/// `Integer::default()` encodes as `:0\r\n`; use it where an absent value
/// should read as zero rather than nil.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Integer(pub i64);

impl Marshal for Integer {
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()> {
        pool.write_int_line(prefix::INTEGER, self.0);
        Ok(())
    }
}

impl Unmarshal for Integer {
    fn unmarshal_from(&mut self, pool: &mut Pool) -> RespResult<()> {
        pool.expect_prefix(&[prefix::INTEGER])?;
        self.0 = pool.read_int_line()?;
        Ok(())
    }
}

/// The bulk string kind.
///
/// `BulkString(None)` is the nil bulk string (`$-1\r\n`), which is not the
/// same value as `BulkString(Some(vec![]))` (`$0\r\n\r\n`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkString(pub Option<Vec<u8>>);

impl BulkString {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        BulkString(Some(data.into()))
    }

    pub fn nil() -> Self {
        BulkString(None)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_none()
    }
}

impl Marshal for BulkString {
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()> {
        match &self.0 {
            Some(data) => pool.write_bulk(data),
            None => pool.write(NIL_BULK_STRING),
        }
        Ok(())
    }

    fn marshal(&self, pool: Option<&mut Pool>) -> RespResult<Bytes> {
        // The nil form is a constant; there is nothing to format.
        if self.0.is_none() {
            return Ok(Bytes::from_static(NIL_BULK_STRING));
        }
        let mut pool = Pool::acquire(pool);
        self.marshal_into(&mut pool)?;
        Ok(pool.take_output())
    }
}

impl Unmarshal for BulkString {
    /// Reads a bulk string. A destination that already holds a buffer keeps
    /// its allocation; a nil destination gets one sized to the payload.
    fn unmarshal_from(&mut self, pool: &mut Pool) -> RespResult<()> {
        pool.expect_prefix(&[prefix::BULK_STRING])?;
        let length = pool.read_int_line()?;

        if length == -1 {
            self.0 = None;
            return Ok(());
        }
        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length).into());
        }

        let length = length as usize;
        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            }
            .into());
        }

        let available = pool.buffered();
        if available.len() < length {
            return Err(ParseError::Incomplete.into());
        }
        let trailer = &available[length..available.len().min(length + 2)];
        if trailer != CRLF {
            return Err(if CRLF.starts_with(trailer) {
                ParseError::Incomplete
            } else {
                ParseError::InvalidTerminator(trailer.to_vec())
            }
            .into());
        }

        let dst = self.0.get_or_insert_with(|| Vec::with_capacity(length));
        dst.clear();
        dst.extend_from_slice(&available[..length]);
        pool.next(length + 2);
        Ok(())
    }
}

/// The header preceding an array's elements. `ArrayHeader(-1)` is the nil
/// array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayHeader(pub i64);

impl ArrayHeader {
    pub fn is_nil(&self) -> bool {
        self.0 == -1
    }
}

impl Marshal for ArrayHeader {
    fn marshal_into(&self, pool: &mut Pool) -> RespResult<()> {
        pool.write_int_line(prefix::ARRAY, self.0);
        Ok(())
    }
}

impl Unmarshal for ArrayHeader {
    fn unmarshal_from(&mut self, pool: &mut Pool) -> RespResult<()> {
        pool.expect_prefix(&[prefix::ARRAY])?;
        self.0 = pool.read_int_line()?;
        Ok(())
    }
}

/// Shorthand used by tests and callers that decode a single scalar.
pub fn unmarshal<T: Unmarshal + Default>(input: &[u8], pool: Option<&mut Pool>) -> RespResult<T> {
    let mut value = T::default();
    value.unmarshal(input, pool)?;
    Ok(value)
}
