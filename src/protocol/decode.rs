//! Incremental RESP Decoder
//!
//! This module turns buffered bytes into [`RespValue`] trees. It is built on
//! the scalar codecs: the first byte picks the codec, and arrays recurse
//! over their declared element count.
//!
//! ## How Decoding Works
//!
//! Values are decoded from the front of a [`Pool`]'s buffered input. If the
//! input ends before the value does, the read cursor is rewound and
//! [`ParseError::Incomplete`] is returned, so the caller can append more
//! bytes and try again without losing anything:
//!
//! 1. Append incoming data to the pool (`Pool::feed`)
//! 2. Call [`decode_buffered`]
//! 3. On success, the value's bytes have been consumed
//! 4. If incomplete, wait for more data
//! 5. On any other error, the stream is corrupt
//!
//! [`decode_one`] runs this loop against any [`BufRead`] source and only
//! consumes from the source the bytes that belong to the returned value.

use crate::protocol::error::{BoxError, ParseError, RespError, RespResult};
use crate::protocol::pool::Pool;
use crate::protocol::scalar::{ArrayHeader, BulkString, Integer, SimpleError, SimpleString, Unmarshal};
use crate::protocol::types::{prefix, RespValue};
use bytes::Bytes;
use std::io::{self, BufRead};
use tracing::trace;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on capacity reserved up front for a declared array length.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Decodes one complete value from the front of the pool's buffered input.
///
/// On [`ParseError::Incomplete`] the read cursor is left where it was before
/// the call.
pub fn decode_buffered(pool: &mut Pool) -> RespResult<RespValue> {
    let start = pool.position();
    let result = read_value(pool, 0);
    if matches!(&result, Err(e) if e.is_incomplete()) {
        pool.rewind(start);
    }
    result
}

fn read_value(pool: &mut Pool, depth: usize) -> RespResult<RespValue> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ParseError::NestingTooDeep(MAX_NESTING_DEPTH).into());
    }

    let first = match pool.buffered().first() {
        Some(&b) => b,
        None => return Err(ParseError::Incomplete.into()),
    };

    match first {
        prefix::SIMPLE_STRING => {
            let mut s = SimpleString::default();
            s.unmarshal_from(pool)?;
            Ok(RespValue::SimpleString(Bytes::from(s.0)))
        }
        prefix::ERROR => {
            let mut e = SimpleError::default();
            e.unmarshal_from(pool)?;
            Ok(RespValue::Error(e.0))
        }
        prefix::INTEGER => {
            let mut i = Integer::default();
            i.unmarshal_from(pool)?;
            Ok(RespValue::Integer(i.0))
        }
        prefix::BULK_STRING => {
            let mut b = BulkString::default();
            b.unmarshal_from(pool)?;
            Ok(match b.0 {
                Some(data) => RespValue::BulkString(Bytes::from(data)),
                None => RespValue::NullBulkString,
            })
        }
        prefix::ARRAY => read_array(pool, depth),
        other => Err(ParseError::UnknownPrefix(other).into()),
    }
}

/// Parses an array: `*<count>\r\n<elements...>`
fn read_array(pool: &mut Pool, depth: usize) -> RespResult<RespValue> {
    let mut header = ArrayHeader::default();
    header.unmarshal_from(pool)?;

    match header.0 {
        -1 => Ok(RespValue::NullArray),
        n if n < 0 => Err(ParseError::InvalidArrayLength(n).into()),
        n => {
            let count = n as usize;
            let mut elements = Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS));
            for _ in 0..count {
                elements.push(read_value(pool, depth + 1)?);
            }
            Ok(RespValue::Array(elements))
        }
    }
}

/// Decodes exactly one value from `source`.
///
/// Bytes are pulled from the source's buffer into the pool until a complete
/// value is available; only the bytes belonging to that value are consumed
/// from the source, so consecutive calls read consecutive values.
///
/// Reaching end of input before the first byte is an
/// [`io::ErrorKind::UnexpectedEof`] error; reaching it in the middle of a
/// value is [`ParseError::Incomplete`]. A value that does not fit in the
/// pool's [`max_input`](Pool::max_input) fails with
/// [`ParseError::MessageTooLarge`].
pub fn decode_one<R: BufRead + ?Sized>(
    source: &mut R,
    pool: Option<&mut Pool>,
) -> RespResult<RespValue> {
    let mut pool = Pool::acquire(pool);

    loop {
        let chunk = source.fill_buf()?;
        if chunk.is_empty() {
            return Err(if pool.is_empty() {
                io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream").into()
            } else {
                ParseError::Incomplete.into()
            });
        }

        let already_buffered = pool.len();
        let max = pool.max_input();
        let room = max.saturating_sub(already_buffered);
        if room == 0 {
            return Err(ParseError::MessageTooLarge {
                size: already_buffered + chunk.len(),
                max,
            }
            .into());
        }

        let chunk_len = chunk.len().min(room);
        pool.feed(&chunk[..chunk_len]);

        match decode_buffered(&mut pool) {
            Ok(value) => {
                source.consume(pool.position() - already_buffered);
                return Ok(value);
            }
            Err(e) if e.is_incomplete() => {
                source.consume(chunk_len);
                trace!(buffered = pool.len(), "Incomplete value, need more data");
            }
            Err(e) => {
                source.consume(chunk_len);
                return Err(e);
            }
        }
    }
}

/// Conversion from a decoded value into a caller type.
///
/// This is the unmarshal hook used by [`decode_into`]. Errors returned here
/// are wrapped in [`RespError::Unmarshal`] together with the target type's
/// name.
pub trait FromResp: Sized {
    fn from_resp(value: RespValue) -> Result<Self, BoxError>;
}

/// Decodes one value from `source` and converts it with [`FromResp`].
pub fn decode_into<T, R>(source: &mut R, pool: Option<&mut Pool>) -> RespResult<T>
where
    T: FromResp,
    R: BufRead + ?Sized,
{
    let value = decode_one(source, pool)?;
    T::from_resp(value).map_err(|source| RespError::Unmarshal {
        target: std::any::type_name::<T>(),
        source,
    })
}

fn mismatch(expected: &str, got: &RespValue) -> BoxError {
    format!("expected {}, got {:?}", expected, got).into()
}

impl FromResp for RespValue {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        Ok(value)
    }
}

impl FromResp for Bytes {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        match value {
            RespValue::BulkString(b) => Ok(b),
            RespValue::SimpleString(s) => Ok(s),
            other => Err(mismatch("a string", &other)),
        }
    }
}

impl FromResp for Vec<u8> {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        Bytes::from_resp(value).map(Vec::from)
    }
}

impl FromResp for String {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        match value {
            RespValue::SimpleString(b) | RespValue::BulkString(b) => {
                Ok(String::from_utf8(b.to_vec())?)
            }
            other => Err(mismatch("a string", &other)),
        }
    }
}

impl FromResp for i64 {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        match value {
            RespValue::Integer(n) => Ok(n),
            RespValue::BulkString(_) | RespValue::SimpleString(_) => {
                let text = value.as_str().ok_or("integer text is not valid UTF-8")?;
                Ok(text.parse()?)
            }
            other => Err(mismatch("an integer", &other)),
        }
    }
}

impl FromResp for bool {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        match i64::from_resp(value)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(format!("expected 0 or 1, got {}", n).into()),
        }
    }
}

impl<T: FromResp> FromResp for Option<T> {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_resp(value).map(Some)
        }
    }
}

impl<T: FromResp> FromResp for Vec<T> {
    fn from_resp(value: RespValue) -> Result<Self, BoxError> {
        match value {
            RespValue::Array(items) => items.into_iter().map(T::from_resp).collect(),
            RespValue::NullArray => Ok(Vec::new()),
            other => Err(mismatch("an array", &other)),
        }
    }
}
