//! Streaming Encoder
//!
//! Writes values straight to a byte sink through an internal buffer.
//! Sequences and maps are flattened onto the sink element by element, and
//! bulk payloads are copied to the sink without being staged in a frame
//! first. Bodies behind a [`LenReader`] are streamed: the header is written
//! as soon as the length is known and the body is copied in chunks.
//!
//! ```text
//!   encode(value) ──> follow refs ──┬─ Seq / Map ─> header, then each element
//!                                   ├─ Bytes / Str ─> header, payload, CRLF
//!                                   └─ anything else ─> Pool ─> sink
//!
//!   encode_reader(body) ──> $<len>\r\n ──> io::copy(body) ──> \r\n
//! ```
//!
//! Output is buffered; call [`Encoder::flush`] once after the last value.

use crate::marshal::any::{encode_value, follow_refs};
use crate::marshal::value::{ToValue, Value};
use crate::protocol::error::{ParseError, RespError, RespResult};
use crate::protocol::pool::Pool;
use crate::protocol::types::{prefix, CRLF};
use std::io::{self, BufWriter, Read, Write};
use tracing::{debug, trace};

/// Default capacity of the encoder's write buffer (8 KB)
const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// A readable body whose total length is known before reading it.
pub trait LenReader: Read {
    /// Number of bytes the body will yield.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LenReader for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }
}

impl<T: AsRef<[u8]>> LenReader for io::Cursor<T> {
    fn len(&self) -> usize {
        let total = self.get_ref().as_ref().len() as u64;
        total.saturating_sub(self.position()) as usize
    }
}

impl<L: LenReader + ?Sized> LenReader for &mut L {
    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Pairs any reader with a declared length.
///
/// Useful for files, sockets or pipes whose size is known out of band.
#[derive(Debug)]
pub struct Body<R> {
    inner: R,
    len: usize,
}

impl<R: Read> Body<R> {
    pub fn new(inner: R, len: usize) -> Self {
        Self { inner, len }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Body<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> LenReader for Body<R> {
    fn len(&self) -> usize {
        self.len
    }
}

/// Encoder bound to one byte sink.
pub struct Encoder<W: Write> {
    w: BufWriter<W>,
    pool: Pool,
}

impl<W: Write> Encoder<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// Creates an encoder whose write buffer holds `capacity` bytes.
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            w: BufWriter::with_capacity(capacity, inner),
            pool: Pool::new(),
        }
    }

    /// Encodes one value.
    ///
    /// Dispatch is the same as [`marshal_any`](crate::marshal::marshal_any).
    /// A failure part way through a sequence leaves the elements before it
    /// on the sink; the stream should be considered broken.
    pub fn encode<T: ToValue + ?Sized>(&mut self, value: &T) -> RespResult<()> {
        self.encode_kind(value.to_value())
    }

    fn encode_kind(&mut self, value: Value<'_>) -> RespResult<()> {
        match follow_refs(value)? {
            Value::Seq(Some(elements)) => {
                self.write_array_header(elements.len())?;
                for item in elements {
                    self.encode_kind(item.to_value())?;
                }
            }
            Value::Map(Some(entries)) => {
                self.write_array_header(2 * entries.len())?;
                for (key, val) in entries {
                    self.encode_kind(key.to_value())?;
                    self.encode_kind(val.to_value())?;
                }
            }
            Value::Bytes(b) => self.write_bulk(b)?,
            Value::Str(s) => self.write_bulk(s.as_bytes())?,
            other => {
                self.pool.reset();
                encode_value(other, &mut self.pool)?;
                self.w.write_all(self.pool.output())?;
            }
        }
        Ok(())
    }

    /// Streams a length-declared body as one bulk string.
    ///
    /// The header goes out before the first body byte is read. A body that
    /// yields fewer or more bytes than it declared fails with
    /// [`ParseError::LengthMismatch`]; by then the header and the bytes
    /// copied so far are already on the sink.
    pub fn encode_reader<L: LenReader>(&mut self, mut body: L) -> RespResult<()> {
        let expected = body.len();
        self.write_header(prefix::BULK_STRING, expected)?;

        let copied = io::copy(&mut body.by_ref().take(expected as u64), &mut self.w)? as usize;
        if copied != expected {
            return Err(ParseError::LengthMismatch {
                expected,
                got: copied,
            }
            .into());
        }

        let mut probe = [0u8; 1];
        if body.read(&mut probe)? != 0 {
            return Err(ParseError::LengthMismatch {
                expected,
                got: expected + 1,
            }
            .into());
        }

        self.w.write_all(CRLF)?;
        trace!(bytes = expected, "Streamed bulk body");
        Ok(())
    }

    /// Writes `*<len>\r\n`. The caller must then encode exactly `len` values.
    pub fn write_array_header(&mut self, len: usize) -> RespResult<()> {
        self.write_header(prefix::ARRAY, len)
    }

    /// Flushes buffered output to the sink.
    pub fn flush(&mut self) -> RespResult<()> {
        trace!(bytes = self.w.buffer().len(), "Flushing encoder");
        self.w.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        self.w.get_ref()
    }

    /// Flushes and returns the sink.
    pub fn into_inner(self) -> RespResult<W> {
        self.w.into_inner().map_err(|e| e.into_error().into())
    }

    fn write_bulk(&mut self, payload: &[u8]) -> RespResult<()> {
        self.write_header(prefix::BULK_STRING, payload.len())?;
        self.w.write_all(payload)?;
        self.w.write_all(CRLF)?;
        Ok(())
    }

    fn write_header(&mut self, prefix: u8, len: usize) -> RespResult<()> {
        let len = i64::try_from(len).map_err(|_| RespError::IntegerOverflow(len as u64))?;
        self.pool.reset();
        self.pool.write_int_line(prefix, len);
        self.w.write_all(self.pool.output())?;
        Ok(())
    }
}

/// Encodes `value` and writes it to `sink` in one call, then flushes.
///
/// The frame is built in `pool` (a fresh one if `None`) and written with a
/// single `write_all`. The flush always runs; its error is returned only
/// when encoding and writing succeeded.
pub fn encode_one<W, T>(sink: &mut W, value: &T, pool: Option<&mut Pool>) -> RespResult<()>
where
    W: Write + ?Sized,
    T: ToValue + ?Sized,
{
    let mut pool = Pool::acquire(pool);
    let written = encode_value(value.to_value(), &mut pool)
        .and_then(|()| sink.write_all(pool.output()).map_err(RespError::from));
    let flushed = sink.flush();

    debug!(bytes = pool.len(), ok = written.is_ok(), "Encoded value to sink");
    pool.reset();

    written?;
    flushed?;
    Ok(())
}
