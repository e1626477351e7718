//! Resource Pool
//!
//! A [`Pool`] is scratch memory shared by the codecs so that repeated
//! encode/decode calls do not allocate. It holds one growable byte buffer
//! (the output of an encode, or the buffered input of a decode) and one
//! growable scratch vector used for number and text formatting.
//!
//! ## Lifecycle
//!
//! ```text
//!   Pool::acquire(Some(&mut pool))     Pool::acquire(None)
//!            │                                 │
//!            ▼                                 ▼
//!   reset buffer + scratch            fresh, owned Pool
//!   (capacity retained)                        │
//!            └───────────────┬─────────────────┘
//!                            ▼
//!                      PoolHandle (derefs to Pool)
//! ```
//!
//! A pool is not safe for concurrent use. The intended discipline is one
//! pool per logical stream, reused sequentially across calls.
//!
//! ## Nested encodes
//!
//! [`Pool::encode_tail`] hands a sub-encode a view over the unused tail
//! capacity of the output buffer (`BytesMut::split_off`). The sub-encode
//! writes in place; its bytes are then merged back onto the accumulator
//! (`BytesMut::unsplit`, which is free when the view did not have to grow).
//! Bytes written before the call are never visible to, or overwritten by,
//! the sub-encode.

use crate::protocol::error::{ParseError, RespError, RespResult};
use crate::protocol::scalar::MAX_BULK_SIZE;
use crate::protocol::types::{prefix, CRLF};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::Write;
use std::ops::{Deref, DerefMut};

/// Minimum free capacity reserved before handing the tail to a sub-encode.
const MIN_TAIL_CAPACITY: usize = 64;

/// Default limit on undecoded input a pool will hold: one maximal bulk
/// string plus room for its header and neighbours.
pub const MAX_INPUT_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Reusable buffers shared between codec calls.
#[derive(Debug)]
pub struct Pool {
    /// Encode output, or buffered decode input
    buf: BytesMut,

    /// Read cursor into `buf` while decoding
    read: usize,

    /// Formatting scratch space
    scratch: Vec<u8>,

    /// Most undecoded input readers may buffer here
    max_input: usize,
}

impl Default for Pool {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

/// A pool obtained through [`Pool::acquire`]: either the caller's pool, reset,
/// or a freshly allocated one.
#[derive(Debug)]
pub enum PoolHandle<'a> {
    Borrowed(&'a mut Pool),
    Owned(Pool),
}

impl Deref for PoolHandle<'_> {
    type Target = Pool;

    fn deref(&self) -> &Pool {
        match self {
            PoolHandle::Borrowed(pool) => pool,
            PoolHandle::Owned(pool) => pool,
        }
    }
}

impl DerefMut for PoolHandle<'_> {
    fn deref_mut(&mut self) -> &mut Pool {
        match self {
            PoolHandle::Borrowed(pool) => pool,
            PoolHandle::Owned(pool) => pool,
        }
    }
}

impl Pool {
    /// Creates an empty pool. No memory is allocated until first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool whose buffer can hold `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            read: 0,
            scratch: Vec::new(),
            max_input: MAX_INPUT_SIZE,
        }
    }

    /// Sets how much undecoded input readers may buffer in this pool.
    ///
    /// The limit survives [`reset`](Self::reset) and [`acquire`](Self::acquire).
    pub fn with_max_input(mut self, max_input: usize) -> Self {
        self.max_input = max_input;
        self
    }

    pub fn max_input(&self) -> usize {
        self.max_input
    }

    /// Returns a ready-to-use pool.
    ///
    /// A given pool is reset (emptied, capacity retained); `None` yields a
    /// freshly allocated pool owned by the handle.
    pub fn acquire(pool: Option<&mut Pool>) -> PoolHandle<'_> {
        match pool {
            Some(pool) => {
                pool.reset();
                PoolHandle::Borrowed(pool)
            }
            None => PoolHandle::Owned(Pool::new()),
        }
    }

    /// Empties the buffer and scratch space, keeping their capacity.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.read = 0;
        self.scratch.clear();
    }

    // ------------------------------------------------------------------
    // Input side
    // ------------------------------------------------------------------

    /// Appends bytes to the buffered input.
    pub fn feed(&mut self, input: &[u8]) {
        self.buf.extend_from_slice(input);
    }

    /// The bytes buffered but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.read..]
    }

    /// The raw buffer, for readers that fill it directly (`read_buf`).
    pub fn input_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Number of bytes consumed since the last reset or compaction.
    pub fn position(&self) -> usize {
        self.read
    }

    /// Moves the read cursor back to a previous [`position`](Self::position).
    pub(crate) fn rewind(&mut self, position: usize) {
        debug_assert!(position <= self.buf.len());
        self.read = position;
    }

    /// Drops consumed bytes from the front of the buffer.
    pub fn compact(&mut self) {
        self.buf.advance(self.read);
        self.read = 0;
    }

    /// Consumes up to `n` bytes, returning fewer only if fewer are buffered.
    pub fn next(&mut self, n: usize) -> &[u8] {
        let start = self.read;
        let end = start + n.min(self.buf.len() - start);
        self.read = end;
        &self.buf[start..end]
    }

    /// Consumes bytes up to the next occurrence of `target`.
    ///
    /// Returns the bytes before the delimiter and `true`, with the delimiter
    /// itself consumed. If the delimiter is not buffered, everything buffered
    /// is consumed and returned with `false`; callers treat that as "need
    /// more input", not as a parse error.
    pub fn read_delimited(&mut self, target: u8) -> (&[u8], bool) {
        let start = self.read;
        match self.buf[start..].iter().position(|&b| b == target) {
            Some(i) => {
                self.read = start + i + 1;
                (&self.buf[start..start + i], true)
            }
            None => {
                self.read = self.buf.len();
                (&self.buf[start..], false)
            }
        }
    }

    /// Consumes `prefix.len()` bytes and checks they equal `prefix`.
    pub fn expect_prefix(&mut self, prefix: &[u8]) -> Result<(), ParseError> {
        let got = self.next(prefix.len());
        if got == prefix {
            Ok(())
        } else if got.len() < prefix.len() && prefix.starts_with(got) {
            Err(ParseError::Incomplete)
        } else {
            Err(ParseError::UnexpectedPrefix {
                expected: prefix.to_vec(),
                got: got.to_vec(),
            })
        }
    }

    /// Consumes one CRLF-terminated line and returns it without the terminator.
    pub fn read_line(&mut self) -> Result<&[u8], ParseError> {
        let start = self.read;
        let (line, found) = self.read_delimited(b'\r');
        let len = line.len();
        if !found {
            return Err(ParseError::Incomplete);
        }

        match self.buf.get(self.read) {
            None => Err(ParseError::Incomplete),
            Some(b'\n') => {
                self.read += 1;
                Ok(&self.buf[start..start + len])
            }
            Some(&other) => Err(ParseError::InvalidTerminator(vec![b'\r', other])),
        }
    }

    /// Consumes one line and parses it as a base-10 signed integer.
    pub fn read_int_line(&mut self) -> Result<i64, ParseError> {
        let line = self.read_line()?;
        parse_int(line)
    }

    // ------------------------------------------------------------------
    // Output side
    // ------------------------------------------------------------------

    /// The bytes written so far.
    pub fn output(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written or buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Splits the written bytes off as an immutable frame.
    ///
    /// The pool keeps the remaining capacity; once the returned `Bytes` is
    /// dropped the original allocation can be reclaimed by later writes.
    pub fn take_output(&mut self) -> Bytes {
        self.read = 0;
        self.buf.split().freeze()
    }

    /// Appends raw bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends `prefix`, `payload` and CRLF.
    ///
    /// Fails without writing if `payload` contains CR or LF, which would
    /// end the line early.
    pub fn write_line(&mut self, prefix: u8, payload: &[u8]) -> RespResult<()> {
        check_line(payload)?;
        self.buf.put_u8(prefix);
        self.buf.extend_from_slice(payload);
        self.buf.extend_from_slice(CRLF);
        Ok(())
    }

    /// Appends `prefix`, the decimal form of `n` and CRLF.
    pub fn write_int_line(&mut self, prefix: u8, n: i64) {
        self.buf.put_u8(prefix);
        self.write_decimal(n);
        self.buf.extend_from_slice(CRLF);
    }

    /// Appends `prefix`, the `Display` form of `value` and CRLF.
    ///
    /// Same CR/LF rule as [`write_line`](Self::write_line).
    pub fn write_display_line(&mut self, prefix: u8, value: &dyn fmt::Display) -> RespResult<()> {
        let mark = self.scratch.len();
        // Writing into a Vec cannot fail.
        let _ = write!(self.scratch, "{}", value);
        if let Err(e) = check_line(&self.scratch[mark..]) {
            self.scratch.truncate(mark);
            return Err(e);
        }
        self.write_line_from(prefix, mark);
        Ok(())
    }

    /// Appends a complete bulk string: `$<len>\r\n<payload>\r\n`.
    pub fn write_bulk(&mut self, payload: &[u8]) {
        self.write_int_line(prefix::BULK_STRING, payload.len() as i64);
        self.buf.extend_from_slice(payload);
        self.buf.extend_from_slice(CRLF);
    }

    /// Scratch space for formatting a payload before writing it.
    ///
    /// Use [`scratch_mark`](Self::scratch_mark) before appending and pass the
    /// mark to [`write_bulk_from_scratch`](Self::write_bulk_from_scratch).
    pub fn scratch_mut(&mut self) -> &mut Vec<u8> {
        &mut self.scratch
    }

    /// Current end of the scratch space.
    pub fn scratch_mark(&self) -> usize {
        self.scratch.len()
    }

    /// Writes `scratch[mark..]` as a bulk string and releases it.
    pub fn write_bulk_from_scratch(&mut self, mark: usize) {
        let len = self.scratch.len() - mark;
        self.write_int_line(prefix::BULK_STRING, len as i64);
        self.buf.extend_from_slice(&self.scratch[mark..]);
        self.buf.extend_from_slice(CRLF);
        self.scratch.truncate(mark);
    }

    fn write_line_from(&mut self, prefix: u8, mark: usize) {
        self.buf.put_u8(prefix);
        self.buf.extend_from_slice(&self.scratch[mark..]);
        self.buf.extend_from_slice(CRLF);
        self.scratch.truncate(mark);
    }

    fn write_decimal(&mut self, n: i64) {
        let mark = self.scratch.len();
        let _ = write!(self.scratch, "{}", n);
        self.buf.extend_from_slice(&self.scratch[mark..]);
        self.scratch.truncate(mark);
    }

    /// Runs a sub-encode against the unused tail of the output buffer.
    ///
    /// The sub-encode sees an empty pool whose buffer is a view over the free
    /// capacity after the bytes already written. On success its output is
    /// appended to the accumulator and its length returned; on failure
    /// nothing it wrote is kept. Growth of the view reallocates only the
    /// view; the accumulator's bytes are never moved or overwritten by the
    /// sub-encode.
    pub fn encode_tail<F>(&mut self, encode: F) -> RespResult<usize>
    where
        F: FnOnce(&mut Pool) -> RespResult<()>,
    {
        let mut acc = std::mem::take(&mut self.buf);
        let read = std::mem::replace(&mut self.read, 0);
        if acc.capacity() - acc.len() < MIN_TAIL_CAPACITY {
            acc.reserve(MIN_TAIL_CAPACITY);
        }
        self.buf = acc.split_off(acc.len());

        let result = encode(self);

        let tail = std::mem::replace(&mut self.buf, acc);
        self.read = read;
        result?;

        let written = tail.len();
        self.buf.unsplit(tail);
        Ok(written)
    }
}

fn check_line(payload: &[u8]) -> RespResult<()> {
    match payload.iter().position(|&b| b == b'\r' || b == b'\n') {
        Some(at) => Err(RespError::LineBreak(at)),
        None => Ok(()),
    }
}

/// Parses a decimal line, reporting the offending text on failure.
fn parse_int(line: &[u8]) -> Result<i64, ParseError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(input: &[u8]) -> Pool {
        let mut pool = Pool::new();
        pool.feed(input);
        pool
    }

    #[test]
    fn test_read_delimited() {
        let mut pool = pool_with(b"foo\nbar");
        assert_eq!(pool.read_delimited(b'\n'), (&b"foo"[..], true));
        assert_eq!(pool.buffered(), b"bar");

        let mut pool = pool_with(b"\nbar");
        assert_eq!(pool.read_delimited(b'\n'), (&b""[..], true));
        assert_eq!(pool.buffered(), b"bar");
    }

    #[test]
    fn test_read_delimited_not_found() {
        let mut pool = pool_with(b"foobar");
        assert_eq!(pool.read_delimited(b'\n'), (&b"foobar"[..], false));
        assert!(pool.buffered().is_empty());
    }

    #[test]
    fn test_read_int_line() {
        let mut pool = pool_with(b"5\r\nfoo");
        assert_eq!(pool.read_int_line(), Ok(5));
        assert_eq!(pool.buffered(), b"foo");

        let mut pool = pool_with(b"-12\r\n");
        assert_eq!(pool.read_int_line(), Ok(-12));
    }

    #[test]
    fn test_read_int_line_incomplete() {
        let mut pool = pool_with(b"5foo");
        assert_eq!(pool.read_int_line(), Err(ParseError::Incomplete));

        let mut pool = pool_with(b"5\r");
        assert_eq!(pool.read_int_line(), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_read_int_line_not_a_number() {
        let mut pool = pool_with(b"abc\r\n");
        assert_eq!(
            pool.read_int_line(),
            Err(ParseError::InvalidInteger("abc".to_string()))
        );
    }

    #[test]
    fn test_read_line_rejects_bare_cr() {
        let mut pool = pool_with(b"foo\rbar\r\n");
        assert_eq!(
            pool.read_line(),
            Err(ParseError::InvalidTerminator(b"\rb".to_vec()))
        );
    }

    #[test]
    fn test_expect_prefix() {
        let mut pool = pool_with(b"$3\r\n");
        assert_eq!(pool.expect_prefix(b"$"), Ok(()));

        let mut pool = pool_with(b":5\r\n");
        assert_eq!(
            pool.expect_prefix(b"$"),
            Err(ParseError::UnexpectedPrefix {
                expected: b"$".to_vec(),
                got: b":".to_vec(),
            })
        );

        let mut pool = Pool::new();
        assert_eq!(pool.expect_prefix(b"$"), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_acquire_resets_given_pool() {
        let mut pool = Pool::new();
        pool.write(b"stale bytes");
        pool.scratch_mut().extend_from_slice(b"stale scratch");
        let capacity = pool.buf.capacity();

        let handle = Pool::acquire(Some(&mut pool));
        assert!(handle.is_empty());
        assert!(handle.scratch.is_empty());
        assert!(handle.buf.capacity() >= capacity);
    }

    #[test]
    fn test_input_limit_survives_reuse() {
        let mut pool = Pool::new().with_max_input(64);
        pool.feed(b"+OK\r\n");
        pool.reset();
        assert_eq!(pool.max_input(), 64);

        let handle = Pool::acquire(Some(&mut pool));
        assert_eq!(handle.max_input(), 64);
        assert_eq!(Pool::new().max_input(), MAX_INPUT_SIZE);
    }

    #[test]
    fn test_write_line_rejects_line_breaks() {
        let mut pool = Pool::new();
        pool.write(b":1\r\n");

        assert!(matches!(pool.write_line(b'+', b"a\rb"), Err(RespError::LineBreak(1))));
        assert!(matches!(
            pool.write_display_line(b'-', &"bad\nnews"),
            Err(RespError::LineBreak(3))
        ));
        assert_eq!(pool.output(), b":1\r\n");
        assert!(pool.scratch.is_empty());

        pool.write_line(b'+', b"fine").unwrap();
        assert_eq!(pool.output(), b":1\r\n+fine\r\n");
    }

    #[test]
    fn test_acquire_without_pool_allocates() {
        let handle = Pool::acquire(None);
        assert!(matches!(handle, PoolHandle::Owned(_)));
        assert!(handle.is_empty());
    }

    #[test]
    fn test_sequential_outputs_do_not_leak() {
        let mut pool = Pool::new();

        let mut first = Pool::acquire(Some(&mut pool));
        first.write_bulk(b"first value");
        let first = first.take_output();

        let mut second = Pool::acquire(Some(&mut pool));
        second.write_int_line(prefix::INTEGER, 2);
        let second = second.take_output();

        assert_eq!(&first[..], b"$11\r\nfirst value\r\n");
        assert_eq!(&second[..], b":2\r\n");
    }

    #[test]
    fn test_encode_tail_preserves_accumulated_bytes() {
        let mut pool = Pool::new();
        pool.write(b"*2\r\n");

        let written = pool
            .encode_tail(|tail| {
                assert!(tail.is_empty());
                tail.write_bulk(b"a");
                Ok(())
            })
            .unwrap();
        assert_eq!(written, 7);

        // A sub-encode that resets its view only clears the view.
        pool.encode_tail(|tail| {
            tail.reset();
            tail.write_bulk(&[b'x'; 1000]);
            Ok(())
        })
        .unwrap();

        assert!(pool.output().starts_with(b"*2\r\n$1\r\na\r\n$1000\r\n"));
        assert_eq!(pool.len(), 4 + 7 + 1009);
    }

    #[test]
    fn test_encode_tail_discards_failed_output() {
        let mut pool = Pool::new();
        pool.write(b"*1\r\n");

        let result = pool.encode_tail(|tail| {
            tail.write(b"garbage");
            Err(RespError::UnsupportedType("Widget"))
        });

        assert!(matches!(result, Err(RespError::UnsupportedType("Widget"))));
        assert_eq!(pool.output(), b"*1\r\n");
    }

    #[test]
    fn test_write_bulk_from_scratch() {
        let mut pool = Pool::new();
        let mark = pool.scratch_mark();
        pool.scratch_mut().extend_from_slice(b"5.5");
        pool.write_bulk_from_scratch(mark);
        assert_eq!(pool.output(), b"$3\r\n5.5\r\n");
        assert!(pool.scratch.is_empty());
    }

    #[test]
    fn test_compact() {
        let mut pool = pool_with(b"+OK\r\n+PONG\r\n");
        pool.read_line().unwrap();
        pool.compact();
        assert_eq!(pool.position(), 0);
        assert_eq!(pool.buffered(), b"+PONG\r\n");
    }
}
