//! Async RESP Reader
//!
//! Decodes values from any tokio [`AsyncRead`] (a `TcpStream`, a pipe, an
//! in-memory duplex). Incoming bytes accumulate in a [`Pool`]; TCP is a
//! stream protocol, so one read may hold half a value or several values,
//! and partial values stay buffered until the rest arrives.
//!
//! ```text
//!   read_value()
//!        │
//!        ▼
//!   ┌──────────────────────────┐   complete   ┌──────────────────────┐
//!   │ decode from buffered     │─────────────>│ drop consumed bytes, │
//!   │ bytes                    │              │ return the value     │
//!   └───────────┬──────────────┘              └──────────────────────┘
//!               │ incomplete
//!               ▼
//!   ┌──────────────────────────┐
//!   │ read more from the       │──> EOF: Ok(None) if nothing is buffered,
//!   │ source, then retry       │         Incomplete otherwise
//!   └──────────────────────────┘
//! ```

use crate::protocol::decode::decode_buffered;
use crate::protocol::error::{ParseError, RespResult};
use crate::protocol::pool::Pool;
use crate::protocol::types::RespValue;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Reads RESP values from an async byte source.
#[derive(Debug)]
pub struct AsyncRespReader<R> {
    inner: R,
    pool: Pool,
    values_read: u64,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> AsyncRespReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_pool(inner, Pool::with_capacity(INITIAL_BUFFER_SIZE))
    }

    /// Reads through `pool`, whose [`max_input`](Pool::max_input) caps how
    /// much undecoded input is held at once.
    pub fn with_pool(inner: R, mut pool: Pool) -> Self {
        pool.reset();
        Self {
            inner,
            pool,
            values_read: 0,
            bytes_read: 0,
        }
    }

    /// Reads the next complete value.
    ///
    /// Returns `Ok(None)` when the source ends cleanly between values, and
    /// [`ParseError::Incomplete`] when it ends in the middle of one.
    pub async fn read_value(&mut self) -> RespResult<Option<RespValue>> {
        loop {
            if let Some(value) = self.try_decode()? {
                return Ok(Some(value));
            }

            if self.read_more_data().await? == 0 {
                if self.pool.buffered().is_empty() {
                    return Ok(None);
                }
                return Err(ParseError::Incomplete.into());
            }
        }
    }

    /// Attempts to decode a value from what is already buffered.
    fn try_decode(&mut self) -> RespResult<Option<RespValue>> {
        if self.pool.buffered().is_empty() {
            return Ok(None);
        }

        match decode_buffered(&mut self.pool) {
            Ok(value) => {
                let consumed = self.pool.position();
                self.pool.compact();
                self.values_read += 1;
                trace!(
                    consumed = consumed,
                    remaining = self.pool.buffered().len(),
                    "Decoded value"
                );
                Ok(Some(value))
            }
            Err(e) if e.is_incomplete() => {
                trace!(
                    buffered = self.pool.buffered().len(),
                    "Incomplete value, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Parse error");
                Err(e)
            }
        }
    }

    /// Reads more data from the source into the buffer.
    async fn read_more_data(&mut self) -> RespResult<usize> {
        let max = self.pool.max_input();
        let buffer = self.pool.input_mut();

        if buffer.len() >= max {
            return Err(ParseError::MessageTooLarge {
                size: buffer.len(),
                max,
            }
            .into());
        }

        // Ensure we have some capacity
        if buffer.capacity() - buffer.len() < 1024 {
            buffer.reserve(4096);
        }

        let n = self.inner.read_buf(buffer).await?;
        self.bytes_read += n as u64;
        trace!(bytes = n, "Read data");
        Ok(n)
    }

    /// Bytes received but not yet decoded.
    pub fn buffered(&self) -> &[u8] {
        self.pool.buffered()
    }

    /// Number of values decoded so far.
    pub fn values_read(&self) -> u64 {
        self.values_read
    }

    /// Number of bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns the source. Buffered bytes are discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
