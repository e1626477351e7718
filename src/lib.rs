//! # FlashRESP - A Fast, Allocation-Aware RESP Codec
//!
//! FlashRESP encodes and decodes the Redis Serialization Protocol (RESP).
//! It is meant to sit underneath clients, proxies and servers that speak
//! the protocol, and leaves connection management to them.
//!
//! ## Features
//!
//! - **Binary-Safe**: Bulk strings carry an explicit length, so payloads may
//!   contain any bytes, CRLF included
//! - **Buffer Reuse**: A [`Pool`] can be handed to every call on a stream so
//!   repeated encodes and decodes stop allocating once warmed up
//! - **Generic Marshaling**: Strings, numbers, options, vectors, maps and
//!   caller types encode without building a value tree first
//! - **Streaming**: Large bodies are copied from any reader straight to the
//!   sink, and an async reader decodes from tokio sources
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashRESP                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────────┐     │
//! │  │ Application │───>│  ToValue    │───>│  Generic Value Marshaler │     │
//! │  │   values    │    │ (Value kind)│    │  marshal_any / Encoder   │     │
//! │  └─────────────┘    └─────────────┘    └────────────┬─────────────┘     │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │  decode_one │    │                Scalar Codecs                 │    │
//! │  │  AsyncResp- │───>│  SimpleString  SimpleError  Integer          │    │
//! │  │  Reader     │    │  BulkString    ArrayHeader                   │    │
//! │  └─────────────┘    └──────────────────────┬───────────────────────┘    │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                     ┌──────────────────────────────────────────────┐    │
//! │                     │                   Pool                       │    │
//! │                     │   input cursor | output buffer | scratch     │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashresp::{decode_one, marshal_any, Pool, RespValue};
//!
//! let mut pool = Pool::new();
//!
//! // Encode a command
//! let frame = marshal_any(&["SET", "name", "Ariz"], Some(&mut pool)).unwrap();
//! assert_eq!(&frame[..], b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n");
//!
//! // Decode it back
//! let value = decode_one(&mut &frame[..], Some(&mut pool)).unwrap();
//! assert_eq!(value.as_array().map(|items| items.len()), Some(3));
//! assert_eq!(value.as_array().unwrap()[2], RespValue::bulk_string("Ariz"));
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Wire grammar, resource pool, scalar codecs and decoding
//! - [`marshal`]: Generic value marshaling for arbitrary Rust values
//! - [`stream`]: Streaming encoder and async reader
//!
//! ## Design Highlights
//!
//! ### Nil Is Not Empty
//!
//! `$-1\r\n` and `$0\r\n\r\n` are different values, as are `*-1\r\n` and
//! `*0\r\n`. Both distinctions survive every encode and decode path.
//!
//! ### In-Place Nested Encoding
//!
//! Nested elements are written into the spare capacity after the bytes
//! already encoded, then merged back, so an array of arrays is built in one
//! buffer without intermediate frames.
//!
//! ### Retryable Truncation
//!
//! Running out of input is reported as [`ParseError::Incomplete`], distinct
//! from every corruption error, so streaming callers can read more and retry.

pub mod marshal;
pub mod protocol;
pub mod stream;

// Re-export commonly used types for convenience
pub use marshal::{marshal_any, Any, Nullable, ToValue, Value};
pub use protocol::{
    decode_into, decode_one, FromResp, Marshal, ParseError, Pool, RespError, RespResult,
    RespValue, Unmarshal,
};
pub use stream::{encode_one, AsyncRespReader, Encoder};

/// Version of FlashRESP
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
