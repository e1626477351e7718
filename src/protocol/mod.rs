//! RESP Protocol Implementation
//!
//! This module provides the wire-level half of the codec: the grammar
//! constants, the resource pool, one codec per value kind, and a decoder
//! for complete values.
//!
//! ## Overview
//!
//! RESP is a simple, binary-safe protocol used by Redis for client-server communication.
//! Five value kinds exist, each introduced by a one-byte prefix and ended by CRLF.
//! Bulk strings and arrays carry an explicit length and have a distinct nil form.
//!
//! ## Modules
//!
//! - `types`: Grammar constants and the `RespValue` enum
//! - `pool`: Reusable buffers shared between codec calls
//! - `scalar`: `SimpleString`, `SimpleError`, `Integer`, `BulkString`, `ArrayHeader`
//! - `decode`: Incremental decoding of complete values
//! - `error`: `ParseError` and `RespError`
//!
//! ## Example
//!
//! ```
//! use flashresp::protocol::{decode_one, BulkString, Marshal, Pool, RespValue};
//! use bytes::Bytes;
//!
//! let mut pool = Pool::new();
//!
//! // Encoding a single value
//! let frame = BulkString::new("Ariz").marshal(Some(&mut pool)).unwrap();
//! assert_eq!(&frame[..], b"$4\r\nAriz\r\n");
//!
//! // Decoding from any buffered reader
//! let mut source: &[u8] = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let value = decode_one(&mut source, Some(&mut pool)).unwrap();
//! assert_eq!(
//!     value,
//!     RespValue::array(vec![
//!         RespValue::bulk_string(Bytes::from("GET")),
//!         RespValue::bulk_string(Bytes::from("name")),
//!     ])
//! );
//! ```

pub mod decode;
pub mod error;
pub mod pool;
pub mod scalar;
pub mod types;

// Re-export commonly used types for convenience
pub use decode::{decode_buffered, decode_into, decode_one, FromResp, MAX_NESTING_DEPTH};
pub use error::{BoxError, ParseError, RespError, RespResult};
pub use pool::{Pool, PoolHandle, MAX_INPUT_SIZE};
pub use scalar::{
    ArrayHeader, BulkString, Integer, Marshal, SimpleError, SimpleString, Unmarshal,
    MAX_BULK_SIZE,
};
pub use types::{RespValue, CRLF, NIL_ARRAY, NIL_BULK_STRING};
