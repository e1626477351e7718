//! Generic value marshaling
//!
//! Turns ordinary Rust values into RESP frames without building a
//! [`RespValue`](crate::protocol::RespValue) tree first:
//!
//! ```
//! use flashresp::marshal::marshal_any;
//!
//! let frame = marshal_any(&vec![Some(1i64), None], None).unwrap();
//! assert_eq!(&frame[..], b"*2\r\n:1\r\n$-1\r\n");
//! ```

pub mod any;
pub mod value;

pub use any::{marshal_any, Any, MAX_POINTER_HOPS};
pub use value::{Dynamic, Elements, Entries, MarshalBinary, MarshalText, Nullable, ToValue, Value};
