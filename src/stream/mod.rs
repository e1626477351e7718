//! Stream adapters
//!
//! - `encoder`: the Streaming Encoder over any `std::io::Write` sink
//! - `reader`: incremental decoding from a tokio `AsyncRead`

pub mod encoder;
pub mod reader;

pub use encoder::{encode_one, Body, Encoder, LenReader};
pub use reader::AsyncRespReader;
