//! # debrotli
//!
//! A decoder for the early Brotli compressed stream format: LZ77
//! back-references over a sliding window combined with canonical prefix
//! codes switched per block type and a context-modeled literal coder.
//!
//! The decoder is purely sequential and allocation-bounded: one window
//! of `2^window_bits` bytes plus per-meta-block prefix tables and
//! context maps. Input and output go through the two small capabilities
//! in [`io`], with in-memory buffers covered out of the box.
//!
//! ## Example
//!
//! ```rust
//! use debrotli::decompress_to_vec;
//!
//! // The shortest stream: no size hint, final empty meta-block.
//! let decoded = decompress_to_vec(&[0x10]).unwrap();
//! assert!(decoded.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decode;
pub mod error;
pub mod io;

pub use decode::{decompress, decompress_buffer, decompress_to_vec, decompressed_size};
pub use error::{Error, Result};
pub use io::{MemSink, Sink, Source};
