//! Error types for the debrotli library.

use std::fmt;

/// Result type alias for debrotli operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding a compressed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input ended before the decoder had the bits it needed.
    Truncated,
    /// The stream violates the compressed-format grammar.
    Format(String),
    /// A back-reference reaches farther than the window allows.
    Backref {
        /// Distance requested by the stream.
        distance: u64,
        /// Largest distance valid at this output position.
        max_distance: u64,
    },
    /// A copy runs past the end of the current meta-block.
    Overrun {
        /// Output position before the copy.
        position: u64,
        /// Requested copy length.
        copy_len: usize,
        /// First position past the current meta-block.
        block_end: u64,
    },
    /// The output sink refused a write.
    Sink,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => {
                write!(f, "unexpected end of input")
            }
            Error::Format(msg) => {
                write!(f, "invalid stream: {}", msg)
            }
            Error::Backref {
                distance,
                max_distance,
            } => {
                write!(
                    f,
                    "invalid back-reference: distance {} exceeds maximum {}",
                    distance, max_distance
                )
            }
            Error::Overrun {
                position,
                copy_len,
                block_end,
            } => {
                write!(
                    f,
                    "copy of {} bytes at position {} passes meta-block end {}",
                    copy_len, position, block_end
                )
            }
            Error::Sink => {
                write!(f, "output sink failed")
            }
        }
    }
}

impl std::error::Error for Error {}
