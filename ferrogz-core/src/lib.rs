//! # ferrogz core
//!
//! Core building blocks for the ferrogz gzip/DEFLATE codec.
//!
//! This crate provides the streaming substrate the codec is built on:
//!
//! - [`input`]: refillable chunked byte buffer over a pull source, with
//!   lookahead and absolute position accounting
//! - [`bits`]: LSB-first bit reader and writer layered on the byte buffers
//! - [`output`]: sliding-window output buffer with back-reference expansion
//! - [`crc`]: CRC-32 engine (scalar and slicing-by-16)
//! - [`config`]: per-codec configuration bundle
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ferrogz is a layered stack; this crate is the bottom layer:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ ferrogz-gzip                                         │
//! │     RFC 1952 member framing, header/trailer checks   │
//! ├──────────────────────────────────────────────────────┤
//! │ ferrogz-deflate                                      │
//! │     Huffman tables, block codec, duplication finder  │
//! ├──────────────────────────────────────────────────────┤
//! │ ferrogz-core (this crate)                            │
//! │     ByteInput/ByteOutput, BitReader/BitWriter, CRC   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is single-threaded and caller-pulled: codecs built on these
//! buffers do a bounded amount of work per call and stop at buffer
//! boundaries without losing or re-emitting data.
//!
//! ## Example
//!
//! ```rust
//! use ferrogz_core::crc::Crc32;
//!
//! let mut crc = Crc32::new();
//! crc.update(b"Hello, ");
//! crc.update(b"World!");
//! assert_eq!(crc.finalize(), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bits;
pub mod config;
pub mod crc;
pub mod error;
pub mod input;
pub mod output;

// Re-exports for convenience
pub use bits::{BitReader, BitState, BitWriter};
pub use config::{ChecksumKind, InputOptions, OutputOptions, Settings, TokenOptions};
pub use crc::{Crc32, StreamChecksum};
pub use error::{FerrogzError, Result};
pub use input::ByteInput;
pub use output::ByteOutput;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bits::{BitReader, BitState, BitWriter};
    pub use crate::config::{ChecksumKind, Settings};
    pub use crate::crc::Crc32;
    pub use crate::error::{FerrogzError, Result};
    pub use crate::input::ByteInput;
    pub use crate::output::ByteOutput;
}
