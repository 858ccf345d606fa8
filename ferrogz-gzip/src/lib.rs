//! # ferrogz gzip
//!
//! RFC 1952 gzip member framing over the ferrogz DEFLATE codec.
//!
//! A gzip member wraps a DEFLATE stream in a header (magic, method, flags,
//! modification time, optional name/comment/extra field, optional header
//! CRC) and an eight-byte trailer carrying the CRC-32 and the size of the
//! uncompressed data. This crate parses and emits that framing and drives
//! `ferrogz-deflate` for the body.
//!
//! ## Example
//!
//! ```rust
//! use ferrogz_gzip::{compress, decompress};
//!
//! let data = b"Hello, gzip world! Hello, gzip world!";
//! let member = compress(data).unwrap();
//! assert_eq!(decompress(&member).unwrap(), data);
//! ```
//!
//! Streaming callers use [`GzipDecoder`] and [`GzipEncoder`] directly;
//! [`GzipDecoder::info`] exposes the parsed header fields.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod decode;
mod encode;
mod header;

pub use decode::GzipDecoder;
pub use encode::GzipEncoder;
pub use header::{flags, CompressionHint, GzipFileInfo, OperatingSystem, CM_DEFLATE, GZIP_MAGIC};

use ferrogz_core::error::Result;

/// Compress a buffer into a gzip member with default file info.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    compress_with_info(data, GzipFileInfo::new())
}

/// Compress a buffer into a gzip member carrying the given file info.
pub fn compress_with_info(data: &[u8], info: GzipFileInfo) -> Result<Vec<u8>> {
    GzipEncoder::new(data, info).read_to_vec()
}

/// Decompress a complete gzip member held in memory.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    GzipDecoder::new(data)?.read_to_vec()
}
