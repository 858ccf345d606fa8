//! Error types for ferrogz operations.
//!
//! One error enum covers the whole codec: byte/bit input, the sliding-window
//! output, Huffman table construction and decoding, DEFLATE block parsing,
//! and gzip member framing. I/O errors raised by the caller's reader are
//! wrapped and propagated unchanged.

use std::io;
use thiserror::Error;

/// The main error type for ferrogz operations.
#[derive(Debug, Error)]
pub enum FerrogzError {
    /// I/O error from the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input ended while more bytes or bits were required.
    #[error("unexpected end of input: {needed} more bytes required")]
    UnexpectedEnd {
        /// Number of bytes that were required but not available.
        needed: usize,
    },

    /// A write would exceed the output buffer capacity.
    ///
    /// This indicates a mis-sized output buffer, not corrupted input.
    #[error("output overflow: writing {requested} bytes with {available} available")]
    OutputOverflow {
        /// Number of bytes the codec attempted to write.
        requested: usize,
        /// Remaining capacity at the time of the write.
        available: usize,
    },

    /// A back-reference pointed further back than the retained window.
    #[error("back-reference distance {distance} exceeds window of {window} bytes")]
    BadBackReference {
        /// The offending distance.
        distance: usize,
        /// Number of bytes currently retained in the window.
        window: usize,
    },

    /// A set of Huffman code lengths does not describe a usable code.
    #[error("invalid Huffman code definition: {message}")]
    BadHuffman {
        /// Description of the violation.
        message: String,
    },

    /// A decoded bit prefix matches no codeword of the active table.
    #[error("no Huffman codeword matches the input bits")]
    BadCode,

    /// A DEFLATE block used the reserved block type.
    #[error("reserved DEFLATE block type {block_type:#04b}")]
    BadBlock {
        /// The two BTYPE bits as read from the stream.
        block_type: u8,
    },

    /// A stored block's one's-complement length check failed.
    #[error("stored block length check failed: LEN={len:#06x}, NLEN={nlen:#06x}")]
    BadStored {
        /// The LEN field.
        len: u16,
        /// The NLEN field, which must be the complement of LEN.
        nlen: u16,
    },

    /// The stream does not start with the gzip magic bytes.
    #[error("not a gzip stream: found {found:02x?} instead of [1f, 8b]")]
    BadMagic {
        /// The first two bytes actually read.
        found: [u8; 2],
    },

    /// The gzip member uses a compression method other than DEFLATE.
    #[error("unsupported gzip compression method {method}")]
    BadMethod {
        /// The CM byte from the member header.
        method: u8,
    },

    /// The optional gzip header CRC-16 did not match.
    #[error("gzip header CRC mismatch: stored {expected:#06x}, computed {computed:#06x}")]
    HeaderCrcMismatch {
        /// CRC stored in the header.
        expected: u16,
        /// CRC computed over the header bytes.
        computed: u16,
    },

    /// The gzip trailer CRC-32 of the decompressed data did not match.
    #[error("gzip body CRC mismatch: stored {expected:#010x}, computed {computed:#010x}")]
    BodyCrcMismatch {
        /// CRC stored in the trailer.
        expected: u32,
        /// CRC computed over the decompressed bytes.
        computed: u32,
    },

    /// The gzip trailer ISIZE did not match the decompressed length.
    #[error("gzip size mismatch: trailer says {expected} bytes, produced {actual}")]
    SizeMismatch {
        /// ISIZE from the trailer (uncompressed size modulo 2^32).
        expected: u32,
        /// Actual decompressed size modulo 2^32.
        actual: u32,
    },
}

/// Result type alias for ferrogz operations.
pub type Result<T> = std::result::Result<T, FerrogzError>;

impl FerrogzError {
    /// Create an unexpected-end error.
    pub fn unexpected_end(needed: usize) -> Self {
        Self::UnexpectedEnd { needed }
    }

    /// Create an output-overflow error.
    pub fn output_overflow(requested: usize, available: usize) -> Self {
        Self::OutputOverflow {
            requested,
            available,
        }
    }

    /// Create a bad-back-reference error.
    pub fn bad_back_reference(distance: usize, window: usize) -> Self {
        Self::BadBackReference { distance, window }
    }

    /// Create a bad-Huffman error.
    pub fn bad_huffman(message: impl Into<String>) -> Self {
        Self::BadHuffman {
            message: message.into(),
        }
    }

    /// Create a bad-block error.
    pub fn bad_block(block_type: u8) -> Self {
        Self::BadBlock { block_type }
    }

    /// Create a bad-stored error.
    pub fn bad_stored(len: u16, nlen: u16) -> Self {
        Self::BadStored { len, nlen }
    }

    /// Create a bad-magic error.
    pub fn bad_magic(found: [u8; 2]) -> Self {
        Self::BadMagic { found }
    }

    /// Create a bad-method error.
    pub fn bad_method(method: u8) -> Self {
        Self::BadMethod { method }
    }

    /// Create a header-CRC-mismatch error.
    pub fn header_crc_mismatch(expected: u16, computed: u16) -> Self {
        Self::HeaderCrcMismatch { expected, computed }
    }

    /// Create a body-CRC-mismatch error.
    pub fn body_crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::BodyCrcMismatch { expected, computed }
    }

    /// Create a size-mismatch error.
    pub fn size_mismatch(expected: u32, actual: u32) -> Self {
        Self::SizeMismatch { expected, actual }
    }
}
