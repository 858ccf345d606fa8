//! # ferrogz deflate
//!
//! Streaming, pausable DEFLATE (RFC 1951) compression and decompression.
//!
//! This crate implements the codec proper on top of `ferrogz-core`'s
//! buffers:
//!
//! - [`inflate`]: the block decoder state machine (stored, fixed-Huffman
//!   and dynamic-Huffman blocks), pausable at any output-buffer boundary
//! - [`deflate`]: the block encoder, choosing per section between stored,
//!   fixed and per-section optimal dynamic codes
//! - [`huffman`]: canonical Huffman decode tables (8-bit fast index plus a
//!   long-code tail), encode tables, and the greedy length assignment
//! - [`lz77`]: the duplication finder — a rolling multi-prefix hash index
//!   emitting literal/match tokens
//! - [`tables`]: the RFC 1951 constants (fixed codes, length/distance
//!   bases, bit-reversal)
//!
//! ## Example
//!
//! ```rust
//! use ferrogz_deflate::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original).unwrap();
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! For streaming use, [`Inflater`] and [`Deflater`] expose the pausable
//! `step`/`consume` interface; the one-shot [`deflate()`] and
//! [`inflate()`] helpers wrap them for in-memory buffers.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;

// Re-exports
pub use deflate::{deflate, Deflater};
pub use huffman::{build_code_lengths, CodeTable, HuffmanTable};
pub use inflate::{inflate, Inflater};
pub use lz77::{Deduplicator, Token};
