//! Codec configuration.
//!
//! Every encoder/decoder instance takes one [`Settings`] bundle at
//! construction. The bundle is plain data; nothing in it can change after
//! the codec is built.

/// Smallest legal output buffer for DEFLATE decompression.
///
/// The window retention floor (32768) plus the longest back-reference copy
/// (258) plus one more window so a full consume still leaves the mandatory
/// history behind.
pub const MIN_OUTPUT_CAPACITY: usize = 2 * 32768 + 258;

/// Sliding-window size mandated by DEFLATE (maximum back-reference reach).
pub const WINDOW_SIZE: usize = 32768;

/// Input buffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOptions {
    /// Buffer capacity in bytes.
    pub max_size: usize,
    /// Retention floor: at most `max_size - min_size` of consumed prefix is
    /// discarded on refill, so the duplication finder keeps its backward
    /// reach.
    pub min_size: usize,
    /// Lookahead tail reserved past `max_size`, at least 4 bytes so the
    /// widest integer read always fits.
    pub look_ahead: usize,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            max_size: 100_000,
            min_size: WINDOW_SIZE,
            look_ahead: 8,
        }
    }
}

/// Output buffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Buffer capacity in bytes.
    pub max_size: usize,
    /// Retention floor while more output is expected; `done()` waives it.
    pub min_size: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            max_size: 100_000,
            min_size: WINDOW_SIZE,
        }
    }
}

/// Token-stream batching between the duplication finder and the block
/// encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOptions {
    /// Tokens per section; a block is emitted when the batch reaches this.
    pub max_size: usize,
    /// Smallest section the encoder emits before end of input.
    pub min_size: usize,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            max_size: 16_384,
            min_size: 4_096,
        }
    }
}

/// Which checksum the codec buffers feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumKind {
    /// Rolling CRC-32 (scalar or slicing-by-16 internally).
    #[default]
    Crc32,
    /// No checksumming.
    None,
}

/// A static configuration bundle for one codec instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Input buffer geometry.
    pub input: InputOptions,
    /// Output buffer geometry.
    pub output: OutputOptions,
    /// Token-stream batching.
    pub tokens: TokenOptions,
    /// Checksum selection.
    pub checksum: ChecksumKind,
    /// Compare computed checksums against stored ones and fail on mismatch.
    pub verify_checksum: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: InputOptions::default(),
            output: OutputOptions::default(),
            tokens: TokenOptions::default(),
            checksum: ChecksumKind::Crc32,
            verify_checksum: true,
        }
    }
}

impl Settings {
    /// The smallest configuration that is still correct for arbitrary
    /// DEFLATE streams: a 33 kB input buffer, the minimum legal output
    /// buffer, and no checksumming.
    pub fn minimal() -> Self {
        Self {
            input: InputOptions {
                max_size: 33_000,
                min_size: 0,
                look_ahead: 8,
            },
            output: OutputOptions {
                max_size: MIN_OUTPUT_CAPACITY,
                min_size: WINDOW_SIZE,
            },
            tokens: TokenOptions {
                max_size: 8_192,
                min_size: 2_048,
            },
            checksum: ChecksumKind::None,
            verify_checksum: false,
        }
    }
}
