//! CRC-32 checksum engine (ISO 3309, as used by gzip).
//!
//! Two code paths share one rolling state:
//!
//! - a scalar path processing one byte per table lookup, used for short
//!   inputs and for the tail of longer ones;
//! - a slicing-by-16 path processing 16 bytes per iteration through 16
//!   pre-computed 256-entry tables.
//!
//! Both paths maintain the invariant `crc(a ∥ b) == fold(crc(a), b)` for any
//! split of the input, so the checksum may be fed in arbitrary slices.
//!
//! The hardware CRC32 instruction on x86_64 uses the Castagnoli polynomial
//! and cannot produce gzip-compatible values, so the slicing tables are the
//! fast path here.

use crate::config::ChecksumKind;

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-32 slicing-by-16 lookup tables.
///
/// Table 0 is the plain byte table; each further table advances the partial
/// remainder by one more byte of zero input.
const CRC32_TABLE_SLICE: [[u32; 256]; 16] = {
    let mut tables = [[0u32; 256]; 16];
    tables[0] = CRC32_TABLE;

    let mut t = 1;
    while t < 16 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

/// Data below this size goes through the scalar loop unconditionally.
const SLICE_THRESHOLD: usize = 16;

/// Rolling CRC-32 calculator (ISO 3309).
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
/// - Reflected input and output
///
/// # Example
///
/// ```
/// use ferrogz_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"123456789");
/// assert_eq!(crc.finalize(), 0xCBF43926);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { state: 0xFFFFFFFF }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.state = 0xFFFFFFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= SLICE_THRESHOLD {
            crc32_slice16(&mut self.state, data);
        } else {
            crc32_scalar(&mut self.state, data);
        }
    }

    /// Current CRC value without consuming the calculator.
    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.state ^ 0xFFFFFFFF
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        self.state ^ 0xFFFFFFFF
    }

    /// Compute the CRC-32 of a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Scalar CRC-32, one byte per lookup.
#[inline]
fn crc32_scalar(state: &mut u32, data: &[u8]) {
    let mut crc = *state;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = CRC32_TABLE[index] ^ (crc >> 8);
    }
    *state = crc;
}

/// Slicing-by-16 CRC-32, sixteen bytes per iteration.
///
/// The running state is XORed into the first four bytes of each chunk before
/// the lookups. `from_le_bytes` keeps that XOR little-endian on every host,
/// which is the byte order the state convention requires.
#[inline]
fn crc32_slice16(state: &mut u32, data: &[u8]) {
    let mut crc = *state;
    let mut chunks = data.chunks_exact(16);

    for chunk in &mut chunks {
        let keyed = crc ^ u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

        crc = CRC32_TABLE_SLICE[15][(keyed & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[14][((keyed >> 8) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[13][((keyed >> 16) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[12][((keyed >> 24) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[11][chunk[4] as usize]
            ^ CRC32_TABLE_SLICE[10][chunk[5] as usize]
            ^ CRC32_TABLE_SLICE[9][chunk[6] as usize]
            ^ CRC32_TABLE_SLICE[8][chunk[7] as usize]
            ^ CRC32_TABLE_SLICE[7][chunk[8] as usize]
            ^ CRC32_TABLE_SLICE[6][chunk[9] as usize]
            ^ CRC32_TABLE_SLICE[5][chunk[10] as usize]
            ^ CRC32_TABLE_SLICE[4][chunk[11] as usize]
            ^ CRC32_TABLE_SLICE[3][chunk[12] as usize]
            ^ CRC32_TABLE_SLICE[2][chunk[13] as usize]
            ^ CRC32_TABLE_SLICE[1][chunk[14] as usize]
            ^ CRC32_TABLE_SLICE[0][chunk[15] as usize];
    }

    crc32_scalar(&mut crc, chunks.remainder());
    *state = crc;
}

/// A checksum slot selected at codec construction time.
///
/// The codec buffers feed every byte they move through this type; with
/// [`ChecksumKind::None`] the feed is a no-op.
#[derive(Debug, Clone)]
pub enum StreamChecksum {
    /// Checksumming disabled.
    Disabled,
    /// Rolling CRC-32.
    Crc32(Crc32),
}

impl StreamChecksum {
    /// Create the checksum slot matching a configuration choice.
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::None => Self::Disabled,
            ChecksumKind::Crc32 => Self::Crc32(Crc32::new()),
        }
    }

    /// Feed a slice of data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if let Self::Crc32(crc) = self {
            crc.update(data);
        }
    }

    /// Current checksum value; 0 when disabled.
    pub fn value(&self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Crc32(crc) => crc.value(),
        }
    }

    /// Whether a real checksum is being computed.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Crc32(_))
    }
}
