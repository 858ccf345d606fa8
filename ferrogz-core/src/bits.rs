//! Bit-level access on top of the byte buffers.
//!
//! DEFLATE packs bits LSB-first within bytes, so both directions here work
//! on a little-endian 64-bit shift register whose lowest bit is the next
//! one in the stream.
//!
//! [`BitState`] is the register alone. The decoder owns one and carries it
//! across block bodies; a [`BitReader`] is the short-lived pairing of that
//! register with the byte input it drains. When a body ends on a byte
//! boundary (stored blocks, end of stream) the state's whole prefetched
//! bytes are returned to the input with [`BitState::return_unused`] — the
//! byte cursor then sits exactly where byte-level parsing must resume.
//!
//! [`BitWriter`] is the mirror image: bits accumulate LSB-first and whole
//! bytes flush into a [`ByteOutput`] once more than 48 are pending.

use crate::error::{FerrogzError, Result};
use crate::input::ByteInput;
use crate::output::ByteOutput;
use std::io::Read;

/// No single bit-field in DEFLATE is wider than 16 bits.
const MIN_PENDING_BITS: u32 = 16;

/// Masks selecting the lowest 0..=16 bits.
const LOW_BITS: [u16; 17] = [
    0x0000, 0x0001, 0x0003, 0x0007, 0x000F, 0x001F, 0x003F, 0x007F, 0x00FF, 0x01FF, 0x03FF, 0x07FF,
    0x0FFF, 0x1FFF, 0x3FFF, 0x7FFF, 0xFFFF,
];

/// Pending bits of a bit reader, detached from the byte input.
#[derive(Debug, Default)]
pub struct BitState {
    /// Shift register; the lowest bit is the next one in the stream.
    data: u64,
    /// Number of valid bits in `data`. Unused upper bits are zero.
    bits_left: u32,
}

impl BitState {
    /// A fresh, empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole prefetched bytes go back to the input; leftover bits of a
    /// partially consumed byte are discarded, which is exactly the byte
    /// alignment stored blocks and the gzip trailer need.
    pub fn return_unused<R: Read>(&mut self, input: &mut ByteInput<R>) {
        input.return_bytes((self.bits_left >> 3) as usize);
        self.data = 0;
        self.bits_left = 0;
    }

    /// Number of pending bits.
    pub fn pending(&self) -> u32 {
        self.bits_left
    }
}

/// Bit-level reader over a [`ByteInput`].
///
/// Short-lived view; construct one per parsing step from the decoder's
/// persistent [`BitState`].
#[derive(Debug)]
pub struct BitReader<'a, R> {
    input: &'a mut ByteInput<R>,
    state: &'a mut BitState,
}

impl<'a, R: Read> BitReader<'a, R> {
    /// Pair a pending-bit register with the byte input it drains.
    pub fn new(input: &'a mut ByteInput<R>, state: &'a mut BitState) -> Self {
        Self { input, state }
    }

    /// Top the register up to at least 16 bits if the input allows.
    ///
    /// Pulls at most 6 bytes so the 48 added bits always fit above the
    /// at-most-15 already pending.
    #[inline]
    fn refill_if_needed(&mut self) -> Result<()> {
        if self.state.bits_left < MIN_PENDING_BITS {
            let (bytes, count) = {
                let chunk = self.input.get_range(6)?;
                let mut bytes = [0u8; 8];
                bytes[..chunk.len()].copy_from_slice(chunk);
                (bytes, chunk.len() as u32)
            };
            self.state.data |= u64::from_le_bytes(bytes) << self.state.bits_left;
            self.state.bits_left += count << 3;
        }
        Ok(())
    }

    /// Read `count` bits (1..=16), LSB-first, unwanted upper bits blanked.
    #[inline]
    pub fn get_bits(&mut self, count: u32) -> Result<u16> {
        debug_assert!((1..=16).contains(&count));
        self.refill_if_needed()?;
        if self.state.bits_left < count {
            return Err(FerrogzError::unexpected_end(1));
        }
        let result = self.state.data as u16 & LOW_BITS[count as usize];
        self.state.data >>= count;
        self.state.bits_left -= count;
        Ok(result)
    }

    /// Show the next 8 bits to `peek` and consume only as many as it says.
    ///
    /// `peek` returns `(consumed, value)`; the Huffman fast index uses this
    /// because the codeword length is only known once the indexed entry is
    /// inspected. Near end of stream the peeked byte is zero-padded; an
    /// error is raised only if more bits are committed than remain.
    #[inline]
    pub fn peek_byte_and_commit<T>(
        &mut self,
        peek: impl FnOnce(u8) -> Result<(u32, T)>,
    ) -> Result<T> {
        self.refill_if_needed()?;
        let (consumed, value) = peek(self.state.data as u8)?;
        if self.state.bits_left < consumed {
            return Err(FerrogzError::unexpected_end(1));
        }
        self.state.data >>= consumed;
        self.state.bits_left -= consumed;
        Ok(value)
    }
}

/// Bit-level writer flushing into a [`ByteOutput`].
#[derive(Debug, Default)]
pub struct BitWriter {
    /// Accumulator; bits enter LSB-first at position `filled`.
    held: u64,
    /// Number of valid bits in `held`.
    filled: u32,
}

impl BitWriter {
    /// A fresh, empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` bits (`value` must fit in them), flushing whole bytes
    /// to `output` once more than 48 are pending.
    #[inline]
    pub fn add_bits(&mut self, output: &mut ByteOutput, value: u32, count: u32) -> Result<()> {
        debug_assert!(count <= 16);
        debug_assert!(count == 32 || u64::from(value) < (1u64 << count));
        self.held |= u64::from(value) << self.filled;
        self.filled += count;
        if self.filled > 48 {
            self.flush_whole_bytes(output)?;
        }
        Ok(())
    }

    /// Move every whole pending byte into the output.
    fn flush_whole_bytes(&mut self, output: &mut ByteOutput) -> Result<()> {
        let bytes = (self.filled / 8) as usize;
        output.add_bytes(&self.held.to_le_bytes()[..bytes])?;
        self.held >>= bytes * 8;
        self.filled -= (bytes * 8) as u32;
        Ok(())
    }

    /// Zero-pad to the next byte boundary and flush. Afterwards the
    /// accumulator is empty and byte-level writes may go directly to the
    /// output (stored blocks rely on this).
    pub fn align_to_byte(&mut self, output: &mut ByteOutput) -> Result<()> {
        if self.filled % 8 != 0 {
            self.filled += 8 - self.filled % 8;
        }
        self.flush_whole_bytes(output)?;
        debug_assert_eq!(self.filled, 0);
        Ok(())
    }

    /// Flush everything, zero-padding a trailing partial byte.
    pub fn finish(&mut self, output: &mut ByteOutput) -> Result<()> {
        self.align_to_byte(output)
    }

    /// Number of bits not yet flushed.
    pub fn pending(&self) -> u32 {
        self.filled
    }
}
