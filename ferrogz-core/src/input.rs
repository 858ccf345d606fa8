//! Chunked byte input over a pull source.
//!
//! [`ByteInput`] owns a fixed-capacity buffer refilled from any
//! [`Read`] implementation. `Read::read` is the pull callback: it returns
//! how many bytes it wrote and 0 signals end of input.
//!
//! The buffer exposes three access styles:
//!
//! - sequential consumption (`get_range`, the little-endian integer
//!   getters), used by the bit reader and the gzip framing;
//! - random peeking at already-buffered bytes (`buffered` + `position`),
//!   used by the duplication finder for its multi-byte prefix probes;
//! - `return_bytes`, bookkeeping-only un-consumption used by the bit reader
//!   to hand back whole bytes it prefetched but never used.
//!
//! On refill the consumed prefix is discarded, but never more than would
//! leave less than `min_size` bytes behind the cursor — the duplication
//! finder relies on that backward reach. The absolute offset of buffer
//! index 0 is tracked in `position_start`, so global positions survive the
//! slide.

use crate::config::{ChecksumKind, InputOptions};
use crate::crc::StreamChecksum;
use crate::error::{FerrogzError, Result};
use std::io::Read;

/// Refillable chunked buffer over a pull source.
#[derive(Debug)]
pub struct ByteInput<R> {
    reader: R,
    buffer: Vec<u8>,
    /// Next unread byte. Unread data lives in `position..filled`.
    position: usize,
    /// End of valid data in the buffer.
    filled: usize,
    /// Absolute stream offset of buffer index 0.
    position_start: u64,
    /// Retention floor kept behind `position` across refills.
    min_size: usize,
    /// The pull source reported end of input.
    end_seen: bool,
    checksum: StreamChecksum,
}

impl<R: Read> ByteInput<R> {
    /// Create a buffer over `reader` with the given geometry.
    ///
    /// When `checksum` is enabled, every newly filled region is fed through
    /// it before callers can read it, so the resulting value is identical
    /// for any slicing of the reads.
    ///
    /// # Panics
    ///
    /// Panics if the lookahead tail is smaller than 4 bytes or the buffer
    /// cannot hold the retention floor.
    pub fn new(reader: R, options: &InputOptions, checksum: ChecksumKind) -> Self {
        assert!(
            options.look_ahead >= 4,
            "input lookahead must be at least 4 bytes, got {}",
            options.look_ahead
        );
        assert!(
            options.max_size > options.min_size,
            "input buffer ({}) must exceed its retention floor ({})",
            options.max_size,
            options.min_size
        );
        Self {
            reader,
            buffer: vec![0; options.max_size + options.look_ahead],
            position: 0,
            filled: 0,
            position_start: 0,
            min_size: options.min_size,
            end_seen: false,
            checksum: StreamChecksum::new(checksum),
        }
    }

    /// Index of the next unread byte within [`buffered`](Self::buffered).
    pub fn position(&self) -> usize {
        self.position
    }

    /// Absolute stream offset of buffer index 0.
    pub fn position_start(&self) -> u64 {
        self.position_start
    }

    /// All bytes currently held, consumed prefix included. Indexes align
    /// with [`position`](Self::position).
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[..self.filled]
    }

    /// Unread bytes currently in the buffer.
    pub fn remaining(&self) -> usize {
        self.filled - self.position
    }

    /// The pull source has reported end of input.
    pub fn end_of_input(&self) -> bool {
        self.end_seen
    }

    /// End of input reached and every buffered byte consumed.
    pub fn at_end(&self) -> bool {
        self.end_seen && self.position == self.filled
    }

    /// Total bytes pulled from the source so far.
    pub fn total_read(&self) -> u64 {
        self.position_start + self.filled as u64
    }

    /// Checksum over everything pulled so far; 0 when disabled.
    pub fn checksum_value(&self) -> u32 {
        self.checksum.value()
    }

    /// Consume `count` already-buffered bytes without copying them.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds [`remaining`](Self::remaining).
    pub fn advance(&mut self, count: usize) {
        assert!(count <= self.remaining());
        self.position += count;
    }

    /// Give back `count` consumed bytes (bookkeeping only, no I/O).
    ///
    /// Only bytes still present in the buffer can be returned; the bit
    /// reader uses this for whole bytes it prefetched past the stream it
    /// was decoding.
    pub fn return_bytes(&mut self, count: usize) {
        debug_assert!(count <= self.position);
        self.position -= count;
    }

    /// Pull more data from the source.
    ///
    /// Discards consumed prefix (respecting the retention floor) when it
    /// exceeds half the buffer, or whenever `force` is set. Returns the
    /// number of bytes added; 0 means end of input or a momentarily full
    /// buffer.
    pub fn refill(&mut self, force: bool) -> Result<usize> {
        let keep_back = self.min_size.min(self.position);
        let dropping = self.position - keep_back;
        if dropping > 0 && (force || self.position > self.buffer.len() / 2) {
            self.buffer.copy_within(dropping..self.filled, 0);
            self.position -= dropping;
            self.filled -= dropping;
            self.position_start += dropping as u64;
        }
        if self.filled == self.buffer.len() {
            return Ok(0);
        }
        let added = self.reader.read(&mut self.buffer[self.filled..])?;
        if added == 0 {
            self.end_seen = true;
        } else {
            self.checksum
                .update(&self.buffer[self.filled..self.filled + added]);
            self.filled += added;
        }
        Ok(added)
    }

    /// A contiguous slice of up to `size` unread bytes, consumed.
    ///
    /// May return fewer bytes than requested (or an empty slice at end of
    /// input); callers needing an exact count must loop.
    pub fn get_range(&mut self, size: usize) -> Result<&[u8]> {
        if self.position + size > self.filled {
            self.refill(false)?;
        }
        let start = self.position;
        let available = size.min(self.filled - start);
        self.position += available;
        Ok(&self.buffer[start..start + available])
    }

    /// Refill until at least `bytes` unread bytes are buffered.
    fn ensure_size(&mut self, bytes: usize) -> Result<()> {
        while self.position + bytes > self.filled {
            let added = self.refill(true)?;
            if added == 0 {
                return Err(FerrogzError::unexpected_end(
                    self.position + bytes - self.filled,
                ));
            }
        }
        Ok(())
    }

    /// Read an exact little-endian run of `N` bytes.
    fn get_le_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_size(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(bytes)
    }

    /// Read one byte.
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_le_bytes::<1>()?[0])
    }

    /// Read a little-endian 16-bit integer.
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.get_le_bytes::<2>()?))
    }

    /// Read a little-endian 32-bit integer.
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.get_le_bytes::<4>()?))
    }

    /// Read a little-endian 64-bit integer.
    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.get_le_bytes::<8>()?))
    }
}
