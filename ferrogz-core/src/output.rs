//! Sliding-window output buffer.
//!
//! [`ByteOutput`] collects decompressed (or compressed) bytes in a fixed
//! buffer and doubles as the DEFLATE back-reference window: while more
//! output is expected, consuming keeps at least `min_size` of the newest
//! bytes in place so later back-references can still reach them. Calling
//! [`done`](ByteOutput::done) waives the retention and lets the final
//! consume drain everything.
//!
//! Back-references are expanded with [`repeat_sequence`], which copies
//! forward in chunks of `distance` bytes so a copy whose distance is
//! shorter than its length reads the bytes it has just written — the
//! classic LZ77 self-overlapping copy. A bulk copy that forbids overlap
//! would produce wrong output here.
//!
//! The configured checksum is fed exactly the bytes handed out by
//! `consume`, in output order, so any consume pattern yields the same
//! value.
//!
//! [`repeat_sequence`]: ByteOutput::repeat_sequence

use crate::config::{ChecksumKind, OutputOptions};
use crate::crc::StreamChecksum;
use crate::error::{FerrogzError, Result};
use std::ops::Range;

/// Fixed-capacity output buffer retaining a back-reference window.
#[derive(Debug)]
pub struct ByteOutput {
    buffer: Vec<u8>,
    /// Bytes filled; valid data is `0..used`.
    used: usize,
    /// End of the prefix already handed out by `consume`.
    consumed: usize,
    /// Retention floor while `expects_more`.
    min_size: usize,
    /// More output will be produced; cleared by `done()`.
    expects_more: bool,
    checksum: StreamChecksum,
    /// All bytes ever written, across consumes.
    total_written: u64,
}

impl ByteOutput {
    /// Create an output buffer with the given geometry.
    ///
    /// # Panics
    ///
    /// Panics if the capacity does not exceed the retention floor.
    pub fn new(options: &OutputOptions, checksum: ChecksumKind) -> Self {
        assert!(
            options.max_size > options.min_size,
            "output buffer ({}) must exceed its retention floor ({})",
            options.max_size,
            options.min_size
        );
        Self {
            buffer: vec![0; options.max_size],
            used: 0,
            consumed: 0,
            min_size: options.min_size,
            expects_more: true,
            checksum: StreamChecksum::new(checksum),
            total_written: 0,
        }
    }

    /// Remaining capacity before a consume is required.
    pub fn available(&self) -> usize {
        self.buffer.len() - self.used
    }

    /// Number of valid bytes currently in the buffer (the reachable
    /// back-reference window).
    pub fn window_len(&self) -> usize {
        self.used
    }

    /// All bytes ever written, across consumes.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Checksum over everything consumed so far; 0 when disabled.
    pub fn checksum_value(&self) -> u32 {
        self.checksum.value()
    }

    /// Whether the configured checksum actually computes anything.
    pub fn checksum_enabled(&self) -> bool {
        self.checksum.is_enabled()
    }

    /// No more data will be written; the next consume may drain everything.
    pub fn done(&mut self) {
        self.expects_more = false;
    }

    fn check_size(&self, adding: usize) -> Result<()> {
        if self.used + adding > self.buffer.len() {
            return Err(FerrogzError::output_overflow(adding, self.available()));
        }
        Ok(())
    }

    /// Append one byte.
    #[inline]
    pub fn add_byte(&mut self, byte: u8) -> Result<()> {
        self.check_size(1)?;
        self.buffer[self.used] = byte;
        self.used += 1;
        self.total_written += 1;
        Ok(())
    }

    /// Append a slice.
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_size(bytes.len())?;
        self.buffer[self.used..self.used + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
        self.total_written += bytes.len() as u64;
        Ok(())
    }

    /// Copy `length` bytes from `distance` behind the write head.
    ///
    /// Copies forward in chunks of at most `distance` bytes, so when
    /// `distance < length` the tail of the copy reads the prefix the copy
    /// itself just produced.
    pub fn repeat_sequence(&mut self, length: usize, distance: usize) -> Result<()> {
        self.check_size(length)?;
        let mut written = 0;
        while written < length {
            if distance == 0 || distance > self.used {
                return Err(FerrogzError::bad_back_reference(distance, self.used));
            }
            let copying = distance.min(length - written);
            self.buffer
                .copy_within(self.used - distance..self.used - distance + copying, self.used);
            self.used += copying;
            written += copying;
        }
        self.total_written += length as u64;
        Ok(())
    }

    /// Hand out everything written since the previous consume.
    ///
    /// `keep` asks for that many bytes of the *previous* batch to stay
    /// addressable immediately before the returned slice (the buffer keeps
    /// more when the retention floor demands it). The returned range is
    /// valid until the next call into the codec; resolve it with
    /// [`slice`](Self::slice).
    pub fn consume_range(&mut self, keep: usize) -> Range<usize> {
        // The final batch needs no cleaning and no retention
        if !self.expects_more {
            let range = self.consumed..self.used;
            self.checksum.update(&self.buffer[range.clone()]);
            self.consumed = self.used;
            return range;
        }

        // Clean the space handed out by the previous call, keeping the
        // requested bytes plus whatever the retention floor demands
        let mut keeping = keep.min(self.consumed);
        let floor = (self.min_size + self.consumed).saturating_sub(self.used);
        if keeping < floor {
            keeping = floor.min(self.consumed);
        }
        let removing = self.consumed - keeping;
        self.buffer.copy_within(removing..self.used, 0);
        self.used -= removing;

        let range = keeping..self.used;
        self.consumed = self.used;
        self.checksum.update(&self.buffer[range.clone()]);
        range
    }

    /// Drop the already-consumed prefix now, beyond the retention floor,
    /// without handing out new bytes.
    ///
    /// Regains the full write capacity between consumes; ranges from
    /// earlier consumes are invalidated. The compressor calls this before
    /// emitting each block, the decompressor keeps the lazy cleaning of
    /// [`consume_range`](Self::consume_range) so the `keep` request can
    /// still be honored.
    pub fn discard_consumed(&mut self) {
        let floor = (self.min_size + self.consumed).saturating_sub(self.used);
        let keeping = floor.min(self.consumed);
        let removing = self.consumed - keeping;
        if removing == 0 {
            return;
        }
        self.buffer.copy_within(removing..self.used, 0);
        self.used -= removing;
        self.consumed -= removing;
    }

    /// Resolve a range returned by [`consume_range`](Self::consume_range).
    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.buffer[range]
    }

    /// Convenience wrapper: consume and resolve in one call.
    pub fn consume(&mut self, keep: usize) -> &[u8] {
        let range = self.consume_range(keep);
        &self.buffer[range]
    }
}
