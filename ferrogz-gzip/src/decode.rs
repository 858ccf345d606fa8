//! Streaming gzip member decoder.

use ferrogz_core::config::{ChecksumKind, Settings};
use ferrogz_core::error::{FerrogzError, Result};
use ferrogz_core::input::ByteInput;
use ferrogz_deflate::Inflater;
use std::io::Read;

use crate::header::GzipFileInfo;

/// Decompresses one gzip member from a pull source.
///
/// The header is parsed on construction; decompressed bytes are then
/// pulled batch by batch with [`read_some`](GzipDecoder::read_some). When
/// the DEFLATE stream ends, the CRC-32 and ISIZE trailer fields are read
/// and — with `verify_checksum` enabled — compared against the decoded
/// data.
#[derive(Debug)]
pub struct GzipDecoder<R> {
    inflater: Inflater<R>,
    info: GzipFileInfo,
    verify: bool,
    done: bool,
}

impl<R: Read> GzipDecoder<R> {
    /// Open a member with default settings (CRC-32 verification on).
    pub fn new(reader: R) -> Result<Self> {
        Self::with_settings(reader, &Settings::default())
    }

    /// Open a member with explicit settings.
    ///
    /// Fails immediately when the header is not a valid gzip header.
    pub fn with_settings(reader: R, settings: &Settings) -> Result<Self> {
        let mut input = ByteInput::new(reader, &settings.input, ChecksumKind::None);
        let info = GzipFileInfo::parse(&mut input, settings.verify_checksum)?;
        Ok(Self {
            inflater: Inflater::from_input(input, settings),
            info,
            verify: settings.verify_checksum,
            done: false,
        })
    }

    /// The parsed member header.
    pub fn info(&self) -> &GzipFileInfo {
        &self.info
    }

    /// Decompression finished and the trailer was checked.
    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Produce the next batch of decompressed bytes.
    ///
    /// `keep` bytes of the previous batch stay addressable directly before
    /// the returned slice. An empty slice does not mean end of data — only
    /// `None` does. The slice is valid until the next call.
    pub fn read_some(&mut self, keep: usize) -> Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        let more = self.inflater.step()?;
        let range = self.inflater.consume_range(keep);
        if !more {
            // The final batch above fed the checksum; the trailer can now
            // be compared against it
            self.verify_trailer()?;
            self.done = true;
        }
        Ok(Some(self.inflater.output_slice(range)))
    }

    /// Read the CRC-32/ISIZE trailer and verify it when enabled.
    fn verify_trailer(&mut self) -> Result<()> {
        let computed_crc = self.inflater.checksum_value();
        let crc_enabled = self.inflater.checksum_enabled();
        let produced = self.inflater.total_written() as u32;

        let input = self.inflater.input_mut();
        let stored_crc = input.get_u32()?;
        let stored_size = input.get_u32()?;

        if self.verify {
            if crc_enabled && stored_crc != computed_crc {
                return Err(FerrogzError::body_crc_mismatch(stored_crc, computed_crc));
            }
            if stored_size != produced {
                return Err(FerrogzError::size_mismatch(stored_size, produced));
            }
        }
        Ok(())
    }

    /// Decompress the whole member into a vector.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        while let Some(batch) = self.read_some(0)? {
            result.extend_from_slice(batch);
        }
        Ok(result)
    }
}
