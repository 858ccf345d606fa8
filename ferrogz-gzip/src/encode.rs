//! Streaming gzip member encoder.

use ferrogz_core::config::{ChecksumKind, Settings};
use ferrogz_core::error::Result;
use ferrogz_deflate::Deflater;
use std::io::Read;

use crate::header::GzipFileInfo;

/// Where the encoder is within the member layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Body,
    Trailer,
    Done,
}

/// Compresses a pull source into one gzip member.
///
/// Batches come out through [`read_some`](GzipEncoder::read_some): first
/// the header (FHCRC always included), then the DEFLATE body, finally the
/// CRC-32/ISIZE trailer. The input checksum is forced on regardless of the
/// settings — the trailer cannot be produced without it.
#[derive(Debug)]
pub struct GzipEncoder<R> {
    deflater: Deflater<R>,
    stage: Stage,
    header: Vec<u8>,
    trailer: [u8; 8],
}

impl<R: Read> GzipEncoder<R> {
    /// Compress `reader` with the given file info and default settings.
    pub fn new(reader: R, info: GzipFileInfo) -> Self {
        Self::with_settings(reader, info, &Settings::default())
    }

    /// Compress `reader` with explicit settings.
    pub fn with_settings(reader: R, info: GzipFileInfo, settings: &Settings) -> Self {
        let mut settings = *settings;
        settings.checksum = ChecksumKind::Crc32;

        let mut header = Vec::new();
        info.write_to(&mut header);
        Self {
            deflater: Deflater::with_settings(reader, &settings),
            stage: Stage::Header,
            header,
            trailer: [0; 8],
        }
    }

    /// The member is fully emitted.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Produce the next batch of the member.
    ///
    /// An empty slice does not mean end of data — only `None` does. The
    /// slice is valid until the next call.
    pub fn read_some(&mut self) -> Result<Option<&[u8]>> {
        match self.stage {
            Stage::Header => {
                self.stage = Stage::Body;
                Ok(Some(&self.header))
            }
            Stage::Body => {
                let more = self.deflater.step()?;
                let range = self.deflater.consume_range();
                if !more {
                    self.trailer[..4].copy_from_slice(&self.deflater.checksum_value().to_le_bytes());
                    self.trailer[4..]
                        .copy_from_slice(&(self.deflater.total_read() as u32).to_le_bytes());
                    self.stage = Stage::Trailer;
                }
                Ok(Some(self.deflater.output_slice(range)))
            }
            Stage::Trailer => {
                self.stage = Stage::Done;
                Ok(Some(&self.trailer))
            }
            Stage::Done => Ok(None),
        }
    }

    /// Emit the whole member into a vector.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        while let Some(batch) = self.read_some()? {
            result.extend_from_slice(batch);
        }
        Ok(result)
    }
}
