//! DEFLATE decompression (RFC 1951).
//!
//! [`Inflater`] is a pausable state machine over the three block types.
//! Each call to [`step`](Inflater::step) decodes until the output buffer
//! fills or the stream ends; the caller then drains the buffer with
//! [`consume`](Inflater::consume) and calls `step` again. A back-reference
//! whose tail did not fit is remembered and resumed first on re-entry, so
//! no byte is lost or emitted twice regardless of buffer sizes.
//!
//! The pending bits of the bit reader live in a [`BitState`] owned by the
//! decoder and travel between block bodies. Entering a stored block (or
//! finishing the stream) returns the whole prefetched bytes to the byte
//! input and discards the partial byte — DEFLATE aligns to a byte boundary
//! at exactly those points.

use ferrogz_core::bits::{BitReader, BitState};
use ferrogz_core::config::{ChecksumKind, Settings, MIN_OUTPUT_CAPACITY, WINDOW_SIZE};
use ferrogz_core::error::{FerrogzError, Result};
use ferrogz_core::input::ByteInput;
use ferrogz_core::output::ByteOutput;
use std::io::Read;
use std::ops::Range;

use crate::huffman::{HuffmanTable, CODELEN_ALPHABET_SIZE, END_OF_BLOCK};
use crate::tables::{
    fixed_distance_table, fixed_litlen_table, CODE_LENGTH_ORDER, DISTANCE_BASE,
    DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS,
};

/// An interrupted back-reference copy, resumed before anything else.
#[derive(Debug, Default, Clone, Copy)]
struct CopyState {
    length: usize,
    distance: usize,
}

impl CopyState {
    /// Copy as much as fits; returns true when output filled up first.
    fn run(&mut self, output: &mut ByteOutput) -> Result<bool> {
        let copying = self.length.min(output.available());
        if copying > 0 {
            output.repeat_sequence(copying, self.distance)?;
            self.length -= copying;
        }
        Ok(self.length > 0)
    }

    fn begin(&mut self, output: &mut ByteOutput, length: usize, distance: usize) -> Result<bool> {
        self.length = length;
        self.distance = distance;
        self.run(output)
    }
}

/// Decoder position within the current block.
#[derive(Debug)]
enum Body {
    /// Between blocks.
    None,
    /// Copying the raw bytes of a stored block.
    Stored {
        /// Bytes of the block not yet copied.
        remaining: usize,
    },
    /// Inside a fixed-Huffman block.
    Fixed { copy: CopyState },
    /// Inside a dynamic-Huffman block with its per-block tables.
    Dynamic {
        litlen: HuffmanTable,
        distance: HuffmanTable,
        copy: CopyState,
    },
    /// Final block fully decoded.
    Finished,
}

/// What a body parse achieved before returning.
enum BodyStatus {
    /// Output buffer is full; same body continues next call.
    Paused,
    /// The block's end-of-block code was reached.
    BlockDone,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater<R> {
    input: ByteInput<R>,
    output: ByteOutput,
    bits: BitState,
    body: Body,
    last_block: bool,
}

impl<R: Read> Inflater<R> {
    /// Create a decompressor over `reader` with default settings.
    pub fn new(reader: R) -> Self {
        Self::with_settings(reader, &Settings::default())
    }

    /// Create a decompressor over `reader` with explicit settings.
    ///
    /// # Panics
    ///
    /// Panics if the output buffer is smaller than
    /// [`MIN_OUTPUT_CAPACITY`] or its retention floor is below the 32768
    /// byte window — either would make back-references unresolvable.
    pub fn with_settings(reader: R, settings: &Settings) -> Self {
        let input = ByteInput::new(reader, &settings.input, ChecksumKind::None);
        Self::from_input(input, settings)
    }

    /// Create a decompressor over an already-open byte input (framing
    /// layers parse their headers first, then hand the input over).
    pub fn from_input(input: ByteInput<R>, settings: &Settings) -> Self {
        assert!(
            settings.output.max_size >= MIN_OUTPUT_CAPACITY,
            "output buffer must hold at least {} bytes for DEFLATE, got {}",
            MIN_OUTPUT_CAPACITY,
            settings.output.max_size
        );
        assert!(
            settings.output.min_size >= WINDOW_SIZE,
            "output retention floor must cover the {} byte window, got {}",
            WINDOW_SIZE,
            settings.output.min_size
        );
        Self {
            input,
            output: ByteOutput::new(&settings.output, settings.checksum),
            bits: BitState::new(),
            body: Body::None,
            last_block: false,
        }
    }

    /// The underlying byte input (for framing layers reading trailers).
    pub fn input_mut(&mut self) -> &mut ByteInput<R> {
        &mut self.input
    }

    /// Checksum over all consumed output; 0 when disabled.
    pub fn checksum_value(&self) -> u32 {
        self.output.checksum_value()
    }

    /// Whether the configured checksum computes anything.
    pub fn checksum_enabled(&self) -> bool {
        self.output.checksum_enabled()
    }

    /// Total decompressed bytes produced so far.
    pub fn total_written(&self) -> u64 {
        self.output.total_written()
    }

    /// The final block has been fully decoded.
    pub fn is_finished(&self) -> bool {
        matches!(self.body, Body::Finished)
    }

    /// Decode until the output buffer fills or the stream ends.
    ///
    /// Returns true while there is more work to do. After each call the
    /// caller should drain the output via [`consume`](Self::consume);
    /// a call made against a still-full buffer parks without progress
    /// until space appears.
    pub fn step(&mut self) -> Result<bool> {
        loop {
            let status = match &mut self.body {
                Body::Finished => return Ok(false),
                Body::None => None,
                Body::Stored { remaining } => {
                    Some(stored_some(&mut self.input, &mut self.output, remaining)?)
                }
                Body::Fixed { copy } => Some(coded_some(
                    &mut self.input,
                    &mut self.bits,
                    &mut self.output,
                    fixed_litlen_table(),
                    fixed_distance_table(),
                    copy,
                )?),
                Body::Dynamic {
                    litlen,
                    distance,
                    copy,
                } => Some(coded_some(
                    &mut self.input,
                    &mut self.bits,
                    &mut self.output,
                    litlen,
                    distance,
                    copy,
                )?),
            };
            match status {
                Some(BodyStatus::Paused) => return Ok(true),
                Some(BodyStatus::BlockDone) => self.body = Body::None,
                None => {}
            }

            if self.last_block {
                self.bits.return_unused(&mut self.input);
                self.output.done();
                self.body = Body::Finished;
                return Ok(false);
            }

            // Next block header
            let mut bits = BitReader::new(&mut self.input, &mut self.bits);
            self.last_block = bits.get_bits(1)? != 0;
            let block_type = bits.get_bits(2)?;
            match block_type {
                0b00 => {
                    // Stored blocks restart at a byte boundary
                    self.bits.return_unused(&mut self.input);
                    let len = self.input.get_u16()?;
                    let nlen = self.input.get_u16()?;
                    if len != !nlen {
                        return Err(FerrogzError::bad_stored(len, nlen));
                    }
                    self.body = Body::Stored {
                        remaining: len as usize,
                    };
                }
                0b01 => {
                    self.body = Body::Fixed {
                        copy: CopyState::default(),
                    };
                }
                0b10 => {
                    let mut bits = BitReader::new(&mut self.input, &mut self.bits);
                    let (litlen, distance) = read_dynamic_tables(&mut bits)?;
                    self.body = Body::Dynamic {
                        litlen,
                        distance,
                        copy: CopyState::default(),
                    };
                }
                other => return Err(FerrogzError::bad_block(other as u8)),
            }
        }
    }

    /// Drain the output produced so far; see [`ByteOutput::consume`].
    pub fn consume(&mut self, keep: usize) -> &[u8] {
        self.output.consume(keep)
    }

    /// Range-returning variant of [`consume`](Self::consume), for callers
    /// that need to touch the decoder again before reading the bytes.
    pub fn consume_range(&mut self, keep: usize) -> Range<usize> {
        self.output.consume_range(keep)
    }

    /// Resolve a range from [`consume_range`](Self::consume_range).
    pub fn output_slice(&self, range: Range<usize>) -> &[u8] {
        self.output.slice(range)
    }

    /// Run the decoder to completion, collecting all output.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        loop {
            let more = self.step()?;
            let range = self.output.consume_range(0);
            result.extend_from_slice(self.output.slice(range));
            if !more {
                return Ok(result);
            }
        }
    }
}

/// Copy stored-block bytes until done or the output fills.
fn stored_some<R: Read>(
    input: &mut ByteInput<R>,
    output: &mut ByteOutput,
    remaining: &mut usize,
) -> Result<BodyStatus> {
    while *remaining > 0 {
        let space = output.available();
        if space == 0 {
            return Ok(BodyStatus::Paused);
        }
        let want = (*remaining).min(space);
        let chunk = input.get_range(want)?;
        if chunk.is_empty() {
            return Err(FerrogzError::unexpected_end(*remaining));
        }
        let taken = chunk.len();
        output.add_bytes(chunk)?;
        *remaining -= taken;
    }
    Ok(BodyStatus::BlockDone)
}

/// Decode literal/length symbols until end-of-block or the output fills.
fn coded_some<R: Read>(
    input: &mut ByteInput<R>,
    bits: &mut BitState,
    output: &mut ByteOutput,
    litlen: &HuffmanTable,
    distance: &HuffmanTable,
    copy: &mut CopyState,
) -> Result<BodyStatus> {
    // A back-reference cut short by a full buffer resumes first
    if copy.length > 0 && copy.run(output)? {
        return Ok(BodyStatus::Paused);
    }

    loop {
        if output.available() == 0 {
            return Ok(BodyStatus::Paused);
        }
        let mut reader = BitReader::new(input, bits);
        let symbol = litlen.decode(&mut reader)?;
        if symbol < END_OF_BLOCK {
            output.add_byte(symbol as u8)?;
        } else if symbol == END_OF_BLOCK {
            return Ok(BodyStatus::BlockDone);
        } else {
            let length = read_length(symbol, &mut reader)?;
            let dist_symbol = distance.decode(&mut reader)?;
            let dist = read_distance(dist_symbol, &mut reader)?;
            if copy.begin(output, length, dist)? {
                return Ok(BodyStatus::Paused);
            }
        }
    }
}

/// Resolve a length symbol (257..=285) plus its extra bits.
fn read_length<R: Read>(symbol: u16, reader: &mut BitReader<'_, R>) -> Result<usize> {
    if symbol > 285 {
        return Err(FerrogzError::BadCode);
    }
    let index = (symbol - 257) as usize;
    let extra_bits = LENGTH_EXTRA_BITS[index];
    let extra = if extra_bits > 0 {
        reader.get_bits(u32::from(extra_bits))?
    } else {
        0
    };
    Ok(LENGTH_BASE[index] as usize + extra as usize)
}

/// Resolve a distance symbol (0..=29) plus its extra bits.
fn read_distance<R: Read>(symbol: u16, reader: &mut BitReader<'_, R>) -> Result<usize> {
    if symbol >= 30 {
        return Err(FerrogzError::BadCode);
    }
    let index = symbol as usize;
    let extra_bits = DISTANCE_EXTRA_BITS[index];
    let extra = if extra_bits > 0 {
        reader.get_bits(u32::from(extra_bits))?
    } else {
        0
    };
    Ok(DISTANCE_BASE[index] as usize + extra as usize)
}

/// Parse a dynamic block header into its two Huffman tables.
fn read_dynamic_tables<R: Read>(
    bits: &mut BitReader<'_, R>,
) -> Result<(HuffmanTable, HuffmanTable)> {
    let litlen_extra = bits.get_bits(5)? as usize;
    if litlen_extra > 29 {
        return Err(FerrogzError::bad_huffman(format!(
            "impossible literal/length code count {}",
            257 + litlen_extra
        )));
    }
    let litlen_count = 257 + litlen_extra;
    let distance_count = bits.get_bits(5)? as usize + 1;
    if distance_count > 30 {
        return Err(FerrogzError::bad_huffman(format!(
            "impossible distance code count {}",
            distance_count
        )));
    }
    let codelen_count = bits.get_bits(4)? as usize + 4;

    // The 19-symbol code-coding alphabet, transmitted in permuted order
    let mut codelen_lengths = [0u8; CODELEN_ALPHABET_SIZE];
    for &slot in CODE_LENGTH_ORDER.iter().take(codelen_count) {
        codelen_lengths[slot] = bits.get_bits(3)? as u8;
    }
    let codelen_table = HuffmanTable::from_lengths(&codelen_lengths)?;

    let lengths = read_code_lengths(bits, &codelen_table, litlen_count + distance_count)?;
    let litlen = HuffmanTable::from_lengths(&lengths[..litlen_count])?;
    let distance = HuffmanTable::from_lengths(&lengths[litlen_count..])?;
    Ok((litlen, distance))
}

/// Decode `count` code lengths through the run-length mini-language:
/// 0..=15 literal, 16 = repeat previous 3-6 times, 17 = zero run of 3-10,
/// 18 = zero run of 11-138.
fn read_code_lengths<R: Read>(
    bits: &mut BitReader<'_, R>,
    codelen_table: &HuffmanTable,
    count: usize,
) -> Result<Vec<u8>> {
    let mut lengths = vec![0u8; count];
    let mut filled = 0usize;
    while filled < count {
        let code = codelen_table.decode(bits)?;
        match code {
            0..=15 => {
                lengths[filled] = code as u8;
                filled += 1;
            }
            16 => {
                if filled == 0 {
                    return Err(FerrogzError::bad_huffman(
                        "length repeat with nothing to repeat",
                    ));
                }
                let run = bits.get_bits(2)? as usize + 3;
                if filled + run > count {
                    return Err(FerrogzError::bad_huffman("length repeat overruns the table"));
                }
                let previous = lengths[filled - 1];
                lengths[filled..filled + run].fill(previous);
                filled += run;
            }
            17 | 18 => {
                let run = if code == 17 {
                    bits.get_bits(3)? as usize + 3
                } else {
                    bits.get_bits(7)? as usize + 11
                };
                if filled + run > count {
                    return Err(FerrogzError::bad_huffman("zero run overruns the table"));
                }
                // Lengths start zeroed; just skip ahead
                filled += run;
            }
            _ => return Err(FerrogzError::BadCode),
        }
    }
    Ok(lengths)
}

/// Decompress a complete DEFLATE stream held in memory.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new(data).read_to_vec()
}
