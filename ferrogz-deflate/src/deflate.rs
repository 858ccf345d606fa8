//! DEFLATE compression (RFC 1951).
//!
//! [`Deflater`] pulls raw bytes through the duplication finder, collects
//! the resulting tokens into sections, and emits each section as one
//! DEFLATE block. Per section it prices all three block types it can
//! produce — stored (only possible while the section is pure literals),
//! fixed Huffman, and dynamic Huffman with per-section optimal tables —
//! and writes the cheapest. The final section carries BFINAL; when the
//! input ends exactly on a section boundary a lone end-of-block in a fixed
//! block terminates the stream.
//!
//! Like the decoder, the compressor is caller-pulled: every
//! [`step`](Deflater::step) produces at most one block into the output
//! buffer, which the caller drains between calls.

use ferrogz_core::bits::BitWriter;
use ferrogz_core::config::{ChecksumKind, OutputOptions, Settings};
use ferrogz_core::error::Result;
use ferrogz_core::input::ByteInput;
use ferrogz_core::output::ByteOutput;
use std::io::Read;
use std::ops::Range;

use crate::huffman::{build_code_lengths, CodeTable, END_OF_BLOCK};
use crate::lz77::{Deduplicator, Token};
use crate::tables::{
    distance_to_code, fixed_distance_codes, fixed_litlen_codes, fixed_litlen_lengths,
    length_to_code, CODE_LENGTH_ORDER,
};

/// Upper bound on the compressed size of one section, used to size the
/// output buffer: at worst ~6 bytes per token plus a dynamic header.
fn worst_case_block_size(tokens_per_section: usize) -> usize {
    tokens_per_section * 6 + 800
}

/// Streaming DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater<R> {
    input: ByteInput<R>,
    finder: Deduplicator,
    tokens: Vec<Token>,
    section_limit: usize,
    bits: BitWriter,
    output: ByteOutput,
    input_done: bool,
    finished: bool,
}

impl<R: Read> Deflater<R> {
    /// Create a compressor over `reader` with default settings.
    pub fn new(reader: R) -> Self {
        Self::with_settings(reader, &Settings::default())
    }

    /// Create a compressor over `reader` with explicit settings.
    ///
    /// The input checksum (for gzip trailers) follows
    /// `settings.checksum`; the output buffer carries none, compressed
    /// bytes are not checksummed.
    ///
    /// # Panics
    ///
    /// Panics if the output buffer cannot hold the largest block a
    /// section of `settings.tokens.max_size` tokens can produce.
    pub fn with_settings(reader: R, settings: &Settings) -> Self {
        assert!(
            settings.output.max_size >= worst_case_block_size(settings.tokens.max_size),
            "output buffer ({}) cannot hold a worst-case section of {} tokens ({} bytes)",
            settings.output.max_size,
            settings.tokens.max_size,
            worst_case_block_size(settings.tokens.max_size)
        );
        // Compressed output is never back-referenced, so no retention floor
        let output_options = OutputOptions {
            max_size: settings.output.max_size,
            min_size: 0,
        };
        Self {
            input: ByteInput::new(reader, &settings.input, settings.checksum),
            finder: Deduplicator::new(),
            tokens: Vec::with_capacity(settings.tokens.max_size),
            section_limit: settings.tokens.max_size,
            bits: BitWriter::new(),
            output: ByteOutput::new(&output_options, ChecksumKind::None),
            input_done: false,
            finished: false,
        }
    }

    /// Checksum over all raw input read so far; 0 when disabled.
    pub fn checksum_value(&self) -> u32 {
        self.input.checksum_value()
    }

    /// Total raw bytes read so far.
    pub fn total_read(&self) -> u64 {
        self.input.total_read()
    }

    /// The final block has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Collect one section of tokens and emit it as a block.
    ///
    /// Returns true while there is more work to do; the caller drains the
    /// output via [`consume`](Self::consume) between calls.
    pub fn step(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        // Reclaim the space of batches the caller has already taken
        self.output.discard_consumed();

        if !self.input_done
            && self
                .finder
                .deduplicate_some(&mut self.input, &mut self.tokens, self.section_limit)?
        {
            self.input_done = true;
        }

        if self.tokens.len() >= self.section_limit || self.input_done {
            let last = self.input_done;
            write_block(&self.tokens, last, &mut self.bits, &mut self.output)?;
            self.tokens.clear();
            if last {
                self.bits.finish(&mut self.output)?;
                self.output.done();
                self.finished = true;
            }
        }

        Ok(!self.finished)
    }

    /// Drain the compressed bytes produced so far.
    pub fn consume(&mut self) -> &[u8] {
        self.output.consume(0)
    }

    /// Range-returning variant of [`consume`](Self::consume).
    pub fn consume_range(&mut self) -> Range<usize> {
        self.output.consume_range(0)
    }

    /// Resolve a range from [`consume_range`](Self::consume_range).
    pub fn output_slice(&self, range: Range<usize>) -> &[u8] {
        self.output.slice(range)
    }

    /// Run the compressor to completion, collecting the whole stream.
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

/// One run-length op for transmitting code lengths.
#[derive(Debug, Clone, Copy)]
struct LengthOp {
    symbol: u8,
    extra: u8,
    extra_bits: u8,
}

/// Everything priced and prebuilt for one section.
struct SectionPlan {
    litlen_lengths: Vec<u8>,
    distance_lengths: Vec<u8>,
    codelen_lengths: Vec<u8>,
    ops: Vec<LengthOp>,
    litlen_count: usize,
    distance_count: usize,
    codelen_count: usize,
    static_cost: u64,
    dynamic_cost: u64,
    stored_cost: Option<u64>,
}

/// Emit one section of tokens as the cheapest block type.
fn write_block(
    tokens: &[Token],
    last: bool,
    bits: &mut BitWriter,
    output: &mut ByteOutput,
) -> Result<()> {
    let plan = plan_section(tokens);

    let stored_wins = plan
        .stored_cost
        .is_some_and(|cost| cost < plan.static_cost && cost < plan.dynamic_cost);
    if stored_wins {
        return write_stored_block(tokens, last, bits, output);
    }
    if plan.dynamic_cost < plan.static_cost {
        write_dynamic_block(tokens, last, &plan, bits, output)
    } else {
        write_static_block(tokens, last, bits, output)
    }
}

/// Frequency pass plus table construction and pricing for one section.
fn plan_section(tokens: &[Token]) -> SectionPlan {
    let mut litlen_freq = [0u32; 286];
    let mut distance_freq = [0u32; 30];
    let mut extra_bits_total = 0u64;
    let mut all_literals = true;

    for token in tokens {
        match *token {
            Token::Literal(byte) => litlen_freq[byte as usize] += 1,
            Token::Match { length, distance } => {
                all_literals = false;
                let (code, length_extra, _) = length_to_code(length);
                litlen_freq[code as usize] += 1;
                let (dist_code, dist_extra, _) = distance_to_code(distance);
                distance_freq[dist_code as usize] += 1;
                extra_bits_total += u64::from(length_extra) + u64::from(dist_extra);
            }
        }
    }
    litlen_freq[END_OF_BLOCK as usize] += 1;

    // Static cost: fixed code lengths plus five bits per distance code
    let static_lengths = fixed_litlen_lengths();
    let mut static_cost = 3 + extra_bits_total;
    for (symbol, &freq) in litlen_freq.iter().enumerate() {
        static_cost += u64::from(freq) * u64::from(static_lengths[symbol]);
    }
    static_cost += distance_freq.iter().map(|&f| u64::from(f) * 5).sum::<u64>();

    // Dynamic tables: a complete code needs at least two symbols
    let mut litlen_build = litlen_freq;
    ensure_two_symbols(&mut litlen_build);
    let litlen_lengths = build_code_lengths(&litlen_build, 15);

    let distance_used = distance_freq.iter().filter(|&&f| f > 0).count();
    let distance_lengths = if distance_used == 0 {
        // One zero-length distance code signals an all-literal block
        vec![0u8; 30]
    } else {
        let mut distance_build = distance_freq;
        ensure_two_symbols(&mut distance_build);
        build_code_lengths(&distance_build, 15)
    };

    let litlen_count = last_used_index(&litlen_lengths).map_or(257, |i| i + 1).max(257);
    let distance_count = last_used_index(&distance_lengths).map_or(1, |i| i + 1);

    // Run-length encode the combined length vector and price its own code
    let mut combined = Vec::with_capacity(litlen_count + distance_count);
    combined.extend_from_slice(&litlen_lengths[..litlen_count]);
    combined.extend_from_slice(&distance_lengths[..distance_count]);
    let ops = run_length_encode(&combined);

    let mut codelen_freq = [0u32; 19];
    for op in &ops {
        codelen_freq[op.symbol as usize] += 1;
    }
    ensure_two_symbols(&mut codelen_freq);
    let codelen_lengths = build_code_lengths(&codelen_freq, 7);

    let codelen_count = CODE_LENGTH_ORDER
        .iter()
        .rposition(|&slot| codelen_lengths[slot] != 0)
        .map_or(4, |i| i + 1)
        .max(4);

    let mut dynamic_cost = 3 + 14 + 3 * codelen_count as u64 + extra_bits_total;
    for op in &ops {
        dynamic_cost += u64::from(codelen_lengths[op.symbol as usize]) + u64::from(op.extra_bits);
    }
    for (symbol, &freq) in litlen_freq.iter().enumerate() {
        dynamic_cost += u64::from(freq) * u64::from(litlen_lengths[symbol]);
    }
    for (symbol, &freq) in distance_freq.iter().enumerate() {
        dynamic_cost += u64::from(freq) * u64::from(distance_lengths[symbol]);
    }

    // Stored is only priceable while the raw bytes equal the literals
    let stored_cost = (all_literals && tokens.len() <= usize::from(u16::MAX))
        .then(|| 3 + 7 + 32 + 8 * tokens.len() as u64);

    SectionPlan {
        litlen_lengths,
        distance_lengths,
        codelen_lengths,
        ops,
        litlen_count,
        distance_count,
        codelen_count,
        static_cost,
        dynamic_cost,
        stored_cost,
    }
}

/// Bump zero-frequency symbols until at least two are in use, so the
/// resulting code is complete.
fn ensure_two_symbols(freqs: &mut [u32]) {
    let mut used = freqs.iter().filter(|&&f| f > 0).count();
    let mut symbol = 0;
    while used < 2 {
        if freqs[symbol] == 0 {
            freqs[symbol] = 1;
            used += 1;
        }
        symbol += 1;
    }
}

fn last_used_index(lengths: &[u8]) -> Option<usize> {
    lengths.iter().rposition(|&len| len != 0)
}

/// Encode a length vector through the run-length mini-language.
fn run_length_encode(lengths: &[u8]) -> Vec<LengthOp> {
    let mut ops = Vec::new();
    let mut index = 0;
    while index < lengths.len() {
        let value = lengths[index];
        let mut run = 1;
        while index + run < lengths.len() && lengths[index + run] == value {
            run += 1;
        }
        index += run;

        if value == 0 {
            while run >= 11 {
                let taking = run.min(138);
                ops.push(LengthOp {
                    symbol: 18,
                    extra: (taking - 11) as u8,
                    extra_bits: 7,
                });
                run -= taking;
            }
            if run >= 3 {
                ops.push(LengthOp {
                    symbol: 17,
                    extra: (run - 3) as u8,
                    extra_bits: 3,
                });
                run = 0;
            }
            for _ in 0..run {
                ops.push(LengthOp {
                    symbol: 0,
                    extra: 0,
                    extra_bits: 0,
                });
            }
        } else {
            ops.push(LengthOp {
                symbol: value,
                extra: 0,
                extra_bits: 0,
            });
            run -= 1;
            while run >= 3 {
                let taking = run.min(6);
                ops.push(LengthOp {
                    symbol: 16,
                    extra: (taking - 3) as u8,
                    extra_bits: 2,
                });
                run -= taking;
            }
            for _ in 0..run {
                ops.push(LengthOp {
                    symbol: value,
                    extra: 0,
                    extra_bits: 0,
                });
            }
        }
    }
    ops
}

/// Emit a stored block from an all-literal section.
fn write_stored_block(
    tokens: &[Token],
    last: bool,
    bits: &mut BitWriter,
    output: &mut ByteOutput,
) -> Result<()> {
    bits.add_bits(output, u32::from(last), 1)?;
    bits.add_bits(output, 0b00, 2)?;
    bits.align_to_byte(output)?;

    let len = tokens.len() as u16;
    output.add_bytes(&len.to_le_bytes())?;
    output.add_bytes(&(!len).to_le_bytes())?;
    for token in tokens {
        match token {
            Token::Literal(byte) => output.add_byte(*byte)?,
            Token::Match { .. } => unreachable!("stored sections are pure literals"),
        }
    }
    Ok(())
}

/// Emit a fixed-Huffman block.
fn write_static_block(
    tokens: &[Token],
    last: bool,
    bits: &mut BitWriter,
    output: &mut ByteOutput,
) -> Result<()> {
    bits.add_bits(output, u32::from(last), 1)?;
    bits.add_bits(output, 0b01, 2)?;
    let litlen = fixed_litlen_codes();
    let distance = fixed_distance_codes();
    write_tokens(tokens, litlen, distance, bits, output)?;
    litlen.write(END_OF_BLOCK as usize, bits, output)
}

/// Emit a dynamic-Huffman block: header counts, the code-coding table in
/// permuted order, both run-length encoded length vectors, then the body.
fn write_dynamic_block(
    tokens: &[Token],
    last: bool,
    plan: &SectionPlan,
    bits: &mut BitWriter,
    output: &mut ByteOutput,
) -> Result<()> {
    bits.add_bits(output, u32::from(last), 1)?;
    bits.add_bits(output, 0b10, 2)?;
    bits.add_bits(output, (plan.litlen_count - 257) as u32, 5)?;
    bits.add_bits(output, (plan.distance_count - 1) as u32, 5)?;
    bits.add_bits(output, (plan.codelen_count - 4) as u32, 4)?;

    for &slot in CODE_LENGTH_ORDER.iter().take(plan.codelen_count) {
        bits.add_bits(output, u32::from(plan.codelen_lengths[slot]), 3)?;
    }

    let codelen_codes = CodeTable::from_lengths(&plan.codelen_lengths);
    for op in &plan.ops {
        codelen_codes.write(op.symbol as usize, bits, output)?;
        if op.extra_bits > 0 {
            bits.add_bits(output, u32::from(op.extra), u32::from(op.extra_bits))?;
        }
    }

    let litlen = CodeTable::from_lengths(&plan.litlen_lengths);
    let distance = CodeTable::from_lengths(&plan.distance_lengths);
    write_tokens(tokens, &litlen, &distance, bits, output)?;
    litlen.write(END_OF_BLOCK as usize, bits, output)
}

/// Emit the token bodies; extra bits follow each code immediately.
fn write_tokens(
    tokens: &[Token],
    litlen: &CodeTable,
    distance: &CodeTable,
    bits: &mut BitWriter,
    output: &mut ByteOutput,
) -> Result<()> {
    for token in tokens {
        match *token {
            Token::Literal(byte) => litlen.write(byte as usize, bits, output)?,
            Token::Match {
                length,
                distance: dist,
            } => {
                let (code, extra_bits, extra) = length_to_code(length);
                litlen.write(code as usize, bits, output)?;
                if extra_bits > 0 {
                    bits.add_bits(output, u32::from(extra), u32::from(extra_bits))?;
                }
                let (dist_code, dist_extra_bits, dist_extra) = distance_to_code(dist);
                distance.write(dist_code as usize, bits, output)?;
                if dist_extra_bits > 0 {
                    bits.add_bits(output, u32::from(dist_extra), u32::from(dist_extra_bits))?;
                }
            }
        }
    }
    Ok(())
}

/// Compress a complete buffer into a DEFLATE stream.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    Deflater::new(data).read_to_vec()
}
