//! LZ77-style duplication finder.
//!
//! The finder walks the input buffer and replaces repeated byte runs with
//! `(length, distance)` back-references. Instead of hash chains it keeps
//! `K = 6` parallel hash tables: table `k` is keyed by the first `k + 3`
//! bytes at a position and stores only the most recent position with that
//! prefix. Longer prefixes are probed first; the longest verified match of
//! at least 3 bytes wins, otherwise a literal is emitted.
//!
//! Two properties keep the index cheap and predictable:
//!
//! - positions are relative to the input buffer, and when the buffer
//!   slides (detected through `position_start`) every stored position is
//!   shifted by the same amount — entries that fall off the front become
//!   stale and read as non-matches;
//! - only the tables whose probe did *not* match are updated with the
//!   current position, so a table keyed by a still-repeating prefix keeps
//!   pointing at the oldest (and therefore longest-reaching) occurrence.
//!
//! The search is deliberately greedy: no lazy matching, one probe per
//! table per position. The compression ratio trails zlib slightly and the
//! output is still fully conforming DEFLATE.

use ferrogz_core::config::WINDOW_SIZE;
use ferrogz_core::error::Result;
use ferrogz_core::input::ByteInput;
use std::io::Read;

/// Minimum back-reference length DEFLATE can encode.
pub const MIN_MATCH: usize = 3;

/// Maximum back-reference length DEFLATE can encode.
pub const MAX_MATCH: usize = 258;

/// Number of parallel prefix tables (prefixes of 3..=8 bytes).
const PREFIX_COUNT: usize = 6;

/// log2 of each prefix table's size.
const HASH_BITS: u32 = 15;

/// Entries per prefix table.
const HASH_SIZE: usize = 1 << HASH_BITS;

/// Refill the input once fewer unread bytes than this remain, so matches
/// are never cut short by the buffer edge (only by end of input).
const PROBE_AHEAD: usize = MAX_MATCH + 8;

/// Byte masks selecting a prefix of 3..=8 bytes from a little-endian load.
const PREFIX_MASKS: [u64; PREFIX_COUNT] = [
    0x0000_0000_00FF_FFFF,
    0x0000_0000_FFFF_FFFF,
    0x0000_00FF_FFFF_FFFF,
    0x0000_FFFF_FFFF_FFFF,
    0x00FF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
];

/// A token produced by the duplication finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

/// Rolling multi-prefix hash index over the input window.
#[derive(Debug)]
pub struct Deduplicator {
    /// Table `k` maps a hash of the `k + 3` byte prefix to the most recent
    /// buffer-relative position; negative means empty or slid out.
    heads: Vec<Vec<i32>>,
    /// `position_start` of the input when the index was last adjusted.
    last_position_start: u64,
}

impl Deduplicator {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            heads: (0..PREFIX_COUNT).map(|_| vec![-1i32; HASH_SIZE]).collect(),
            last_position_start: 0,
        }
    }

    /// Forget all indexed positions.
    pub fn reset(&mut self) {
        for table in &mut self.heads {
            table.fill(-1);
        }
        self.last_position_start = 0;
    }

    #[inline(always)]
    fn hash(prefix: u64, table: usize) -> usize {
        let masked = prefix & PREFIX_MASKS[table];
        (masked.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> (64 - HASH_BITS)) as usize
    }

    /// Shift every stored position after the input buffer slid.
    fn adjust_for_slide(&mut self, position_start: u64) {
        let delta = position_start - self.last_position_start;
        if delta == 0 {
            return;
        }
        self.last_position_start = position_start;
        for table in &mut self.heads {
            for entry in table.iter_mut() {
                let moved = i64::from(*entry) - delta as i64;
                *entry = if *entry < 0 || moved < 0 { -1 } else { moved as i32 };
            }
        }
    }

    /// Tokenize input until `limit` tokens are collected or the input is
    /// exhausted. Returns true when the input ended.
    pub fn deduplicate_some<R: Read>(
        &mut self,
        input: &mut ByteInput<R>,
        tokens: &mut Vec<Token>,
        limit: usize,
    ) -> Result<bool> {
        loop {
            if tokens.len() >= limit {
                return Ok(false);
            }

            // Keep the probe window full so only end of input shortens it
            if input.remaining() < PROBE_AHEAD && !input.end_of_input() {
                while input.remaining() < PROBE_AHEAD {
                    if input.refill(true)? == 0 {
                        break;
                    }
                }
                self.adjust_for_slide(input.position_start());
            }

            let buffer = input.buffered();
            let position = input.position();
            let remaining = buffer.len() - position;
            if remaining == 0 {
                return Ok(true);
            }

            // Load up to 8 lookahead bytes, zero-padded near the end
            let ahead = remaining.min(8);
            let mut prefix_bytes = [0u8; 8];
            prefix_bytes[..ahead].copy_from_slice(&buffer[position..position + ahead]);
            let prefix = u64::from_le_bytes(prefix_bytes);

            let mut best_length = 0usize;
            let mut best_distance = 0usize;
            let mut hashes = [0usize; PREFIX_COUNT];
            let mut probed = [false; PREFIX_COUNT];
            let mut matched = [false; PREFIX_COUNT];

            for table in (0..PREFIX_COUNT).rev() {
                let prefix_len = table + MIN_MATCH;
                if remaining < prefix_len {
                    continue;
                }
                let hash = Self::hash(prefix, table);
                hashes[table] = hash;
                probed[table] = true;

                let candidate = self.heads[table][hash];
                if candidate < 0 {
                    continue;
                }
                let candidate = candidate as usize;
                if candidate >= position || position - candidate > WINDOW_SIZE {
                    continue;
                }

                let limit_len = remaining.min(MAX_MATCH);
                let length = buffer[candidate..candidate + limit_len]
                    .iter()
                    .zip(&buffer[position..position + limit_len])
                    .take_while(|(a, b)| a == b)
                    .count();
                if length >= prefix_len {
                    matched[table] = true;
                }
                if length >= MIN_MATCH && length > best_length {
                    best_length = length;
                    best_distance = position - candidate;
                }
            }

            let literal = buffer[position];

            // Tables whose prefix still matched keep their older, further
            // reaching entry
            for table in 0..PREFIX_COUNT {
                if probed[table] && !matched[table] {
                    self.heads[table][hashes[table]] = position as i32;
                }
            }

            if best_length >= MIN_MATCH {
                tokens.push(Token::Match {
                    length: best_length as u16,
                    distance: best_distance as u16,
                });
                input.advance(best_length);
            } else {
                tokens.push(Token::Literal(literal));
                input.advance(1);
            }
        }
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrogz_core::config::{ChecksumKind, InputOptions};

    fn tokenize(data: &[u8]) -> Vec<Token> {
        tokenize_with(data, &InputOptions::default())
    }

    fn tokenize_with(data: &[u8], options: &InputOptions) -> Vec<Token> {
        let mut input = ByteInput::new(data, options, ChecksumKind::None);
        let mut finder = Deduplicator::new();
        let mut tokens = Vec::new();
        loop {
            if finder
                .deduplicate_some(&mut input, &mut tokens, usize::MAX)
                .unwrap()
            {
                return tokens;
            }
        }
    }

    fn expand(tokens: &[Token]) -> Vec<u8> {
        let mut out = Vec::new();
        for token in tokens {
            match *token {
                Token::Literal(byte) => out.push(byte),
                Token::Match { length, distance } => {
                    for _ in 0..length {
                        let byte = out[out.len() - distance as usize];
                        out.push(byte);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_all_distinct_bytes_stay_literals() {
        let tokens = tokenize(b"abcdefgh");
        assert_eq!(tokens.len(), 8);
        assert!(tokens.iter().all(|t| matches!(t, Token::Literal(_))));
    }

    #[test]
    fn test_hello_tokenization() {
        // Six literals, then the period-6 repetition as one match
        let tokens = tokenize(b"hello hello hello hello\n");
        assert_eq!(
            tokens,
            vec![
                Token::Literal(b'h'),
                Token::Literal(b'e'),
                Token::Literal(b'l'),
                Token::Literal(b'l'),
                Token::Literal(b'o'),
                Token::Literal(b' '),
                Token::Match {
                    length: 17,
                    distance: 6
                },
                Token::Literal(b'\n'),
            ]
        );
    }

    #[test]
    fn test_expansion_reproduces_input() {
        let samples: [&[u8]; 5] = [
            b"abaabbbabaababbaababaaaabaaabbbbbaa",
            b"The main interesting thing about it is the deflate algorithm.",
            b"BAACCEACAAAEBAACEABAEDEACEAACAAECCAADAEAACAEADAA",
            b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            b"xy",
        ];
        for sample in samples {
            let tokens = tokenize(sample);
            assert_eq!(expand(&tokens), sample, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_finds_duplications() {
        let tokens = tokenize(b"abaabbbabaababbaababaaaabaaabbbbbaa");
        let matches = tokens
            .iter()
            .filter(|t| matches!(t, Token::Match { .. }))
            .count();
        assert!(matches >= 4, "expected several matches, got {}", matches);
    }

    #[test]
    fn test_match_length_caps_at_258() {
        let data = vec![b'z'; 600];
        let tokens = tokenize(&data);
        assert_eq!(expand(&tokens), data);
        for token in &tokens {
            if let Token::Match { length, .. } = token {
                assert!(*length <= MAX_MATCH as u16);
            }
        }
    }

    #[test]
    fn test_window_slide_keeps_tokens_valid() {
        // A repeating phrase over several buffer slides
        let phrase = b"ferrous oxide never sleeps; ";
        let mut data = Vec::new();
        while data.len() < 200_000 {
            data.extend_from_slice(phrase);
        }
        let options = InputOptions {
            max_size: 40_000,
            min_size: WINDOW_SIZE,
            look_ahead: 8,
        };
        let tokens = tokenize_with(&data, &options);
        assert_eq!(expand(&tokens), data);
        // Distances must never exceed what the decoder window can resolve
        for token in &tokens {
            if let Token::Match { distance, .. } = token {
                assert!((*distance as usize) <= WINDOW_SIZE);
            }
        }
        // The repetition must actually be found
        let literal_count = tokens
            .iter()
            .filter(|t| matches!(t, Token::Literal(_)))
            .count();
        assert!(literal_count < data.len() / 10);
    }

    #[test]
    fn test_batch_limit_pauses_and_resumes() {
        let data = b"mississippi mississippi mississippi";
        let mut input = ByteInput::new(
            data.as_slice(),
            &InputOptions::default(),
            ChecksumKind::None,
        );
        let mut finder = Deduplicator::new();
        let mut tokens = Vec::new();
        let mut exhausted = false;
        while !exhausted {
            let before = tokens.len();
            exhausted = finder.deduplicate_some(&mut input, &mut tokens, before + 3).unwrap();
            assert!(tokens.len() <= before + 3);
        }
        assert_eq!(expand(&tokens), data);
    }
}
