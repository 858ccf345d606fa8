//! End-to-end tests for the DEFLATE codec: reference streams produced by
//! other implementations, round trips, and buffer-size independence.

use ferrogz_core::config::{
    ChecksumKind, InputOptions, OutputOptions, Settings, TokenOptions, MIN_OUTPUT_CAPACITY,
    WINDOW_SIZE,
};
use ferrogz_deflate::{deflate, inflate, Deflater, Inflater};
use std::io::Read;

/// Hands out at most `chunk` bytes per read, to exercise partial refills.
struct ChunkedReader<'a> {
    data: &'a [u8],
    position: usize,
    chunk: usize,
}

impl<'a> ChunkedReader<'a> {
    fn new(data: &'a [u8], chunk: usize) -> Self {
        Self {
            data,
            position: 0,
            chunk,
        }
    }
}

impl Read for ChunkedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let giving = (self.data.len() - self.position)
            .min(buf.len())
            .min(self.chunk);
        buf[..giving].copy_from_slice(&self.data[self.position..self.position + giving]);
        self.position += giving;
        Ok(giving)
    }
}

/// Deterministic mixed-entropy test corpus.
fn mixed_corpus(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x0123456789ABCDEF;
    let phrase = b"a rolling stone gathers no moss; ";
    while data.len() < size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        if seed & 3 == 0 {
            // A burst of noise
            for _ in 0..((seed >> 8) & 0x3F) {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                data.push((seed >> 32) as u8);
            }
        } else {
            data.extend_from_slice(phrase);
        }
    }
    data.truncate(size);
    data
}

#[test]
fn decodes_stored_reference_stream() {
    let stream = [
        0x01, 0x12, 0x00, 0xED, 0xFF, 0xC4, 0x8D, 0xC3, 0xB3, 0xC5, 0xA1, 0xC3, 0xA9, 0xC5, 0x88,
        0xC3, 0xA1, 0xC4, 0x8F, 0xC3, 0xB4, 0xC5, 0xBE,
    ];
    let output = inflate(&stream).unwrap();
    assert_eq!(std::str::from_utf8(&output).unwrap(), "čóšéňáďôž");
}

#[test]
fn decodes_fixed_reference_stream() {
    let stream = [
        0xCB, 0x48, 0xCD, 0xC9, 0xC9, 0x57, 0xC8, 0x40, 0x27, 0xB9, 0x00,
    ];
    assert_eq!(inflate(&stream).unwrap(), b"hello hello hello hello\n");
}

#[test]
fn decodes_dynamic_reference_stream() {
    let stream = [
        0x1D, 0xC6, 0x49, 0x01, 0x00, 0x00, 0x10, 0x40, 0xC0, 0xAC, 0xA3, 0x7F, 0x88, 0x3D, 0x3C,
        0x20, 0x2A, 0x97, 0x9D, 0x37, 0x5E, 0x1D, 0x0C,
    ];
    assert_eq!(
        inflate(&stream).unwrap(),
        b"abaabbbabaababbaababaaaabaaabbbbbaa"
    );
}

#[test]
fn reference_streams_survive_tiny_input_reads() {
    let stream = [
        0xCB, 0x48, 0xCD, 0xC9, 0xC9, 0x57, 0xC8, 0x40, 0x27, 0xB9, 0x00,
    ];
    for chunk in [1, 2, 3, 5] {
        let mut inflater = Inflater::new(ChunkedReader::new(&stream, chunk));
        assert_eq!(
            inflater.read_to_vec().unwrap(),
            b"hello hello hello hello\n",
            "chunk size {}",
            chunk
        );
    }
}

#[test]
fn seed_text_roundtrips() {
    let text = b"BAACCEACAAAEBAACEABAEDEACEAACAAECCAADAEAACAEADAA";
    let compressed = deflate(text).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), text);
}

#[test]
fn roundtrip_across_entropy_mix() {
    for size in [0usize, 1, 2, 100, 4096, 70_000, 250_000] {
        let data = mixed_corpus(size);
        let compressed = deflate(&data).unwrap();
        assert_eq!(inflate(&compressed).unwrap(), data, "size {}", size);
    }
}

#[test]
fn output_buffer_size_does_not_change_the_bytes() {
    // Invariant: decoding with any legal output buffer yields the same
    // stream of bytes. The large input forces many pauses at the small
    // buffer size.
    let data = mixed_corpus(400_000);
    let compressed = deflate(&data).unwrap();

    let small = Settings {
        input: InputOptions {
            max_size: 33_000,
            min_size: 0,
            look_ahead: 8,
        },
        output: OutputOptions {
            max_size: MIN_OUTPUT_CAPACITY,
            min_size: WINDOW_SIZE,
        },
        tokens: TokenOptions::default(),
        checksum: ChecksumKind::None,
        verify_checksum: false,
    };

    let mut with_small = Inflater::with_settings(compressed.as_slice(), &small);
    let small_result = with_small.read_to_vec().unwrap();

    let mut with_default = Inflater::new(compressed.as_slice());
    let default_result = with_default.read_to_vec().unwrap();

    assert_eq!(small_result, data);
    assert_eq!(default_result, data);
}

#[test]
fn consume_keep_retains_requested_tail() {
    let data = mixed_corpus(150_000);
    let compressed = deflate(&data).unwrap();

    // Drive the decoder manually, always asking to keep 16 bytes of the
    // previous batch in front of the next one
    let mut inflater = Inflater::new(compressed.as_slice());
    let mut collected: Vec<u8> = Vec::new();
    loop {
        let more = inflater.step().unwrap();
        let range = inflater.consume_range(16);
        let start = range.start;
        let batch = inflater.output_slice(range);
        if start >= 16 {
            let kept = inflater.output_slice(start - 16..start);
            let tail_start = collected.len().saturating_sub(16);
            assert_eq!(kept, &collected[tail_start..]);
        }
        collected.extend_from_slice(inflater.output_slice(start..start + batch.len()));
        if !more {
            break;
        }
    }
    assert_eq!(collected, data);
}

#[test]
fn compressor_checksum_covers_all_input() {
    use ferrogz_core::crc::Crc32;

    let data = mixed_corpus(50_000);
    let mut deflater = Deflater::new(data.as_slice());
    let compressed = deflater.read_to_vec().unwrap();
    assert_eq!(deflater.checksum_value(), Crc32::compute(&data));
    assert_eq!(deflater.total_read(), data.len() as u64);
    assert_eq!(inflate(&compressed).unwrap(), data);
}

#[test]
fn compression_pays_off_on_repetitive_data() {
    let data = b"hello hello hello hello\n".repeat(4_000);
    let compressed = deflate(&data).unwrap();
    assert!(compressed.len() < data.len() / 10);
    assert_eq!(inflate(&compressed).unwrap(), data);
}

#[test]
fn window_spanning_matches_resolve() {
    // Matches at the full 32768-byte distance
    let mut data = vec![0x55u8; WINDOW_SIZE];
    let marker = b"spanning-marker";
    data[..marker.len()].copy_from_slice(marker);
    data.extend_from_slice(marker);
    let compressed = deflate(&data).unwrap();
    assert_eq!(inflate(&compressed).unwrap(), data);
}
