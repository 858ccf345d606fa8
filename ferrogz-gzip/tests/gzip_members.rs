//! End-to-end tests against real gzip members and write/read round trips.

use ferrogz_core::config::Settings;
use ferrogz_core::error::FerrogzError;
use ferrogz_gzip::{
    compress, compress_with_info, decompress, CompressionHint, GzipDecoder, GzipEncoder,
    GzipFileInfo, OperatingSystem,
};
use std::io::Read;

/// A 53-byte member produced by the gzip tool: filename
/// "hello hello hello hello", fixed-Huffman body, valid trailer.
const HELLO_MEMBER: [u8; 53] = [
    0x1F, 0x8B, 0x08, 0x08, 0x82, 0x52, 0xC7, 0x62, 0x00, 0x03, 0x68, 0x65, 0x6C, 0x6C, 0x6F,
    0x20, 0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x68, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x68, 0x65,
    0x6C, 0x6C, 0x6F, 0x00, 0xCB, 0x48, 0xCD, 0xC9, 0xC9, 0x57, 0xC8, 0x40, 0x27, 0xB9, 0x00,
    0x00, 0x88, 0x59, 0x0B, 0x18, 0x00, 0x00, 0x00,
];

/// A 42-byte member holding several short lines ("multiline").
const MULTILINE_MEMBER: [u8; 42] = [
    0x1F, 0x8B, 0x08, 0x08, 0xD5, 0x99, 0x5B, 0x63, 0x00, 0x03, 0x6D, 0x75, 0x6C, 0x74, 0x69,
    0x6C, 0x69, 0x6E, 0x65, 0x00, 0x4B, 0xE4, 0x4A, 0x4C, 0xE2, 0x4A, 0xE4, 0x02, 0xE2, 0x44,
    0x2E, 0x20, 0x0D, 0x00, 0xAF, 0xA7, 0xD4, 0x0F, 0x0F, 0x00, 0x00, 0x00,
];

/// Hands out at most `chunk` bytes per read.
struct ChunkedReader<'a> {
    data: &'a [u8],
    position: usize,
    chunk: usize,
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

#[test]
fn parses_reference_member() {
    let mut decoder = GzipDecoder::new(HELLO_MEMBER.as_slice()).unwrap();

    let info = decoder.info();
    assert_eq!(info.operating_system, OperatingSystem::Unix);
    assert_eq!(info.hint, CompressionHint::Unspecified);
    assert_eq!(info.name.as_deref(), Some("hello hello hello hello"));
    assert_eq!(info.comment, None);
    assert!(!info.probably_text);
    assert_eq!(info.extra, None);
    assert_eq!(info.modification_time, 0x62C75282);

    let decompressed = decoder.read_to_vec().unwrap();
    assert_eq!(decompressed, b"hello hello hello hello\n");
    assert!(decoder.is_finished());
}

#[test]
fn decodes_reference_member_through_tiny_reads() {
    for chunk in [1, 2, 7] {
        let reader = ChunkedReader {
            data: &HELLO_MEMBER,
            position: 0,
            chunk,
        };
        let mut decoder = GzipDecoder::new(reader).unwrap();
        assert_eq!(
            decoder.read_to_vec().unwrap(),
            b"hello hello hello hello\n",
            "chunk size {}",
            chunk
        );
    }
}

#[test]
fn decodes_multiline_member() {
    let mut decoder = GzipDecoder::new(MULTILINE_MEMBER.as_slice()).unwrap();
    assert_eq!(decoder.info().name.as_deref(), Some("multiline"));
    let decompressed = decoder.read_to_vec().unwrap();
    assert_eq!(decompressed, b"a\nab\na\nb\naa\n\na\n");
}

#[test]
fn one_shot_decompress() {
    assert_eq!(
        decompress(&HELLO_MEMBER).unwrap(),
        b"hello hello hello hello\n"
    );
}

#[test]
fn rejects_corrupted_trailer_crc() {
    let mut member = HELLO_MEMBER;
    // Flip a bit in the stored CRC-32
    member[46] ^= 0x01;
    let err = decompress(&member).unwrap_err();
    assert!(matches!(err, FerrogzError::BodyCrcMismatch { .. }));
}

#[test]
fn rejects_corrupted_trailer_size() {
    let mut member = HELLO_MEMBER;
    // Last four bytes are ISIZE
    member[49] ^= 0x01;
    let err = decompress(&member).unwrap_err();
    assert!(matches!(err, FerrogzError::SizeMismatch { .. }));
}

#[test]
fn skips_verification_when_disabled() {
    let mut member = HELLO_MEMBER;
    member[46] ^= 0x01;

    let mut settings = Settings::default();
    settings.verify_checksum = false;
    let mut decoder = GzipDecoder::with_settings(member.as_slice(), &settings).unwrap();
    assert_eq!(decoder.read_to_vec().unwrap(), b"hello hello hello hello\n");
}

#[test]
fn rejects_truncated_member() {
    let err = decompress(&HELLO_MEMBER[..40]).unwrap_err();
    assert!(matches!(err, FerrogzError::UnexpectedEnd { .. }));
}

#[test]
fn write_then_read_roundtrip() {
    let data = b"Hahahahahaha!\nMwahahahahaha!";
    let member = compress_with_info(data, GzipFileInfo::with_name("secret")).unwrap();

    let mut decoder = GzipDecoder::new(member.as_slice()).unwrap();
    assert_eq!(decoder.info().name.as_deref(), Some("secret"));
    assert!(decoder.info().header_crc.is_some());
    assert_eq!(decoder.read_to_vec().unwrap(), data);
}

#[test]
fn roundtrip_with_all_header_fields() {
    let data = b"payload payload payload";
    let info = GzipFileInfo {
        modification_time: 1_700_000_000,
        operating_system: OperatingSystem::Unix,
        hint: CompressionHint::Fastest,
        name: Some("field-test.txt".to_string()),
        comment: Some("every optional field set".to_string()),
        extra: Some(vec![0xAB; 10]),
        probably_text: true,
        header_crc: None,
    };
    let member = compress_with_info(data, info).unwrap();

    let mut decoder = GzipDecoder::new(member.as_slice()).unwrap();
    let parsed = decoder.info().clone();
    assert_eq!(parsed.modification_time, 1_700_000_000);
    assert_eq!(parsed.operating_system, OperatingSystem::Unix);
    assert_eq!(parsed.hint, CompressionHint::Fastest);
    assert_eq!(parsed.name.as_deref(), Some("field-test.txt"));
    assert_eq!(parsed.comment.as_deref(), Some("every optional field set"));
    assert_eq!(parsed.extra.as_deref(), Some(&[0xABu8; 10][..]));
    assert!(parsed.probably_text);
    assert_eq!(decoder.read_to_vec().unwrap(), data);
}

#[test]
fn roundtrip_empty_payload() {
    let member = compress(b"").unwrap();
    assert_eq!(decompress(&member).unwrap(), b"");
}

#[test]
fn roundtrip_large_payload_in_streaming_batches() {
    let mut data = Vec::new();
    let mut seed = 0x9E3779B97F4A7C15u64;
    while data.len() < 500_000 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        if seed & 1 == 0 {
            data.extend_from_slice(b"the same words over and over, ");
        } else {
            data.push((seed >> 32) as u8);
        }
    }

    // Compress through the streaming interface
    let mut encoder = GzipEncoder::new(data.as_slice(), GzipFileInfo::new());
    let mut member = Vec::new();
    while let Some(batch) = encoder.read_some().unwrap() {
        member.push(batch.to_vec());
    }
    let member: Vec<u8> = member.concat();

    // Decompress through the streaming interface with batching
    let mut decoder = GzipDecoder::new(member.as_slice()).unwrap();
    let mut collected = Vec::new();
    while let Some(batch) = decoder.read_some(0).unwrap() {
        collected.extend_from_slice(batch);
    }
    assert_eq!(collected, data);
}

#[test]
fn isize_reflects_total_input() {
    let data = vec![7u8; 10_000];
    let member = compress(&data).unwrap();
    let trailer = &member[member.len() - 4..];
    assert_eq!(u32::from_le_bytes(trailer.try_into().unwrap()), 10_000);
}
