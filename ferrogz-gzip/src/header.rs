//! gzip member header parsing and emission (RFC 1952).
//!
//! The header is read field by field from a [`ByteInput`]; every byte is
//! also fed through a local CRC-32 so the optional FHCRC check (the low 16
//! bits of that CRC) can be verified exactly as the writer computed it.
//! The writer always emits FHCRC.

use ferrogz_core::crc::Crc32;
use ferrogz_core::error::{FerrogzError, Result};
use ferrogz_core::input::ByteInput;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

/// gzip magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// gzip compression method byte for DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// gzip header flag bits.
pub mod flags {
    /// Content is probably text.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC-16 present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original file name present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
}

/// Operating system that created the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingSystem {
    /// Unix-like (OS byte 3).
    Unix,
    /// Windows (OS byte 0).
    Windows,
    /// Anything else.
    #[default]
    Other,
}

impl OperatingSystem {
    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Windows,
            3 => Self::Unix,
            _ => Self::Other,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Windows => 0,
            Self::Unix => 3,
            Self::Other => 255,
        }
    }
}

/// The compression-effort hint carried in the XFL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionHint {
    /// XFL 4: the densest (slowest) setting was used.
    Densest,
    /// XFL 8: the fastest setting was used.
    Fastest,
    /// No hint.
    #[default]
    Unspecified,
}

impl CompressionHint {
    fn from_byte(byte: u8) -> Self {
        match byte {
            4 => Self::Densest,
            8 => Self::Fastest,
            _ => Self::Unspecified,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Densest => 4,
            Self::Fastest => 8,
            Self::Unspecified => 0,
        }
    }
}

/// File information carried in a gzip member header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipFileInfo {
    /// Modification time as Unix epoch seconds (0 = unavailable).
    pub modification_time: u32,
    /// Creating operating system.
    pub operating_system: OperatingSystem,
    /// Compression-effort hint from the XFL byte.
    pub hint: CompressionHint,
    /// Original file name, if present.
    pub name: Option<String>,
    /// Comment, if present.
    pub comment: Option<String>,
    /// Raw extra-field blob, if present.
    pub extra: Option<Vec<u8>>,
    /// The FTEXT flag: content is probably text.
    pub probably_text: bool,
    /// Stored header CRC-16, if the member carried one.
    pub header_crc: Option<u16>,
}

impl GzipFileInfo {
    /// File info with the modification time set to the current epoch
    /// seconds, as the writer's default.
    pub fn new() -> Self {
        Self {
            modification_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0),
            ..Self::default()
        }
    }

    /// File info carrying an original file name.
    pub fn with_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new()
        }
    }

    /// Parse a member header from the byte input.
    ///
    /// Every header byte is fed through a CRC-32; when the member carries
    /// FHCRC and `verify` is on, the low 16 bits must match.
    pub fn parse<R: Read>(input: &mut ByteInput<R>, verify: bool) -> Result<Self> {
        let mut crc = Crc32::new();
        let mut info = Self::default();

        let magic = [input.get_u8()?, input.get_u8()?];
        if magic != GZIP_MAGIC {
            return Err(FerrogzError::bad_magic(magic));
        }
        let method = input.get_u8()?;
        if method != CM_DEFLATE {
            return Err(FerrogzError::bad_method(method));
        }
        crc.update(&magic);
        crc.update(&[method]);

        let member_flags = input.get_u8()?;
        crc.update(&[member_flags]);

        info.modification_time = input.get_u32()?;
        crc.update(&info.modification_time.to_le_bytes());

        let xfl = input.get_u8()?;
        crc.update(&[xfl]);
        info.hint = CompressionHint::from_byte(xfl);

        let os = input.get_u8()?;
        crc.update(&[os]);
        info.operating_system = OperatingSystem::from_byte(os);

        if member_flags & flags::FEXTRA != 0 {
            let extra_len = input.get_u16()?;
            crc.update(&extra_len.to_le_bytes());
            let mut extra = Vec::with_capacity(extra_len as usize);
            while extra.len() < extra_len as usize {
                let chunk = input.get_range(extra_len as usize - extra.len())?;
                if chunk.is_empty() {
                    return Err(FerrogzError::unexpected_end(
                        extra_len as usize - extra.len(),
                    ));
                }
                crc.update(chunk);
                extra.extend_from_slice(chunk);
            }
            info.extra = Some(extra);
        }
        if member_flags & flags::FNAME != 0 {
            info.name = Some(read_null_terminated(input, &mut crc)?);
        }
        if member_flags & flags::FCOMMENT != 0 {
            info.comment = Some(read_null_terminated(input, &mut crc)?);
        }
        info.probably_text = member_flags & flags::FTEXT != 0;

        if member_flags & flags::FHCRC != 0 {
            let computed = crc.value() as u16;
            let stored = input.get_u16()?;
            info.header_crc = Some(stored);
            if verify && stored != computed {
                return Err(FerrogzError::header_crc_mismatch(stored, computed));
            }
        }

        Ok(info)
    }

    /// Serialize the header, FHCRC included. Appends to `out`; bytes
    /// already in the buffer are left alone and do not enter the CRC.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let header_start = out.len();
        let mut member_flags = flags::FHCRC;
        if self.probably_text {
            member_flags |= flags::FTEXT;
        }
        if self.extra.is_some() {
            member_flags |= flags::FEXTRA;
        }
        if self.name.is_some() {
            member_flags |= flags::FNAME;
        }
        if self.comment.is_some() {
            member_flags |= flags::FCOMMENT;
        }

        out.extend_from_slice(&GZIP_MAGIC);
        out.push(CM_DEFLATE);
        out.push(member_flags);
        out.extend_from_slice(&self.modification_time.to_le_bytes());
        out.push(self.hint.to_byte());
        out.push(self.operating_system.to_byte());

        if let Some(extra) = &self.extra {
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(extra);
        }
        if let Some(name) = &self.name {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        if let Some(comment) = &self.comment {
            out.extend_from_slice(comment.as_bytes());
            out.push(0);
        }

        let crc = Crc32::compute(&out[header_start..]) as u16;
        out.extend_from_slice(&crc.to_le_bytes());
    }
}

/// Read a NUL-terminated string, feeding every byte (terminator included)
/// through the header checksum.
fn read_null_terminated<R: Read>(input: &mut ByteInput<R>, crc: &mut Crc32) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let byte = input.get_u8()?;
        crc.update(&[byte]);
        if byte == 0 {
            break;
        }
        bytes.push(byte);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrogz_core::config::{ChecksumKind, InputOptions};

    fn input_over(data: &[u8]) -> ByteInput<&[u8]> {
        ByteInput::new(data, &InputOptions::default(), ChecksumKind::None)
    }

    #[test]
    fn test_minimal_header_roundtrip() {
        let info = GzipFileInfo {
            modification_time: 1_657_000_000,
            operating_system: OperatingSystem::Unix,
            ..GzipFileInfo::default()
        };
        let mut bytes = Vec::new();
        info.write_to(&mut bytes);

        let mut input = input_over(&bytes);
        let parsed = GzipFileInfo::parse(&mut input, true).unwrap();
        assert_eq!(parsed.modification_time, info.modification_time);
        assert_eq!(parsed.operating_system, OperatingSystem::Unix);
        assert_eq!(parsed.hint, CompressionHint::Unspecified);
        assert!(parsed.name.is_none());
        assert!(parsed.header_crc.is_some());
    }

    #[test]
    fn test_full_header_roundtrip() {
        let info = GzipFileInfo {
            modification_time: 42,
            operating_system: OperatingSystem::Windows,
            hint: CompressionHint::Densest,
            name: Some("data.bin".to_string()),
            comment: Some("a comment".to_string()),
            extra: Some(vec![1, 2, 3, 4]),
            probably_text: true,
            header_crc: None,
        };
        let mut bytes = Vec::new();
        info.write_to(&mut bytes);

        let mut input = input_over(&bytes);
        let parsed = GzipFileInfo::parse(&mut input, true).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("data.bin"));
        assert_eq!(parsed.comment.as_deref(), Some("a comment"));
        assert_eq!(parsed.extra.as_deref(), Some(&[1u8, 2, 3, 4][..]));
        assert!(parsed.probably_text);
        assert_eq!(parsed.hint, CompressionHint::Densest);
        assert_eq!(parsed.operating_system, OperatingSystem::Windows);
    }

    #[test]
    fn test_write_appends_to_existing_buffer() {
        // The header CRC must cover only the appended header bytes, not
        // whatever the caller already had in the buffer
        let info = GzipFileInfo {
            modification_time: 7,
            name: Some("appended".to_string()),
            ..GzipFileInfo::default()
        };
        let mut clean = Vec::new();
        info.write_to(&mut clean);

        let mut prefixed = b"already here".to_vec();
        info.write_to(&mut prefixed);
        assert_eq!(&prefixed[12..], &clean[..]);

        let mut input = input_over(&clean);
        let parsed = GzipFileInfo::parse(&mut input, true).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("appended"));
    }

    #[test]
    fn test_bad_magic() {
        let mut input = input_over(&[0x50, 0x4B, 0x03, 0x04]);
        assert!(matches!(
            GzipFileInfo::parse(&mut input, true),
            Err(FerrogzError::BadMagic { found: [0x50, 0x4B] })
        ));
    }

    #[test]
    fn test_bad_method() {
        let mut input = input_over(&[0x1F, 0x8B, 0x07, 0x00]);
        assert!(matches!(
            GzipFileInfo::parse(&mut input, true),
            Err(FerrogzError::BadMethod { method: 7 })
        ));
    }

    #[test]
    fn test_corrupted_header_crc() {
        let info = GzipFileInfo::with_name("x");
        let mut bytes = Vec::new();
        info.write_to(&mut bytes);
        let crc_at = bytes.len() - 2;
        bytes[crc_at] ^= 0xFF;

        let mut input = input_over(&bytes);
        assert!(matches!(
            GzipFileInfo::parse(&mut input, true),
            Err(FerrogzError::HeaderCrcMismatch { .. })
        ));

        // Without verification the mismatch is recorded, not raised
        let mut input = input_over(&bytes);
        let parsed = GzipFileInfo::parse(&mut input, false).unwrap();
        assert!(parsed.header_crc.is_some());
    }

    #[test]
    fn test_reference_header() {
        // Header of a real gzip member: FNAME, mtime, Unix
        let bytes = [
            0x1F, 0x8B, 0x08, 0x08, 0x82, 0x52, 0xC7, 0x62, 0x00, 0x03, b'h', b'i', 0x00,
        ];
        let mut input = input_over(&bytes);
        let parsed = GzipFileInfo::parse(&mut input, true).unwrap();
        assert_eq!(parsed.modification_time, 0x62C75282);
        assert_eq!(parsed.operating_system, OperatingSystem::Unix);
        assert_eq!(parsed.hint, CompressionHint::Unspecified);
        assert_eq!(parsed.name.as_deref(), Some("hi"));
        assert!(!parsed.probably_text);
        assert!(parsed.header_crc.is_none());
    }
}
