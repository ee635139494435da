//! Inner (per-series) and outer (format) headers.
//!
//! Both headers are big-endian and written through the bit stream layer.
//!
//! Outer header (80 bytes, 84 with the scale field):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0  | 8 | magic (`"GORILLA"` in the low seven bytes) |
//! | 8  | 2 | version |
//! | 10 | 2 | header size (80 or 84) |
//! | 12 | 4 | sample count |
//! | 16 | 4 | compressed payload size in bytes |
//! | 20 | 4 | original size (`count * 16`) |
//! | 24 | 4 | CRC-32 of the payload |
//! | 28 | 8 | first timestamp |
//! | 36 | 4 | first delta (signed) |
//! | 40 | 8 | first value bits |
//! | 48 | 4 | timestamp sub-stream bits |
//! | 52 | 4 | value sub-stream bits |
//! | 56 | 4 | total payload bits |
//! | 60 | 8 | compression ratio (f64) |
//! | 68 | 8 | creation time (Unix seconds) |
//! | 76 | 4 | flags |
//! | 80 | 4 | scale decimals (84-byte header only) |
//!
//! The payload opens with the 32-byte inner header: count, first timestamp,
//! first value bits, first delta, and the two sub-stream bit lengths.

use serde::{Deserialize, Serialize};

use crate::bitbuffer::{BitReader, BitWriter, OutOfBits};
use crate::checksum::checksum;
use crate::error::{DecodeError, EncodeError, IntegrityWarning};

pub const MAGIC: u64 = 0x0047_4F52_494C_4C41;
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: u16 = 80;
pub const HEADER_SIZE_WITH_SCALE: u16 = 84;
pub const INNER_HEADER_BITS: usize = 256;
pub const INNER_HEADER_LEN: usize = INNER_HEADER_BITS / 8;
/// Uncompressed size assumed per sample: 8 bytes timestamp + 8 bytes value.
pub const BYTES_PER_SAMPLE: u32 = 16;

/// Transforms recorded in the outer header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Value preprocessing (scaling) was applied.
    pub const PREPROCESSED: Flags = Flags(0x1);
    /// Counter-delta transform was applied.
    pub const COUNTER_DELTA: Flags = Flags(0x2);

    pub const fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }
}

/// Per-series metadata at the start of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerHeader {
    pub count: u32,
    pub first_timestamp: i64,
    pub first_value_bits: u64,
    pub first_delta: i32,
    pub timestamp_bits: u32,
    pub value_bits: u32,
}

impl InnerHeader {
    pub fn write_to(&self, w: &mut BitWriter) {
        w.write(self.count as u64, 32);
        w.write(self.first_timestamp as u64, 64);
        w.write(self.first_value_bits, 64);
        w.write_signed(self.first_delta as i64, 32);
        w.write(self.timestamp_bits as u64, 32);
        w.write(self.value_bits as u64, 32);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BitWriter::with_capacity(INNER_HEADER_LEN);
        self.write_to(&mut w);
        w.pad_and_emit().bytes
    }

    pub fn read_from(r: &mut BitReader<'_>) -> Result<Self, OutOfBits> {
        Ok(Self {
            count: r.read(32)? as u32,
            first_timestamp: r.read(64)? as i64,
            first_value_bits: r.read(64)?,
            first_delta: r.read_signed(32)? as i32,
            timestamp_bits: r.read(32)? as u32,
            value_bits: r.read(32)? as u32,
        })
    }

    /// Parses the inner header at the start of `payload`.
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < INNER_HEADER_LEN {
            return Err(DecodeError::BufferTooShort {
                expected: INNER_HEADER_LEN,
                actual: payload.len(),
            });
        }
        let mut r = BitReader::new(payload, INNER_HEADER_BITS);
        Ok(Self::read_from(&mut r)?)
    }
}

/// Format wrapper around the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OuterHeader {
    pub version: u16,
    pub count: u32,
    pub compressed_size: u32,
    pub original_size: u32,
    pub checksum: u32,
    pub first_timestamp: i64,
    pub first_delta: i32,
    pub first_value_bits: u64,
    pub timestamp_bits: u32,
    pub value_bits: u32,
    pub total_bits: u32,
    pub compression_ratio: f64,
    pub creation_time: i64,
    pub flags: Flags,
    /// Present exactly when the header is 84 bytes long.
    pub scale_decimals: Option<u32>,
}

impl OuterHeader {
    /// Builds the header describing `payload`, whose first bytes are `inner`.
    pub fn for_payload(
        inner: &InnerHeader,
        payload: &[u8],
        flags: Flags,
        scale_decimals: Option<u32>,
        creation_time: i64,
    ) -> Result<Self, EncodeError> {
        let too_large = || EncodeError::PayloadTooLarge {
            bytes: payload.len(),
        };
        let compressed_size = u32::try_from(payload.len()).map_err(|_| too_large())?;
        let total_bits = compressed_size.checked_mul(8).ok_or_else(too_large)?;
        let original_size = inner
            .count
            .checked_mul(BYTES_PER_SAMPLE)
            .ok_or(EncodeError::TooManySamples {
                count: inner.count as usize,
            })?;
        let compression_ratio = if original_size > 0 {
            compressed_size as f64 / original_size as f64
        } else {
            0.0
        };

        Ok(Self {
            version: VERSION,
            count: inner.count,
            compressed_size,
            original_size,
            checksum: checksum(payload),
            first_timestamp: inner.first_timestamp,
            first_delta: inner.first_delta,
            first_value_bits: inner.first_value_bits,
            timestamp_bits: inner.timestamp_bits,
            value_bits: inner.value_bits,
            total_bits,
            compression_ratio,
            creation_time,
            flags,
            scale_decimals,
        })
    }

    pub fn header_size(&self) -> u16 {
        if self.scale_decimals.is_some() {
            HEADER_SIZE_WITH_SCALE
        } else {
            HEADER_SIZE
        }
    }

    pub fn write_to(&self, w: &mut BitWriter) {
        w.write(MAGIC, 64);
        w.write(self.version as u64, 16);
        w.write(self.header_size() as u64, 16);
        w.write(self.count as u64, 32);
        w.write(self.compressed_size as u64, 32);
        w.write(self.original_size as u64, 32);
        w.write(self.checksum as u64, 32);
        w.write(self.first_timestamp as u64, 64);
        w.write_signed(self.first_delta as i64, 32);
        w.write(self.first_value_bits, 64);
        w.write(self.timestamp_bits as u64, 32);
        w.write(self.value_bits as u64, 32);
        w.write(self.total_bits as u64, 32);
        w.write(self.compression_ratio.to_bits(), 64);
        w.write(self.creation_time as u64, 64);
        w.write(self.flags.bits() as u64, 32);
        if let Some(scale) = self.scale_decimals {
            w.write(scale as u64, 32);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BitWriter::with_capacity(self.header_size() as usize);
        self.write_to(&mut w);
        w.pad_and_emit().bytes
    }

    /// Parses and structurally validates the outer header at the start of
    /// `bytes`. The checksum is not verified here.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let min = HEADER_SIZE as usize;
        if bytes.len() < min {
            return Err(DecodeError::BufferTooShort {
                expected: min,
                actual: bytes.len(),
            });
        }

        let mut r = BitReader::from_bytes(bytes);
        let magic = r.read(64)?;
        if magic != MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }
        let version = r.read(16)? as u16;
        if version > VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let header_size = r.read(16)? as u16;
        if header_size != HEADER_SIZE && header_size != HEADER_SIZE_WITH_SCALE {
            return Err(DecodeError::InvalidHeaderSize(header_size));
        }
        if bytes.len() < header_size as usize {
            return Err(DecodeError::BufferTooShort {
                expected: header_size as usize,
                actual: bytes.len(),
            });
        }

        let header = Self {
            version,
            count: r.read(32)? as u32,
            compressed_size: r.read(32)? as u32,
            original_size: r.read(32)? as u32,
            checksum: r.read(32)? as u32,
            first_timestamp: r.read(64)? as i64,
            first_delta: r.read_signed(32)? as i32,
            first_value_bits: r.read(64)?,
            timestamp_bits: r.read(32)? as u32,
            value_bits: r.read(32)? as u32,
            total_bits: r.read(32)? as u32,
            compression_ratio: f64::from_bits(r.read(64)?),
            creation_time: r.read(64)? as i64,
            flags: Flags::from_bits(r.read(32)? as u32),
            scale_decimals: if header_size == HEADER_SIZE_WITH_SCALE {
                Some(r.read(32)? as u32)
            } else {
                None
            },
        };

        let available = bytes.len();
        if header_size as usize + header.compressed_size as usize > available {
            return Err(DecodeError::PayloadOutOfBounds {
                header_size: header_size as usize,
                compressed_size: header.compressed_size as usize,
                available,
            });
        }
        Ok(header)
    }

    /// Returns the payload slice of a buffer this header was parsed from.
    pub fn payload<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        let start = self.header_size() as usize;
        let end = start + self.compressed_size as usize;
        &bytes[start.min(bytes.len())..end.min(bytes.len())]
    }

    /// Compares the fields duplicated in the inner header.
    pub fn compare_inner(&self, inner: &InnerHeader) -> Vec<IntegrityWarning> {
        let pairs: [(&'static str, i128, i128); 6] = [
            ("count", self.count.into(), inner.count.into()),
            (
                "first_timestamp",
                self.first_timestamp.into(),
                inner.first_timestamp.into(),
            ),
            ("first_delta", self.first_delta.into(), inner.first_delta.into()),
            (
                "first_value_bits",
                self.first_value_bits.into(),
                inner.first_value_bits.into(),
            ),
            (
                "timestamp_bits",
                self.timestamp_bits.into(),
                inner.timestamp_bits.into(),
            ),
            ("value_bits", self.value_bits.into(), inner.value_bits.into()),
        ];
        pairs
            .into_iter()
            .filter(|(_, outer, inner)| outer != inner)
            .map(|(field, outer, inner)| IntegrityWarning::HeaderMismatch { field, outer, inner })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner() -> InnerHeader {
        InnerHeader {
            count: 3,
            first_timestamp: -5,
            first_value_bits: 1.5f64.to_bits(),
            first_delta: -60,
            timestamp_bits: 77,
            value_bits: 130,
        }
    }

    fn outer(scale: Option<u32>) -> OuterHeader {
        let payload = vec![0xAB; 60];
        OuterHeader::for_payload(&inner(), &payload, Flags::PREPROCESSED, scale, 1_700_000_000)
            .unwrap()
    }

    fn with_payload(header: &OuterHeader) -> Vec<u8> {
        let mut bytes = header.to_bytes();
        bytes.extend(std::iter::repeat(0xAB).take(header.compressed_size as usize));
        bytes
    }

    #[test]
    fn test_inner_header_layout() {
        let bytes = inner().to_bytes();
        assert_eq!(bytes.len(), INNER_HEADER_LEN);
        assert_eq!(&bytes[0..4], &3u32.to_be_bytes());
        assert_eq!(&bytes[4..12], &(-5i64).to_be_bytes());
        assert_eq!(&bytes[12..20], &1.5f64.to_bits().to_be_bytes());
        assert_eq!(&bytes[20..24], &(-60i32).to_be_bytes());
        assert_eq!(&bytes[24..28], &77u32.to_be_bytes());
        assert_eq!(&bytes[28..32], &130u32.to_be_bytes());
        assert_eq!(InnerHeader::parse(&bytes), Ok(inner()));
    }

    #[test]
    fn test_inner_header_too_short() {
        let bytes = inner().to_bytes();
        assert_eq!(
            InnerHeader::parse(&bytes[..31]),
            Err(DecodeError::BufferTooShort {
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn test_outer_header_layout() {
        let header = outer(None);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[0..8], &[0, b'G', b'O', b'R', b'I', b'L', b'L', b'A']);
        assert_eq!(&bytes[8..10], &[0, 1]);
        assert_eq!(&bytes[10..12], &[0, 80]);
        assert_eq!(&bytes[12..16], &3u32.to_be_bytes());
        assert_eq!(&bytes[16..20], &60u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &48u32.to_be_bytes());
        assert_eq!(&bytes[24..28], &checksum(&[0xAB; 60]).to_be_bytes());
        assert_eq!(&bytes[36..40], &(-60i32).to_be_bytes());
        assert_eq!(&bytes[56..60], &480u32.to_be_bytes());
        assert_eq!(&bytes[60..68], &(60.0f64 / 48.0).to_bits().to_be_bytes());
        assert_eq!(&bytes[68..76], &1_700_000_000i64.to_be_bytes());
        assert_eq!(&bytes[76..80], &1u32.to_be_bytes());
    }

    #[test]
    fn test_outer_header_with_scale() {
        let header = outer(Some(2));
        let bytes = with_payload(&header);
        assert_eq!(header.header_size(), 84);
        assert_eq!(&bytes[10..12], &[0, 84]);
        assert_eq!(&bytes[80..84], &2u32.to_be_bytes());

        let parsed = OuterHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.payload(&bytes), &[0xAB; 60][..]);
    }

    #[test]
    fn test_outer_header_roundtrip() {
        let header = outer(None);
        let bytes = with_payload(&header);
        assert_eq!(OuterHeader::parse(&bytes).unwrap(), header);
        assert!(header.compare_inner(&inner()).is_empty());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = with_payload(&outer(None));
        bytes[1] = b'X';
        assert!(matches!(
            OuterHeader::parse(&bytes),
            Err(DecodeError::BadMagic(_))
        ));
    }

    #[test]
    fn test_rejects_future_version() {
        let mut bytes = with_payload(&outer(None));
        bytes[9] = 2;
        assert_eq!(
            OuterHeader::parse(&bytes),
            Err(DecodeError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn test_rejects_header_size() {
        let mut bytes = with_payload(&outer(None));
        bytes[11] = 81;
        assert_eq!(
            OuterHeader::parse(&bytes),
            Err(DecodeError::InvalidHeaderSize(81))
        );
    }

    #[test]
    fn test_rejects_short_buffers() {
        let bytes = with_payload(&outer(Some(0)));
        assert_eq!(
            OuterHeader::parse(&bytes[..79]),
            Err(DecodeError::BufferTooShort {
                expected: 80,
                actual: 79
            })
        );
        assert_eq!(
            OuterHeader::parse(&bytes[..82]),
            Err(DecodeError::BufferTooShort {
                expected: 84,
                actual: 82
            })
        );
        assert_eq!(
            OuterHeader::parse(&bytes[..100]),
            Err(DecodeError::PayloadOutOfBounds {
                header_size: 84,
                compressed_size: 60,
                available: 100
            })
        );
    }

    #[test]
    fn test_compare_inner_reports_mismatches() {
        let header = outer(None);
        let mut other = inner();
        other.first_delta = 60;
        other.value_bits = 1;
        let warnings = header.compare_inner(&other);
        assert_eq!(
            warnings,
            vec![
                IntegrityWarning::HeaderMismatch {
                    field: "first_delta",
                    outer: -60,
                    inner: 60
                },
                IntegrityWarning::HeaderMismatch {
                    field: "value_bits",
                    outer: 130,
                    inner: 1
                },
            ]
        );
    }

    #[test]
    fn test_flags() {
        let mut flags = Flags::NONE;
        assert!(!flags.contains(Flags::PREPROCESSED));
        flags.insert(Flags::PREPROCESSED);
        flags.insert(Flags::COUNTER_DELTA);
        assert_eq!(flags.bits(), 3);
        assert!(flags.contains(Flags::COUNTER_DELTA));
        assert_eq!(Flags::from_bits(2), Flags::COUNTER_DELTA);
    }
}
