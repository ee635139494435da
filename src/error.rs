//! Error and warning types for encoding and decoding.

use std::fmt;

use thiserror::Error;

use crate::bitbuffer::OutOfBits;

/// Error returned when a series cannot be encoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// Sample list has the wrong shape (arity, non-numeric fields).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Option record is malformed or out of range.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A first delta or delta-of-delta does not fit the 32-bit signed bucket.
    #[error("timestamp delta {delta} at sample {index} does not fit in 32 signed bits")]
    DeltaOverflow { index: usize, delta: i128 },

    /// The sample count does not fit the header's 32-bit size fields.
    #[error("too many samples for one series: {count}")]
    TooManySamples { count: usize },

    /// The packed payload does not fit the header's 32-bit size fields.
    #[error("compressed payload too large: {bytes} bytes")]
    PayloadTooLarge { bytes: usize },
}

/// Error returned when a buffer cannot be decoded. All variants are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("invalid magic number {0:#018x}")]
    BadMagic(u64),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("invalid header size {0}, expected 80 or 84")]
    InvalidHeaderSize(u16),

    #[error("compressed payload of {compressed_size} bytes after a {header_size}-byte header exceeds buffer of {available} bytes")]
    PayloadOutOfBounds {
        header_size: usize,
        compressed_size: usize,
        available: usize,
    },

    #[error("declared sub-stream lengths ({timestamp_bits} + {value_bits} bits) exceed the {available_bits}-bit payload")]
    SubstreamOutOfBounds {
        timestamp_bits: usize,
        value_bits: usize,
        available_bits: usize,
    },

    #[error("invalid value window: {leading} leading zeros with {meaningful} meaningful bits")]
    InvalidValueWindow { leading: u8, meaningful: u8 },

    #[error("truncated sub-stream: {0}")]
    Truncated(#[from] OutOfBits),
}

/// A non-fatal inconsistency found while decoding.
///
/// Warnings are reported next to the decoded samples; they never stop decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    /// The payload checksum differs from the one stored in the outer header.
    ChecksumMismatch { stored: u32, computed: u32 },
    /// A field duplicated in both headers holds different values.
    HeaderMismatch {
        field: &'static str,
        outer: i128,
        inner: i128,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { stored, computed } => {
                write!(f, "checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")
            }
            Self::HeaderMismatch { field, outer, inner } => {
                write!(f, "header field {field} differs: outer {outer}, inner {inner}")
            }
        }
    }
}
