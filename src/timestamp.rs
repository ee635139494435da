//! Delta-of-delta timestamp codec.
//!
//! The first timestamp is stored verbatim in 64 bits. The delta to the second
//! timestamp and every following delta-of-delta use the same variable-length
//! code:
//!
//! | value               | code                 | bits |
//! |---------------------|----------------------|------|
//! | 0                   | `0`                  | 1    |
//! | [-63, 64]           | `10` + 7-bit value   | 9    |
//! | [-255, 256]         | `110` + 9-bit value  | 12   |
//! | [-2047, 2048]       | `1110` + 12-bit value| 16   |
//! | any other i32       | `1111` + 32-bit value| 36   |

use crate::bitbuffer::{BitReader, BitWriter, OutOfBits, PackedBits};
use crate::error::{DecodeError, EncodeError};

/// Result of encoding a timestamp column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTimestamps {
    /// The packed sub-stream.
    pub bits: PackedBits,
    pub first_timestamp: i64,
    /// `ts[1] - ts[0]`, or 0 for fewer than two samples.
    pub first_delta: i32,
    pub count: usize,
}

/// Streaming delta-of-delta encoder for the timestamp column.
#[derive(Debug, Clone, Default)]
pub struct TimestampEncoder {
    buf: BitWriter,
    count: usize,
    first_timestamp: i64,
    first_delta: i32,
    prev_timestamp: i64,
    prev_delta: i128,
}

impl TimestampEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next timestamp.
    ///
    /// Fails when the first delta or a delta-of-delta does not fit the
    /// 32-bit bucket.
    pub fn push(&mut self, timestamp: i64) -> Result<(), EncodeError> {
        match self.count {
            0 => {
                self.buf.write(timestamp as u64, 64);
                self.first_timestamp = timestamp;
            }
            1 => {
                let delta = timestamp as i128 - self.prev_timestamp as i128;
                let first_delta = fit_bucket(delta, self.count)?;
                write_delta(&mut self.buf, first_delta);
                self.first_delta = first_delta;
                self.prev_delta = delta;
            }
            _ => {
                let delta = timestamp as i128 - self.prev_timestamp as i128;
                let dod = fit_bucket(delta - self.prev_delta, self.count)?;
                write_delta(&mut self.buf, dod);
                self.prev_delta = delta;
            }
        }
        self.prev_timestamp = timestamp;
        self.count += 1;
        Ok(())
    }

    pub fn finish(self) -> EncodedTimestamps {
        EncodedTimestamps {
            bits: self.buf.pad_and_emit(),
            first_timestamp: self.first_timestamp,
            first_delta: self.first_delta,
            count: self.count,
        }
    }
}

/// Encodes a whole timestamp column.
pub fn encode_timestamps(timestamps: &[i64]) -> Result<EncodedTimestamps, EncodeError> {
    let mut encoder = TimestampEncoder::new();
    for &ts in timestamps {
        encoder.push(ts)?;
    }
    Ok(encoder.finish())
}

fn fit_bucket(delta: i128, index: usize) -> Result<i32, EncodeError> {
    i32::try_from(delta).map_err(|_| EncodeError::DeltaOverflow { index, delta })
}

/// Writes a first delta or delta-of-delta using the variable-length code.
fn write_delta(buf: &mut BitWriter, d: i32) {
    let d = d as i64;
    if d == 0 {
        buf.write_bit(false);
    } else if (-63..=64).contains(&d) {
        buf.write(0b10, 2);
        buf.write_signed(d, 7);
    } else if (-255..=256).contains(&d) {
        buf.write(0b110, 3);
        buf.write_signed(d, 9);
    } else if (-2047..=2048).contains(&d) {
        buf.write(0b1110, 4);
        buf.write_signed(d, 12);
    } else {
        buf.write(0b1111, 4);
        buf.write_signed(d, 32);
    }
}

/// Reads one variable-length delta.
fn read_delta(reader: &mut BitReader<'_>) -> Result<i64, OutOfBits> {
    if !reader.read_bit()? {
        return Ok(0);
    }
    if !reader.read_bit()? {
        return read_bucket(reader, 7);
    }
    if !reader.read_bit()? {
        return read_bucket(reader, 9);
    }
    if !reader.read_bit()? {
        return read_bucket(reader, 12);
    }
    reader.read_signed(32)
}

/// The short buckets span `[-(2^(w-1) - 1), 2^(w-1)]`: the all-negative
/// extreme is never written, so that pattern stands for the upper bound.
fn read_bucket(reader: &mut BitReader<'_>, width: u8) -> Result<i64, OutOfBits> {
    let value = reader.read_signed(width)?;
    let upper = 1i64 << (width - 1);
    Ok(if value == -upper { upper } else { value })
}

/// Lazily decodes `count` timestamps from a reader positioned at the start
/// of the timestamp sub-stream.
#[derive(Debug)]
pub struct TimestampDecoder<'a> {
    reader: BitReader<'a>,
    count: usize,
    emitted: usize,
    prev_timestamp: i64,
    prev_delta: i64,
    done: bool,
}

impl<'a> TimestampDecoder<'a> {
    pub fn new(reader: BitReader<'a>, count: usize) -> Self {
        Self {
            reader,
            count,
            emitted: 0,
            prev_timestamp: 0,
            prev_delta: 0,
            done: false,
        }
    }

    fn decode_next(&mut self) -> Result<i64, OutOfBits> {
        let ts = match self.emitted {
            0 => self.reader.read(64)? as i64,
            1 => {
                self.prev_delta = read_delta(&mut self.reader)?;
                self.prev_timestamp.wrapping_add(self.prev_delta)
            }
            _ => {
                let dod = read_delta(&mut self.reader)?;
                self.prev_delta = self.prev_delta.wrapping_add(dod);
                self.prev_timestamp.wrapping_add(self.prev_delta)
            }
        };
        self.prev_timestamp = ts;
        Ok(ts)
    }
}

impl Iterator for TimestampDecoder<'_> {
    type Item = Result<i64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.emitted >= self.count {
            return None;
        }
        match self.decode_next() {
            Ok(ts) => {
                self.emitted += 1;
                Some(Ok(ts))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Decodes `count` timestamps.
pub fn decode_timestamps(reader: BitReader<'_>, count: usize) -> Result<Vec<i64>, DecodeError> {
    // Every timestamp after the first costs at least one bit.
    let mut out = Vec::with_capacity(count.min(reader.remaining().saturating_sub(63)));
    for ts in TimestampDecoder::new(reader, count) {
        out.push(ts?);
    }
    Ok(out)
}
