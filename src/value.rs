//! XOR-window value codec.
//!
//! The first value's raw bits are stored verbatim. Each following value is
//! XORed with its predecessor:
//!
//! - `0`: identical to the previous value.
//! - `10` + meaningful bits: the XOR fits the remembered window.
//! - `11` + 5-bit leading zeros + 6-bit (meaningful - 1) + meaningful bits:
//!   a new window, which becomes the remembered one.
//!
//! The remembered window starts out covering all 64 bits.

use crate::bitbuffer::{bitmask, BitReader, BitWriter, PackedBits};
use crate::error::DecodeError;

/// Largest leading-zero count the 5-bit field can carry.
const MAX_LEADING: u8 = 31;

/// Leading/trailing zero counts bounding the meaningful bits of an XOR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Window {
    leading: u8,
    trailing: u8,
}

impl Window {
    #[inline]
    fn meaningful(self) -> u8 {
        64 - self.leading - self.trailing
    }
}

/// Result of encoding a value column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedValues {
    /// The packed sub-stream.
    pub bits: PackedBits,
    /// Raw bits of the first value, or 0 for an empty column.
    pub first_bits: u64,
    pub count: usize,
}

/// Streaming XOR encoder for the value column.
#[derive(Debug, Clone, Default)]
pub struct ValueEncoder {
    buf: BitWriter,
    count: usize,
    first_bits: u64,
    prev_bits: u64,
    window: Window,
}

impl ValueEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next value.
    pub fn push(&mut self, value: f64) {
        let bits = value.to_bits();
        if self.count == 0 {
            self.buf.write(bits, 64);
            self.first_bits = bits;
        } else {
            self.encode_xor(bits ^ self.prev_bits);
        }
        self.prev_bits = bits;
        self.count += 1;
    }

    fn encode_xor(&mut self, xor: u64) {
        if xor == 0 {
            self.buf.write_bit(false);
            return;
        }

        let leading = xor.leading_zeros() as u8;
        let trailing = xor.trailing_zeros() as u8;
        let window = self.window;

        if window.meaningful() > 0 && leading >= window.leading && trailing >= window.trailing {
            let meaningful = window.meaningful();
            self.buf.write(0b10, 2);
            self.buf.write((xor >> window.trailing) & bitmask(meaningful), meaningful);
        } else {
            // A clamped leading count widens the window so that the reader's
            // derived trailing count stays exact.
            let leading = leading.min(MAX_LEADING);
            let meaningful = 64 - leading - trailing;
            self.buf.write(0b11, 2);
            self.buf.write(leading as u64, 5);
            self.buf.write((meaningful - 1) as u64, 6);
            self.buf.write(xor >> trailing, meaningful);
            self.window = Window { leading, trailing };
        }
    }

    pub fn finish(self) -> EncodedValues {
        EncodedValues {
            bits: self.buf.pad_and_emit(),
            first_bits: self.first_bits,
            count: self.count,
        }
    }
}

/// Encodes a whole value column.
pub fn encode_values(values: &[f64]) -> EncodedValues {
    let mut encoder = ValueEncoder::new();
    for &v in values {
        encoder.push(v);
    }
    encoder.finish()
}

/// Lazily decodes `count` values from a reader positioned at the start of
/// the value sub-stream.
#[derive(Debug)]
pub struct ValueDecoder<'a> {
    reader: BitReader<'a>,
    count: usize,
    emitted: usize,
    prev_bits: u64,
    window: Window,
    done: bool,
}

impl<'a> ValueDecoder<'a> {
    pub fn new(reader: BitReader<'a>, count: usize) -> Self {
        Self {
            reader,
            count,
            emitted: 0,
            prev_bits: 0,
            window: Window::default(),
            done: false,
        }
    }

    fn decode_next(&mut self) -> Result<u64, DecodeError> {
        if self.emitted == 0 {
            return Ok(self.reader.read(64)?);
        }
        if !self.reader.read_bit()? {
            return Ok(self.prev_bits);
        }

        if !self.reader.read_bit()? {
            // '10': reuse the remembered window.
            let meaningful = self.window.meaningful();
            let value = self.reader.read(meaningful)?;
            return Ok(self.prev_bits ^ (value << self.window.trailing));
        }

        // '11': new window.
        let leading = self.reader.read(5)? as u8;
        let meaningful = self.reader.read(6)? as u8 + 1;
        if leading + meaningful > 64 {
            return Err(DecodeError::InvalidValueWindow {
                leading,
                meaningful,
            });
        }
        let trailing = 64 - leading - meaningful;
        let value = self.reader.read(meaningful)?;
        self.window = Window { leading, trailing };
        Ok(self.prev_bits ^ (value << trailing))
    }
}

impl Iterator for ValueDecoder<'_> {
    type Item = Result<f64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.emitted >= self.count {
            return None;
        }
        match self.decode_next() {
            Ok(bits) => {
                self.prev_bits = bits;
                self.emitted += 1;
                Some(Ok(f64::from_bits(bits)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decodes `count` values.
pub fn decode_values(reader: BitReader<'_>, count: usize) -> Result<Vec<f64>, DecodeError> {
    // Every value after the first costs at least one bit.
    let mut out = Vec::with_capacity(count.min(reader.remaining().saturating_sub(63)));
    for v in ValueDecoder::new(reader, count) {
        out.push(v?);
    }
    Ok(out)
}
