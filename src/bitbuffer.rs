use thiserror::Error;

/// Error returned when a read would run past the end of a bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bit stream exhausted: needed {requested} bits at position {position}, {available} available")]
pub struct OutOfBits {
    /// Bit position at which the read was attempted.
    pub position: usize,
    /// Number of bits requested.
    pub requested: usize,
    /// Number of bits left before the end of the stream.
    pub available: usize,
}

/// An MSB-first bit accumulator.
///
/// Complete bytes are committed to the output as soon as they fill up; at most
/// seven bits are ever pending, so `len_bits() == 8 * committed + pending`.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Pending bits, right-aligned.
    pending: u64,
    /// Number of pending bits (0..8).
    pending_bits: u8,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `BitWriter` with the given pre-allocated capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            pending: 0,
            pending_bits: 0,
        }
    }

    /// Returns the total number of bits written.
    #[inline]
    pub fn len_bits(&self) -> usize {
        self.bytes.len() * 8 + self.pending_bits as usize
    }

    /// Returns `true` if no bits have been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len_bits() == 0
    }

    /// Writes a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write(bit as u64, 1);
    }

    /// Appends the lowest `nbits` bits of `value`, most significant first.
    ///
    /// Widths above 32 are split into a high part and a low 32-bit part so
    /// the accumulator never shifts by its full width.
    pub fn write(&mut self, value: u64, nbits: u8) {
        debug_assert!(nbits <= 64);
        if nbits == 0 {
            return;
        }
        if nbits > 32 {
            self.write(value >> 32, nbits - 32);
            self.write(value & 0xFFFF_FFFF, 32);
            return;
        }
        self.pending = (self.pending << nbits) | (value & bitmask(nbits));
        self.pending_bits += nbits;
        while self.pending_bits >= 8 {
            self.pending_bits -= 8;
            self.bytes.push((self.pending >> self.pending_bits) as u8);
        }
        self.pending &= bitmask(self.pending_bits);
    }

    /// Writes the two's-complement representation of `value` masked to `nbits`.
    #[inline]
    pub fn write_signed(&mut self, value: i64, nbits: u8) {
        self.write(value as u64 & bitmask(nbits), nbits);
    }

    /// Appends the exact bit content of an independently packed stream,
    /// dropping its trailing pad bits.
    pub fn write_packed(&mut self, packed: &PackedBits) {
        let full_bytes = packed.bit_len / 8;
        let remaining = (packed.bit_len % 8) as u8;
        for &byte in &packed.bytes[..full_bytes] {
            self.write(byte as u64, 8);
        }
        if remaining > 0 {
            let last = packed.bytes[full_bytes];
            self.write((last >> (8 - remaining)) as u64, remaining);
        }
    }

    /// Zero-fills the current byte so the stream ends on a byte boundary.
    pub fn pad_to_byte(&mut self) {
        if self.pending_bits > 0 {
            self.write(0, 8 - self.pending_bits);
        }
    }

    /// Flushes pending bits left-justified into a final byte and returns the
    /// bytes together with the bit count before padding.
    pub fn pad_and_emit(mut self) -> PackedBits {
        let bit_len = self.len_bits();
        if self.pending_bits > 0 {
            self.bytes.push((self.pending << (8 - self.pending_bits)) as u8);
        }
        PackedBits {
            bytes: self.bytes,
            bit_len,
        }
    }
}

/// A byte-padded bit stream together with its exact, pre-padding length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedBits {
    /// Packed bytes; the last byte is zero-filled on the right.
    pub bytes: Vec<u8>,
    /// Number of meaningful bits in `bytes`.
    pub bit_len: usize,
}

/// A cursor for reading bits MSB-first from a byte slice.
///
/// Several readers may share one slice, each positioned independently with
/// [`BitReader::skip`].
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Total number of readable bits.
    total_bits: usize,
    /// Current bit position (0-indexed from the start of `bytes`).
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over the first `total_bits` bits of `bytes`.
    ///
    /// `total_bits` is clamped to the length of the slice.
    pub fn new(bytes: &'a [u8], total_bits: usize) -> Self {
        Self {
            bytes,
            total_bits: total_bits.min(bytes.len() * 8),
            pos: 0,
        }
    }

    /// Creates a reader over every bit of `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, bytes.len() * 8)
    }

    /// Returns the current bit position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bits remaining.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.total_bits.saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.total_bits
    }

    /// Advances the cursor by `nbits` without decoding them.
    pub fn skip(&mut self, nbits: usize) -> Result<(), OutOfBits> {
        self.ensure(nbits)?;
        self.pos += nbits;
        Ok(())
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool, OutOfBits> {
        self.ensure(1)?;
        let byte = self.bytes[self.pos / 8];
        let bit = (byte >> (7 - self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Ok(bit)
    }

    /// Reads `nbits` bits (at most 64) as an unsigned value, MSB first.
    ///
    /// Nothing is consumed when fewer than `nbits` bits remain.
    pub fn read(&mut self, nbits: u8) -> Result<u64, OutOfBits> {
        debug_assert!(nbits <= 64);
        self.ensure(nbits as usize)?;
        let mut value: u64 = 0;
        for _ in 0..nbits {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    /// Reads `nbits` bits and sign-extends from bit `nbits - 1`.
    pub fn read_signed(&mut self, nbits: u8) -> Result<i64, OutOfBits> {
        let raw = self.read(nbits)?;
        Ok(sign_extend(raw, nbits))
    }

    fn ensure(&self, nbits: usize) -> Result<(), OutOfBits> {
        let available = self.remaining();
        if nbits > available {
            return Err(OutOfBits {
                position: self.pos,
                requested: nbits,
                available,
            });
        }
        Ok(())
    }
}

/// Returns a bitmask with the lowest `n` bits set. Handles `n == 64` without overflow.
#[inline]
pub(crate) fn bitmask(n: u8) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Sign-extend an `n`-bit value stored in a `u64` to a full `i64`.
#[inline]
pub(crate) fn sign_extend(value: u64, bits: u8) -> i64 {
    if bits == 0 {
        return 0;
    }
    let shift = 64 - bits as u32;
    ((value << shift) as i64) >> shift
}
