use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::bitbuffer::BitWriter;
use crate::error::EncodeError;
use crate::header::{InnerHeader, OuterHeader, BYTES_PER_SAMPLE, INNER_HEADER_LEN};
use crate::options::EncodeOptions;
use crate::preprocess;
use crate::timestamp::TimestampEncoder;
use crate::value::encode_values;

/// Largest series whose original size (`count * 16`) fits the header.
pub const MAX_SAMPLES: usize = (u32::MAX / BYTES_PER_SAMPLE) as usize;

/// A single time-series sample. Serialized as a `[timestamp, value]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, f64)", into = "(i64, f64)")]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    /// Creates a new `Sample`.
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Self { timestamp, value }
    }
}

impl From<Sample> for (i64, f64) {
    fn from(s: Sample) -> Self {
        (s.timestamp, s.value)
    }
}

/// Encodes a whole series into the wire format.
///
/// # Example
/// ```
/// use gorilla_stream::{EncodeOptions, Encoder, Sample};
///
/// let encoder = Encoder::new(EncodeOptions::default());
/// let bytes = encoder
///     .encode(&[Sample::new(1_609_459_200, 12.0), Sample::new(1_609_459_260, 12.5)])
///     .unwrap();
/// assert_eq!(&bytes[1..8], b"GORILLA");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Encodes `samples`, stamping the header with the current time.
    ///
    /// An empty series produces an empty buffer.
    pub fn encode(&self, samples: &[Sample]) -> Result<Vec<u8>, EncodeError> {
        self.encode_at(samples, unix_now())
    }

    /// Like [`Encoder::encode`] with an explicit creation time (Unix seconds),
    /// for reproducible output.
    pub fn encode_at(
        &self,
        samples: &[Sample],
        creation_time: i64,
    ) -> Result<Vec<u8>, EncodeError> {
        self.options.validate()?;
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        if samples.len() > MAX_SAMPLES {
            return Err(EncodeError::TooManySamples {
                count: samples.len(),
            });
        }

        let mut values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        let applied = preprocess::apply(&mut values, &self.options);

        let mut timestamps = TimestampEncoder::new();
        for s in samples {
            timestamps.push(s.timestamp)?;
        }
        let timestamps = timestamps.finish();
        let values = encode_values(&values);

        let inner = InnerHeader {
            count: samples.len() as u32,
            first_timestamp: timestamps.first_timestamp,
            first_value_bits: values.first_bits,
            first_delta: timestamps.first_delta,
            timestamp_bits: bit_len(timestamps.bits.bit_len)?,
            value_bits: bit_len(values.bits.bit_len)?,
        };
        log::trace!(
            "sub-streams: timestamps={} bits, values={} bits",
            inner.timestamp_bits,
            inner.value_bits
        );

        let data_bytes = (timestamps.bits.bit_len + values.bits.bit_len).div_ceil(8);
        let mut packed = BitWriter::with_capacity(INNER_HEADER_LEN + data_bytes);
        inner.write_to(&mut packed);
        packed.write_packed(&timestamps.bits);
        packed.write_packed(&values.bits);
        packed.pad_to_byte();
        let payload = packed.pad_and_emit().bytes;

        let scale = self
            .options
            .writes_scale_field()
            .then_some(applied.scale_decimals);
        let header =
            OuterHeader::for_payload(&inner, &payload, applied.flags, scale, creation_time)?;

        let mut out = header.to_bytes();
        out.extend_from_slice(&payload);
        log::debug!(
            "encoded {} samples into {} bytes (ratio {:.3}, flags {:#x})",
            header.count,
            out.len(),
            header.compression_ratio,
            header.flags.bits()
        );
        Ok(out)
    }
}

/// Encodes `samples` with `options`.
pub fn encode(samples: &[Sample], options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    Encoder::new(*options).encode(samples)
}

fn bit_len(bits: usize) -> Result<u32, EncodeError> {
    u32::try_from(bits).map_err(|_| EncodeError::PayloadTooLarge { bytes: bits / 8 })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
