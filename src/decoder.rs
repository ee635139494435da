use crate::bitbuffer::BitReader;
use crate::checksum::checksum;
use crate::encoder::Sample;
use crate::error::{DecodeError, IntegrityWarning};
use crate::header::{InnerHeader, OuterHeader, INNER_HEADER_BITS};
use crate::preprocess;
use crate::timestamp::decode_timestamps;
use crate::value::decode_values;

/// Result of a decode, including non-fatal findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub samples: Vec<Sample>,
    /// Integrity problems found along the way; decoding continued past them.
    pub warnings: Vec<IntegrityWarning>,
    /// The outer header, absent for an empty buffer.
    pub header: Option<OuterHeader>,
}

impl Decoded {
    /// Returns `true` when no integrity warnings were raised.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Reconstructs a series from the wire format.
///
/// # Example
/// ```
/// use gorilla_stream::{encode, Decoder, EncodeOptions, Sample};
///
/// let input = vec![Sample::new(1_609_459_200, 12.0), Sample::new(1_609_459_260, 12.5)];
/// let bytes = encode(&input, &EncodeOptions::default()).unwrap();
///
/// let decoded = Decoder::decode_with_report(&bytes).unwrap();
/// assert!(decoded.is_clean());
/// assert_eq!(decoded.samples, input);
/// ```
pub struct Decoder;

impl Decoder {
    /// Decodes all samples, discarding integrity warnings after logging them.
    pub fn decode(bytes: &[u8]) -> Result<Vec<Sample>, DecodeError> {
        Ok(Self::decode_with_report(bytes)?.samples)
    }

    /// Decodes all samples and reports integrity warnings alongside them.
    ///
    /// Structural problems (magic, version, header size, bounds, truncated
    /// sub-streams) are errors. A checksum mismatch or disagreeing duplicate
    /// header fields are only warnings.
    pub fn decode_with_report(bytes: &[u8]) -> Result<Decoded, DecodeError> {
        if bytes.is_empty() {
            return Ok(Decoded::default());
        }

        let header = OuterHeader::parse(bytes)?;
        let payload = header.payload(bytes);
        let mut warnings = Vec::new();

        let computed = checksum(payload);
        if computed != header.checksum {
            warnings.push(IntegrityWarning::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }

        let samples = if header.count == 0 {
            Vec::new()
        } else {
            let inner = InnerHeader::parse(payload)?;
            warnings.extend(header.compare_inner(&inner));
            decode_payload(payload, &header, &inner)?
        };

        for warning in &warnings {
            log::warn!("{warning}");
        }
        log::debug!(
            "decoded {} samples from {} bytes ({} warnings)",
            samples.len(),
            bytes.len(),
            warnings.len()
        );

        Ok(Decoded {
            samples,
            warnings,
            header: Some(header),
        })
    }
}

/// Decodes `bytes` into samples.
pub fn decode(bytes: &[u8]) -> Result<Vec<Sample>, DecodeError> {
    Decoder::decode(bytes)
}

fn decode_payload(
    payload: &[u8],
    header: &OuterHeader,
    inner: &InnerHeader,
) -> Result<Vec<Sample>, DecodeError> {
    let timestamp_bits = inner.timestamp_bits as usize;
    let value_bits = inner.value_bits as usize;
    let available_bits = payload.len() * 8;

    let value_start = INNER_HEADER_BITS + timestamp_bits;
    let value_end = value_start + value_bits;
    if value_end > available_bits {
        return Err(DecodeError::SubstreamOutOfBounds {
            timestamp_bits,
            value_bits,
            available_bits,
        });
    }

    // Two cursors over one payload, each bounded by its own sub-stream.
    let mut ts_reader = BitReader::new(payload, value_start);
    ts_reader.skip(INNER_HEADER_BITS)?;
    let mut val_reader = BitReader::new(payload, value_end);
    val_reader.skip(value_start)?;

    let count = header.count as usize;
    let timestamps = decode_timestamps(ts_reader, count)?;
    let mut values = decode_values(val_reader, count)?;

    preprocess::restore(
        &mut values,
        header.flags,
        header.scale_decimals.unwrap_or(0),
    );

    Ok(timestamps
        .into_iter()
        .zip(values)
        .map(|(timestamp, value)| Sample { timestamp, value })
        .collect())
}
