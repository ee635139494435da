//! JSON form of a series: an array of `[timestamp, value]` pairs.

use crate::encoder::Sample;
use crate::error::EncodeError;

/// Parses `[[ts, value], ...]`. Integer values are accepted and widened to
/// `f64`; timestamps must be integers.
pub fn samples_from_json(text: &str) -> Result<Vec<Sample>, EncodeError> {
    serde_json::from_str(text).map_err(|e| EncodeError::InvalidInput(e.to_string()))
}

/// Renders samples as `[[ts, value], ...]`.
///
/// JSON has no NaN or infinity; such values are written as `null`.
pub fn samples_to_json(samples: &[Sample]) -> Result<String, serde_json::Error> {
    serde_json::to_string(samples)
}
