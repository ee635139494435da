use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Upper bound on automatically detected decimal places.
pub const MAX_AUTO_SCALE: u32 = 6;
/// Upper bound on an explicit scale: 10^18 is the largest power of ten in an i64.
pub const MAX_SCALE_DECIMALS: u32 = 18;

/// Decimal scaling applied to values during preprocessing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScaleRepr", into = "ScaleRepr")]
pub enum ScaleDecimals {
    /// Detect the number of decimal places from the data.
    #[default]
    Auto,
    /// Scale by exactly `10^n`.
    Fixed(u32),
}

/// Wire form of [`ScaleDecimals`]: the string `"auto"` or an integer.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ScaleRepr {
    Fixed(u32),
    Named(String),
}

impl TryFrom<ScaleRepr> for ScaleDecimals {
    type Error = String;

    fn try_from(repr: ScaleRepr) -> Result<Self, Self::Error> {
        match repr {
            ScaleRepr::Fixed(n) => Ok(ScaleDecimals::Fixed(n)),
            ScaleRepr::Named(s) => s.parse(),
        }
    }
}

impl From<ScaleDecimals> for ScaleRepr {
    fn from(scale: ScaleDecimals) -> Self {
        match scale {
            ScaleDecimals::Auto => ScaleRepr::Named("auto".to_string()),
            ScaleDecimals::Fixed(n) => ScaleRepr::Fixed(n),
        }
    }
}

impl FromStr for ScaleDecimals {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ScaleDecimals::Auto);
        }
        s.parse::<u32>()
            .map(ScaleDecimals::Fixed)
            .map_err(|_| format!("expected \"auto\" or a non-negative integer, got {s:?}"))
    }
}

impl fmt::Display for ScaleDecimals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDecimals::Auto => write!(f, "auto"),
            ScaleDecimals::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Options recognized by the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Enables value preprocessing (flag bit 0).
    pub victoria_metrics: bool,
    /// Delta-encodes values as a counter (flag bit 1); only applied together
    /// with `victoria_metrics`.
    pub is_counter: bool,
    pub scale_decimals: ScaleDecimals,
}

impl EncodeOptions {
    /// Options with preprocessing enabled and automatic scaling.
    pub fn victoria_metrics() -> Self {
        Self {
            victoria_metrics: true,
            ..Self::default()
        }
    }

    pub fn with_counter(mut self, is_counter: bool) -> Self {
        self.is_counter = is_counter;
        self
    }

    pub fn with_scale(mut self, scale_decimals: ScaleDecimals) -> Self {
        self.scale_decimals = scale_decimals;
        self
    }

    /// Parses an option record such as
    /// `{"victoria_metrics": true, "scale_decimals": "auto"}`.
    /// Unknown keys are ignored.
    pub fn from_json(text: &str) -> Result<Self, EncodeError> {
        serde_json::from_str(text).map_err(|e| EncodeError::InvalidOptions(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EncodeError> {
        if let ScaleDecimals::Fixed(n) = self.scale_decimals {
            if n > MAX_SCALE_DECIMALS {
                return Err(EncodeError::InvalidOptions(format!(
                    "scale_decimals {n} exceeds maximum of {MAX_SCALE_DECIMALS}"
                )));
            }
        }
        Ok(())
    }

    /// Whether the 84-byte header carrying a scale field is written.
    ///
    /// The rule is `victoria_metrics || (is_counter && scale defined)`; a
    /// scale is always defined (explicit or auto), so a counter series gets
    /// the scale field even without preprocessing.
    pub fn writes_scale_field(&self) -> bool {
        self.victoria_metrics || self.is_counter
    }
}
