//! # Gorilla stream
//!
//! Compression for `(timestamp, value)` series based on Facebook's Gorilla
//! scheme (*"Gorilla: A Fast, Scalable, In-Memory Time Series Database"*,
//! VLDB 2015), wrapped in a self-describing byte format.
//!
//! ## Algorithm overview
//!
//! - **Timestamps** are stored as delta-of-deltas in variable-length
//!   buckets, so a series sampled at a fixed interval costs one bit per point.
//! - **Values** (IEEE 754 doubles) are XORed with their predecessor; only the
//!   meaningful bits inside a leading/trailing zero window are written.
//!
//! ## Wire format
//!
//! An encoded buffer is an 80-byte (or 84-byte, when a scale is recorded)
//! big-endian outer header followed by a payload. The payload holds a
//! 32-byte inner header, the timestamp sub-stream and the value sub-stream,
//! packed MSB-first. A CRC-32 over the payload is kept in the outer header;
//! see [`header`] for the field layout.
//!
//! ## Example
//!
//! ```rust
//! use gorilla_stream::{decode, encode, EncodeOptions, Sample};
//!
//! let series = vec![
//!     Sample::new(1609459200, 12.0),
//!     Sample::new(1609459260, 12.5),
//!     Sample::new(1609459320, 13.0),
//! ];
//!
//! let bytes = encode(&series, &EncodeOptions::default()).unwrap();
//! println!("compressed {} samples into {} bytes", series.len(), bytes.len());
//!
//! let restored = decode(&bytes).unwrap();
//! assert_eq!(restored, series);
//! ```
//!
//! ## Preprocessing
//!
//! With `victoria_metrics` enabled, values can be counter-delta encoded and
//! scaled to integers before compression. The transforms are recorded in the
//! header flags and undone on decode:
//!
//! ```rust
//! # use gorilla_stream::{decode, encode, EncodeOptions, Sample};
//! let counter = vec![Sample::new(0, 1.0), Sample::new(60, 1.5), Sample::new(120, 3.25)];
//! let opts = EncodeOptions::victoria_metrics().with_counter(true);
//! let bytes = encode(&counter, &opts).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), counter);
//! ```

pub mod bitbuffer;
pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod input;
pub mod options;
pub mod preprocess;
pub mod timestamp;
pub mod value;

// Re-export primary types at the crate root.
pub use checksum::checksum;
pub use decoder::{decode, Decoded, Decoder};
pub use encoder::{encode, Encoder, Sample};
pub use error::{DecodeError, EncodeError, IntegrityWarning};
pub use header::{Flags, InnerHeader, OuterHeader};
pub use options::{EncodeOptions, ScaleDecimals};
