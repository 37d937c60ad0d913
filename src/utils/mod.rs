//! Utility functions and data structures.
//!
//! ## Modules
//!
//! - [`app_data`] - Engine configuration and app data directory
//! - [`encoding`] - Id-set codecs and varint helpers
//! - [`normalizer`] - Person-name normalization
//! - [`qgram`] - q-gram extraction for indexing and lookups
//!
//! ## Key Functions
//!
//! ```no_run
//! use authdex::utils::{extract_qgrams, DefaultNormalizer, NameNormalizer};
//!
//! let name = DefaultNormalizer.normalize("J. Ellis");
//! assert_eq!(name.text, "ellis, j");
//!
//! let qgrams = extract_qgrams(&name.surname, 2);
//! // Returns: ["el", "ll", "li", "is"]
//! ```

pub mod app_data;
pub mod encoding;
pub mod normalizer;
pub mod qgram;

pub use app_data::*;
pub use encoding::*;
pub use normalizer::*;
pub use qgram::*;
