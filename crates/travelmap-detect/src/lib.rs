//! Country detection from free-text video titles.
//!
//! A [`PatternCatalog`] holds the flag and keyword tables; a
//! [`CountryDetector`] scans titles against it and yields deduplicated,
//! confidence-scored [`DetectedCountry`] values.

pub mod catalog;
pub mod detector;
mod flags;

pub use catalog::{CatalogBuilder, PatternCatalog};
pub use detector::{CountryDetector, DetectedCountry};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("home country {0} is not in the pattern catalog")]
    UnknownHomeCountry(String),
}
