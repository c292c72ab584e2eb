//! Common error types for geoprof
//!
//! All place-scoped failures carry the offending place id so a failed place
//! can be reported and skipped without disturbing its neighbors.

use thiserror::Error;

/// Common result type for geoprof operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the geoprof pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// No lookup rows exist for a place id
    #[error("unknown geography: no lookup rows for place id '{0}'")]
    UnknownGeography(String),

    /// Geography-type label outside the closed enumeration
    #[error("unrecognized geography type '{label}' for place id '{place_id}'")]
    UnrecognizedGeographyType { place_id: String, label: String },

    /// A place's lookup rows disagree on geography type
    #[error("inconsistent geography types for place id '{place_id}': {found}")]
    InconsistentGeographyType { place_id: String, found: String },

    /// Ratio computed against a zero denominator
    #[error("invalid denominator: '{denominator}' is zero while computing '{measure}'")]
    InvalidDenominator { measure: String, denominator: String },

    /// Degenerate pooled-variance denominator (total population equals the
    /// number of sub-geographies)
    #[error("invalid pooling for place id '{place_id}': pooled-variance denominator is zero")]
    InvalidPooling { place_id: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input data (lookup table or source rows)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Short machine-readable name of the failure kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownGeography(_) => "UnknownGeography",
            Error::UnrecognizedGeographyType { .. } => "UnrecognizedGeographyType",
            Error::InconsistentGeographyType { .. } => "InconsistentGeographyType",
            Error::InvalidDenominator { .. } => "InvalidDenominator",
            Error::InvalidPooling { .. } => "InvalidPooling",
            Error::Io(_) => "Io",
            Error::Config(_) => "Config",
            Error::Parse(_) => "Parse",
        }
    }
}
