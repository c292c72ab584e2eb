//! Core types and trait definitions for geoprof-ingest
//!
//! Defines the data contract the pipeline stages share:
//! - Source families and measure kinds (the pooling classes)
//! - Raw fetched rows and canonical per-geography records
//! - The aggregated one-row-per-place output record
//! - The `SourceFetcher` boundary the network clients implement

use crate::geography::GeographyType;
use geoprof_common::MeasureValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Source families and measure kinds
// ============================================================================

/// The three downstream data-source families, each keyed by a different
/// identifier encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFamily {
    /// Decennial-count source (full-population counts)
    Decennial,
    /// Survey-estimate source (estimates with margins of error)
    Survey,
    /// Health-measure source (prevalences with 95% confidence limits)
    Health,
}

impl SourceFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFamily::Decennial => "decennial",
            SourceFamily::Survey => "survey",
            SourceFamily::Health => "health",
        }
    }
}

impl std::fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Population base a percentage measure is computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denominator {
    /// All residents of the geography
    TotalPopulation,
    /// Residents aged 18 and over
    AdultPopulation,
}

/// Measure classification driving the pooling rule applied when a place
/// spans multiple geographies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MeasureKind {
    /// Plain count, pooled by summation
    Count,
    /// Percentage without reported bounds, pooled by population weighting
    Percentage { denominator: Denominator },
    /// Percentage with reported 95% confidence limits, pooled by population
    /// weighting with variance pooling for the reconstructed bounds
    PercentageWithCi { denominator: Denominator },
    /// Percentage with a reported margin of error, pooled by population
    /// weighting with root-sum-square MOE pooling
    PercentageWithMoe { denominator: Denominator },
    /// Rate that is not a proportion of a population (no consistent
    /// denominator exists), pooled by simple mean
    MeanRate,
}

impl MeasureKind {
    /// Denominator population for percentage-family kinds
    pub fn denominator(&self) -> Option<Denominator> {
        match self {
            MeasureKind::Percentage { denominator }
            | MeasureKind::PercentageWithCi { denominator }
            | MeasureKind::PercentageWithMoe { denominator } => Some(*denominator),
            MeasureKind::Count | MeasureKind::MeanRate => None,
        }
    }
}

/// Reserved prefix for the low confidence bound companion of a measure
pub const LOW_BOUND_PREFIX: &str = "lo_";
/// Reserved prefix for the high confidence bound companion of a measure
pub const HIGH_BOUND_PREFIX: &str = "hi_";
/// Reserved prefix for the margin-of-error companion of a measure
pub const MOE_PREFIX: &str = "moe_";

// ============================================================================
// Rows and records
// ============================================================================

/// One raw row as fetched from a source, before normalization
///
/// Column names are still source-specific (variable codes, source geography
/// column names); values are still strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub columns: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }
}

/// One geography identifier's full set of canonical measure values
///
/// Confidence companions live in the same map under the reserved
/// `lo_`/`hi_`/`moe_` prefixes, mirroring the tabular shape of the sources.
#[derive(Debug, Clone, PartialEq)]
pub struct PerGeographyRecord {
    /// Canonical geography key (the short census-form identifier)
    pub geo_key: String,
    pub geography_type: GeographyType,
    /// Source place name for this geography, from the lookup table
    pub source_place_name: String,
    /// Canonical measure name -> value
    pub values: BTreeMap<String, MeasureValue>,
}

impl PerGeographyRecord {
    pub fn new(geo_key: impl Into<String>, geography_type: GeographyType) -> Self {
        Self {
            geo_key: geo_key.into(),
            geography_type,
            source_place_name: String::new(),
            values: BTreeMap::new(),
        }
    }

    /// Value for a measure; absent measures read as Unknown
    pub fn value(&self, measure: &str) -> MeasureValue {
        self.values.get(measure).copied().unwrap_or(MeasureValue::Unknown)
    }

    pub fn set_value(&mut self, measure: impl Into<String>, value: MeasureValue) {
        self.values.insert(measure.into(), value);
    }

    /// Merge another record's measures into this one (same geography key,
    /// different source family). Existing measures are not overwritten.
    pub fn absorb(&mut self, other: PerGeographyRecord) {
        for (name, value) in other.values {
            self.values.entry(name).or_insert(value);
        }
    }
}

/// One place's final profile row: every measure resolved to a single value
///
/// Immutable once produced by the aggregation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub place_id: String,
    pub place_name: String,
    pub geography_type: GeographyType,
    /// All contributing geography keys, delimiter-joined for provenance
    pub geo_keys: String,
    /// All contributing source place names, delimiter-joined
    pub source_place_names: String,
    /// Human-readable provenance comment (may be empty)
    pub comment: String,
    pub values: BTreeMap<String, MeasureValue>,
}

impl AggregatedRecord {
    /// Value for a measure; absent measures read as Unknown
    pub fn value(&self, measure: &str) -> MeasureValue {
        self.values.get(measure).copied().unwrap_or(MeasureValue::Unknown)
    }
}

// ============================================================================
// Fetch boundary
// ============================================================================

/// Fetch errors shared by all source clients
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result of fetching one source family for one resolved geography set
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Normal row set, one or more rows
    Rows(Vec<RawRow>),
    /// The source has no data for this geography. Aggregates as all-Unknown
    /// measures for the affected sub-geographies, never as a failure.
    NoData,
}

/// Narrow boundary to the remote statistical sources
///
/// The pipeline only needs identifiers in and raw rows (or a no-data
/// signal) back; request construction is the implementor's concern. Tests
/// substitute an in-memory fake.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Which source family this fetcher serves
    fn family(&self) -> SourceFamily;

    /// Fetch all catalog measures for the given resolved geography set
    async fn fetch(
        &self,
        geography: &crate::geography::ResolvedGeography,
    ) -> Result<FetchOutcome, FetchError>;
}
