//! Raw row normalization
//!
//! Converts fetched rows into canonical per-geography records: the source's
//! geography column becomes the canonical key, every value column is coerced
//! to numeric with nodata sentinels mapped to Unknown, and source variable
//! codes are renamed to canonical short names.
//!
//! Sentinel rule: sources encode "no data" with reserved negative values
//! (and the sentinels differ between sources), so every negative value maps
//! to Unknown. Zero is valid data for every measure kind.

use crate::catalog::MeasureCatalog;
use crate::geography::GeographyType;
use crate::types::{PerGeographyRecord, RawRow, SourceFamily};
use geoprof_common::{Error, MeasureValue, Result};

/// Health-family rows key on a location id rather than a census geography
/// column
const LOCATION_ID_COLUMN: &str = "locationid";

/// Identifier columns, never coerced to numeric
const KEY_COLUMNS: &[&str] = &[
    "state",
    "county",
    "tract",
    "place",
    "zip code tabulation area",
    "us",
    LOCATION_ID_COLUMN,
];

/// Normalize one source family's raw rows into canonical records
pub fn normalize(
    raw_rows: &[RawRow],
    catalog: &MeasureCatalog,
    family: SourceFamily,
    geography_type: GeographyType,
) -> Result<Vec<PerGeographyRecord>> {
    raw_rows
        .iter()
        .map(|row| normalize_row(row, catalog, family, geography_type))
        .collect()
}

fn normalize_row(
    row: &RawRow,
    catalog: &MeasureCatalog,
    family: SourceFamily,
    geography_type: GeographyType,
) -> Result<PerGeographyRecord> {
    let geo_key = geo_key_of(row, family, geography_type)?;
    let mut record = PerGeographyRecord::new(geo_key, geography_type);

    for (column, raw_value) in &row.columns {
        if KEY_COLUMNS.contains(&column.as_str()) {
            continue;
        }
        // unrecognized codes pass through under their source name
        let name = catalog.rename(family, column).unwrap_or(column.as_str());
        record.set_value(name, coerce_numeric(raw_value));
    }

    Ok(record)
}

/// Canonical join key for a raw row
fn geo_key_of(row: &RawRow, family: SourceFamily, geography_type: GeographyType) -> Result<String> {
    match family {
        SourceFamily::Health => {
            let location_id = row
                .get(LOCATION_ID_COLUMN)
                .ok_or_else(|| Error::Parse("health row is missing its location id".to_string()))?;
            if geography_type.location_id_has_state_prefix() && location_id.len() > 2 {
                Ok(location_id[2..].to_string())
            } else {
                Ok(location_id.to_string())
            }
        }
        SourceFamily::Decennial | SourceFamily::Survey => match geography_type {
            GeographyType::Tract => {
                // concatenate county + tract into the composite key
                let county = row.get("county").ok_or_else(|| {
                    Error::Parse("tract row is missing its county column".to_string())
                })?;
                let tract = row.get("tract").ok_or_else(|| {
                    Error::Parse("tract row is missing its tract column".to_string())
                })?;
                Ok(format!("{}{}", county, tract))
            }
            _ => {
                let column = geography_type.census_response_column();
                row.get(column)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::Parse(format!("row is missing its '{}' column", column))
                    })
            }
        },
    }
}

/// Coerce a raw string to a measure value; unparsable and negative values
/// are Unknown
fn coerce_numeric(raw: &str) -> MeasureValue {
    match raw.trim().parse::<f64>() {
        Ok(v) if v >= 0.0 => MeasureValue::Known(v),
        _ => MeasureValue::Unknown,
    }
}
