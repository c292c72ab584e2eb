//! Final profile table assembly and CSV output
//!
//! One row per place id, columns in a fixed order: place metadata, every
//! published measure (with its bounds where the measure carries them), and
//! the provenance comment last. Unknown values serialize as empty fields.

use crate::catalog::MeasureCatalog;
use crate::types::{AggregatedRecord, MeasureKind};
use geoprof_common::{Error, Result};
use std::path::Path;

/// Fixed leading metadata columns
const METADATA_COLUMNS: &[&str] = &["id", "name", "areatype", "placename", "geoid"];

/// Output column headers in publication order
pub fn column_headers(catalog: &MeasureCatalog) -> Vec<String> {
    let mut headers: Vec<String> = METADATA_COLUMNS.iter().map(|c| c.to_string()).collect();
    for measure in catalog.published() {
        let name = &measure.short_name;
        headers.push(name.clone());
        match measure.kind {
            MeasureKind::PercentageWithCi { .. } => {
                headers.push(format!("lo_{}", name));
                headers.push(format!("hi_{}", name));
            }
            MeasureKind::PercentageWithMoe { .. } => {
                headers.push(format!("moe_{}", name));
                headers.push(format!("lo_{}", name));
                headers.push(format!("hi_{}", name));
            }
            MeasureKind::Count | MeasureKind::Percentage { .. } | MeasureKind::MeanRate => {}
        }
    }
    headers.push("comment".to_string());
    headers
}

/// Write the profile table to any writer
pub fn write_table<W: std::io::Write>(
    records: &[AggregatedRecord],
    catalog: &MeasureCatalog,
    writer: W,
) -> Result<()> {
    let headers = column_headers(catalog);
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(&headers)
        .map_err(|e| Error::Parse(format!("writing header row: {}", e)))?;

    for record in records {
        let mut row = Vec::with_capacity(headers.len());
        row.push(record.place_id.clone());
        row.push(record.place_name.clone());
        row.push(record.geography_type.label().to_string());
        row.push(record.source_place_names.clone());
        row.push(record.geo_keys.clone());
        for header in &headers[METADATA_COLUMNS.len()..headers.len() - 1] {
            row.push(record.value(header).to_string());
        }
        row.push(record.comment.clone());
        csv_writer
            .write_record(&row)
            .map_err(|e| Error::Parse(format!("writing row for '{}': {}", record.place_id, e)))?;
    }

    csv_writer
        .flush()
        .map_err(Error::Io)?;
    Ok(())
}

/// Write the profile table to a CSV file
pub fn write_table_path(
    records: &[AggregatedRecord],
    catalog: &MeasureCatalog,
    path: &Path,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_table(records, catalog, file)
}
