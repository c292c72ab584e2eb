//! Place/geography lookup table
//!
//! The input dataset linking place ids to their associated geography
//! records. A place id may appear on several rows (one-to-many mapping);
//! row order is preserved because it drives the output ordering.

use geoprof_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceGeographyLink {
    /// Place id (string key, not unique across rows)
    pub id: String,
    /// Place name
    pub name: String,
    /// Fully-qualified geography identifier
    #[serde(rename = "GEOIDFQ")]
    pub geoid_fq: String,
    /// Geography-type label (closed set, validated at resolve time)
    #[serde(rename = "AREATYPE")]
    pub area_type: String,
    /// Source place name for the linked geography
    #[serde(rename = "PLACENAME")]
    pub place_name: String,
    /// Optional free-text annotation; presence requests a provenance comment
    #[serde(rename = "COMMENT")]
    pub comment: Option<String>,
}

/// The full lookup table, in file order
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    links: Vec<PlaceGeographyLink>,
}

impl LookupTable {
    /// Load the lookup table from a CSV file
    pub fn from_csv_path(path: &Path) -> Result<LookupTable> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load the lookup table from any CSV reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<LookupTable> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut links = Vec::new();
        for (row_index, row) in csv_reader.deserialize::<PlaceGeographyLink>().enumerate() {
            let link = row.map_err(|e| {
                Error::Parse(format!("lookup table row {}: {}", row_index + 1, e))
            })?;
            links.push(link);
        }
        Ok(LookupTable { links })
    }

    pub fn links(&self) -> &[PlaceGeographyLink] {
        &self.links
    }

    /// Unique place ids in first-appearance order
    pub fn place_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for link in &self.links {
            if seen.insert(link.id.clone()) {
                ids.push(link.id.clone());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,name,GEOIDFQ,AREATYPE,PLACENAME,COMMENT
AK10,Adak,1600000US0200370,Incorporated place,Adak city,
AK95,Chignik Lagoon,1400000US02164000100,Census tract,Census Tract 1,merged tracts
AK95,Chignik Lagoon,1400000US02164000200,Census tract,Census Tract 2,merged tracts
AK12,Akhiok,0500000US02013,County,Aleutians East Borough,nearest county
";

    #[test]
    fn test_parse_preserves_row_order() {
        let table = LookupTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.links().len(), 4);
        assert_eq!(table.links()[0].id, "AK10");
        assert_eq!(table.links()[1].geoid_fq, "1400000US02164000100");
    }

    #[test]
    fn test_place_ids_unique_first_appearance() {
        let table = LookupTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.place_ids(), vec!["AK10", "AK95", "AK12"]);
    }

    #[test]
    fn test_empty_comment_is_none() {
        let table = LookupTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.links()[0].comment, None);
        assert_eq!(table.links()[1].comment.as_deref(), Some("merged tracts"));
    }

    #[test]
    fn test_malformed_row_is_parse_error() {
        let bad = "id,name\nAK10";
        let err = LookupTable::from_reader(bad.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), "Parse");
    }
}
