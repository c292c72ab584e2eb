//! Geography types and identifier resolution
//!
//! Every place in the lookup table is associated with one or more
//! fully-qualified geography identifiers. Each downstream source family
//! expects a different fixed-width suffix of that identifier, so the suffix
//! widths are a documented constant table here, not inferred from data.
//!
//! Census tracts are the special case: the census form of a tract identifier
//! is a (county, tract) pair because the source needs the parts in separate
//! query parameters.

use crate::lookup::PlaceGeographyLink;
use geoprof_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Closed enumeration of supported geography types
///
/// Adding a type is a compile-time decision: every `match` over this enum is
/// exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeographyType {
    County,
    /// Incorporated place or census designated place
    Place,
    /// ZIP code tabulation area
    Zcta,
    /// Census tract
    Tract,
    State,
    Nation,
}

impl GeographyType {
    /// Parse a lookup-table area-type label
    pub fn from_label(label: &str) -> Option<GeographyType> {
        match label {
            "County" => Some(GeographyType::County),
            "Incorporated place" | "Census designated place" => Some(GeographyType::Place),
            "ZCTA" => Some(GeographyType::Zcta),
            "Census tract" => Some(GeographyType::Tract),
            "State" => Some(GeographyType::State),
            "Nation" => Some(GeographyType::Nation),
            _ => None,
        }
    }

    /// Lowercase human-readable label, used in provenance comments
    pub fn label(&self) -> &'static str {
        match self {
            GeographyType::County => "county",
            GeographyType::Place => "place",
            GeographyType::Zcta => "zcta",
            GeographyType::Tract => "census tract",
            GeographyType::State => "state",
            GeographyType::Nation => "nation",
        }
    }

    /// Geography predicate name used in census-style query URLs
    pub fn census_query_segment(&self) -> &'static str {
        match self {
            GeographyType::County => "county",
            GeographyType::Place => "place",
            GeographyType::Zcta => "zip%20code%20tabulation%20area",
            GeographyType::Tract => "tract",
            GeographyType::State => "state",
            GeographyType::Nation => "us",
        }
    }

    /// Geography column name in census-style responses, renamed to the
    /// canonical key during normalization
    pub fn census_response_column(&self) -> &'static str {
        match self {
            GeographyType::County => "county",
            GeographyType::Place => "place",
            GeographyType::Zcta => "zip code tabulation area",
            GeographyType::Tract => "tract",
            GeographyType::State => "state",
            GeographyType::Nation => "us",
        }
    }

    /// Suffix width of the fully-qualified identifier used by the
    /// decennial/survey family (and as the canonical join key).
    /// `None` means the full identifier.
    ///
    /// Tract is 9: the 3-digit county portion concatenated with the 6-digit
    /// tract portion.
    pub fn census_suffix_len(&self) -> Option<usize> {
        match self {
            GeographyType::County => Some(3),
            GeographyType::Place => Some(5),
            GeographyType::Zcta => Some(5),
            GeographyType::Tract => Some(9),
            GeographyType::State => Some(2),
            GeographyType::Nation => None,
        }
    }

    /// Suffix width of the fully-qualified identifier used by the
    /// health-measure family's location ids. `None` means the full
    /// identifier. These are the census widths plus the 2-digit state FIPS
    /// prefix where a state qualifier applies.
    pub fn location_id_len(&self) -> Option<usize> {
        match self {
            GeographyType::County => Some(5),
            GeographyType::Place => Some(7),
            GeographyType::Zcta => Some(5),
            GeographyType::Tract => Some(11),
            GeographyType::State => Some(2),
            GeographyType::Nation => None,
        }
    }

    /// Whether census-style queries for this type must carry the state
    /// qualifier
    pub fn requires_state_qualifier(&self) -> bool {
        match self {
            GeographyType::County | GeographyType::Place | GeographyType::Tract => true,
            GeographyType::Zcta | GeographyType::State | GeographyType::Nation => false,
        }
    }

    /// Whether a health-family location id carries a leading state FIPS that
    /// must be stripped to obtain the canonical join key.
    ///
    /// ZCTA ids are bare ZIP codes; a ZIP beginning with the state's FIPS
    /// digits is legitimate data, so they are never stripped.
    pub fn location_id_has_state_prefix(&self) -> bool {
        matches!(
            self,
            GeographyType::County | GeographyType::Place | GeographyType::Tract
        )
    }
}

/// Census-form identifiers for a resolved place
///
/// Always a collection: callers treat one and many geographies uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum CensusIds {
    /// One identifier string per linked geography
    Plain(Vec<String>),
    /// Tract special case: shared county portion plus one tract portion per
    /// linked geography
    Tract { county: String, tracts: Vec<String> },
}

impl CensusIds {
    pub fn len(&self) -> usize {
        match self {
            CensusIds::Plain(ids) => ids.len(),
            CensusIds::Tract { tracts, .. } => tracts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A place id resolved to the identifier forms each source family expects
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeography {
    pub place_id: String,
    pub place_name: String,
    pub geography_type: GeographyType,
    /// Identifiers in the decennial/survey form
    pub census_ids: CensusIds,
    /// Identifiers in the health-family location-id form
    pub location_ids: Vec<String>,
    /// Canonical join keys, one per linked geography, in lookup order
    pub geo_keys: Vec<String>,
    /// Source place names, one per linked geography, in lookup order
    pub source_place_names: Vec<String>,
}

/// Resolve a place id against its lookup links.
///
/// Fails with `UnknownGeography` when the place id has no links,
/// `UnrecognizedGeographyType` for a label outside the closed enumeration,
/// and `InconsistentGeographyType` when links disagree on the type.
pub fn resolve(links: &[PlaceGeographyLink], place_id: &str) -> Result<ResolvedGeography> {
    let place_links: Vec<&PlaceGeographyLink> =
        links.iter().filter(|l| l.id == place_id).collect();

    if place_links.is_empty() {
        return Err(Error::UnknownGeography(place_id.to_string()));
    }

    let geography_type = geography_type_of(&place_links, place_id)?;

    let mut geo_keys = Vec::with_capacity(place_links.len());
    let mut location_ids = Vec::with_capacity(place_links.len());
    for link in &place_links {
        geo_keys.push(suffix_of(&link.geoid_fq, geography_type.census_suffix_len())?.to_string());
        location_ids
            .push(suffix_of(&link.geoid_fq, geography_type.location_id_len())?.to_string());
    }

    let census_ids = match geography_type {
        GeographyType::Tract => {
            // County portion comes from the first link; merged tracts of one
            // place share a county.
            let first = suffix_of(&place_links[0].geoid_fq, Some(9))?;
            let county = first[..3].to_string();
            let mut tracts = Vec::with_capacity(place_links.len());
            for link in &place_links {
                tracts.push(suffix_of(&link.geoid_fq, Some(6))?.to_string());
            }
            CensusIds::Tract { county, tracts }
        }
        _ => CensusIds::Plain(geo_keys.clone()),
    };

    Ok(ResolvedGeography {
        place_id: place_id.to_string(),
        place_name: place_links[0].name.clone(),
        geography_type,
        census_ids,
        location_ids,
        geo_keys,
        source_place_names: place_links.iter().map(|l| l.place_name.clone()).collect(),
    })
}

/// Parse and cross-check the geography type of a place's links
fn geography_type_of(
    place_links: &[&PlaceGeographyLink],
    place_id: &str,
) -> Result<GeographyType> {
    let mut resolved: Option<GeographyType> = None;
    for link in place_links {
        let parsed = GeographyType::from_label(&link.area_type).ok_or_else(|| {
            Error::UnrecognizedGeographyType {
                place_id: place_id.to_string(),
                label: link.area_type.clone(),
            }
        })?;
        match resolved {
            None => resolved = Some(parsed),
            Some(existing) if existing != parsed => {
                return Err(Error::InconsistentGeographyType {
                    place_id: place_id.to_string(),
                    found: format!("{} vs {}", existing.label(), parsed.label()),
                });
            }
            Some(_) => {}
        }
    }
    // place_links is non-empty, so resolved is always set
    resolved.ok_or_else(|| Error::UnknownGeography(place_id.to_string()))
}

/// Fixed-width suffix of a fully-qualified identifier; `None` width means
/// the full identifier
fn suffix_of(geoid_fq: &str, len: Option<usize>) -> Result<&str> {
    match len {
        None => Ok(geoid_fq),
        Some(n) => {
            if geoid_fq.len() < n {
                return Err(Error::Parse(format!(
                    "geography identifier '{}' is shorter than the expected {}-digit suffix",
                    geoid_fq, n
                )));
            }
            Ok(&geoid_fq[geoid_fq.len() - n..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, area_type: &str, geoid_fq: &str, place_name: &str) -> PlaceGeographyLink {
        PlaceGeographyLink {
            id: id.to_string(),
            name: format!("{} name", id),
            geoid_fq: geoid_fq.to_string(),
            area_type: area_type.to_string(),
            place_name: place_name.to_string(),
            comment: None,
        }
    }

    #[test]
    fn test_county_suffix_widths() {
        let links = vec![link("AK1", "County", "0500000US02013", "Aleutians East Borough")];
        let resolved = resolve(&links, "AK1").unwrap();
        assert_eq!(resolved.geography_type, GeographyType::County);
        assert_eq!(resolved.census_ids, CensusIds::Plain(vec!["013".to_string()]));
        assert_eq!(resolved.location_ids, vec!["02013".to_string()]);
        assert_eq!(resolved.geo_keys, vec!["013".to_string()]);
    }

    #[test]
    fn test_place_suffix_widths() {
        let links = vec![link("AK2", "Incorporated place", "1600000US0203000", "Anchorage")];
        let resolved = resolve(&links, "AK2").unwrap();
        assert_eq!(resolved.geography_type, GeographyType::Place);
        assert_eq!(resolved.census_ids, CensusIds::Plain(vec!["03000".to_string()]));
        assert_eq!(resolved.location_ids, vec!["0203000".to_string()]);
    }

    #[test]
    fn test_designated_place_maps_to_place() {
        let links = vec![link("AK3", "Census designated place", "1600000US0276110", "Tanana")];
        assert_eq!(resolve(&links, "AK3").unwrap().geography_type, GeographyType::Place);
    }

    #[test]
    fn test_zcta_suffix_widths() {
        let links = vec![link("AK4", "ZCTA", "860Z200US99501", "99501")];
        let resolved = resolve(&links, "AK4").unwrap();
        assert_eq!(resolved.census_ids, CensusIds::Plain(vec!["99501".to_string()]));
        // ZCTA location ids are the bare ZIP, no state prefix to strip
        assert_eq!(resolved.location_ids, vec!["99501".to_string()]);
    }

    #[test]
    fn test_tract_returns_county_tract_pair() {
        let links = vec![
            link("AK5", "Census tract", "1400000US02090001700", "Census Tract 17"),
            link("AK5", "Census tract", "1400000US02090001800", "Census Tract 18"),
        ];
        let resolved = resolve(&links, "AK5").unwrap();
        match resolved.census_ids {
            CensusIds::Tract { county, tracts } => {
                assert_eq!(county, "090");
                assert_eq!(tracts, vec!["001700".to_string(), "001800".to_string()]);
            }
            other => panic!("expected tract pair, got {:?}", other),
        }
        // composite 9-digit join keys and 11-digit location ids
        assert_eq!(resolved.geo_keys, vec!["090001700".to_string(), "090001800".to_string()]);
        assert_eq!(
            resolved.location_ids,
            vec!["02090001700".to_string(), "02090001800".to_string()]
        );
    }

    #[test]
    fn test_single_link_still_returns_collection() {
        let links = vec![link("AK6", "County", "0500000US02013", "Aleutians East Borough")];
        let resolved = resolve(&links, "AK6").unwrap();
        assert_eq!(resolved.census_ids.len(), 1);
        assert_eq!(resolved.geo_keys.len(), 1);
    }

    #[test]
    fn test_unknown_place_id() {
        let links = vec![link("AK1", "County", "0500000US02013", "x")];
        let err = resolve(&links, "MISSING").unwrap_err();
        assert_eq!(err.kind(), "UnknownGeography");
    }

    #[test]
    fn test_unrecognized_label() {
        let links = vec![link("AK7", "Borough cluster", "0500000US02013", "x")];
        let err = resolve(&links, "AK7").unwrap_err();
        assert_eq!(err.kind(), "UnrecognizedGeographyType");
    }

    #[test]
    fn test_inconsistent_types_rejected() {
        let links = vec![
            link("AK8", "County", "0500000US02013", "x"),
            link("AK8", "ZCTA", "860Z200US99501", "y"),
        ];
        let err = resolve(&links, "AK8").unwrap_err();
        assert_eq!(err.kind(), "InconsistentGeographyType");
    }

    #[test]
    fn test_too_short_identifier_is_parse_error() {
        let links = vec![link("AK9", "Census tract", "17", "x")];
        let err = resolve(&links, "AK9").unwrap_err();
        assert_eq!(err.kind(), "Parse");
    }

    #[test]
    fn test_state_qualifier_table() {
        assert!(GeographyType::County.requires_state_qualifier());
        assert!(GeographyType::Place.requires_state_qualifier());
        assert!(GeographyType::Tract.requires_state_qualifier());
        assert!(!GeographyType::Zcta.requires_state_qualifier());
        assert!(!GeographyType::Nation.requires_state_qualifier());
    }
}
