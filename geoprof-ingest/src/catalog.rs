//! Measure catalog
//!
//! Immutable configuration mapping each source family's variable codes to
//! canonical short measure names and measure kinds, plus the base query
//! endpoints per source and geography type. Constructed once at startup and
//! passed explicitly into the normalizer, aggregator, and fetch clients.

use crate::geography::GeographyType;
use crate::types::{Denominator, MeasureKind, SourceFamily};
use serde::{Deserialize, Serialize};

/// Source variable code -> canonical short name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeMapping {
    pub code: String,
    pub short_name: String,
}

/// Semantic registration of one canonical measure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureSpec {
    pub short_name: String,
    pub kind: MeasureKind,
    /// Whether the measure appears in the published output table.
    /// Unpublished measures are intermediates (raw brackets, denominators).
    pub publish: bool,
}

/// A census-style source (decennial or survey family): one base URL, one
/// query for all variable codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusSource {
    pub base_url: String,
    pub codes: Vec<CodeMapping>,
}

impl CensusSource {
    /// Comma-joined variable codes for the `get=` query parameter
    pub fn code_list(&self) -> String {
        self.codes
            .iter()
            .map(|m| m.code.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Health-family endpoints, one per queryable geography type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEndpoints {
    pub county: String,
    pub place: String,
    pub zcta: String,
    pub tract: String,
}

impl HealthEndpoints {
    /// Endpoint for a geography type; the health source only publishes
    /// county, place, ZCTA, and tract releases
    pub fn for_type(&self, geography_type: GeographyType) -> Option<&str> {
        match geography_type {
            GeographyType::County => Some(&self.county),
            GeographyType::Place => Some(&self.place),
            GeographyType::Zcta => Some(&self.zcta),
            GeographyType::Tract => Some(&self.tract),
            GeographyType::State | GeographyType::Nation => None,
        }
    }
}

/// One health-family variable: queried individually per location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthVariable {
    pub code: String,
    pub short_name: String,
    /// Data-value-type pin (crude prevalence) applied for county and place
    /// queries; ZCTA and tract releases publish only one value type
    pub value_type_id: Option<String>,
}

/// One health-family dataset (measure release)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDataset {
    pub name: String,
    pub endpoints: HealthEndpoints,
    pub variables: Vec<HealthVariable>,
}

/// The full measure catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureCatalog {
    pub decennial: CensusSource,
    pub survey: CensusSource,
    pub health: Vec<HealthDataset>,
    measures: Vec<MeasureSpec>,
}

impl MeasureCatalog {
    /// Canonical short name for a source variable code, per family.
    /// Returns None for unrecognized codes (they pass through unchanged).
    pub fn rename(&self, family: SourceFamily, code: &str) -> Option<&str> {
        match family {
            SourceFamily::Decennial => lookup_code(&self.decennial.codes, code),
            SourceFamily::Survey => lookup_code(&self.survey.codes, code),
            SourceFamily::Health => self
                .health
                .iter()
                .flat_map(|d| d.variables.iter())
                .find(|v| v.code == code)
                .map(|v| v.short_name.as_str()),
        }
    }

    /// Measure kind for a canonical short name
    pub fn kind_of(&self, short_name: &str) -> Option<MeasureKind> {
        self.measures
            .iter()
            .find(|m| m.short_name == short_name)
            .map(|m| m.kind)
    }

    /// Published measures in output-column order
    pub fn published(&self) -> impl Iterator<Item = &MeasureSpec> {
        self.measures.iter().filter(|m| m.publish)
    }

    /// The built-in catalog for the production source families
    pub fn builtin() -> MeasureCatalog {
        MeasureCatalog {
            decennial: CensusSource {
                base_url: "https://api.census.gov/data/2020/dec/dhc".to_string(),
                codes: decennial_codes(),
            },
            survey: CensusSource {
                // Subject tables; variables outside subject tables need a
                // different base URL
                base_url: "https://api.census.gov/data/2020/acs/acs5/subject".to_string(),
                codes: survey_codes(),
            },
            health: vec![prevalence_dataset(), sdoh_dataset()],
            measures: measure_registry(),
        }
    }
}

fn lookup_code<'a>(codes: &'a [CodeMapping], code: &str) -> Option<&'a str> {
    codes
        .iter()
        .find(|m| m.code == code)
        .map(|m| m.short_name.as_str())
}

fn mapping(code: &str, short_name: &str) -> CodeMapping {
    CodeMapping {
        code: code.to_string(),
        short_name: short_name.to_string(),
    }
}

/// Decennial sex-by-age and Hispanic-or-Latino-by-race variable codes
fn decennial_codes() -> Vec<CodeMapping> {
    vec![
        // totals
        mapping("P12_001N", "total_population"),
        mapping("P12_002N", "total_male"),
        mapping("P12_026N", "total_female"),
        // male by age category
        mapping("P12_003N", "m_under_5"),
        mapping("P12_004N", "m_5_to_9"),
        mapping("P12_005N", "m_10_to_14"),
        mapping("P12_006N", "m_15_to_17"),
        mapping("P12_020N", "m_65_to_66"),
        mapping("P12_021N", "m_67_to_69"),
        mapping("P12_022N", "m_70_to_74"),
        mapping("P12_023N", "m_75_to_79"),
        mapping("P12_024N", "m_80_to_84"),
        mapping("P12_025N", "m_85_plus"),
        // female by age category
        mapping("P12_027N", "f_under_5"),
        mapping("P12_028N", "f_5_to_9"),
        mapping("P12_029N", "f_10_to_14"),
        mapping("P12_030N", "f_15_to_17"),
        mapping("P12_044N", "f_65_to_66"),
        mapping("P12_045N", "f_67_to_69"),
        mapping("P12_046N", "f_70_to_74"),
        mapping("P12_047N", "f_75_to_79"),
        mapping("P12_048N", "f_80_to_84"),
        mapping("P12_049N", "f_85_plus"),
        // race / ethnicity
        mapping("P9_001N", "total_p9"),
        mapping("P9_002N", "hispanic_latino"),
        mapping("P9_005N", "white"),
        mapping("P9_006N", "african_american"),
        mapping("P9_007N", "amer_indian_ak_native"),
        mapping("P9_008N", "asian"),
        mapping("P9_009N", "hawaiian_pacislander"),
        mapping("P9_010N", "other"),
        mapping("P9_011N", "multi"),
    ]
}

/// Survey estimate and margin-of-error variable codes
fn survey_codes() -> Vec<CodeMapping> {
    vec![
        mapping("S1810_C03_001E", "pct_w_disability"),
        mapping("S1810_C03_001M", "moe_pct_w_disability"),
        mapping("S2701_C03_001E", "pct_insured"),
        mapping("S2701_C03_001M", "moe_pct_insured"),
        mapping("S2701_C05_001E", "pct_uninsured"),
        mapping("S2701_C05_001M", "moe_pct_uninsured"),
    ]
}

fn health_variable(code: &str, short_name: &str, value_type_id: Option<&str>) -> HealthVariable {
    HealthVariable {
        code: code.to_string(),
        short_name: short_name.to_string(),
        value_type_id: value_type_id.map(str::to_string),
    }
}

/// Adult chronic-condition prevalence dataset (value + 95% CI limits)
fn prevalence_dataset() -> HealthDataset {
    HealthDataset {
        name: "places".to_string(),
        endpoints: HealthEndpoints {
            county: "https://data.cdc.gov/resource/swc5-untb.json".to_string(),
            place: "https://data.cdc.gov/resource/eav7-hnsx.json".to_string(),
            zcta: "https://data.cdc.gov/resource/qnzd-25i4.json".to_string(),
            tract: "https://data.cdc.gov/resource/cwsq-ngmh.json".to_string(),
        },
        variables: vec![
            health_variable("CASTHMA", "pct_asthma", Some("CrdPrv")),
            health_variable("COPD", "pct_copd", Some("CrdPrv")),
            health_variable("CHD", "pct_hd", Some("CrdPrv")),
            health_variable("STROKE", "pct_stroke", Some("CrdPrv")),
            health_variable("DIABETES", "pct_diabetes", Some("CrdPrv")),
            health_variable("KIDNEY", "pct_kd", Some("CrdPrv")),
        ],
    }
}

/// Social-determinants dataset (value only)
fn sdoh_dataset() -> HealthDataset {
    HealthDataset {
        name: "sdoh".to_string(),
        endpoints: HealthEndpoints {
            county: "https://data.cdc.gov/resource/i6u4-y3g4.json".to_string(),
            place: "https://data.cdc.gov/resource/edkk-ze78.json".to_string(),
            zcta: "https://data.cdc.gov/resource/bumh-rgsq.json".to_string(),
            tract: "https://data.cdc.gov/resource/e539-uadk.json".to_string(),
        },
        variables: vec![
            health_variable("REMNRTY", "pct_minority", None),
            health_variable("NOHSDP", "pct_no_hsdiploma", None),
            health_variable("POV150", "pct_below_150pov", None),
            health_variable("BROAD", "pct_no_bband", None),
        ],
    }
}

fn spec(short_name: &str, kind: MeasureKind, publish: bool) -> MeasureSpec {
    MeasureSpec {
        short_name: short_name.to_string(),
        kind,
        publish,
    }
}

/// The semantic registry: every canonical measure the pipeline produces,
/// in published-column order (published entries first)
fn measure_registry() -> Vec<MeasureSpec> {
    use Denominator::{AdultPopulation, TotalPopulation};
    use MeasureKind::{Count, MeanRate, Percentage, PercentageWithCi, PercentageWithMoe};

    let mut measures = vec![
        // published profile measures
        spec("total_population", Count, true),
        spec("pct_under_18", Percentage { denominator: TotalPopulation }, true),
        spec("pct_65_plus", Percentage { denominator: TotalPopulation }, true),
        spec("pct_hispanic_latino", Percentage { denominator: TotalPopulation }, true),
        spec("pct_white", Percentage { denominator: TotalPopulation }, true),
        spec("pct_african_american", Percentage { denominator: TotalPopulation }, true),
        spec("pct_amer_indian_ak_native", Percentage { denominator: TotalPopulation }, true),
        spec("pct_asian", Percentage { denominator: TotalPopulation }, true),
        spec("pct_hawaiian_pacislander", Percentage { denominator: TotalPopulation }, true),
        spec("pct_other", Percentage { denominator: TotalPopulation }, true),
        spec("pct_multi", Percentage { denominator: TotalPopulation }, true),
        spec("pct_w_disability", PercentageWithMoe { denominator: TotalPopulation }, true),
        spec("pct_insured", PercentageWithMoe { denominator: TotalPopulation }, true),
        spec("pct_uninsured", PercentageWithMoe { denominator: TotalPopulation }, true),
        spec("pct_asthma", PercentageWithCi { denominator: AdultPopulation }, true),
        spec("pct_copd", PercentageWithCi { denominator: AdultPopulation }, true),
        spec("pct_hd", PercentageWithCi { denominator: AdultPopulation }, true),
        spec("pct_stroke", PercentageWithCi { denominator: AdultPopulation }, true),
        spec("pct_diabetes", PercentageWithCi { denominator: AdultPopulation }, true),
        spec("pct_kd", PercentageWithCi { denominator: AdultPopulation }, true),
        spec("pct_minority", Percentage { denominator: TotalPopulation }, true),
        spec("pct_no_hsdiploma", Percentage { denominator: AdultPopulation }, true),
        spec("pct_below_150pov", Percentage { denominator: TotalPopulation }, true),
        // household-based, no population denominator to weight by
        spec("pct_no_bband", MeanRate, true),
    ];

    // intermediates: raw brackets, bracket sums, denominators
    let intermediates = [
        "total_male",
        "total_female",
        "m_under_5",
        "m_5_to_9",
        "m_10_to_14",
        "m_15_to_17",
        "m_65_to_66",
        "m_67_to_69",
        "m_70_to_74",
        "m_75_to_79",
        "m_80_to_84",
        "m_85_plus",
        "f_under_5",
        "f_5_to_9",
        "f_10_to_14",
        "f_15_to_17",
        "f_65_to_66",
        "f_67_to_69",
        "f_70_to_74",
        "f_75_to_79",
        "f_80_to_84",
        "f_85_plus",
        "total_p9",
        "hispanic_latino",
        "white",
        "african_american",
        "amer_indian_ak_native",
        "asian",
        "hawaiian_pacislander",
        "other",
        "multi",
        "m_under_18",
        "f_under_18",
        "total_under_18",
        "total_under_5",
        "m_65_plus",
        "f_65_plus",
        "total_65_plus",
        "adult_population",
    ];
    measures.extend(intermediates.iter().map(|name| spec(name, Count, false)));

    measures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_known_codes() {
        let catalog = MeasureCatalog::builtin();
        assert_eq!(
            catalog.rename(SourceFamily::Decennial, "P12_001N"),
            Some("total_population")
        );
        assert_eq!(
            catalog.rename(SourceFamily::Survey, "S2701_C03_001M"),
            Some("moe_pct_insured")
        );
        assert_eq!(catalog.rename(SourceFamily::Health, "CASTHMA"), Some("pct_asthma"));
    }

    #[test]
    fn test_unrecognized_code_is_none() {
        let catalog = MeasureCatalog::builtin();
        assert_eq!(catalog.rename(SourceFamily::Decennial, "P99_999N"), None);
    }

    #[test]
    fn test_kind_registry() {
        let catalog = MeasureCatalog::builtin();
        assert_eq!(catalog.kind_of("total_population"), Some(MeasureKind::Count));
        assert_eq!(
            catalog.kind_of("pct_asthma"),
            Some(MeasureKind::PercentageWithCi { denominator: Denominator::AdultPopulation })
        );
        assert_eq!(
            catalog.kind_of("pct_insured"),
            Some(MeasureKind::PercentageWithMoe { denominator: Denominator::TotalPopulation })
        );
        assert_eq!(catalog.kind_of("pct_no_bband"), Some(MeasureKind::MeanRate));
        assert_eq!(catalog.kind_of("nonexistent"), None);
    }

    #[test]
    fn test_published_order_starts_with_population() {
        let catalog = MeasureCatalog::builtin();
        let published: Vec<&str> =
            catalog.published().map(|m| m.short_name.as_str()).collect();
        assert_eq!(published[0], "total_population");
        assert!(published.contains(&"pct_kd"));
        // intermediates never publish
        assert!(!published.contains(&"m_under_5"));
        assert!(!published.contains(&"adult_population"));
    }

    #[test]
    fn test_health_endpoints_by_type() {
        let catalog = MeasureCatalog::builtin();
        let places = &catalog.health[0];
        assert!(places.endpoints.for_type(GeographyType::County).is_some());
        assert!(places.endpoints.for_type(GeographyType::Nation).is_none());
    }

    #[test]
    fn test_code_list_is_comma_joined() {
        let catalog = MeasureCatalog::builtin();
        let list = catalog.survey.code_list();
        assert!(list.starts_with("S1810_C03_001E,"));
        assert_eq!(list.split(',').count(), 6);
    }
}
