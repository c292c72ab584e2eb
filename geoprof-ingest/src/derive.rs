//! Derived measure computation
//!
//! Adds the age-bracket sums, age and race/ethnicity percentage shares, and
//! the adult population to a canonical record. All sums are over disjoint
//! raw brackets; one Unknown addend makes the sum Unknown (no partial-sum
//! fallback).

use crate::types::PerGeographyRecord;
use geoprof_common::{Error, MeasureValue, Result};

const MALE_UNDER_18_BRACKETS: &[&str] = &["m_under_5", "m_5_to_9", "m_10_to_14", "m_15_to_17"];
const FEMALE_UNDER_18_BRACKETS: &[&str] = &["f_under_5", "f_5_to_9", "f_10_to_14", "f_15_to_17"];
const MALE_65_PLUS_BRACKETS: &[&str] = &[
    "m_65_to_66",
    "m_67_to_69",
    "m_70_to_74",
    "m_75_to_79",
    "m_80_to_84",
    "m_85_plus",
];
const FEMALE_65_PLUS_BRACKETS: &[&str] = &[
    "f_65_to_66",
    "f_67_to_69",
    "f_70_to_74",
    "f_75_to_79",
    "f_80_to_84",
    "f_85_plus",
];

/// Race/ethnicity share -> numerator count, all against the `total_p9` base
const RACE_SHARES: &[(&str, &str)] = &[
    ("pct_hispanic_latino", "hispanic_latino"),
    ("pct_white", "white"),
    ("pct_african_american", "african_american"),
    ("pct_amer_indian_ak_native", "amer_indian_ak_native"),
    ("pct_asian", "asian"),
    ("pct_hawaiian_pacislander", "hawaiian_pacislander"),
    ("pct_other", "other"),
    ("pct_multi", "multi"),
];

/// Enrich a record with its derived measures
pub fn derive(mut record: PerGeographyRecord) -> Result<PerGeographyRecord> {
    let m_under_18 = bracket_sum(&record, MALE_UNDER_18_BRACKETS);
    let f_under_18 = bracket_sum(&record, FEMALE_UNDER_18_BRACKETS);
    let total_under_18 = m_under_18 + f_under_18;
    let total_under_5 = record.value("m_under_5") + record.value("f_under_5");

    let m_65_plus = bracket_sum(&record, MALE_65_PLUS_BRACKETS);
    let f_65_plus = bracket_sum(&record, FEMALE_65_PLUS_BRACKETS);
    let total_65_plus = m_65_plus + f_65_plus;

    record.set_value("m_under_18", m_under_18);
    record.set_value("f_under_18", f_under_18);
    record.set_value("total_under_18", total_under_18);
    record.set_value("total_under_5", total_under_5);
    record.set_value("m_65_plus", m_65_plus);
    record.set_value("f_65_plus", f_65_plus);
    record.set_value("total_65_plus", total_65_plus);

    let total_population = record.value("total_population");
    let pct_under_18 = share("pct_under_18", total_under_18, total_population)?;
    let pct_65_plus = share("pct_65_plus", total_65_plus, total_population)?;
    record.set_value("pct_under_18", pct_under_18);
    record.set_value("pct_65_plus", pct_65_plus);

    let total_p9 = record.value("total_p9");
    for (share_name, count_name) in RACE_SHARES {
        let value = share(share_name, record.value(count_name), total_p9)?;
        record.set_value(*share_name, value);
    }

    record.set_value(
        "adult_population",
        adult_population(total_population, pct_under_18),
    );

    Ok(record)
}

/// Residents aged 18 and over, the denominator for adult-only percentages:
/// `total_population × (1 − pct_under_18/100)`, rounded to a whole count
pub fn adult_population(
    total_population: MeasureValue,
    pct_under_18: MeasureValue,
) -> MeasureValue {
    total_population
        .zip_with(pct_under_18, |total, pct| total * (1.0 - pct / 100.0))
        .map(f64::round)
}

fn bracket_sum(record: &PerGeographyRecord, brackets: &[&str]) -> MeasureValue {
    brackets.iter().map(|name| record.value(name)).sum()
}

/// `round(numerator / denominator × 100, 2)`; a denominator of exactly zero
/// is a contract violation, not a silent Unknown
fn share(measure: &str, numerator: MeasureValue, denominator: MeasureValue) -> Result<MeasureValue> {
    if denominator == MeasureValue::Known(0.0) {
        return Err(Error::InvalidDenominator {
            measure: measure.to_string(),
            denominator: "population base".to_string(),
        });
    }
    Ok(numerator
        .zip_with(denominator, |n, d| n / d * 100.0)
        .round2())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::GeographyType;

    fn record_with(values: &[(&str, f64)]) -> PerGeographyRecord {
        let mut record = PerGeographyRecord::new("013", GeographyType::County);
        for (name, value) in values {
            record.set_value(*name, MeasureValue::Known(*value));
        }
        record
    }

    fn full_age_record() -> PerGeographyRecord {
        record_with(&[
            ("total_population", 1000.0),
            ("m_under_5", 30.0),
            ("m_5_to_9", 40.0),
            ("m_10_to_14", 35.0),
            ("m_15_to_17", 20.0),
            ("f_under_5", 25.0),
            ("f_5_to_9", 45.0),
            ("f_10_to_14", 30.0),
            ("f_15_to_17", 25.0),
            ("m_65_to_66", 10.0),
            ("m_67_to_69", 12.0),
            ("m_70_to_74", 15.0),
            ("m_75_to_79", 8.0),
            ("m_80_to_84", 5.0),
            ("m_85_plus", 2.0),
            ("f_65_to_66", 11.0),
            ("f_67_to_69", 13.0),
            ("f_70_to_74", 14.0),
            ("f_75_to_79", 9.0),
            ("f_80_to_84", 6.0),
            ("f_85_plus", 3.0),
        ])
    }

    #[test]
    fn test_bracket_sums() {
        let derived = derive(full_age_record()).unwrap();
        assert_eq!(derived.value("m_under_18"), MeasureValue::Known(125.0));
        assert_eq!(derived.value("f_under_18"), MeasureValue::Known(125.0));
        assert_eq!(derived.value("total_under_18"), MeasureValue::Known(250.0));
        assert_eq!(derived.value("total_under_5"), MeasureValue::Known(55.0));
        assert_eq!(derived.value("total_65_plus"), MeasureValue::Known(108.0));
    }

    #[test]
    fn test_age_shares() {
        let derived = derive(full_age_record()).unwrap();
        assert_eq!(derived.value("pct_under_18"), MeasureValue::Known(25.0));
        assert_eq!(derived.value("pct_65_plus"), MeasureValue::Known(10.8));
    }

    #[test]
    fn test_adult_population() {
        let derived = derive(full_age_record()).unwrap();
        // 1000 × (1 − 0.25) = 750
        assert_eq!(derived.value("adult_population"), MeasureValue::Known(750.0));
    }

    #[test]
    fn test_unknown_addend_poisons_sum() {
        let mut record = full_age_record();
        record.set_value("m_5_to_9", MeasureValue::Unknown);
        let derived = derive(record).unwrap();
        assert!(derived.value("m_under_18").is_unknown());
        assert!(derived.value("total_under_18").is_unknown());
        assert!(derived.value("pct_under_18").is_unknown());
        assert!(derived.value("adult_population").is_unknown());
        // the 65+ chain is untouched
        assert_eq!(derived.value("total_65_plus"), MeasureValue::Known(108.0));
    }

    #[test]
    fn test_race_shares() {
        let mut record = full_age_record();
        record.set_value("total_p9", MeasureValue::Known(1000.0));
        record.set_value("hispanic_latino", MeasureValue::Known(77.0));
        record.set_value("white", MeasureValue::Known(333.0));
        let derived = derive(record).unwrap();
        assert_eq!(derived.value("pct_hispanic_latino"), MeasureValue::Known(7.7));
        assert_eq!(derived.value("pct_white"), MeasureValue::Known(33.3));
        // categories with no counts at all stay unknown
        assert!(derived.value("pct_asian").is_unknown());
    }

    #[test]
    fn test_zero_denominator_is_error() {
        let mut record = full_age_record();
        record.set_value("total_population", MeasureValue::Known(0.0));
        let err = derive(record).unwrap_err();
        assert_eq!(err.kind(), "InvalidDenominator");
    }

    #[test]
    fn test_missing_population_yields_unknown_shares() {
        let mut record = full_age_record();
        record.values.remove("total_population");
        let derived = derive(record).unwrap();
        assert!(derived.value("pct_under_18").is_unknown());
        assert!(derived.value("adult_population").is_unknown());
    }
}
