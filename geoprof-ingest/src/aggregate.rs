//! Statistical aggregation engine
//!
//! Produces exactly one record per place. A place linked to a single
//! geography passes through unchanged; a place linked to several
//! geographies is pooled, with a separate rule per measure class:
//!
//! - counts are summed;
//! - percentages are recombined through their denominator populations
//!   (percent → implied count → sum → percent; averaging percentages
//!   directly is invalid when sub-geography populations differ);
//! - percentages carrying 95% confidence limits get a pooled standard
//!   deviation backed out of the reported half-widths, and new 90% bounds;
//! - percentages carrying a margin of error get a root-sum-square pooled
//!   MOE;
//! - rates with no population denominator are averaged.
//!
//! All arithmetic runs at full precision; published values are rounded to
//! two decimals only as the final step.

use crate::catalog::MeasureCatalog;
use crate::derive::adult_population;
use crate::types::{
    AggregatedRecord, Denominator, MeasureKind, PerGeographyRecord, HIGH_BOUND_PREFIX,
    LOW_BOUND_PREFIX, MOE_PREFIX,
};
use geoprof_common::{Error, MeasureValue, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Delimiter joining per-geography provenance columns in the output row
const PROVENANCE_DELIMITER: &str = "; ";

/// Z-score of the reported 95% confidence limits
const Z_95: f64 = 1.96;
/// Z-score of the reconstructed 90% confidence bounds
const Z_90: f64 = 1.645;

/// Aggregate one place's per-geography records into its single profile row
pub fn aggregate(
    place_id: &str,
    place_name: &str,
    comment: &str,
    group: &[PerGeographyRecord],
    catalog: &MeasureCatalog,
) -> Result<AggregatedRecord> {
    if group.is_empty() {
        return Err(Error::UnknownGeography(place_id.to_string()));
    }

    // type disagreement is fatal before any pooling arithmetic
    let geography_type = group[0].geography_type;
    for record in &group[1..] {
        if record.geography_type != geography_type {
            return Err(Error::InconsistentGeographyType {
                place_id: place_id.to_string(),
                found: format!(
                    "{} vs {}",
                    geography_type.label(),
                    record.geography_type.label()
                ),
            });
        }
    }

    let mut values = if group.len() == 1 {
        pass_through(&group[0], catalog)
    } else {
        debug!(
            place_id = %place_id,
            sub_geographies = group.len(),
            "Pooling multi-geography place"
        );
        pool(place_id, group, catalog)?
    };

    // publication rounding happens last, after all pooling arithmetic
    for value in values.values_mut() {
        *value = value.round2();
    }

    Ok(AggregatedRecord {
        place_id: place_id.to_string(),
        place_name: place_name.to_string(),
        geography_type,
        geo_keys: join_provenance(group.iter().map(|r| r.geo_key.as_str())),
        source_place_names: join_provenance(group.iter().map(|r| r.source_place_name.as_str())),
        comment: comment.to_string(),
        values,
    })
}

/// Single-geography identity path: published measures and their bounds are
/// copied as-is
fn pass_through(
    record: &PerGeographyRecord,
    catalog: &MeasureCatalog,
) -> BTreeMap<String, MeasureValue> {
    let mut values = BTreeMap::new();
    for measure in catalog.published() {
        let name = measure.short_name.as_str();
        let value = record.value(name);
        values.insert(name.to_string(), value);

        match measure.kind {
            MeasureKind::PercentageWithCi { .. } => {
                values.insert(low_name(name), record.value(&low_name(name)));
                values.insert(high_name(name), record.value(&high_name(name)));
            }
            MeasureKind::PercentageWithMoe { .. } => {
                let moe = record.value(&moe_name(name));
                values.insert(moe_name(name), moe);
                values.insert(low_name(name), (value - moe).max_zero());
                values.insert(high_name(name), value + moe);
            }
            MeasureKind::Count | MeasureKind::Percentage { .. } | MeasureKind::MeanRate => {}
        }
    }
    values
}

/// Multi-geography pooling path
fn pool(
    place_id: &str,
    group: &[PerGeographyRecord],
    catalog: &MeasureCatalog,
) -> Result<BTreeMap<String, MeasureValue>> {
    let total_populations: Vec<MeasureValue> =
        group.iter().map(|r| r.value("total_population")).collect();
    let adult_populations: Vec<MeasureValue> = group
        .iter()
        .map(|r| adult_population(r.value("total_population"), r.value("pct_under_18")))
        .collect();

    let denominators_of = |denominator: Denominator| match denominator {
        Denominator::TotalPopulation => total_populations.as_slice(),
        Denominator::AdultPopulation => adult_populations.as_slice(),
    };

    let mut values = BTreeMap::new();
    for measure in catalog.published() {
        let name = measure.short_name.as_str();
        let measure_values: Vec<MeasureValue> = group.iter().map(|r| r.value(name)).collect();

        match measure.kind {
            MeasureKind::Count => {
                values.insert(name.to_string(), measure_values.iter().copied().sum());
            }
            MeasureKind::Percentage { denominator } => {
                let pooled = weighted_percentage(&measure_values, denominators_of(denominator));
                values.insert(name.to_string(), pooled);
            }
            MeasureKind::PercentageWithCi { denominator } => {
                let denominators = denominators_of(denominator);
                let pooled = weighted_percentage(&measure_values, denominators);

                let high_bounds: Vec<MeasureValue> =
                    group.iter().map(|r| r.value(&high_name(name))).collect();
                let pooled_sd = pooled_standard_deviation(
                    place_id,
                    &measure_values,
                    &high_bounds,
                    denominators,
                )?;

                let population_sum: MeasureValue = denominators.iter().copied().sum();
                let half_width = pooled_sd.zip_with(population_sum, |sd, pop| {
                    Z_90 * sd / pop.sqrt()
                });
                values.insert(low_name(name), (pooled - half_width).max_zero());
                values.insert(high_name(name), pooled + half_width);
                values.insert(name.to_string(), pooled);
            }
            MeasureKind::PercentageWithMoe { denominator } => {
                let pooled = weighted_percentage(&measure_values, denominators_of(denominator));

                // root-sum-square of the sub-geography margins of error
                let pooled_moe = group
                    .iter()
                    .map(|r| r.value(&moe_name(name)).map(|m| m * m))
                    .sum::<MeasureValue>()
                    .map(f64::sqrt);

                values.insert(low_name(name), (pooled - pooled_moe).max_zero());
                values.insert(high_name(name), pooled + pooled_moe);
                values.insert(moe_name(name), pooled_moe);
                values.insert(name.to_string(), pooled);
            }
            MeasureKind::MeanRate => {
                let sum: MeasureValue = measure_values.iter().copied().sum();
                let mean = sum.map(|s| s / group.len() as f64);
                values.insert(name.to_string(), mean);
            }
        }
    }

    Ok(values)
}

/// Population-weighted recombination: percent → implied count → sum →
/// percent against the summed denominator
fn weighted_percentage(
    percentages: &[MeasureValue],
    denominators: &[MeasureValue],
) -> MeasureValue {
    let implied_count_sum: MeasureValue = percentages
        .iter()
        .zip(denominators)
        .map(|(pct, den)| pct.zip_with(*den, |p, d| p / 100.0 * d))
        .sum();
    let denominator_sum: MeasureValue = denominators.iter().copied().sum();
    (implied_count_sum / denominator_sum).map(|fraction| fraction * 100.0)
}

/// Pool the implied standard deviations of several sub-geographies.
///
/// Each reported 95% half-width implies `sd = (high − value)·√pop / 1.96`;
/// its variance contributes with weight `(pop − 1)`. The pooled variance is
/// the contribution sum over `(Σ pop − n)` degrees of freedom.
fn pooled_standard_deviation(
    place_id: &str,
    values: &[MeasureValue],
    high_bounds: &[MeasureValue],
    denominators: &[MeasureValue],
) -> Result<MeasureValue> {
    let population_sum: MeasureValue = denominators.iter().copied().sum();
    let sub_geography_count = denominators.len() as f64;

    // degenerate degrees of freedom are a fatal condition, not an Unknown
    if let Some(pop) = population_sum.as_f64() {
        if pop - sub_geography_count == 0.0 {
            return Err(Error::InvalidPooling {
                place_id: place_id.to_string(),
            });
        }
    }

    let contribution_sum: MeasureValue = values
        .iter()
        .zip(high_bounds)
        .zip(denominators)
        .map(|((value, high), den)| {
            let implied_sd = high
                .zip_with(*value, |h, v| h - v)
                .zip_with(*den, |half_width, pop| half_width * pop.sqrt() / Z_95);
            implied_sd
                .map(|sd| sd * sd)
                .zip_with(*den, |variance, pop| variance * (pop - 1.0))
        })
        .sum();

    Ok(contribution_sum
        .zip_with(population_sum, |sum, pop| sum / (pop - sub_geography_count))
        .map(f64::sqrt))
}

fn low_name(measure: &str) -> String {
    format!("{}{}", LOW_BOUND_PREFIX, measure)
}

fn high_name(measure: &str) -> String {
    format!("{}{}", HIGH_BOUND_PREFIX, measure)
}

fn moe_name(measure: &str) -> String {
    format!("{}{}", MOE_PREFIX, measure)
}

fn join_provenance<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(PROVENANCE_DELIMITER)
}
