//! Per-place profile pipeline and fan-out
//!
//! For each place id: resolve its geographies, fetch all three source
//! families concurrently, normalize and join the rows by canonical
//! geography key, derive the computed measures, and aggregate into one
//! record. Places are processed by a bounded worker pool; completion order
//! is unspecified and the output is re-ordered to the lookup table's
//! first-appearance order, so the run is deterministic.
//!
//! A failed place is logged with its id and failure kind and omitted from
//! the output; other places are unaffected.

use crate::aggregate::aggregate;
use crate::catalog::MeasureCatalog;
use crate::comment::build_comments;
use crate::derive::derive;
use crate::error::{IngestError, IngestResult};
use crate::geography::resolve;
use crate::lookup::LookupTable;
use crate::normalize::normalize;
use crate::types::{AggregatedRecord, FetchOutcome, PerGeographyRecord, SourceFetcher};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct ProfileRun {
    /// One record per successful place, in lookup first-appearance order
    pub records: Vec<AggregatedRecord>,
    /// Failed places with their failure, in lookup first-appearance order
    pub failures: Vec<(String, IngestError)>,
}

/// The profile pipeline
pub struct ProfileBuilder {
    catalog: Arc<MeasureCatalog>,
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    workers: usize,
}

impl ProfileBuilder {
    pub fn new(
        catalog: MeasureCatalog,
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        workers: usize,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            fetchers,
            workers: workers.max(1),
        }
    }

    /// Build one profile record per place in the lookup table
    pub async fn build_profiles(&self, table: &LookupTable) -> ProfileRun {
        let comments = build_comments(table.links());
        let place_ids = table.place_ids();
        let total = place_ids.len();

        info!(places = total, workers = self.workers, "Starting profile run");

        let results: Vec<(String, IngestResult<AggregatedRecord>)> =
            stream::iter(place_ids.iter().cloned().map(|place_id| {
                let comments = &comments;
                async move {
                    let result = self.build_place(table, &place_id, comments).await;
                    (place_id, result)
                }
            }))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        // re-order to lookup order regardless of completion order
        let mut by_id: HashMap<String, IngestResult<AggregatedRecord>> =
            results.into_iter().collect();
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for place_id in &place_ids {
            match by_id.remove(place_id) {
                Some(Ok(record)) => records.push(record),
                Some(Err(error)) => {
                    warn!(
                        place_id = %place_id,
                        kind = error.kind(),
                        error = %error,
                        "Place failed; omitting from output"
                    );
                    failures.push((place_id.clone(), error));
                }
                None => {}
            }
        }

        info!(
            succeeded = records.len(),
            failed = failures.len(),
            "Profile run complete"
        );

        ProfileRun { records, failures }
    }

    /// Resolve, fetch, normalize, derive, and aggregate one place
    async fn build_place(
        &self,
        table: &LookupTable,
        place_id: &str,
        comments: &HashMap<String, String>,
    ) -> IngestResult<AggregatedRecord> {
        let resolved = resolve(table.links(), place_id)?;

        // all source families in flight together
        let outcomes =
            futures::future::join_all(self.fetchers.iter().map(|f| f.fetch(&resolved))).await;

        // seed one record per linked geography, then absorb each family's
        // normalized rows by canonical key
        let mut group: Vec<PerGeographyRecord> = resolved
            .geo_keys
            .iter()
            .zip(&resolved.source_place_names)
            .map(|(geo_key, source_place_name)| {
                let mut record = PerGeographyRecord::new(geo_key, resolved.geography_type);
                record.source_place_name = source_place_name.clone();
                record
            })
            .collect();

        for (fetcher, outcome) in self.fetchers.iter().zip(outcomes) {
            let family = fetcher.family();
            match outcome.map_err(|source| IngestError::Fetch { family, source })? {
                FetchOutcome::NoData => {
                    // all measures of this family stay Unknown
                    info!(
                        place_id = %place_id,
                        family = %family,
                        "Source has no data for this geography"
                    );
                }
                FetchOutcome::Rows(rows) => {
                    let normalized =
                        normalize(&rows, &self.catalog, family, resolved.geography_type)
                            .map_err(IngestError::Common)?;
                    for record in normalized {
                        match group.iter_mut().find(|g| g.geo_key == record.geo_key) {
                            Some(target) => target.absorb(record),
                            None => warn!(
                                place_id = %place_id,
                                family = %family,
                                geo_key = %record.geo_key,
                                "Row for a geography the place is not linked to; ignoring"
                            ),
                        }
                    }
                }
            }
        }

        let group: Vec<PerGeographyRecord> = group
            .into_iter()
            .map(derive)
            .collect::<Result<_, _>>()
            .map_err(IngestError::Common)?;

        let comment = comments.get(place_id).map(String::as_str).unwrap_or("");
        aggregate(place_id, &resolved.place_name, comment, &group, &self.catalog)
            .map_err(IngestError::Common)
    }
}
