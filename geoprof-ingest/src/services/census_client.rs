//! Census-style API client
//!
//! Serves the decennial-count and survey-estimate families. One query per
//! place fetches every catalog variable for all of the place's geography
//! identifiers; responses arrive as an array-of-arrays (header row first).

use crate::catalog::CensusSource;
use crate::geography::{CensusIds, ResolvedGeography};
use crate::services::{RateLimiter, REQUEST_TIMEOUT};
use crate::types::{FetchError, FetchOutcome, RawRow, SourceFamily, SourceFetcher};
use std::sync::Arc;

/// Client for one census-style source family
pub struct CensusFetcher {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    family: SourceFamily,
    source: CensusSource,
    api_key: String,
    state_fips: String,
}

impl CensusFetcher {
    pub fn new(
        family: SourceFamily,
        source: CensusSource,
        api_key: impl Into<String>,
        state_fips: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new()),
            family,
            source,
            api_key: api_key.into(),
            state_fips: state_fips.into(),
        })
    }

    /// Build the query URL for one resolved place
    fn build_url(&self, geography: &ResolvedGeography) -> String {
        build_url(
            &self.source.base_url,
            &self.source.code_list(),
            geography,
            &self.state_fips,
            &self.api_key,
        )
    }
}

/// Query URL construction, per geography type:
/// - ZCTA queries omit the state qualifier
/// - tract queries pass the county and tract portions separately
/// - all other state-scoped types carry the state qualifier
fn build_url(
    base_url: &str,
    code_list: &str,
    geography: &ResolvedGeography,
    state_fips: &str,
    api_key: &str,
) -> String {
    let geography_type = geography.geography_type;
    let segment = geography_type.census_query_segment();

    match &geography.census_ids {
        CensusIds::Tract { county, tracts } => format!(
            "{}?get={}&for=tract:{}&in=state:{}&in=county:{}&key={}",
            base_url,
            code_list,
            tracts.join(","),
            state_fips,
            county,
            api_key
        ),
        CensusIds::Plain(ids) => {
            let id_list = ids.join(",");
            if geography_type.requires_state_qualifier() {
                format!(
                    "{}?get={}&for={}:{}&in=state:{}&key={}",
                    base_url, code_list, segment, id_list, state_fips, api_key
                )
            } else {
                format!(
                    "{}?get={}&for={}:{}&key={}",
                    base_url, code_list, segment, id_list, api_key
                )
            }
        }
    }
}

/// Parse the array-of-arrays payload into raw rows. The first array is the
/// header; cells may arrive as strings, numbers, or null.
fn parse_rows(payload: &serde_json::Value) -> Result<Vec<RawRow>, FetchError> {
    let arrays = payload
        .as_array()
        .ok_or_else(|| FetchError::Parse("expected a JSON array response".to_string()))?;

    let Some((header, data_rows)) = arrays.split_first() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header
        .as_array()
        .ok_or_else(|| FetchError::Parse("expected an array header row".to_string()))?
        .iter()
        .map(cell_to_string)
        .collect();

    let mut rows = Vec::with_capacity(data_rows.len());
    for data_row in data_rows {
        let cells = data_row
            .as_array()
            .ok_or_else(|| FetchError::Parse("expected an array data row".to_string()))?;
        if cells.len() != header.len() {
            return Err(FetchError::Parse(format!(
                "data row has {} cells but the header has {}",
                cells.len(),
                header.len()
            )));
        }
        let mut row = RawRow::new();
        for (column, cell) in header.iter().zip(cells) {
            row.set(column.clone(), cell_to_string(cell));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn cell_to_string(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl SourceFetcher for CensusFetcher {
    fn family(&self) -> SourceFamily {
        self.family
    }

    async fn fetch(&self, geography: &ResolvedGeography) -> Result<FetchOutcome, FetchError> {
        self.rate_limiter.wait().await;

        let url = self.build_url(geography);
        tracing::debug!(
            family = self.family.as_str(),
            place_id = %geography.place_id,
            url = %url,
            "Requesting census-style data"
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        // the source answers "no content" when a geography has no rows
        if status == reqwest::StatusCode::NO_CONTENT || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::NoData);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(FetchOutcome::NoData);
        }
        let payload: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let rows = parse_rows(&payload)?;
        if rows.is_empty() {
            return Ok(FetchOutcome::NoData);
        }
        Ok(FetchOutcome::Rows(rows))
    }
}
