//! Health-measure API client
//!
//! The health source is queried one (variable, location id) pair at a time
//! and returns JSON objects carrying the value plus its 95% confidence
//! limits. This client assembles those answers into one raw row per
//! location id so the rest of the pipeline sees the same tabular shape as
//! the census-style families.

use crate::catalog::HealthDataset;
use crate::geography::{GeographyType, ResolvedGeography};
use crate::services::{RateLimiter, REQUEST_TIMEOUT};
use crate::types::{FetchError, FetchOutcome, RawRow, SourceFamily, SourceFetcher};
use std::sync::Arc;

/// Client for the health-measure source family
pub struct HealthFetcher {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    datasets: Vec<HealthDataset>,
    app_token: String,
}

impl HealthFetcher {
    pub fn new(
        datasets: Vec<HealthDataset>,
        app_token: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new()),
            datasets,
            app_token: app_token.into(),
        })
    }

    async fn query_value(&self, url: &str) -> Result<Option<HealthAnswer>, FetchError> {
        self.rate_limiter.wait().await;
        tracing::debug!(url = %url, "Requesting health data");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), error_text));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(parse_answer(&payload))
    }
}

/// One variable's answer for one location
#[derive(Debug, Clone, PartialEq)]
struct HealthAnswer {
    value: String,
    low_limit: Option<String>,
    high_limit: Option<String>,
}

/// Build the query URL for one (variable, location) pair. The
/// crude-prevalence pin only applies where several value types exist
/// (county and place releases).
fn build_url(
    base_url: &str,
    app_token: &str,
    measure_code: &str,
    value_type_id: Option<&str>,
    location_id: &str,
    geography_type: GeographyType,
) -> String {
    let pin_value_type = matches!(
        geography_type,
        GeographyType::County | GeographyType::Place
    );
    match value_type_id {
        Some(type_id) if pin_value_type => format!(
            "{}?$$app_token={}&measureid={}&datavaluetypeid={}&locationid={}",
            base_url, app_token, measure_code, type_id, location_id
        ),
        _ => format!(
            "{}?$$app_token={}&measureid={}&locationid={}",
            base_url, app_token, measure_code, location_id
        ),
    }
}

/// Extract the first result object's value and confidence limits; an empty
/// result set means the source has no data for this pair.
fn parse_answer(payload: &serde_json::Value) -> Option<HealthAnswer> {
    let first = payload.as_array()?.first()?;
    let value = field_to_string(first.get("data_value")?)?;
    Some(HealthAnswer {
        value,
        low_limit: first.get("low_confidence_limit").and_then(field_to_string),
        high_limit: first.get("high_confidence_limit").and_then(field_to_string),
    })
}

fn field_to_string(field: &serde_json::Value) -> Option<String> {
    match field {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HealthFetcher {
    fn family(&self) -> SourceFamily {
        SourceFamily::Health
    }

    async fn fetch(&self, geography: &ResolvedGeography) -> Result<FetchOutcome, FetchError> {
        let geography_type = geography.geography_type;

        let mut rows = Vec::with_capacity(geography.location_ids.len());
        let mut any_data = false;

        for location_id in &geography.location_ids {
            let mut row = RawRow::new();
            row.set("locationid", location_id.clone());

            for dataset in &self.datasets {
                let Some(base_url) = dataset.endpoints.for_type(geography_type) else {
                    // this source has no release for the geography type
                    return Ok(FetchOutcome::NoData);
                };
                for variable in &dataset.variables {
                    let url = build_url(
                        base_url,
                        &self.app_token,
                        &variable.code,
                        variable.value_type_id.as_deref(),
                        location_id,
                        geography_type,
                    );
                    if let Some(answer) = self.query_value(&url).await? {
                        any_data = true;
                        row.set(variable.code.clone(), answer.value);
                        // confidence limits go straight to canonical bound
                        // names; the normalizer passes them through
                        if let Some(low) = answer.low_limit {
                            row.set(format!("lo_{}", variable.short_name), low);
                        }
                        if let Some(high) = answer.high_limit {
                            row.set(format!("hi_{}", variable.short_name), high);
                        }
                    }
                }
            }
            rows.push(row);
        }

        if !any_data {
            return Ok(FetchOutcome::NoData);
        }
        Ok(FetchOutcome::Rows(rows))
    }
}
