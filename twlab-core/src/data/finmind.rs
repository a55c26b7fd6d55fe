//! FinMind data feed.
//!
//! Fetches Taiwan daily bars and the instrument list from the FinMind v4 REST
//! API. Handles call spacing, retries with exponential backoff, response
//! envelope parsing, and the circuit breaker.
//!
//! Whole-market snapshots (no `data_id`) require a sponsor-tier token; on a
//! free token FinMind answers with an error envelope, which surfaces as a
//! `DataError` and, through `fetch_or_empty`, as an empty day.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::directory::instruments_from_records;
use super::provider::{DataError, DataFeed, Dataset, FeedRequest, InstrumentDirectory, RawRecord};
use super::rate_limit::RateLimiter;
use crate::domain::InstrumentInfo;

pub const DEFAULT_BASE_URL: &str = "https://api.finmindtrade.com/api/v4/data";

/// Transport settings for the FinMind feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FinMindConfig {
    pub base_url: String,
    /// API token. Anonymous calls work with a much smaller quota.
    pub token: Option<String>,
    /// Minimum spacing between calls.
    pub min_interval: Duration,
    pub max_retries: u32,
    /// First retry delay; doubles on each further attempt.
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for FinMindConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            min_interval: Duration::from_millis(1000),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// FinMind response envelope: `{"msg": "success", "status": 200, "data": [...]}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

pub struct FinMindFeed {
    client: reqwest::blocking::Client,
    config: FinMindConfig,
    limiter: RateLimiter,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl FinMindFeed {
    pub fn new(config: FinMindConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_interval),
            config,
            circuit_breaker,
        })
    }

    /// Query parameters for a request.
    fn query(request: &FeedRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![("dataset", request.dataset.name().to_string())];
        if let Some(id) = &request.instrument_id {
            params.push(("data_id", id.clone()));
        }
        if request.dataset == Dataset::DailyPrice {
            params.push(("start_date", request.start.to_string()));
            if let Some(end) = request.end {
                params.push(("end_date", end.to_string()));
            }
        }
        params
    }

    /// Unwrap the FinMind envelope into records.
    fn parse_envelope(envelope: Envelope) -> Result<Vec<RawRecord>, DataError> {
        match envelope.status {
            Some(200) | None => {}
            Some(402) => {
                return Err(DataError::RateLimited {
                    retry_after_secs: 3600,
                })
            }
            Some(401) | Some(403) => {
                return Err(DataError::AuthenticationRequired(envelope.msg));
            }
            Some(code) => {
                return Err(DataError::Other(format!("status {code}: {}", envelope.msg)));
            }
        }

        let data = envelope
            .data
            .ok_or_else(|| DataError::ResponseFormatChanged("envelope has no data".into()))?;
        let serde_json::Value::Array(rows) = data else {
            return Err(DataError::ResponseFormatChanged("data is not an array".into()));
        };

        rows.into_iter()
            .map(|row| match row {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(DataError::ResponseFormatChanged(format!(
                    "data row is not an object: {other}"
                ))),
            })
            .collect()
    }

    fn fetch_with_retry(&self, request: &FeedRequest) -> Result<Vec<RawRecord>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let params = Self::query(request);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying FinMind call");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }
            self.limiter.acquire();

            let mut call = self.client.get(&self.config.base_url).query(&params);
            if let Some(token) = &self.config.token {
                call = call.bearer_auth(token);
            }

            let resp = match call.send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "FinMind rejected the token".into(),
                ));
            }
            if status == reqwest::StatusCode::PAYMENT_REQUIRED
                || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: 3600,
                });
                continue;
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status}")));
                continue;
            }

            let envelope: Envelope = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse FinMind response: {e}"))
            })?;

            match Self::parse_envelope(envelope) {
                Ok(records) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        dataset = request.dataset.name(),
                        instrument = request.instrument_id.as_deref().unwrap_or("*"),
                        rows = records.len(),
                        "FinMind call succeeded"
                    );
                    return Ok(records);
                }
                Err(e @ DataError::RateLimited { .. }) => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let err = last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into()));
        warn!(error = %err, "FinMind call gave up");
        Err(err)
    }
}

impl DataFeed for FinMindFeed {
    fn name(&self) -> &str {
        "finmind"
    }

    fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawRecord>, DataError> {
        self.fetch_with_retry(request)
    }
}

impl InstrumentDirectory for FinMindFeed {
    fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, DataError> {
        let request = FeedRequest {
            dataset: Dataset::InstrumentInfo,
            instrument_id: None,
            start: chrono::NaiveDate::MIN,
            end: None,
        };
        let records = self.fetch_with_retry(&request)?;
        Ok(instruments_from_records(&records))
    }
}
