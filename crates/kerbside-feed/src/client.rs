use std::time::Duration;

use chrono::NaiveDateTime;
use kerbside_core::{AppConfig, ParkingSpot};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::ResponseCache;
use crate::envelope::{envelope_status, payload_objects, unwrap_body};
use crate::error::FeedError;
use crate::insights::{
    decode_rows, InsightsDataset, MotorCensusRow, ParkingTrend, PopulationGrowth,
    PopulationRegion, ZoneSegment,
};
use crate::normalize::transform_all;
use crate::retry::RetryPolicy;
use crate::rows::group_rows;
use crate::types::{BackendBayRecord, JoinedBayRow};

const API_KEY_HEADER: &str = "x-api-key";

/// Connection and retry settings for [`BayFeedClient`].
#[derive(Clone)]
pub struct FeedOptions {
    pub base_url: String,
    pub bays_path: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure. `0` disables retries.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// How long a fetched feed is served from memory. Zero disables caching.
    pub cache_ttl: Duration,
}

impl FeedOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            bays_path: config.bays_path.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }
}

impl std::fmt::Debug for FeedOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedOptions")
            .field("base_url", &self.base_url)
            .field("bays_path", &self.bays_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// GET-and-decode plumbing shared by the feed clients.
///
/// Payloads are cached per URL only after the caller's decoder accepted
/// them, so a malformed response is fetched again next time.
struct HttpFeed {
    client: Client,
    api_key: Option<String>,
    retry: RetryPolicy,
    cache: ResponseCache,
}

impl HttpFeed {
    fn new(options: &FeedOptions) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            api_key: options.api_key.clone(),
            retry: RetryPolicy {
                max_retries: options.max_retries,
                backoff_base: Duration::from_millis(options.backoff_base_ms),
            },
            cache: ResponseCache::new(options.cache_ttl),
        })
    }

    async fn get<T>(
        &self,
        url: &str,
        decode: impl Fn(Value, &str) -> Result<T, FeedError>,
    ) -> Result<T, FeedError> {
        if let Some(payload) = self.cache.get(url).await {
            return decode(payload, url);
        }

        let payload = self.retry.run(url, || self.fetch_once(url)).await?;
        let decoded = decode(payload.clone(), url)?;
        self.cache.insert(url, payload).await;
        Ok(decoded)
    }

    /// One GET. Returns the payload with any envelope removed.
    async fn fetch_once(&self, url: &str) -> Result<Value, FeedError> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FeedError::RateLimited { retry_after_secs });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
            context: format!("response from {url}"),
            source: e,
        })?;

        // A Lambda error can still arrive as HTTP 200 with the real status inside.
        if let Some(status) = envelope_status(&value).filter(|s| *s >= 400) {
            return Err(FeedError::UnexpectedStatus {
                status,
                url: url.to_owned(),
            });
        }
        Ok(unwrap_body(value))
    }
}

/// HTTP client for the parking bays endpoint.
///
/// Accepts either grouped records or raw joined rows, bare or wrapped in an
/// API Gateway envelope, and always hands back one [`BackendBayRecord`] per
/// bay. Successful fetches are cached for the configured TTL.
///
/// Transient errors (429, 5xx, network failures) are retried with
/// exponential backoff up to `max_retries` additional attempts. A 429 waits
/// at least as long as its `Retry-After` header asks.
pub struct BayFeedClient {
    http: HttpFeed,
    bays_url: String,
}

impl BayFeedClient {
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidBaseUrl`] if the base URL is not an
    /// absolute http(s) URL, or [`FeedError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(options: &FeedOptions) -> Result<Self, FeedError> {
        let bays_url = build_url(&options.base_url, &options.bays_path)?;
        Ok(Self {
            http: HttpFeed::new(options)?,
            bays_url,
        })
    }

    #[must_use]
    pub fn bays_url(&self) -> &str {
        &self.bays_url
    }

    /// Fetches every bay record, from cache when fresh.
    ///
    /// # Errors
    ///
    /// - [`FeedError::RateLimited`]: HTTP 429 after all retries.
    /// - [`FeedError::NotFound`]: HTTP 404 (not retried).
    /// - [`FeedError::UnexpectedStatus`]: any other non-2xx status, from the
    ///   response or from an envelope's `statusCode`.
    /// - [`FeedError::Http`]: network or TLS failure after all retries.
    /// - [`FeedError::Deserialize`]: body is not JSON.
    /// - [`FeedError::UnexpectedShape`]: body is JSON but not an array.
    pub async fn fetch_records(&self) -> Result<Vec<BackendBayRecord>, FeedError> {
        let records = self.http.get(&self.bays_url, decode_payload).await?;
        tracing::info!(url = %self.bays_url, count = records.len(), "bay feed loaded");
        Ok(records)
    }

    /// Fetches and normalizes the feed. Unusable records are dropped.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::fetch_records`].
    pub async fn fetch_spots(&self, at: NaiveDateTime) -> Result<Vec<ParkingSpot>, FeedError> {
        let records = self.fetch_records().await?;
        Ok(transform_all(records, at))
    }

    /// Drops the cached feed so the next fetch goes to the network.
    pub async fn invalidate(&self) {
        self.http.cache.invalidate(&self.bays_url).await;
    }
}

/// HTTP client for the insights datasets.
///
/// Shares the bay feed's base URL, API key, retry policy and cache TTL. Each
/// dataset is cached under its own URL.
pub struct InsightsClient {
    http: HttpFeed,
    base_url: String,
}

impl InsightsClient {
    /// # Errors
    ///
    /// Same as [`BayFeedClient::new`].
    pub fn new(options: &FeedOptions) -> Result<Self, FeedError> {
        validate_base_url(&options.base_url)?;
        Ok(Self {
            http: HttpFeed::new(options)?,
            base_url: options.base_url.clone(),
        })
    }

    #[must_use]
    pub fn url_for(&self, dataset: InsightsDataset) -> String {
        join_url(&self.base_url, dataset.path())
    }

    /// Yearly sensor occupancy.
    ///
    /// # Errors
    ///
    /// Same as [`BayFeedClient::fetch_records`].
    pub async fn parking_trends(&self) -> Result<Vec<ParkingTrend>, FeedError> {
        self.fetch_rows(InsightsDataset::ParkingTrends).await
    }

    /// Zone segments joined with their bays.
    ///
    /// # Errors
    ///
    /// Same as [`BayFeedClient::fetch_records`].
    pub async fn parking_zones(&self) -> Result<Vec<ZoneSegment>, FeedError> {
        self.fetch_rows(InsightsDataset::ParkingZones).await
    }

    /// Motor vehicle census by state.
    ///
    /// # Errors
    ///
    /// Same as [`BayFeedClient::fetch_records`].
    pub async fn motor_census(&self) -> Result<Vec<MotorCensusRow>, FeedError> {
        self.fetch_rows(InsightsDataset::MotorCensus).await
    }

    /// City population growth per period.
    ///
    /// # Errors
    ///
    /// Same as [`BayFeedClient::fetch_records`].
    pub async fn population_growth(&self) -> Result<Vec<PopulationGrowth>, FeedError> {
        self.fetch_rows(InsightsDataset::PopulationGrowth).await
    }

    /// Regional population by year.
    ///
    /// # Errors
    ///
    /// Same as [`BayFeedClient::fetch_records`].
    pub async fn population_web(&self) -> Result<Vec<PopulationRegion>, FeedError> {
        self.fetch_rows(InsightsDataset::PopulationWeb).await
    }

    /// Forgets every cached dataset.
    pub fn clear_cache(&self) {
        self.http.cache.clear();
    }

    /// Fetches `dataset` decoded as rows of `T`.
    ///
    /// # Errors
    ///
    /// Same as [`BayFeedClient::fetch_records`]; [`FeedError::Deserialize`]
    /// if a row does not fit `T`.
    pub async fn fetch_rows<T: DeserializeOwned>(
        &self,
        dataset: InsightsDataset,
    ) -> Result<Vec<T>, FeedError> {
        let url = self.url_for(dataset);
        let rows: Vec<T> = self.http.get(&url, decode_rows::<T>).await?;
        tracing::info!(url, dataset = %dataset, count = rows.len(), "insights dataset loaded");
        Ok(rows)
    }
}

/// Joins `path` onto `base_url`, keeping any stage prefix in the base.
///
/// `("https://api.example.com/dev/", "/parkingbays")` becomes
/// `"https://api.example.com/dev/parkingbays"`.
pub(crate) fn build_url(base_url: &str, path: &str) -> Result<String, FeedError> {
    validate_base_url(base_url)?;
    Ok(join_url(base_url, path))
}

fn validate_base_url(base_url: &str) -> Result<(), FeedError> {
    let invalid = |reason: &str| FeedError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: reason.to_owned(),
    };

    let parsed = reqwest::Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("URL has no host"));
    }
    Ok(())
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turns a decoded response body into one record per bay.
///
/// Elements that are not JSON objects are skipped. If no object carries a
/// `Restrictions` key the payload is treated as joined rows and grouped.
/// `url` is only used in errors and logs.
///
/// # Errors
///
/// [`FeedError::UnexpectedStatus`] for an envelope carrying a 4xx/5xx
/// `statusCode`, [`FeedError::UnexpectedShape`] if the payload is not an
/// array, [`FeedError::Deserialize`] if an element cannot be read.
pub fn decode_payload(value: Value, url: &str) -> Result<Vec<BackendBayRecord>, FeedError> {
    let objects = payload_objects(value, url)?;

    let deserialize_err = |e| FeedError::Deserialize {
        context: format!("bay feed from {url}"),
        source: e,
    };

    let is_joined = !objects.is_empty() && objects.iter().all(|o| o.get("Restrictions").is_none());
    if is_joined {
        let rows = objects
            .into_iter()
            .map(serde_json::from_value::<JoinedBayRow>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(deserialize_err)?;
        tracing::debug!(url, rows = rows.len(), "grouping joined bay rows");
        return Ok(group_rows(rows));
    }

    objects
        .into_iter()
        .map(serde_json::from_value::<BackendBayRecord>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(deserialize_err)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
