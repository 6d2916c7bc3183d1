//! AMap web API client.
//!
//! Wraps the geocoding and around-search endpoints with rate limiting,
//! bounded retry, pagination, and raw-response backup recording.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::amap::models::{AroundSearchResponse, Coordinates, GeocodeResponse, Poi};
use crate::amap::{PoiFilter, PoiProvider};
use crate::config::{ApiConfig, RateLimitConfig};
use crate::output::backup::BackupWriter;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Wire-level failure. The geocode retry loop treats every variant as a
/// failed attempt; pagination treats every variant as end-of-data.
#[derive(Debug, Error)]
pub enum AmapError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("service returned status {status} (infocode {infocode})")]
    Status { status: String, infocode: String },
    #[error("no geocode result")]
    NoResult,
}

pub struct AmapClient {
    http: reqwest::Client,
    key: SecretString,
    api: ApiConfig,
    limiter: Arc<Limiter>,
    /// Raw-response backup for the address currently being evaluated.
    /// The single run worker serializes access through this lock.
    backup: Mutex<Option<BackupWriter>>,
}

impl AmapClient {
    pub fn new(api: ApiConfig, rate_limit: &RateLimitConfig, key: SecretString) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let limiter = create_rate_limiter(rate_limit);

        Ok(Self {
            http,
            key,
            api,
            limiter,
            backup: Mutex::new(None),
        })
    }

    /// Install the raw backup writer for the next address, replacing any
    /// previous one. Pass `None` to stop recording.
    pub async fn install_backup(&self, writer: Option<BackupWriter>) {
        *self.backup.lock().await = writer;
    }

    async fn rate_limit(&self) {
        self.limiter.until_ready().await;
    }

    async fn record_raw(
        &self,
        request_type: &str,
        poi_label: Option<&str>,
        params: &serde_json::Value,
        status: &str,
        infocode: &str,
        count: &str,
        raw_body: &str,
    ) {
        let mut guard = self.backup.lock().await;
        if let Some(writer) = guard.as_mut() {
            if let Err(e) = writer.record(request_type, poi_label, params, status, infocode, count, raw_body)
            {
                warn!(error = %e, "Failed to append raw backup row");
            }
        }
    }

    async fn fetch_text(&self, url: &str, params: &[(&str, String)]) -> Result<String, AmapError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// One geocode request. Success requires status `"1"` and a nonzero
    /// result count; anything else is a failed attempt.
    async fn geocode_once(&self, address: &str) -> Result<Coordinates, AmapError> {
        self.rate_limit().await;

        let params = vec![
            ("key", self.key.expose_secret().to_string()),
            ("address", address.to_string()),
        ];
        let logged_params = params_json(&params);

        let body = self.fetch_text(&self.api.geocode_url, &params).await?;

        let response: GeocodeResponse = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(e) => {
                self.record_raw("geocode", None, &logged_params, "N/A", "N/A", "N/A", &body)
                    .await;
                return Err(e.into());
            }
        };

        self.record_raw(
            "geocode",
            None,
            &logged_params,
            &response.status,
            &response.infocode,
            &response.count,
            &body,
        )
        .await;

        if response.status != "1" {
            return Err(AmapError::Status {
                status: response.status,
                infocode: response.infocode,
            });
        }
        if response.result_count() == 0 {
            return Err(AmapError::NoResult);
        }

        response
            .geocodes
            .first()
            .and_then(|geocode| Coordinates::parse(&geocode.location))
            .ok_or(AmapError::NoResult)
    }

    #[instrument(skip(self))]
    async fn geocode_with_retry(&self, address: &str) -> Option<Coordinates> {
        let max_retries = self.api.geocode_max_retries;

        for attempt in 1..=max_retries {
            match self.geocode_once(address).await {
                Ok(coords) => {
                    info!(
                        address,
                        longitude = coords.longitude,
                        latitude = coords.latitude,
                        "Address resolved"
                    );
                    return Some(coords);
                }
                Err(e) => {
                    warn!(address, attempt, max_retries, error = %e, "Geocode attempt failed");
                    if attempt < max_retries {
                        tokio::time::sleep(Duration::from_millis(self.api.geocode_retry_delay_ms))
                            .await;
                    }
                }
            }
        }

        None
    }

    /// Fetch all pages for one around-search query. A non-success status,
    /// an empty or short page, the page cap, or a malformed page all end
    /// the walk; whatever was accumulated so far is returned as-is.
    #[instrument(skip(self, center, filter))]
    async fn search_paged(
        &self,
        center: Coordinates,
        radius_m: u32,
        filter: &PoiFilter,
        label: &str,
    ) -> Vec<Poi> {
        let page_size = self.api.page_size;
        let mut all_pois = Vec::new();

        for page_num in 1..=self.api.max_page_num {
            self.rate_limit().await;

            let (filter_key, filter_value) = filter.query_param();
            let mut params = vec![
                ("key", self.key.expose_secret().to_string()),
                ("location", center.to_query()),
                ("radius", radius_m.to_string()),
                ("page_size", page_size.to_string()),
                ("page_num", page_num.to_string()),
                ("show_fields", "business".to_string()),
            ];
            params.push((filter_key, filter_value.to_string()));
            let logged_params = params_json(&params);

            let body = match self.fetch_text(&self.api.around_search_url, &params).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(label, page_num, error = %e, "Search page failed; keeping partial results");
                    break;
                }
            };

            let response: AroundSearchResponse = match serde_json::from_str(&body) {
                Ok(response) => response,
                Err(e) => {
                    self.record_raw("around_search", Some(label), &logged_params, "N/A", "N/A", "N/A", &body)
                        .await;
                    warn!(label, page_num, error = %e, "Malformed search page; keeping partial results");
                    break;
                }
            };

            self.record_raw(
                "around_search",
                Some(label),
                &logged_params,
                &response.status,
                &response.infocode,
                &response.count,
                &body,
            )
            .await;

            if response.status != "1" {
                warn!(
                    label,
                    page_num,
                    status = %response.status,
                    infocode = %response.infocode,
                    "Search page rejected; keeping partial results"
                );
                break;
            }
            if response.pois.is_empty() {
                break;
            }

            let page_count = response.pois.len();
            all_pois.extend(response.pois);

            if (page_count as u32) < page_size {
                break;
            }
        }

        all_pois
    }
}

#[async_trait]
impl PoiProvider for AmapClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        Ok(self.geocode_with_retry(address).await)
    }

    async fn search_around(
        &self,
        center: Coordinates,
        radius_m: u32,
        filter: &PoiFilter,
        label: &str,
    ) -> Result<Vec<Poi>> {
        Ok(self.search_paged(center, radius_m, filter, label).await)
    }
}

fn create_rate_limiter(config: &RateLimitConfig) -> Arc<Limiter> {
    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::new(10).unwrap());
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(1).unwrap());

    let quota = Quota::per_second(rps).allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}

/// Request parameters as JSON for the raw backup, minus the API key.
fn params_json(params: &[(&str, String)]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = params
        .iter()
        .filter(|(name, _)| *name != "key")
        .map(|(name, value)| ((*name).to_string(), serde_json::Value::String(value.clone())))
        .collect();
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_api_config(server_uri: &str, page_size: u32, max_page_num: u32) -> ApiConfig {
        ApiConfig {
            geocode_url: format!("{server_uri}/v3/geocode/geo"),
            around_search_url: format!("{server_uri}/v5/place/around"),
            request_timeout_seconds: 5,
            geocode_max_retries: 2,
            geocode_retry_delay_ms: 10,
            page_size,
            max_page_num,
        }
    }

    fn test_client(server_uri: &str, page_size: u32, max_page_num: u32) -> AmapClient {
        let rate_limit = RateLimitConfig {
            requests_per_second: 1000,
            burst_size: 100,
        };
        AmapClient::new(
            test_api_config(server_uri, page_size, max_page_num),
            &rate_limit,
            SecretString::from("test-key".to_string()),
        )
        .expect("client should build")
    }

    fn poi_json(typecode: &str) -> serde_json::Value {
        serde_json::json!({"name": "p", "typecode": typecode, "distance": "120"})
    }

    fn page_json(pois: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "status": "1",
            "infocode": "10000",
            "count": pois.len().to_string(),
            "pois": pois,
        })
    }

    #[tokio::test]
    async fn test_geocode_returns_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/geocode/geo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "1",
                "count": "1",
                "infocode": "10000",
                "geocodes": [{"location": "104.071216,30.663938"}],
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 25, 40);
        let coords = client.geocode("some address").await.unwrap().unwrap();
        assert!((coords.longitude - 104.071216).abs() < 1e-9);
        assert!((coords.latitude - 30.663938).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_geocode_no_result_retries_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/geocode/geo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "1",
                "count": "0",
                "infocode": "10000",
                "geocodes": [],
            })))
            .expect(2) // geocode_max_retries in the test config
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 25, 40);
        assert!(client.geocode("nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_geocode_malformed_body_is_non_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/geocode/geo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 25, 40);
        assert!(client.geocode("somewhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_accumulates_until_short_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .and(query_param("page_num", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_json(vec![poi_json("120300"), poi_json("120300")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .and(query_param("page_num", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![poi_json("120300")])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 2, 40);
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };
        let pois = client
            .search_around(center, 800, &PoiFilter::Types("120300".to_string()), "住宅小区")
            .await
            .unwrap();
        assert_eq!(pois.len(), 3);
    }

    #[tokio::test]
    async fn test_search_stops_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "0",
                "infocode": "10001",
                "count": "0",
                "pois": [],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 2, 40);
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };
        let pois = client
            .search_around(center, 800, &PoiFilter::Types("120300".to_string()), "住宅小区")
            .await
            .unwrap();
        assert!(pois.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_page_truncates_silently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .and(query_param("page_num", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_json(vec![poi_json("150500"), poi_json("150500")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .and(query_param("page_num", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 2, 40);
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };
        let pois = client
            .search_around(center, 800, &PoiFilter::Types("150500".to_string()), "地铁站")
            .await
            .unwrap();
        // The first page survives; the malformed second page ends the walk.
        assert_eq!(pois.len(), 2);
    }

    #[tokio::test]
    async fn test_search_respects_page_cap() {
        let server = MockServer::start().await;
        // Every page comes back full, so only the cap stops the walk.
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_json(vec![poi_json("050300"), poi_json("050300")])),
            )
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 2, 3);
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };
        let pois = client
            .search_around(center, 800, &PoiFilter::Types("050300".to_string()), "快餐小吃")
            .await
            .unwrap();
        assert_eq!(pois.len(), 6);
    }

    #[tokio::test]
    async fn test_keyword_filter_uses_keywords_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/place/around"))
            .and(query_param("keywords", "夜市|美食街"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![poi_json("061000")])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 2, 40);
        let center = Coordinates {
            longitude: 104.0,
            latitude: 30.6,
        };
        let pois = client
            .search_around(
                center,
                800,
                &PoiFilter::Keywords("夜市|美食街".to_string()),
                "夜市美食街",
            )
            .await
            .unwrap();
        assert_eq!(pois.len(), 1);
    }

    #[test]
    fn test_params_json_masks_key() {
        let params = vec![
            ("key", "secret".to_string()),
            ("address", "somewhere".to_string()),
        ];
        let json = params_json(&params);
        assert!(json.get("key").is_none());
        assert_eq!(json["address"], "somewhere");
    }

    #[test]
    fn test_rate_limiter_creation() {
        let config = RateLimitConfig {
            requests_per_second: 10,
            burst_size: 1,
        };
        let limiter = create_rate_limiter(&config);
        assert!(limiter.check().is_ok());
    }
}
