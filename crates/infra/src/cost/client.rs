//! HTTP implementation of [`CostSource`].
//!
//! Each window is one GET against the configured endpoint:
//!
//! ```text
//! GET {endpoint}?start=2026-04-24&end=2026-05-01&granularity=MONTHLY&group_by=SERVICE
//! ```
//!
//! The response groups amounts by service within each time period:
//!
//! ```json
//! {"results_by_time":[{"groups":[
//!   {"keys":["Amazon Lightsail"],"metrics":{"UnblendedCost":{"amount":"1.23","unit":"USD"}}}
//! ]}]}
//! ```
//!
//! Amounts are strings; one that does not parse counts as zero.
//!
//! A 5xx answer or a connect/timeout failure is retried with doubling
//! backoff, up to [`FETCH_ATTEMPTS`] tries per window. Other 4xx answers are
//! returned as they are.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use quill_core::{CostError, CostSource};
use quill_domain::{CostConfig, CostWindow, QuillError, ServiceCost};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::errors::InfraError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const USER_AGENT: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));

/// Tries per window, first request included.
pub const FETCH_ATTEMPTS: u32 = 3;
const FETCH_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct CostResponse {
    #[serde(default)]
    results_by_time: Vec<ResultByTime>,
}

#[derive(Debug, Deserialize)]
struct ResultByTime {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct Group {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    metrics: GroupMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct GroupMetrics {
    #[serde(rename = "UnblendedCost")]
    unblended_cost: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    amount: String,
}

/// Cost source backed by the cost report HTTP API.
#[derive(Clone)]
pub struct HttpCostSource {
    client: Client,
    endpoint: Url,
    backoff: Duration,
}

impl std::fmt::Debug for HttpCostSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCostSource").field("endpoint", &self.endpoint.as_str()).finish()
    }
}

impl HttpCostSource {
    /// Build a source from the cost configuration.
    ///
    /// # Errors
    /// Returns `QuillError::Config` if the endpoint is missing or invalid or
    /// the token is not a valid header value.
    pub fn new(config: &CostConfig) -> quill_domain::Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| QuillError::Config("cost.endpoint is not set".into()))?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| QuillError::Config(format!("cost.endpoint is not a valid URL: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| QuillError::Config("cost.api_token is not a valid header".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .no_proxy()
            .build()
            .map_err(|e| QuillError::from(InfraError::from(e)))?;

        Ok(Self { client, endpoint, backoff: FETCH_BACKOFF })
    }

    fn window_url(&self, window: CostWindow, today: NaiveDate) -> Url {
        let (start, end) = window_range(window, today);
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("start", &start.format(DATE_FORMAT).to_string())
            .append_pair("end", &end.format(DATE_FORMAT).to_string())
            .append_pair("granularity", "MONTHLY")
            .append_pair("group_by", "SERVICE");
        url
    }

    async fn fetch(
        &self,
        window: CostWindow,
        today: NaiveDate,
    ) -> Result<Vec<ServiceCost>, CostError> {
        let url = self.window_url(window, today);
        let response = self.get_with_retry(&url).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CostError::Status { status: status.as_u16(), body });
        }

        let body: CostResponse =
            response.json().await.map_err(|e| CostError::Decode(e.to_string()))?;
        let costs = flatten(body);
        debug!(window = %window.label(), rows = costs.len(), "cost window fetched");
        Ok(costs)
    }

    /// GET `url`; the last 5xx response is handed back as `Ok` for the
    /// caller's status check.
    async fn get_with_retry(&self, url: &Url) -> Result<Response, CostError> {
        let mut attempt = 1;
        loop {
            let last = attempt >= FETCH_ATTEMPTS;
            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_server_error() && !last => {
                    debug!(attempt, status = %response.status(), "cost api server error, retrying");
                }
                Ok(response) => return Ok(response),
                Err(err) if is_transient(&err) && !last => {
                    debug!(attempt, error = %err, "cost api unreachable, retrying");
                }
                Err(err) => {
                    let err = QuillError::from(InfraError::from(err));
                    return Err(CostError::Transport(err.to_string()));
                }
            }
            tokio::time::sleep(self.backoff_for(attempt)).await;
            attempt += 1;
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1 << attempt.saturating_sub(1).min(8))
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

#[async_trait]
impl CostSource for HttpCostSource {
    async fn costs_for_window(&self, window: CostWindow) -> Result<Vec<ServiceCost>, CostError> {
        self.fetch(window, Utc::now().date_naive()).await
    }
}

/// `[today - days, today]`.
fn window_range(window: CostWindow, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.checked_sub_days(Days::new(u64::from(window.days))).unwrap_or(NaiveDate::MIN);
    (start, today)
}

fn flatten(response: CostResponse) -> Vec<ServiceCost> {
    response
        .results_by_time
        .into_iter()
        .flat_map(|period| period.groups)
        .filter_map(|group| {
            let service = group.keys.into_iter().next()?;
            let raw = group.metrics.unblended_cost.map(|c| c.amount).unwrap_or_default();
            let amount = raw.trim().parse::<f64>().unwrap_or_else(|_| {
                warn!(service = %service, amount = %raw, "unparseable cost amount, using zero");
                0.0
            });
            Some(ServiceCost::new(service, amount))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn source(server: &MockServer, token: Option<&str>) -> HttpCostSource {
        let config = CostConfig {
            enabled: true,
            endpoint: Some(format!("{}/v1/costs", server.uri())),
            api_token: token.map(str::to_owned),
            ..CostConfig::default()
        };
        HttpCostSource::new(&config).expect("cost source")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date")
    }

    #[test]
    fn window_range_ends_today() {
        let (start, end) = window_range(CostWindow::days(30), today());
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date"));
        assert_eq!(end, today());
    }

    #[test]
    fn missing_endpoint_is_a_config_error() {
        let err = HttpCostSource::new(&CostConfig::default()).expect_err("no endpoint");
        assert!(matches!(err, QuillError::Config(_)));
    }

    #[test]
    fn flatten_keeps_every_group_and_zeroes_bad_amounts() {
        let body: CostResponse = serde_json::from_str(
            r#"{"results_by_time":[
                {"groups":[{"keys":["Amazon Lightsail"],"metrics":{"UnblendedCost":{"amount":"1.50","unit":"USD"}}}]},
                {"groups":[
                    {"keys":["Amazon Lightsail"],"metrics":{"UnblendedCost":{"amount":"2.25","unit":"USD"}}},
                    {"keys":["AmazonCloudWatch"],"metrics":{"UnblendedCost":{"amount":"n/a","unit":"USD"}}},
                    {"keys":[],"metrics":{}}
                ]}
            ]}"#,
        )
        .expect("valid body");

        assert_eq!(
            flatten(body),
            vec![
                ServiceCost::new("Amazon Lightsail", 1.5),
                ServiceCost::new("Amazon Lightsail", 2.25),
                ServiceCost::new("AmazonCloudWatch", 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn queries_window_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("start", "2026-04-24"))
            .and(query_param("end", "2026-05-01"))
            .and(query_param("granularity", "MONTHLY"))
            .and(query_param("group_by", "SERVICE"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results_by_time": [{"groups": [
                    {"keys": ["Amazon Lightsail"],
                     "metrics": {"UnblendedCost": {"amount": "3.5", "unit": "USD"}}}
                ]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let costs = source(&server, Some("s3cret"))
            .fetch(CostWindow::days(7), today())
            .await
            .expect("costs");
        assert_eq!(costs, vec![ServiceCost::new("Amazon Lightsail", 3.5)]);
    }

    #[tokio::test]
    async fn empty_result_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results_by_time":[]}"#))
            .mount(&server)
            .await;

        let costs = source(&server, None).fetch(CostWindow::days(90), today()).await;
        assert_eq!(costs, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn client_errors_surface_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let err = source(&server, None).fetch(CostWindow::days(7), today()).await;
        assert_eq!(err, Err(CostError::Status { status: 403, body: "forbidden".into() }));
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results_by_time":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpCostSource { backoff: Duration::from_millis(1), ..source(&server, None) };
        let costs = source.fetch(CostWindow::days(7), today()).await;
        assert_eq!(costs, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn persistent_server_error_surfaces_after_last_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(u64::from(FETCH_ATTEMPTS))
            .mount(&server)
            .await;

        let source = HttpCostSource { backoff: Duration::from_millis(1), ..source(&server, None) };
        let err = source.fetch(CostWindow::days(7), today()).await;
        assert_eq!(err, Err(CostError::Status { status: 503, body: "busy".into() }));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let config = CostConfig {
            enabled: true,
            endpoint: Some(format!("http://{addr}/v1/costs")),
            ..CostConfig::default()
        };
        let source = HttpCostSource {
            backoff: Duration::from_millis(1),
            ..HttpCostSource::new(&config).expect("cost source")
        };
        let err = source.fetch(CostWindow::days(7), today()).await;
        assert!(matches!(err, Err(CostError::Transport(_))), "{err:?}");
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = CostConfig {
            endpoint: Some("http://localhost/v1/costs".into()),
            ..CostConfig::default()
        };
        let source = HttpCostSource::new(&config).expect("cost source");
        assert_eq!(source.backoff_for(1), FETCH_BACKOFF);
        assert_eq!(source.backoff_for(3), FETCH_BACKOFF * 4);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = source(&server, None).fetch(CostWindow::days(7), today()).await;
        assert!(matches!(err, Err(CostError::Decode(_))));
    }
}
