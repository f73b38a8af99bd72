//! HTTP client configuration and the JSON request helper shared by API crates.
//!
//! [`ServiceClient`] performs one request per call, checks the status against the one the
//! caller expects and decodes the body. It never retries; failures are returned as they
//! happened.

use crate::error::{Error, Result};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for AppEngine requests
pub const APPENGINE_DEFAULT_TIMEOUT: u64 = 30;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Content type used for partial updates.
pub const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// HTTP client configuration.
///
/// Configures timeouts, connection pooling, request logging and response compression.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Emit a debug event for every request
    pub enable_logging: bool,

    /// Enable response compression
    pub enable_compression: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(APPENGINE_DEFAULT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_logging: true,
            enable_compression: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Serialize)]
struct DataEnvelopeRef<'a, B: ?Sized> {
    data: &'a B,
}

/// Builder for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientBuilder {
    base_url: Url,
    http: ClientConfig,
    user_agent: Option<String>,
}

impl ServiceClientBuilder {
    /// Create a builder for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL cannot be parsed or cannot carry a path.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(format!(
                "`{base_url}` cannot be used as a base URL"
            )));
        }

        Ok(Self {
            base_url,
            http: ClientConfig::new().with_timeout(timeout),
            user_agent: None,
        })
    }

    /// Set the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http = config;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<ServiceClient> {
        let mut builder = Client::builder()
            .timeout(self.http.timeout)
            .pool_idle_timeout(self.http.pool_idle_timeout)
            .pool_max_idle_per_host(self.http.pool_max_idle_per_host)
            .gzip(self.http.enable_compression);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        Ok(ServiceClient {
            http: builder.build()?,
            base_url: self.base_url,
            log_requests: self.http.enable_logging,
        })
    }
}

/// Immutable, cheaply clonable handle performing JSON requests against one base URL.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
    log_requests: bool,
}

impl ServiceClient {
    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an absolute URL by appending path segments to the base URL.
    ///
    /// Each segment is percent-encoded, so identifiers containing `/` or spaces stay a
    /// single segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the base URL cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidEndpoint(format!("`{}` cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url` and decode the whole response body.
    ///
    /// # Errors
    ///
    /// Transport failures, a status other than `expected`, or a body that does not decode
    /// into `T`.
    pub async fn get_json<T>(
        &self,
        url: Url,
        params: &[(String, String)],
        expected: StatusCode,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self
            .execute(Method::GET, url.clone(), params, None, expected)
            .await?;
        decode(&url, &body)
    }

    /// GET `url` and decode the payload found under the `data` member.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceClient::get_json`].
    pub async fn get_data<T>(&self, url: Url, expected: StatusCode) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.get_json::<DataEnvelope<T>>(url, &[], expected)
            .await
            .map(|envelope| envelope.data)
    }

    /// PATCH `url` with `payload` wrapped in a `data` member, as a JSON merge patch.
    ///
    /// # Errors
    ///
    /// Transport failures or a status other than `expected`. The response body is ignored.
    pub async fn patch_data<B>(&self, url: Url, payload: &B, expected: StatusCode) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(&DataEnvelopeRef { data: payload })?;
        self.execute(Method::PATCH, url, &[], Some(body), expected)
            .await
            .map(|_| ())
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        params: &[(String, String)],
        body: Option<Vec<u8>>,
        expected: StatusCode,
    ) -> Result<String> {
        if self.log_requests {
            debug!(%method, %url, params = params.len(), "sending AppEngine request");
        }

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static(MERGE_PATCH_CONTENT_TYPE))
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status != expected {
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|err| {
        Error::ParseError(format!(
            "Failed to parse response for `{}`: {err}",
            url.path()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base: &str) -> ServiceClient {
        ServiceClientBuilder::new(base, Duration::from_secs(5))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new();
        assert_eq!(config.timeout, Duration::from_secs(APPENGINE_DEFAULT_TIMEOUT));
        assert!(config.enable_logging);
        assert!(config.enable_compression);
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_pool_idle_timeout(Duration::from_secs(120))
            .with_pool_max_idle(20)
            .with_logging(false)
            .with_compression(false);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
        assert_eq!(config.pool_max_idle_per_host, 20);
        assert!(!config.enable_logging);
        assert!(!config.enable_compression);
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let err = ServiceClientBuilder::new("::nope", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));

        let err = ServiceClientBuilder::new("mailto:ops@example.com", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let client = test_client("https://api.example.com/appengine/");
        let url = client.endpoint(&["v1", "test", "devices"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/appengine/v1/test/devices");

        let client = test_client("https://api.example.com");
        let url = client.endpoint(&["v1", "test", "stats", "devices"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/test/stats/devices");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = test_client("https://api.example.com/appengine");
        let url = client
            .endpoint(&["v1", "test", "devices-by-alias", "living room/1"])
            .unwrap();
        assert_eq!(
            url.path(),
            "/appengine/v1/test/devices-by-alias/living%20room%2F1"
        );
    }

    #[tokio::test]
    async fn get_data_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/test/stats/devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"total_devices": 3}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = client.endpoint(&["v1", "test", "stats", "devices"]).unwrap();
        let value: serde_json::Value = client.get_data(url, StatusCode::OK).await.unwrap();
        assert_eq!(value, json!({"total_devices": 3}));
    }

    #[tokio::test]
    async fn get_json_sends_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/test/devices"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = client.endpoint(&["v1", "test", "devices"]).unwrap();
        let params = vec![("limit".to_string(), "2".to_string())];
        let value: serde_json::Value = client.get_json(url, &params, StatusCode::OK).await.unwrap();
        assert_eq!(value, json!({"data": []}));
    }

    #[tokio::test]
    async fn unexpected_status_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("device not found"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = client.endpoint(&["v1", "test", "devices", "x"]).unwrap();
        let err = client
            .get_data::<serde_json::Value>(url, StatusCode::OK)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnexpectedStatus {
                status: 404,
                body: "device not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn success_status_other_than_expected_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = client.endpoint(&["v1", "test", "devices", "x"]).unwrap();
        let err = client
            .patch_data(url, &json!({"credentials_inhibited": true}), StatusCode::OK)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(204));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\": [1, 2"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = client.endpoint(&["v1", "test", "devices"]).unwrap();
        let err = client
            .get_data::<Vec<u32>>(url, StatusCode::OK)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[tokio::test]
    async fn patch_data_wraps_payload_as_merge_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/test/devices/abc"))
            .and(header("content-type", MERGE_PATCH_CONTENT_TYPE))
            .and(body_json(json!({"data": {"metadata": {"room": null}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = client.endpoint(&["v1", "test", "devices", "abc"]).unwrap();
        client
            .patch_data(url, &json!({"metadata": {"room": null}}), StatusCode::OK)
            .await
            .unwrap();
    }
}
