//! REST API layer: one method per backend endpoint.
//!
//! [`ApiClient`] owns a single shared [`reqwest::Client`] and the backend
//! base URL. Every method performs exactly one HTTP request and returns
//! `Result<T, ClientError>`; there are no retries and no caching here.
//! Endpoint methods live in the per-resource submodules as `impl ApiClient`
//! blocks.

pub mod auth;
pub mod dto;
pub mod events;
pub mod ratings;
pub mod subscriptions;
pub mod users;

use std::time::Instant;

use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ApiErrorBody, ClientError};

/// HTTP client bound to one backend.
///
/// Cheap to clone: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Builds a client from configuration, applying the request deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("eventhub-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("building http client: {e}")))?;
        Ok(Self::with_http(http, config.api_url.clone()))
    }

    /// Wraps an existing [`reqwest::Client`].
    #[must_use]
    pub const fn with_http(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves path segments against the base URL.
    ///
    /// Each segment is percent-encoded, so values containing `/`, spaces or
    /// `?` stay inside their own segment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the base URL cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ClientError::Config(format!("{} cannot be a base url", self.base_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let body = self.send(Method::GET, url, |r| r).await?;
        decode(&body)
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        payload: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let body = self.send(Method::POST, url, |r| r.json(payload)).await?;
        decode(&body)
    }

    pub(crate) async fn post_ack<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        payload: &B,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(segments)?;
        let body = self.send(Method::POST, url, |r| r.json(payload)).await?;
        acknowledge(&body)
    }

    pub(crate) async fn delete_ack(&self, segments: &[&str]) -> Result<(), ClientError> {
        let url = self.endpoint(segments)?;
        let body = self.send(Method::DELETE, url, |r| r).await?;
        acknowledge(&body)
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        form: Form,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let body = self.send(Method::POST, url, |r| r.multipart(form)).await?;
        decode(&body)
    }

    /// Sends one request and returns the body of a 2xx response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<String, ClientError> {
        tracing::debug!(%method, %url, "request");
        let started = Instant::now();

        let response = build(self.http.request(method.clone(), url.clone()))
            .send()
            .await
            .map_err(|e| {
                let err = ClientError::from(e);
                tracing::warn!(%method, %url, error = %err, "request failed");
                err
            })?;

        let status = response.status();
        let text = response.text().await.map_err(ClientError::from)?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !status.is_success() {
            let err = ClientError::from_response(status, &text);
            tracing::warn!(%method, %url, status = status.as_u16(), elapsed_ms, error = %err, "backend rejected request");
            return Err(err);
        }

        tracing::debug!(%method, %url, status = status.as_u16(), elapsed_ms, "response");
        Ok(text)
    }
}

/// Decodes a 2xx body into `T`.
///
/// A body that does not match `T` but does match `{"error": "..."}` is
/// reported as a backend error rather than a decode failure.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api) => ClientError::Http {
            status: reqwest::StatusCode::OK,
            message: api.error,
        },
        Err(_) => ClientError::Decode(e.to_string()),
    })
}

/// Checks an acknowledgement body. Any content except an error object is
/// accepted.
fn acknowledge(body: &str) -> Result<(), ClientError> {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api) => Err(ClientError::Http {
            status: reqwest::StatusCode::OK,
            message: api.error,
        }),
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use httpmock::Method::{DELETE, GET};
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    pub(crate) fn client_for(server: &MockServer) -> ApiClient {
        let Ok(url) = Url::parse(&server.base_url()) else {
            panic!("mock server url must parse");
        };
        let config = ClientConfig::new(url).with_request_timeout(Duration::from_secs(5));
        let Ok(client) = ApiClient::new(&config) else {
            panic!("client must build");
        };
        client
    }

    fn client_at(base: &str) -> ApiClient {
        let Ok(url) = Url::parse(base) else {
            panic!("bad base url");
        };
        ApiClient::with_http(reqwest::Client::new(), url)
    }

    #[test]
    fn endpoint_appends_segments() {
        let client = client_at("http://localhost:3000");
        let Ok(url) = client.endpoint(&["getEventsByUserId", "7"]) else {
            panic!("endpoint failed");
        };
        assert_eq!(url.as_str(), "http://localhost:3000/getEventsByUserId/7");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = client_at("https://api.example.com/v1/");
        let Ok(url) = client.endpoint(&["getEvents"]) else {
            panic!("endpoint failed");
        };
        assert_eq!(url.as_str(), "https://api.example.com/v1/getEvents");
    }

    #[test]
    fn endpoint_encodes_segments() {
        let client = client_at("http://localhost:3000");
        let Ok(url) = client.endpoint(&["updateEvent", "1", "Board games", "a/b?c"]) else {
            panic!("endpoint failed");
        };
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/updateEvent/1/Board%20games/a%2Fb%3Fc"
        );
    }

    #[test]
    fn decode_reports_error_body() {
        let result = decode::<Vec<u32>>(r#"{"error":"Wrong password"}"#);
        let Err(ClientError::Http { message, .. }) = result else {
            panic!("expected backend error");
        };
        assert_eq!(message, "Wrong password");
        assert!(matches!(
            decode::<Vec<u32>>("<html>"),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn acknowledge_accepts_any_non_error_body() {
        assert!(acknowledge("").is_ok());
        assert!(acknowledge("{}").is_ok());
        assert!(acknowledge("OK").is_ok());
        assert!(acknowledge(r#"{"error":"nope"}"#).is_err());
    }

    #[tokio::test]
    async fn non_success_status_maps_to_http_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/getEvents");
                then.status(503).json_body(json!({ "error": "maintenance" }));
            })
            .await;

        let client = client_for(&server);
        let result = client.list_events().await;
        mock.assert_async().await;

        let Err(err) = result else {
            panic!("expected failure");
        };
        assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let client = client_at("http://127.0.0.1:9");
        let result = client.delete_ack(&["deleteEventById", "1"]).await;
        assert!(matches!(
            result,
            Err(ClientError::Network(_) | ClientError::Timeout)
        ));
    }

    #[tokio::test]
    async fn deadline_is_enforced() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/deleteEventById/1");
                then.status(200).delay(Duration::from_millis(500));
            })
            .await;

        let Ok(url) = Url::parse(&server.base_url()) else {
            panic!("mock server url must parse");
        };
        let config = ClientConfig::new(url).with_request_timeout(Duration::from_millis(50));
        let Ok(client) = ApiClient::new(&config) else {
            panic!("client must build");
        };
        let result = client.delete_ack(&["deleteEventById", "1"]).await;
        assert!(matches!(result, Err(ClientError::Timeout)));
    }
}
