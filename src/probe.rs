use anyhow::{Context, Result};
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode, Url};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::metrics::record_probe;

const USER_AGENT: &str = concat!("oglive-probe/", env!("CARGO_PKG_VERSION"));

/// Issues single requests against one resource and reports the status code
/// the server answered with.
#[derive(Clone, Debug)]
pub struct EndpointProbe {
    client: Client,
    url: Url,
    authorization: String,
}

impl EndpointProbe {
    /// Creates a probe with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(url: &str, authorization: impl Into<String>) -> Result<Self> {
        Self::with_client(build_client(None)?, url, authorization)
    }

    /// Creates a probe that sends its requests through `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid absolute URL.
    pub fn with_client(client: Client, url: &str, authorization: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid probe URL: {url}"))?;

        Ok(Self {
            client,
            url,
            authorization: authorization.into(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sends a GET with the authorization header and no body.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure.
    pub async fn probe_get(&self) -> Result<StatusCode> {
        self.probe(Method::GET).await
    }

    /// Sends a POST with the authorization header and an empty body.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure.
    pub async fn probe_post(&self) -> Result<StatusCode> {
        self.probe(Method::POST).await
    }

    /// Sends a single request with the given method and returns the status.
    ///
    /// No retries. A POST carries an explicit empty body so the server sees
    /// `Content-Length: 0`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be completed (connection
    /// refused, DNS failure, timeout).
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn probe(&self, method: Method) -> Result<StatusCode> {
        let request = self
            .client
            .request(method.clone(), self.url.clone())
            .header(AUTHORIZATION, &self.authorization);

        self.send(method, true, request).await
    }

    /// Sends a GET without the `Authorization` header.
    ///
    /// What the server answers here is its own business; callers only
    /// observe the status.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn probe_unauthenticated(&self) -> Result<StatusCode> {
        let request = self.client.get(self.url.clone());
        self.send(Method::GET, false, request).await
    }

    async fn send(
        &self,
        method: Method,
        authenticated: bool,
        request: reqwest::RequestBuilder,
    ) -> Result<StatusCode> {
        let request = if method == Method::POST {
            request.body(Vec::<u8>::new())
        } else {
            request
        };

        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed();

        let status = result
            .map(|resp| resp.status())
            .with_context(|| format!("{method} {} failed", self.url));

        record_probe(&method, authenticated, status.as_ref().ok().copied(), elapsed);

        let status = status?;
        debug!(
            %method,
            authenticated,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis(),
            "Probe completed"
        );

        Ok(status)
    }
}

/// Builds the HTTP client used by probes.
///
/// Without a timeout the client keeps reqwest's defaults.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        info!(timeout_secs = timeout.as_secs(), "Using request timeout");
        builder = builder.timeout(timeout);
    }

    builder.build().context("building HTTP client failed")
}

/// Sends a GET to `url` with `authorization` as the `Authorization` header.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the request cannot be completed.
pub async fn probe_get(url: &str, authorization: &str) -> Result<StatusCode> {
    EndpointProbe::new(url, authorization)?.probe_get().await
}

/// Sends a POST with an empty body to `url` with `authorization` as the
/// `Authorization` header.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the request cannot be completed.
pub async fn probe_post(url: &str, authorization: &str) -> Result<StatusCode> {
    EndpointProbe::new(url, authorization)?.probe_post().await
}
