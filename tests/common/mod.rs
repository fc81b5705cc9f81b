#![allow(dead_code)]

use axum::{http::StatusCode, routing::get, Json, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OGLIVE_LIST_PATH: &str = "/oglive/list";
pub const TOKEN: &str = "07b3bfe728954619b58f0107ad73acc1";

/// Builder for a mock server exposing `/oglive/list`.
///
/// Requests carrying the expected token get the configured status per
/// method; anything else falls through to wiremock's 404.
pub struct MockOgliveBuilder {
    server: MockServer,
    token: String,
}

impl MockOgliveBuilder {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            token: TOKEN.to_string(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    /// Answers `http_method` with `status` when the token matches.
    pub async fn respond(self, http_method: &str, status: u16) -> Self {
        Mock::given(method(http_method))
            .and(path(OGLIVE_LIST_PATH))
            .and(header("Authorization", self.token.as_str()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
        self
    }

    /// Same as [`respond`](Self::respond) but delays the answer.
    pub async fn respond_delayed(self, http_method: &str, status: u16, delay: Duration) -> Self {
        Mock::given(method(http_method))
            .and(path(OGLIVE_LIST_PATH))
            .and(header("Authorization", self.token.as_str()))
            .respond_with(ResponseTemplate::new(status).set_delay(delay))
            .mount(&self.server)
            .await;
        self
    }

    /// The behavior of the real server: GET lists, POST is rejected.
    pub async fn read_only(self) -> Self {
        self.respond("GET", 200).await.respond("POST", 405).await
    }

    /// Mounts a fallback for requests to the resource that carry no
    /// `Authorization` header at all.
    pub async fn unauthenticated(self, status: u16) -> Self {
        Mock::given(method("GET"))
            .and(path(OGLIVE_LIST_PATH))
            .and(NoAuthorization)
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
        self
    }

    pub fn build(self) -> MockOglive {
        MockOglive {
            server: self.server,
        }
    }
}

struct NoAuthorization;

impl wiremock::Match for NoAuthorization {
    fn matches(&self, request: &wiremock::Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

pub struct MockOglive {
    pub server: MockServer,
}

impl MockOglive {
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), OGLIVE_LIST_PATH)
    }

    pub async fn received(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// Serves a router with only a GET route on `/oglive/list`, so any other
/// method is answered by the router itself with 405.
pub async fn spawn_read_only_router() -> SocketAddr {
    let app = Router::new().route(
        OGLIVE_LIST_PATH,
        get(|| async { (StatusCode::OK, Json(serde_json::json!({ "oglive": [] }))) }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub router");
    });

    addr
}

/// Returns a loopback URL nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let port = listener.local_addr().expect("probe port address").port();
    drop(listener);
    format!("http://127.0.0.1:{port}{OGLIVE_LIST_PATH}")
}

/// Initialize tracing for tests (only once).
///
/// Defaults to `warn` level to reduce noise. Use `RUST_LOG=debug` for verbose output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_test_writer()
        .try_init();
}
