pub mod fixtures;
pub mod mock;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use dpc_api::api::{admin_router, public_router};
use dpc_api::config::AuthMode;
use dpc_api::{AppState, Config};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt as _;

pub use fixtures::*;
pub use mock::{MockAttribution, MockSsas, RecordedCall};

/// Organization the test caller acts for in header auth mode.
pub const ORG_ID: &str = "0d8a2a8e-5f2d-4a59-9c43-2d1f8c9b1e7a";

pub struct TestApp {
    pub public: Router,
    pub admin: Router,
    pub attribution: Arc<MockAttribution>,
    pub ssas: Arc<MockSsas>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::new_with_config(|_| {})
    }

    /// Header auth mode unless `configure` says otherwise.
    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.auth.mode = AuthMode::Header;
        configure(&mut config);

        let attribution = Arc::new(MockAttribution::default());
        let ssas = Arc::new(MockSsas::default());
        let state = AppState::with_clients(config, attribution.clone(), ssas.clone());

        Self {
            public: public_router(state.clone()),
            admin: admin_router(state),
            attribution,
            ssas,
        }
    }

    pub async fn admin_request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let body = json_bytes(body)?;
        send(&self.admin, method, path_and_query, body, extra_headers).await
    }

    /// Public request on behalf of [`ORG_ID`].
    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut headers = vec![("x-org", ORG_ID)];
        headers.extend_from_slice(extra_headers);
        let body = json_bytes(body)?;
        send(&self.public, method, path_and_query, body, &headers).await
    }

    /// Public request with exactly the given headers and a raw body.
    pub async fn raw_request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Bytes,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        send(&self.public, method, path_and_query, body, headers).await
    }

    /// Create an organization through the admin API and return its id.
    pub async fn create_organization(&self, npi: &str) -> anyhow::Result<String> {
        let (status, _, body) = self
            .admin_request(Method::POST, "/v2/Organization", Some(organization(npi)), &[])
            .await?;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
        json_body(&body)["id"]
            .as_str()
            .map(String::from)
            .context("resource id")
    }
}

fn json_bytes(body: Option<Value>) -> anyhow::Result<Bytes> {
    Ok(match body {
        Some(json) => Bytes::from(serde_json::to_vec(&json)?),
        None => Bytes::new(),
    })
}

async fn send(
    router: &Router,
    method: Method,
    path_and_query: &str,
    body: Bytes,
    headers: &[(&str, &str)],
) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
    let mut request = Request::builder()
        .method(method)
        .uri(path_and_query)
        .header("content-type", "application/fhir+json")
        .body(Body::from(body))
        .context("build request")?;

    for (name, value) in headers {
        request.headers_mut().insert(
            name.parse::<HeaderName>().context("parse header name")?,
            value.parse::<HeaderValue>().context("parse header value")?,
        );
    }

    let response = router
        .clone()
        .oneshot(request)
        .await
        .context("dispatch request")?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .context("read response body")?;
    Ok((status, headers, body))
}

pub fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        panic!(
            "response body is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(body)
        )
    })
}

/// The single issue of an `OperationOutcome` body.
pub fn issue(body: &Bytes) -> Value {
    let outcome = json_body(body);
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    outcome["issue"][0].clone()
}
