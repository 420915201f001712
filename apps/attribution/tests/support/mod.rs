pub mod fixtures;
pub mod memory;
pub mod postgres;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use dpc_attribution::{api::create_router, AppState, Config};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt as _;

pub use fixtures::*;
pub use memory::{MemoryJobStore, MemoryResourceStore};
pub use postgres::{with_pg_app, with_pg_app_with_config, PgTestApp};

pub struct TestApp {
    pub router: Router,
    pub resources: Arc<MemoryResourceStore>,
    pub jobs: Arc<MemoryJobStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::new_with_config(|_| {})
    }

    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        configure(&mut config);

        let resources = Arc::new(MemoryResourceStore::default());
        let jobs = Arc::new(MemoryJobStore::default());
        let state = AppState::with_stores(config, resources.clone(), jobs.clone());

        Self {
            router: create_router(state),
            resources,
            jobs,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        dispatch(&self.router, method, path_and_query, body, extra_headers).await
    }

    /// Create an organization and return its id.
    pub async fn create_organization(&self, npi: &str) -> anyhow::Result<String> {
        post_organization(&self.router, npi).await
    }
}

pub async fn dispatch(
    router: &Router,
    method: Method,
    path_and_query: &str,
    body: Option<Value>,
    extra_headers: &[(&str, &str)],
) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
    let mut request = Request::builder()
        .method(method)
        .uri(path_and_query)
        .header("content-type", "application/json")
        .body(match body {
            Some(json) => Body::from(serde_json::to_vec(&json)?),
            None => Body::empty(),
        })
        .context("build request")?;

    for (name, value) in extra_headers {
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

/// POST an organization through `router` and return its id.
pub async fn post_organization(router: &Router, npi: &str) -> anyhow::Result<String> {
    let (status, _, body) =
        dispatch(router, Method::POST, "/Organization", Some(organization(npi)), &[]).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));
    let envelope: Value = serde_json::from_slice(&body)?;
    envelope["id"]
        .as_str()
        .map(String::from)
        .context("envelope id")
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
