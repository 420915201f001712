//! Token service (SSAS) client

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::{endpoint, success_body, ClientError, ClientResult, RetryPolicy};
use crate::config::SsasConfig;
use crate::request_context::RequestContext;

/// What an introspected access token grants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    pub active: bool,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub implementer_id: Option<String>,
}

#[async_trait]
pub trait SsasClient: Send + Sync {
    /// Exchange a client assertion for an access token, returning the token
    /// service's answer unchanged.
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        content_type: Option<&str>,
        body: Bytes,
    ) -> ClientResult<Bytes>;

    /// Introspect an access token. Inactive tokens are an error.
    async fn validate_token(&self, ctx: &RequestContext, token: &str) -> ClientResult<TokenInfo>;
}

pub struct HttpSsasClient {
    public_url: Url,
    admin_url: Url,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpSsasClient {
    pub fn new(config: &SsasConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            public_url: Url::parse(&config.public_url)?,
            admin_url: Url::parse(&config.admin_url)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http,
            retry: RetryPolicy::new(config.retries, config.retry_delay_ms),
        })
    }
}

#[async_trait]
impl SsasClient for HttpSsasClient {
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        content_type: Option<&str>,
        body: Bytes,
    ) -> ClientResult<Bytes> {
        let url = endpoint(&self.public_url, &["v2", "token", "auth"])?;
        let content_type = content_type.unwrap_or("application/x-www-form-urlencoded");
        let response = self
            .retry
            .send(|| {
                self.http
                    .request(Method::POST, url.clone())
                    .header("X-Request-Id", &ctx.request_id)
                    .header(CONTENT_TYPE, content_type)
                    .body(body.clone())
            })
            .await?;
        success_body(response).await
    }

    async fn validate_token(&self, ctx: &RequestContext, token: &str) -> ClientResult<TokenInfo> {
        let url = endpoint(&self.admin_url, &["introspect"])?;
        let payload = json!({ "token": token });
        let response = self
            .retry
            .send(|| {
                self.http
                    .request(Method::POST, url.clone())
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .header("X-Request-Id", &ctx.request_id)
                    .json(&payload)
            })
            .await?;

        let body = success_body(response).await?;
        let info: TokenInfo = serde_json::from_slice(&body)?;
        if !info.active {
            return Err(ClientError::Status {
                status: reqwest::StatusCode::UNAUTHORIZED,
                body: "token is not active".to_string(),
            });
        }
        Ok(info)
    }
}
