//! Attribution service client

use async_trait::async_trait;
use bytes::Bytes;
use dpc_fhir_models::{BatchAndFiles, FileInfo, JobCreated, ResourceType};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use std::time::Duration;
use url::Url;

use super::{endpoint, success_body, ClientError, ClientResult, RetryPolicy};
use crate::config::AttributionConfig;
use crate::request_context::RequestContext;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const ORG_HEADER: &str = "X-ORG";
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
pub const REQUEST_URL_HEADER: &str = "X-Request-Url";

/// Operations the gateway needs from the attribution service.
///
/// Resource calls return the raw envelope bytes; shaping them into FHIR
/// resources is the response middleware's job.
#[async_trait]
pub trait AttributionClient: Send + Sync {
    async fn get(&self, ctx: &RequestContext, resource_type: ResourceType, id: &str)
        -> ClientResult<Bytes>;

    async fn post(&self, ctx: &RequestContext, resource_type: ResourceType, body: Bytes)
        -> ClientResult<Bytes>;

    async fn put(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        id: &str,
        body: Bytes,
    ) -> ClientResult<Bytes>;

    async fn delete(&self, ctx: &RequestContext, resource_type: ResourceType, id: &str)
        -> ClientResult<()>;

    /// Queue an export of `group_id` using the context's `_type` and `_since`.
    async fn export(&self, ctx: &RequestContext, group_id: &str) -> ClientResult<JobCreated>;

    async fn job_batches(&self, ctx: &RequestContext, job_id: &str)
        -> ClientResult<Vec<BatchAndFiles>>;

    async fn file_info(&self, ctx: &RequestContext, file_name: &str) -> ClientResult<FileInfo>;
}

pub struct HttpAttributionClient {
    base: Url,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpAttributionClient {
    pub fn new(config: &AttributionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            base: Url::parse(&config.url)?,
            http,
            retry: RetryPolicy::new(config.retries, config.retry_delay_ms),
        })
    }

    /// A request carrying the context headers the attribution service scopes by.
    fn request(&self, ctx: &RequestContext, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, &ctx.request_id);
        if let Some(org) = &ctx.organization_id {
            builder = builder.header(ORG_HEADER, org);
        }
        if let Some(ip) = &ctx.requesting_ip {
            builder = builder.header(FORWARDED_FOR_HEADER, ip);
        }
        if let Some(url) = &ctx.request_url {
            builder = builder.header(REQUEST_URL_HEADER, url);
        }
        builder
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> ClientResult<Bytes> {
        let response = self
            .retry
            .send(|| {
                let builder = self.request(ctx, method.clone(), url.clone());
                match &body {
                    Some(body) => builder
                        .header(CONTENT_TYPE, "application/json")
                        .body(body.clone()),
                    None => builder,
                }
            })
            .await?;

        let result = success_body(response).await;
        if let Err(e) = &result {
            tracing::warn!(
                request_id = %ctx.request_id,
                method = %method,
                url = %url,
                error = %e,
                "Attribution request failed"
            );
        }
        result
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        url: Url,
    ) -> ClientResult<T> {
        let body = self.call(ctx, Method::GET, url, None).await?;
        if body.is_empty() {
            return Err(ClientError::Empty);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl AttributionClient for HttpAttributionClient {
    async fn get(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        id: &str,
    ) -> ClientResult<Bytes> {
        let url = endpoint(&self.base, &[resource_type.as_str(), id])?;
        self.call(ctx, Method::GET, url, None).await
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        body: Bytes,
    ) -> ClientResult<Bytes> {
        let url = endpoint(&self.base, &[resource_type.as_str()])?;
        self.call(ctx, Method::POST, url, Some(body)).await
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        id: &str,
        body: Bytes,
    ) -> ClientResult<Bytes> {
        let url = endpoint(&self.base, &[resource_type.as_str(), id])?;
        self.call(ctx, Method::PUT, url, Some(body)).await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        resource_type: ResourceType,
        id: &str,
    ) -> ClientResult<()> {
        let url = endpoint(&self.base, &[resource_type.as_str(), id])?;
        self.call(ctx, Method::DELETE, url, None).await.map(|_| ())
    }

    async fn export(&self, ctx: &RequestContext, group_id: &str) -> ClientResult<JobCreated> {
        let mut url = endpoint(&self.base, &[ResourceType::Group.as_str(), group_id, "$export"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(types) = &ctx.resource_types {
                query.append_pair("_type", types);
            }
            if let Some(since) = &ctx.since {
                query.append_pair("_since", since);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get_json(ctx, url).await
    }

    async fn job_batches(
        &self,
        ctx: &RequestContext,
        job_id: &str,
    ) -> ClientResult<Vec<BatchAndFiles>> {
        let url = endpoint(&self.base, &["Job", job_id])?;
        self.get_json(ctx, url).await
    }

    async fn file_info(&self, ctx: &RequestContext, file_name: &str) -> ClientResult<FileInfo> {
        let url = endpoint(&self.base, &["Data", file_name])?;
        self.get_json(ctx, url).await
    }
}
