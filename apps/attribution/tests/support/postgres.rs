//! Router over the Postgres stores, isolated in a throwaway schema per test.
//!
//! Set `ATTRIBUTION_DATABASE__TEST_DATABASE_URL` to run these; without it the
//! Postgres tests are skipped.

use anyhow::Context as _;
use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
    Router,
};
use dpc_attribution::db::{self, PgJobStore, PgResourceStore};
use dpc_attribution::{api::create_router, AppState, Config};
use futures::FutureExt as _;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::Connection as _;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use super::{dispatch, post_organization};

pub struct PgTestApp {
    pub router: Router,
    pub pool: PgPool,
    schema: String,
    admin_database_url: String,
}

impl PgTestApp {
    /// `None` when no test database is configured.
    pub async fn new_with_config(
        configure: impl FnOnce(&mut Config),
    ) -> anyhow::Result<Option<Self>> {
        let mut config = Config::load().context("load Config for tests")?;
        let Some(admin_database_url) = config.database.test_database_url.clone() else {
            return Ok(None);
        };
        configure(&mut config);

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(&admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        config.database.url = with_search_path(&admin_database_url, &schema)?;
        config.database.pool_min_size = 0;
        config.database.pool_max_size = 2;
        config.database.run_migrations = true;

        let pool = db::connect(&config.database)
            .await
            .context("connect test pool")?;
        let state = AppState::with_stores(
            config,
            Arc::new(PgResourceStore::new(pool.clone())),
            Arc::new(PgJobStore::new(pool.clone())),
        );

        Ok(Some(Self {
            router: create_router(state),
            pool,
            schema,
            admin_database_url,
        }))
    }

    pub async fn cleanup(self) -> anyhow::Result<()> {
        self.pool.close().await;

        let mut admin_conn = sqlx::PgConnection::connect(&self.admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;
        Ok(())
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

    pub async fn create_organization(&self, npi: &str) -> anyhow::Result<String> {
        post_organization(&self.router, npi).await
    }
}

pub async fn with_pg_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a PgTestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    with_pg_app_with_config(|_| {}, f).await
}

pub async fn with_pg_app_with_config<C, F>(configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: for<'a> FnOnce(
        &'a PgTestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let Some(app) = PgTestApp::new_with_config(configure).await? else {
        eprintln!("ATTRIBUTION_DATABASE__TEST_DATABASE_URL not set, skipping Postgres test");
        return Ok(());
    };

    let result = std::panic::AssertUnwindSafe(f(&app)).catch_unwind().await;
    let cleanup_result = app.cleanup().await;

    if let Err(e) = cleanup_result {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}
