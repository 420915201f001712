mod support;

use anyhow::Context as _;
use axum::http::{Method, StatusCode};
use dpc_fhir_models::ResourceType;
use serde_json::Value;
use std::sync::atomic::Ordering;
use support::*;

#[tokio::test]
async fn create_returns_resource_without_envelope() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, headers, body) = app
        .admin_request(
            Method::POST,
            "/v2/Organization",
            Some(organization("2111111119")),
            &[("x-request-id", "req-create")],
        )
        .await?;

    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    assert_eq!(headers["content-type"], "application/fhir+json; charset=UTF-8");
    assert_eq!(headers["x-request-id"], "req-create");

    let resource = json_body(&body);
    assert!(resource.get("info").is_none());
    assert_eq!(resource["resourceType"], "Organization");
    assert_eq!(resource["name"], "Burgers University Medical Center");
    let id = resource["id"].as_str().context("id")?;
    assert_eq!(resource["meta"]["id"], format!("Organization/{id}"));
    assert_eq!(resource["meta"]["versionId"], "1");

    let calls = app.attribution.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation, "post");
    assert_eq!(calls[0].request_id, "req-create");
    Ok(())
}

#[tokio::test]
async fn invalid_organization_never_reaches_attribution() -> anyhow::Result<()> {
    let app = TestApp::new();
    let mut body = organization("2111111119");
    body["identifier"] = serde_json::json!([{ "system": "urn:oid:1.2.3", "value": "17-0112278" }]);

    let (status, headers, body) = app
        .admin_request(Method::POST, "/v2/Organization", Some(body), &[])
        .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["content-type"], "application/fhir+json; charset=UTF-8");
    let issue = issue(&body);
    assert_eq!(issue["code"], "Business Rule Violation");
    assert_eq!(issue["severity"], "warning");
    assert_eq!(issue["details"]["text"], "Not a valid organization");
    assert!(app.attribution.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn oversized_organization_is_too_large() -> anyhow::Result<()> {
    let app = TestApp::new_with_config(|config| config.admin_server.max_request_body_size = 64);

    let (status, headers, body) = app
        .admin_request(Method::POST, "/v2/Organization", Some(organization("2111111119")), &[])
        .await?;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(headers["content-type"], "application/fhir+json; charset=UTF-8");
    let issue = issue(&body);
    assert_eq!(issue["code"], "Exception");
    assert_eq!(issue["severity"], "error");
    assert_eq!(issue["details"]["text"], "Request body is too large");
    assert!(app.attribution.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_organization_is_not_found() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, headers, body) = app
        .admin_request(
            Method::GET,
            "/v2/Organization/2c1d0e9f-8a7b-4c6d-5e4f-3a2b1c0d9e8f",
            None,
            &[],
        )
        .await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let issue = issue(&body);
    assert_eq!(issue["code"], "Not Found");
    assert_eq!(issue["details"]["text"], "Failed to find organization");
    let request_id = headers["x-request-id"].to_str()?;
    assert_eq!(issue["diagnostics"], request_id);
    Ok(())
}

#[tokio::test]
async fn update_bumps_version_and_delete_empties_body() -> anyhow::Result<()> {
    let app = TestApp::new();
    let id = app.create_organization("2111111119").await?;
    let path = format!("/v2/Organization/{id}");

    let mut renamed = organization("2111111119");
    renamed["name"] = Value::from("Burgers Clinic");
    let (status, _, body) = app
        .admin_request(Method::PUT, &path, Some(renamed), &[])
        .await?;
    assert_eq!(status, StatusCode::OK);
    let resource = json_body(&body);
    assert_eq!(resource["name"], "Burgers Clinic");
    assert_eq!(resource["meta"]["versionId"], "2");

    let (status, _, body) = app.admin_request(Method::DELETE, &path, None, &[]).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _, _) = app.admin_request(Method::GET, &path, None, &[]).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = app.admin_request(Method::DELETE, &path, None, &[]).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(issue(&body)["code"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn null_info_is_a_server_error() -> anyhow::Result<()> {
    let app = TestApp::new();
    let id = "6f1e2d3c-4b5a-4968-8776-a5b4c3d2e1f0";
    app.attribution.insert_raw(
        ResourceType::Organization,
        id,
        serde_json::to_vec(&envelope(id, 1, Value::Null))?,
    );

    let (status, headers, body) = app
        .admin_request(
            Method::GET,
            &format!("/v2/Organization/{id}"),
            None,
            &[("x-request-id", "req-null-info")],
        )
        .await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers["content-type"], "application/fhir+json; charset=UTF-8");
    let issue = issue(&body);
    assert_eq!(issue["code"], "Exception");
    assert_eq!(issue["severity"], "error");
    assert_eq!(issue["diagnostics"], "req-null-info");
    Ok(())
}

#[tokio::test]
async fn failed_save_is_unprocessable() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.attribution.fail_writes.store(true, Ordering::SeqCst);

    let (status, _, body) = app
        .admin_request(Method::POST, "/v2/Organization", Some(organization("2111111119")), &[])
        .await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let issue = issue(&body);
    assert_eq!(issue["code"], "Exception");
    assert_eq!(issue["details"]["text"], "Failed to save organization");
    Ok(())
}

#[tokio::test]
async fn public_read_is_limited_to_own_organization() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.attribution.insert_raw(
        ResourceType::Organization,
        ORG_ID,
        serde_json::to_vec(&envelope(ORG_ID, 1, organization("2111111119")))?,
    );

    let (status, _, body) = app
        .request(Method::GET, &format!("/v2/Organization/{}", ORG_ID.to_uppercase()), None, &[])
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    assert_eq!(json_body(&body)["id"], ORG_ID);

    let (status, _, body) = app
        .request(
            Method::GET,
            "/v2/Organization/2c1d0e9f-8a7b-4c6d-5e4f-3a2b1c0d9e8f",
            None,
            &[],
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(issue(&body)["details"]["text"], "Not Allowed");
    assert_eq!(app.attribution.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn public_routes_require_an_organization() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, _, body) = app
        .raw_request(
            Method::GET,
            &format!("/v2/Organization/{ORG_ID}"),
            Default::default(),
            &[],
        )
        .await?;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(issue(&body)["code"], "Exception");
    assert!(app.attribution.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn organizations_are_not_managed_on_the_public_listener() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, _, _) = app
        .request(Method::POST, "/v2/Organization", Some(organization("2111111119")), &[])
        .await?;

    assert!(status.is_client_error());
    assert!(app.attribution.calls().is_empty());
    Ok(())
}
