//! Mock managed-identity endpoint.
//!
//! Answers `POST /oauth2/token` the way a workload-local identity service
//! does: the caller must send `Metadata: true` and a form-encoded
//! `resource`, and gets back a bearer token scoped to that resource.
//! Tokens are random and carry no claims.

use axum::{
    extract::Form,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Lifetime advertised for every minted token, in seconds.
const TOKEN_TTL_SECS: i64 = 3599;

/// Build the mock endpoint's router.
pub fn router() -> Router {
    Router::new().route("/oauth2/token", post(token))
}

#[derive(Deserialize)]
struct TokenRequest {
    #[serde(default)]
    resource: String,
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(error: &str, description: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "error_description": description })),
    )
}

async fn token(headers: HeaderMap, Form(req): Form<TokenRequest>) -> Result<Json<Value>, ApiError> {
    let has_metadata = headers
        .get("metadata")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if !has_metadata {
        warn!("token request without Metadata header");
        return Err(bad_request(
            "invalid_request",
            "Required metadata header not specified",
        ));
    }

    let resource = req.resource.trim();
    if resource.is_empty() {
        warn!("token request without resource");
        return Err(bad_request(
            "invalid_resource",
            "The request body must contain the resource parameter",
        ));
    }

    info!(resource = %resource, "issuing token");

    let now = Utc::now();
    let expires_on = now + Duration::seconds(TOKEN_TTL_SECS);
    let access_token = format!("imds_{}", uuid::Uuid::new_v4().simple());

    // Numbers are strings on the wire, as the real endpoint sends them.
    Ok(Json(json!({
        "access_token": access_token,
        "refresh_token": "",
        "expires_in": TOKEN_TTL_SECS.to_string(),
        "expires_on": expires_on.timestamp().to_string(),
        "not_before": now.timestamp().to_string(),
        "resource": resource,
        "token_type": "Bearer",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;

    fn server() -> TestServer {
        TestServer::new(router()).unwrap()
    }

    fn metadata() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("metadata"),
            HeaderValue::from_static("true"),
        )
    }

    #[tokio::test]
    async fn issues_bearer_token_for_resource() {
        let (name, value) = metadata();
        let res = server()
            .post("/oauth2/token")
            .add_header(name, value)
            .form(&[("resource", "https://management.core.windows.net/")])
            .await;

        res.assert_status_ok();
        let body: Value = res.json();
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["resource"], "https://management.core.windows.net/");
        assert!(body["access_token"].as_str().unwrap().starts_with("imds_"));
    }

    #[tokio::test]
    async fn tokens_are_unique_per_call() {
        let server = server();
        let mut seen = Vec::new();
        for _ in 0..2 {
            let (name, value) = metadata();
            let res = server
                .post("/oauth2/token")
                .add_header(name, value)
                .form(&[("resource", "https://vault.azure.net")])
                .await;
            let body: Value = res.json();
            seen.push(body["access_token"].as_str().unwrap().to_string());
        }
        assert_ne!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn missing_metadata_header_is_rejected() {
        let res = server()
            .post("/oauth2/token")
            .form(&[("resource", "https://management.core.windows.net/")])
            .expect_failure()
            .await;

        res.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = res.json();
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn missing_resource_is_rejected() {
        let (name, value) = metadata();
        let res = server()
            .post("/oauth2/token")
            .add_header(name, value)
            .form(&[("resource", "  ")])
            .expect_failure()
            .await;

        res.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = res.json();
        assert_eq!(body["error"], "invalid_resource");
    }
}
