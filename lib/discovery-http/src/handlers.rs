//! Request routing for the service's HTTP endpoints

use crate::health::{HealthChecks, HealthStatus};
use discovery_core::DiscoveryClient;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared state behind every connection
pub struct AppState {
    discovery: Arc<DiscoveryClient>,
    health: HealthChecks,
}

impl AppState {
    pub fn new(discovery: Arc<DiscoveryClient>, health: HealthChecks) -> Self {
        Self { discovery, health }
    }
}

/// Dispatch a request to its handler
pub async fn route<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();

    debug!("{} {}", method, path);

    if method != Method::GET {
        return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n");
    }

    match path.as_str() {
        "/" => text_response(StatusCode::OK, "Running"),
        "/health" => health(state),
        "/api/service" => service_url(&query, state).await,
        _ => text_response(StatusCode::NOT_FOUND, "Not Found\n"),
    }
}

fn health(state: &AppState) -> Response<Full<Bytes>> {
    let report = state.health.run();
    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    match serde_json::to_vec(&report) {
        Ok(body) => json_response(status, body),
        Err(e) => {
            warn!("Failed to serialise health report: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n")
        }
    }
}

/// `GET /api/service?serviceName=&endpoint=`
async fn service_url(query: &str, state: &AppState) -> Response<Full<Bytes>> {
    let mut service_name = None;
    let mut endpoint = String::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key.eq_ignore_ascii_case("serviceName") {
            service_name = Some(value.into_owned());
        } else if key.eq_ignore_ascii_case("endpoint") {
            endpoint = value.into_owned();
        }
    }

    let Some(service_name) = service_name.filter(|name| !name.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "serviceName is required");
    };

    match state.discovery.resolve(&service_name, &endpoint).await {
        Ok(Some(url)) => json_response(StatusCode::OK, Value::String(url).to_string()),
        Ok(None) => json_response(StatusCode::OK, Value::Null.to_string()),
        Err(e) => {
            warn!("Discovery of {} failed: {}", service_name, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    response(status, "text/plain; charset=utf-8", Bytes::from_static(body.as_bytes()))
}

fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    response(status, "application/json", body.into())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, json!({ "error": message }).to_string())
}

fn response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
