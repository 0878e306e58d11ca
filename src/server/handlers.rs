//! HTTP handlers for the DEEPaaS v2 style routes.

use crate::core::{ModelRunner, ModelService, PredictArgs, TrainArgs};
use crate::utils::error::{ApiError, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("❌ {} (suggestion: {})", self, self.recovery_suggestion());
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.user_friendly_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Empty bodies count as `{}` so every argument falls back to its default.
fn parse_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation("body", e.to_string()))
}

fn check_model<R: ModelRunner>(service: &ModelService<R>, name: &str) -> Result<()> {
    if name != service.name() {
        return Err(ApiError::NotFound {
            what: "Model".to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn handle_root() -> impl IntoResponse {
    Json(json!({
        "version": "v2",
        "links": [{"rel": "models", "href": "/v2/models/"}],
    }))
}

pub async fn handle_list_models<R: ModelRunner + 'static>(
    State(service): State<Arc<ModelService<R>>>,
) -> Result<Json<Value>> {
    let metadata = service.get_metadata()?;
    Ok(Json(json!({ "models": [metadata] })))
}

pub async fn handle_get_model<R: ModelRunner + 'static>(
    State(service): State<Arc<ModelService<R>>>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    check_model(&service, &name)?;
    Ok(Json(serde_json::to_value(service.get_metadata()?)?))
}

pub async fn handle_predict<R: ModelRunner + 'static>(
    State(service): State<Arc<ModelService<R>>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    check_model(&service, &name)?;
    let mut args = PredictArgs::from_json(parse_body(&body)?)?;
    if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        args.apply_accept_header(accept);
    }

    let rendered = service.predict(&args).await?;

    let mut response = (
        [(header::CONTENT_TYPE, rendered.content_type.mime())],
        rendered.body,
    )
        .into_response();
    if let Some(filename) = rendered.filename {
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
        }
    }
    Ok(response)
}

pub async fn handle_train<R: ModelRunner + 'static>(
    State(service): State<Arc<ModelService<R>>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    check_model(&service, &name)?;
    let args = TrainArgs::from_json(parse_body(&body)?)?;
    let summary = service.train(&args).await?;
    Ok(Json(serde_json::to_value(summary)?))
}
