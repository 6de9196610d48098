use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use super::conditional::format_http_date;
use super::error::ApiError;
use crate::concurrency::{ChangeToken, ReadOutcome};

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with a 200 status
    pub fn success(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error("Failed to serialize response data").into_response();
            }
        };

        (StatusCode::OK, Json(json!({ "success": true, "data": data_value }))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Full reads carry validators; not-modified reads carry them with no body.
impl<T: Serialize> IntoResponse for ReadOutcome<T> {
    fn into_response(self) -> Response {
        let validators = validators(self.last_modified());
        match self {
            ReadOutcome::Full { value, .. } => (validators, ApiResponse::success(value)).into_response(),
            ReadOutcome::NotModified { .. } => (StatusCode::NOT_MODIFIED, validators).into_response(),
        }
    }
}

fn validators(last_modified: Option<chrono::DateTime<chrono::Utc>>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(at) = last_modified else {
        return headers;
    };

    match HeaderValue::from_str(&ChangeToken::from_timestamp(at).to_etag()) {
        Ok(etag) => {
            headers.insert(header::ETAG, etag);
        }
        Err(e) => tracing::warn!("Skipping unrepresentable ETag: {}", e),
    }
    match HeaderValue::from_str(&format_http_date(at)) {
        Ok(date) => {
            headers.insert(header::LAST_MODIFIED, date);
        }
        Err(e) => tracing::warn!("Skipping unrepresentable Last-Modified: {}", e),
    }
    headers
}
