// Conditional request header parsing
use axum::http::{header, HeaderMap, HeaderName};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::error::ApiError;
use crate::concurrency::{IfMatch, ReadPreconditions, WritePreconditions};

pub fn read_preconditions(headers: &HeaderMap) -> Result<ReadPreconditions, ApiError> {
    Ok(ReadPreconditions {
        if_modified_since: http_date(headers, header::IF_MODIFIED_SINCE)?,
    })
}

pub fn write_preconditions(headers: &HeaderMap) -> Result<WritePreconditions, ApiError> {
    let if_match = match headers.get(header::IF_MATCH) {
        None => None,
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| invalid(&header::IF_MATCH, "must be visible ASCII"))?;
            if raw.trim().is_empty() {
                return Err(invalid(&header::IF_MATCH, "cannot be empty"));
            }
            Some(IfMatch::parse(raw))
        }
    };

    Ok(WritePreconditions {
        if_match,
        if_unmodified_since: http_date(headers, header::IF_UNMODIFIED_SINCE)?,
    })
}

/// Parses an RFC 1123 HTTP-date
fn http_date(headers: &HeaderMap, name: HeaderName) -> Result<Option<DateTime<Utc>>, ApiError> {
    let Some(value) = headers.get(&name) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| invalid(&name, "must be visible ASCII"))?;
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|at| Some(at.with_timezone(&Utc)))
        .map_err(|_| invalid(&name, "must be an HTTP-date"))
}

/// Formats a stamp as an HTTP-date, which carries whole seconds only
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn invalid(name: &HeaderName, reason: &str) -> ApiError {
    let mut field_errors = HashMap::new();
    field_errors.insert(name.as_str().to_string(), reason.to_string());
    ApiError::validation_error(format!("{}: {}", name.as_str(), reason), Some(field_errors))
}
