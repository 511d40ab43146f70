//! Uniform response envelope shared by every endpoint.

use std::collections::BTreeMap;
use std::fmt;

use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{codes, ApiError};
use crate::utils;
use crate::validation::PayloadError;

/// Tracing header, used only for log correlation.
pub const REQUEST_ID_HEADER: &str = "request-id";

/// One `errors[]` entry, serialized as `{ "<field>": "<message>" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.message)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldErrorVisitor;

        impl<'de> Visitor<'de> for FieldErrorVisitor {
            type Value = FieldError;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with exactly one field")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldError, A::Error> {
                let (field, message): (String, String) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::invalid_length(2, &self));
                }
                Ok(FieldError { field, message })
            }
        }

        deserializer.deserialize_map(FieldErrorVisitor)
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_data: u64,
    pub total_page: u64,
}

/// `total_page = ceil(total_data / limit)`. A zero `limit` is a bad request.
pub fn set_base_meta(page: u32, limit: u32, total_data: u64) -> Result<PaginationMeta, ApiError> {
    if limit == 0 {
        return Err(ApiError::BadRequest);
    }
    Ok(PaginationMeta {
        page,
        limit,
        total_data,
        total_page: total_data.div_ceil(u64::from(limit)),
    })
}

static IMPLICIT_FAILURE: ApiError = ApiError::BadRequest;

/// The body of every response. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub code: String,
    pub message: String,
    pub data: T,
    pub meta: Option<PaginationMeta>,
    pub errors: Option<Vec<FieldError>>,
    pub server_time: i64,
}

impl<T> ResponseEnvelope<T> {
    /// Builds an envelope whose code always agrees with `err`.
    ///
    /// Field errors without an error are reported as [`ApiError::BadRequest`].
    /// Returns the HTTP status alongside.
    pub fn new(
        message: &str,
        data: T,
        meta: Option<PaginationMeta>,
        err: Option<&ApiError>,
        field_errors: Vec<FieldError>,
    ) -> (StatusCode, Self) {
        let err = match err {
            None if !field_errors.is_empty() => Some(&IMPLICIT_FAILURE),
            other => other,
        };
        let (status, code) = ApiError::status_of(err);

        let message = match (message.trim().is_empty(), err) {
            (false, _) => message.to_string(),
            (true, Some(e)) => e.to_string(),
            (true, None) => codes::SUCCESS.to_string(),
        };

        let envelope = Self {
            code: code.to_string(),
            message,
            data,
            meta,
            errors: if err.is_some() && !field_errors.is_empty() {
                Some(field_errors)
            } else {
                None
            },
            server_time: utils::time_now().timestamp(),
        };
        (status, envelope)
    }
}

/// Writes the envelope for `req`.
///
/// Logs the outgoing data only when the request carries a `request-id`.
/// The response is returned by value, so each request produces it once.
pub fn build_response<T: Serialize>(
    req: &HttpRequest,
    message: &str,
    data: T,
    meta: Option<PaginationMeta>,
    err: Option<&ApiError>,
    field_errors: Vec<FieldError>,
) -> HttpResponse {
    if let Some(line) = response_log_line(req, &data) {
        log::info!("{}", line);
    }

    let (status, envelope) = ResponseEnvelope::new(message, data, meta, err, field_errors);
    write_envelope(status, &envelope)
}

/// `200 success` with `data`.
pub fn success<T: Serialize>(req: &HttpRequest, data: T) -> HttpResponse {
    build_response(req, "", data, None, None, Vec::new())
}

/// Envelope for `err` with `data: null`.
pub fn failure(req: &HttpRequest, err: &ApiError) -> HttpResponse {
    build_response(req, "", Value::Null, None, Some(err), Vec::new())
}

/// `400` envelope for a rejected request body.
pub fn reject_payload(req: &HttpRequest, err: &PayloadError) -> HttpResponse {
    build_response(
        req,
        &err.to_string(),
        Value::Null,
        None,
        Some(&ApiError::BadRequest),
        vec![err.field_error()],
    )
}

/// `[RESPONSE <url>] REQUEST_ID: <id> BODY: <json>`, or `None` without a
/// `request-id` header.
pub fn response_log_line<T: Serialize>(req: &HttpRequest, data: &T) -> Option<String> {
    let request_id = request_id(req)?;
    let body = serde_json::to_string(data).unwrap_or_else(|e| format!("<unserializable: {e}>"));
    Some(format!(
        "[RESPONSE {}] REQUEST_ID: {} BODY: {}",
        req.uri(),
        request_id,
        body
    ))
}

/// Non-empty `request-id` header value.
pub fn request_id(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Serializes an envelope with the standard headers.
pub fn write_envelope<T: Serialize>(status: StatusCode, envelope: &ResponseEnvelope<T>) -> HttpResponse {
    let date = utils::time_now()
        .format(utils::FORMAT_DATETIME_TEXT)
        .to_string();

    let mut builder = HttpResponse::build(status);
    builder.content_type("application/json");
    if let Ok(value) = HeaderValue::from_str(&date) {
        builder.insert_header((header::DATE, value));
    }

    match serde_json::to_string_pretty(envelope) {
        Ok(body) => builder.body(body),
        Err(e) => {
            log::error!("Failed to serialize response envelope: {}", e);
            let mut fallback = BTreeMap::new();
            fallback.insert("code", codes::INTERNAL_SERVER_ERROR);
            fallback.insert("message", "failed to serialize response");
            HttpResponse::InternalServerError()
                .content_type("application/json")
                .json(fallback)
        }
    }
}
