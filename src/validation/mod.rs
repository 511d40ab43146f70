//! Request payload decoding and validation.
//!
//! Payloads derive [`validator::Validate`] for their constraints and declare
//! their wire names with [`json_fields!`](crate::json_fields). A failed pass is
//! reported as a single [`PayloadError`] carrying the first violation found.

use std::collections::HashSet;

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::response::{self, FieldError};

/// Internal name → wire name of one payload field.
#[derive(Debug, Clone, Copy)]
pub struct FieldTag {
    pub name: &'static str,
    pub json: &'static str,
    /// Field table of an embedded payload, if the field is one.
    pub nested: Option<fn() -> &'static [FieldTag]>,
}

/// Field table of a payload type, in declaration order.
pub trait JsonFields {
    fn json_fields() -> &'static [FieldTag];
}

/// Implements [`JsonFields`] for a payload.
///
/// Every internal name must be a field of the payload:
///
/// ```
/// use rest_boilerplate::json_fields;
///
/// struct Address { street: String }
/// struct Order { customer_id: u64, shipping: Address }
///
/// json_fields!(Address { street => "street" });
/// json_fields!(Order {
///     customer_id => "customer",
///     shipping => "shipping" nested Address,
/// });
/// ```
///
/// ```compile_fail
/// use rest_boilerplate::json_fields;
///
/// struct Order { customer_id: u64 }
///
/// json_fields!(Order { customer => "customer" });
/// ```
#[macro_export]
macro_rules! json_fields {
    (@nested) => { None };
    (@nested $inner:ty) => {
        Some(<$inner as $crate::validation::JsonFields>::json_fields)
    };
    ($ty:ty { $($field:ident => $json:literal $(nested $inner:ty)?),* $(,)? }) => {
        impl $crate::validation::JsonFields for $ty {
            fn json_fields() -> &'static [$crate::validation::FieldTag] {
                let _ = |_payload: &$ty| { $(let _ = &_payload.$field;)* };
                const FIELDS: &[$crate::validation::FieldTag] = &[
                    $($crate::validation::FieldTag {
                        name: stringify!($field),
                        json: $json,
                        nested: $crate::json_fields!(@nested $($inner)?),
                    }),*
                ];
                FIELDS
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("invalid type of {field} (expected: {expected}, got: {got})")]
    InvalidType {
        field: String,
        expected: String,
        got: String,
    },
    #[error("payload error: {0}")]
    Malformed(String),
    /// `field` is the wire name, empty when the field table has no entry.
    #[error("{message}")]
    Constraint {
        field: String,
        code: String,
        message: String,
    },
}

impl PayloadError {
    /// The `errors[]` entry reported for this failure.
    pub fn field_error(&self) -> FieldError {
        match self {
            PayloadError::InvalidType { field, .. } => FieldError::new(field, self.to_string()),
            PayloadError::Malformed(_) => FieldError::new("payload", self.to_string()),
            PayloadError::Constraint { field, code, message } => {
                let key = if field.is_empty() { code } else { field };
                FieldError::new(key, message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldTableError {
    #[error("{type_name}: field `{field}` has an empty wire name")]
    EmptyWireName {
        type_name: &'static str,
        field: &'static str,
    },
    #[error("{type_name}: wire name `{json}` is declared more than once")]
    DuplicateWireName {
        type_name: &'static str,
        json: &'static str,
    },
    #[error("{type_name}: field `{field}` is declared as `{json}`, which the payload never serializes")]
    UnknownWireName {
        type_name: &'static str,
        field: &'static str,
        json: &'static str,
    },
    #[error("{type_name}: serialized key `{json}` has no entry in the field table")]
    UndeclaredWireName {
        type_name: &'static str,
        json: String,
    },
    #[error("{type_name}: default payload could not be serialized: {reason}")]
    Unserializable {
        type_name: &'static str,
        reason: String,
    },
}

/// Checks a payload's field table against the keys serde actually writes for
/// `T::default()`. Run once per payload type at startup.
pub fn audit_json_fields<T>() -> Result<(), FieldTableError>
where
    T: JsonFields + Serialize + Default,
{
    let type_name = std::any::type_name::<T>();
    let sample = serde_json::to_value(T::default()).map_err(|e| {
        FieldTableError::Unserializable {
            type_name,
            reason: e.to_string(),
        }
    })?;
    audit_table(type_name, T::json_fields(), &sample)
}

fn audit_table(
    type_name: &'static str,
    fields: &[FieldTag],
    sample: &Value,
) -> Result<(), FieldTableError> {
    let mut seen = HashSet::new();
    for tag in fields {
        if tag.json.is_empty() {
            return Err(FieldTableError::EmptyWireName {
                type_name,
                field: tag.name,
            });
        }
        if !seen.insert(tag.json) {
            return Err(FieldTableError::DuplicateWireName {
                type_name,
                json: tag.json,
            });
        }
        let Some(value) = sample.get(tag.json) else {
            return Err(FieldTableError::UnknownWireName {
                type_name,
                field: tag.name,
                json: tag.json,
            });
        };
        // An absent optional payload has no keys to compare.
        if let (Some(nested), false) = (tag.nested, value.is_null()) {
            audit_table(type_name, nested(), value)?;
        }
    }

    if let Value::Object(map) = sample {
        if let Some(key) = map.keys().find(|key| !fields.iter().any(|tag| tag.json == key.as_str())) {
            return Err(FieldTableError::UndeclaredWireName {
                type_name,
                json: key.clone(),
            });
        }
    }
    Ok(())
}

/// Wire name of `field`, searched through `T` and its embedded payloads.
/// Empty when no table declares the field.
pub fn json_tag<T: JsonFields>(field: &str) -> String {
    find_json_tag(T::json_fields(), field)
        .unwrap_or_default()
        .to_string()
}

pub fn find_json_tag(fields: &[FieldTag], field: &str) -> Option<&'static str> {
    for tag in fields {
        if tag.name == field {
            return Some(tag.json);
        }
        if let Some(nested) = tag.nested {
            if let Some(found) = find_json_tag(nested(), field) {
                return Some(found);
            }
        }
    }
    None
}

/// Decodes `body` into `T` and validates it.
pub fn decode_and_validate<T>(body: &[u8]) -> Result<T, PayloadError>
where
    T: DeserializeOwned + Validate + JsonFields,
{
    let mut de = serde_json::Deserializer::from_slice(body);
    let payload: T = serde_path_to_error::deserialize(&mut de).map_err(decode_error)?;
    de.end()
        .map_err(|e| PayloadError::Malformed(e.to_string()))?;

    validate_struct(&payload)?;
    Ok(payload)
}

/// [`decode_and_validate`] for a request body, rejecting non-JSON content types.
/// A missing `Content-Type` is accepted.
pub fn decode_request<T>(req: &HttpRequest, body: &[u8]) -> Result<T, PayloadError>
where
    T: DeserializeOwned + Validate + JsonFields,
{
    if let Some(content_type) = req.headers().get(header::CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        if !is_json_mime(content_type) {
            return Err(PayloadError::Malformed(format!(
                "unsupported content type {content_type:?}, expected application/json"
            )));
        }
    }
    decode_and_validate(body)
}

/// Extractor for a decoded and validated JSON body.
///
/// A rejected body short-circuits the handler with the 400 envelope built by
/// [`response::reject_payload`].
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromRequest for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + JsonFields + 'static,
{
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let body = Bytes::from_request(&req, payload);

        Box::pin(async move {
            let decoded = match body.await {
                Ok(body) => decode_request::<T>(&req, &body),
                Err(e) => Err(PayloadError::Malformed(e.to_string())),
            };

            match decoded {
                Ok(value) => Ok(ValidatedJson(value)),
                Err(err) => {
                    log::warn!("Rejected payload for {}: {}", req.uri(), err);
                    let rejection = response::reject_payload(&req, &err);
                    Err(InternalError::from_response(err, rejection).into())
                }
            }
        })
    }
}

fn is_json_mime(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

fn decode_error(err: serde_path_to_error::Error<serde_json::Error>) -> PayloadError {
    let field = err.path().to_string();
    let inner = err.into_inner();

    if inner.classify() == serde_json::error::Category::Data {
        let message = inner.to_string();
        if let Some((expected, got)) = split_type_mismatch(&message) {
            return PayloadError::InvalidType {
                field,
                expected: wire_type(expected),
                got: got.to_string(),
            };
        }
    }
    PayloadError::Malformed(inner.to_string())
}

/// Splits serde's `invalid type: <got>, expected <expected> at line ..`.
fn split_type_mismatch(message: &str) -> Option<(&str, &str)> {
    let rest = message
        .strip_prefix("invalid type: ")
        .or_else(|| message.strip_prefix("invalid value: "))?;
    let rest = match rest.rfind(" at line ") {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    let (got, expected) = rest.rsplit_once(", expected ")?;
    Some((expected, got))
}

fn wire_type(expected: &str) -> String {
    let name = expected
        .strip_prefix("an ")
        .or_else(|| expected.strip_prefix("a "))
        .unwrap_or(expected);

    let wire = match name {
        "u8" | "u16" | "u32" | "u64" | "u128" | "usize" | "i8" | "i16" | "i32" | "i64"
        | "i128" | "isize" => "int",
        "f32" | "f64" => "float",
        "string" | "borrowed string" | "character" | "char" => "string",
        "boolean" => "bool",
        "sequence" => "array",
        "map" => "object",
        _ if name.starts_with("struct ") => "object",
        _ if name.starts_with("tuple") => "array",
        _ => name,
    };
    wire.to_string()
}

/// Runs the payload's constraints and reports the first violation.
pub fn validate_struct<T: Validate + JsonFields>(payload: &T) -> Result<(), PayloadError> {
    let errors = match payload.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let Some((field, error)) = first_violation(T::json_fields(), &errors) else {
        return Err(PayloadError::Malformed(errors.to_string()));
    };

    let json = json_tag::<T>(&field);
    let message = constraint_message(error, &json);
    Err(PayloadError::Constraint {
        field: json,
        code: error.code.to_string(),
        message,
    })
}

/// Walks `errors` in field declaration order; fields absent from the table
/// follow, sorted by name.
fn first_violation<'e>(
    fields: &[FieldTag],
    errors: &'e ValidationErrors,
) -> Option<(String, &'e ValidationError)> {
    let all = errors.errors();

    for tag in fields {
        if let Some(kind) = all.get(tag.name) {
            let nested = tag.nested.map(|table| table()).unwrap_or_default();
            if let Some(found) = violation_in(tag.name, kind, nested) {
                return Some(found);
            }
        }
    }

    let mut undeclared: Vec<(&str, &ValidationErrorsKind)> = all
        .iter()
        .map(|(name, kind)| (AsRef::<str>::as_ref(name), kind))
        .filter(|(name, _)| !fields.iter().any(|tag| tag.name == *name))
        .collect();
    undeclared.sort_by(|a, b| a.0.cmp(b.0));
    undeclared
        .into_iter()
        .find_map(|(name, kind)| violation_in(name, kind, &[]))
}

fn violation_in<'e>(
    name: &str,
    kind: &'e ValidationErrorsKind,
    nested: &[FieldTag],
) -> Option<(String, &'e ValidationError)> {
    match kind {
        ValidationErrorsKind::Field(list) => list.first().map(|e| (name.to_string(), e)),
        ValidationErrorsKind::Struct(inner) => first_violation(nested, inner),
        ValidationErrorsKind::List(items) => items
            .values()
            .find_map(|inner| first_violation(nested, inner)),
    }
}

/// Constraint kinds with a dedicated message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    Required,
    Min(String),
    Max(String),
    Email,
    OneOf(Vec<String>),
    DatetimeFormat,
    Gt(String),
    Unknown(String),
}

impl ConstraintKind {
    pub fn from_error(error: &ValidationError) -> Self {
        match &*error.code {
            "required" | "required_if" => ConstraintKind::Required,
            "email" => ConstraintKind::Email,
            "datetimeformat" => ConstraintKind::DatetimeFormat,
            "oneof" => ConstraintKind::OneOf(
                param(error, "choices")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            "min" => ConstraintKind::Min(param(error, "min")),
            "max" => ConstraintKind::Max(param(error, "max")),
            "gt" => ConstraintKind::Gt(param(error, "gt")),
            "length" | "range" => bound_kind(error),
            other => ConstraintKind::Unknown(other.to_string()),
        }
    }

    pub fn message(&self, field: &str) -> String {
        match self {
            ConstraintKind::Required => format!("{field} is required"),
            ConstraintKind::Min(min) => format!("{field} must be at least {min}"),
            ConstraintKind::Max(max) => format!("{field} must be at most {max}"),
            ConstraintKind::Email => format!("{field} must be a valid email address"),
            ConstraintKind::OneOf(choices) => {
                format!("{field} valid choices are: {}", choices.join(", "))
            }
            ConstraintKind::DatetimeFormat => {
                format!("{field} datetime format is YYYY-MM-DD hh:mm")
            }
            ConstraintKind::Gt(limit) if limit == "0" => format!("{field} can't be empty"),
            ConstraintKind::Gt(limit) => format!("Minimum length of {field} is {limit}"),
            ConstraintKind::Unknown(_) => format!("Validation error on field {field}"),
        }
    }
}

/// Message for one violation; the raw constraint code when the wire name is unknown.
pub fn constraint_message(error: &ValidationError, json_field: &str) -> String {
    if json_field.is_empty() {
        return error.code.to_string();
    }
    ConstraintKind::from_error(error).message(json_field)
}

// `length` and `range` carry both bounds; pick the one the value crossed.
fn bound_kind(error: &ValidationError) -> ConstraintKind {
    if error.params.contains_key("exclusive_min") {
        return ConstraintKind::Gt(param(error, "exclusive_min"));
    }

    let min = error
        .params
        .get("min")
        .or_else(|| error.params.get("equal"));
    let max = error
        .params
        .get("max")
        .or_else(|| error.params.get("exclusive_max"));

    match (min, max) {
        (Some(min), None) => ConstraintKind::Min(render_param(min)),
        (None, Some(max)) => ConstraintKind::Max(render_param(max)),
        (Some(min), Some(max)) => {
            let measured = error.params.get("value").and_then(measure);
            match (measured, min.as_f64()) {
                (Some(value), Some(floor)) if value >= floor => {
                    ConstraintKind::Max(render_param(max))
                }
                _ => ConstraintKind::Min(render_param(min)),
            }
        }
        (None, None) => ConstraintKind::Unknown(error.code.to_string()),
    }
}

fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn param(error: &ValidationError, name: &str) -> String {
    error
        .params
        .get(name)
        .map(render_param)
        .unwrap_or_default()
}

fn render_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
        }
        other => other.to_string(),
    }
}

/// Custom constraints referenced from `#[validate(custom(...))]` attributes.
pub mod rules {
    use std::borrow::Cow;

    use chrono::NaiveDateTime;
    use validator::ValidationError;

    /// `YYYY-MM-DD hh:mm`
    pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn datetime_format(value: &str) -> Result<(), ValidationError> {
        NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
            .map(|_| ())
            .map_err(|_| ValidationError::new("datetimeformat"))
    }

    /// Fails with code `oneof` and the space separated `choices` param.
    pub fn one_of(value: &str, choices: &[&str]) -> Result<(), ValidationError> {
        if choices.contains(&value) {
            return Ok(());
        }
        let mut err = ValidationError::new("oneof");
        err.add_param(Cow::from("choices"), &choices.join(" "));
        err.add_param(Cow::from("value"), &value);
        Err(err)
    }
}
