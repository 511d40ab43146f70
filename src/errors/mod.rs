//! Error taxonomy and its status/code mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::Value;
use thiserror::Error;

use crate::response::{self, ResponseEnvelope};

/// Machine-readable codes carried in the `code` field of every envelope.
pub mod codes {
    pub const SUCCESS: &str = "success";
    pub const BAD_REQUEST: &str = "bad request";
    pub const DATA_NOT_EXIST: &str = "data not exist";
    pub const ALREADY_EXISTS: &str = "already exists";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const REFRESH_TOKEN_REVOKED: &str = "refresh token revoked";
    pub const ACCESS_TOKEN_EXPIRED: &str = "access token expired";
    pub const NO_CONTENT: &str = "no content";
    pub const MAX_SIZE_EXCEEDED: &str = "maximum size exceeded";
    pub const INTERNAL_SERVER_ERROR: &str = "internal server error";
}

/// Every failure a handler can hand to the response builder.
/// Each variant maps to exactly one status in [`ApiError::status`].
#[derive(Debug, Error)]
pub enum ApiError {
    // 5XX
    #[error("internal server error")]
    InternalServer,
    #[error("transaction failed")]
    StartTransaction,
    #[error("database error: {0}")]
    Database(String),

    // 4XX
    #[error("bad request")]
    BadRequest,
    #[error("invalid token")]
    InvalidToken,
    #[error("your requested item is not found")]
    NotFound,
    #[error("your item already exist")]
    DuplicateData,
    #[error("maximum size exceeded")]
    MaxSizeExceeded,
    #[error("unauthorized")]
    Unauthorized,
    #[error("unauthorized: Invalid Bearer token")]
    InvalidBearerToken,
    #[error("unauthorized: login required")]
    LoginRequired,
    #[error("unauthorized: Bearer token is missing or empty")]
    MissingBearer,
    #[error("unauthorized: State is invalid")]
    InvalidState,
    #[error("refresh token revoked")]
    RefreshTokenRevoked,
    #[error("access token is expired")]
    AccessTokenExpired,

    // 2XX
    #[error("no content")]
    NoContent,
}

impl ApiError {
    /// HTTP status and envelope code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest | ApiError::InvalidToken => {
                (StatusCode::BAD_REQUEST, codes::BAD_REQUEST)
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, codes::DATA_NOT_EXIST),
            ApiError::DuplicateData => (StatusCode::CONFLICT, codes::ALREADY_EXISTS),
            ApiError::Unauthorized
            | ApiError::InvalidState
            | ApiError::MissingBearer
            | ApiError::InvalidBearerToken
            | ApiError::LoginRequired => (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED),
            ApiError::RefreshTokenRevoked => {
                (StatusCode::UNAUTHORIZED, codes::REFRESH_TOKEN_REVOKED)
            }
            ApiError::AccessTokenExpired => {
                (StatusCode::UNAUTHORIZED, codes::ACCESS_TOKEN_EXPIRED)
            }
            ApiError::NoContent => (StatusCode::NO_CONTENT, codes::NO_CONTENT),
            ApiError::MaxSizeExceeded => (StatusCode::BAD_REQUEST, codes::MAX_SIZE_EXCEEDED),
            ApiError::InternalServer | ApiError::StartTransaction | ApiError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Total mapping used by the response builder; `None` means success.
    pub fn status_of(err: Option<&ApiError>) -> (StatusCode, &'static str) {
        match err {
            None => (StatusCode::OK, codes::SUCCESS),
            Some(e) => e.status(),
        }
    }
}

/// Lets middleware return an [`ApiError`] as `Err`; actix renders it as the
/// usual envelope.
impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, envelope) = ResponseEnvelope::new("", Value::Null, None, Some(self), Vec::new());
        response::write_envelope(status, &envelope)
    }
}

impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_error_is_success() {
        assert_eq!(ApiError::status_of(None), (StatusCode::OK, codes::SUCCESS));
    }

    #[test]
    fn sentinel_mapping() {
        let cases = [
            (ApiError::BadRequest, 400, codes::BAD_REQUEST),
            (ApiError::InvalidToken, 400, codes::BAD_REQUEST),
            (ApiError::NotFound, 404, codes::DATA_NOT_EXIST),
            (ApiError::DuplicateData, 409, codes::ALREADY_EXISTS),
            (ApiError::Unauthorized, 401, codes::UNAUTHORIZED),
            (ApiError::InvalidState, 401, codes::UNAUTHORIZED),
            (ApiError::MissingBearer, 401, codes::UNAUTHORIZED),
            (ApiError::InvalidBearerToken, 401, codes::UNAUTHORIZED),
            (ApiError::LoginRequired, 401, codes::UNAUTHORIZED),
            (ApiError::RefreshTokenRevoked, 401, codes::REFRESH_TOKEN_REVOKED),
            (ApiError::AccessTokenExpired, 401, codes::ACCESS_TOKEN_EXPIRED),
            (ApiError::NoContent, 204, codes::NO_CONTENT),
            (ApiError::MaxSizeExceeded, 400, codes::MAX_SIZE_EXCEEDED),
            (ApiError::StartTransaction, 500, codes::INTERNAL_SERVER_ERROR),
            (ApiError::Database("boom".to_string()), 500, codes::INTERNAL_SERVER_ERROR),
        ];

        for (err, status, code) in cases {
            let (got_status, got_code) = err.status();
            assert_eq!(got_status.as_u16(), status, "status for {err:?}");
            assert_eq!(got_code, code, "code for {err:?}");
        }
    }

    #[actix_rt::test]
    async fn renders_as_envelope_error() {
        let err = ApiError::NotFound;
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let envelope: ResponseEnvelope = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope.code, codes::DATA_NOT_EXIST);
        assert_eq!(envelope.message, "your requested item is not found");
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn messages_follow_sentinels() {
        assert_eq!(ApiError::NotFound.to_string(), "your requested item is not found");
        assert_eq!(ApiError::DuplicateData.to_string(), "your item already exist");
    }
}
