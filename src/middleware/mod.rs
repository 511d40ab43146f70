use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, ConnectionType, Method, StatusCode},
    Error, HttpRequest, HttpResponse, ResponseError,
};

use futures_util::future::{FutureExt, LocalBoxFuture};
use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::future::{ready, Ready};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::response;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH";
pub const ALLOWED_HEADERS: &str = "Accept, Authorization, Content-Type, X-CSRF-Token";
pub const EXPOSED_HEADERS: &str = "Link";
pub const PREFLIGHT_MAX_AGE_SECONDS: &str = "300";

/// Request logging middleware
pub struct LoggingMiddleware;

impl<S> Transform<S, ServiceRequest> for LoggingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggingMiddlewareService<S> {
    service: Arc<S>,
}

impl<S> Service<ServiceRequest> for LoggingMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        let start_time = std::time::Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();

        log::info!("{}", request_log_line(req.request()));

        Box::pin(async move {
            let result = service.call(req).await;
            let duration = start_time.elapsed();

            match &result {
                Ok(res) => {
                    log::info!(
                        "Request completed: {} {} {} {}ms",
                        method, uri, res.status().as_u16(), duration.as_millis()
                    );
                }
                Err(err) => {
                    log::error!(
                        "Request failed: {} {} {} {}ms",
                        method, uri, err, duration.as_millis()
                    );
                }
            }

            result
        })
    }
}

/// `[IN_REQUEST: [<METHOD>] <url>] REQUEST_ID: <id or -> HEADER: <json>`
pub fn request_log_line(req: &HttpRequest) -> String {
    let mut headers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, value) in req.headers().iter() {
        headers
            .entry(name.as_str())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    let header_json = serde_json::to_string(&headers).unwrap_or_else(|_| "{}".to_string());

    format!(
        "[IN_REQUEST: [{}] {}] REQUEST_ID: {} HEADER: {}",
        req.method(),
        req.uri(),
        response::request_id(req).unwrap_or("-"),
        header_json
    )
}

/// CORS middleware
pub struct CorsMiddleware {
    /// Exact origins; `*` admits any `http://` or `https://` origin.
    pub allowed_origins: Vec<String>,
}

impl<S> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddlewareService {
            service: Arc::new(service),
            allowed_origins: self.allowed_origins.clone(),
        }))
    }
}

pub struct CorsMiddlewareService<S> {
    service: Arc<S>,
    allowed_origins: Vec<String>,
}

impl<S> Service<ServiceRequest> for CorsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);

        let origin = req
            .headers()
            .get(header::ORIGIN)
            .filter(|o| {
                o.to_str()
                    .map(|o| origin_allowed(&self.allowed_origins, o))
                    .unwrap_or(false)
            })
            .cloned();

        let is_preflight = req.method() == Method::OPTIONS
            && req.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

        if is_preflight {
            let mut response = HttpResponse::NoContent();
            response.insert_header((header::VARY, "Origin"));
            if let Some(origin) = origin {
                response
                    .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin))
                    .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
                    .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS))
                    .insert_header((header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE_SECONDS));
            }
            let response = req.into_response(response.finish());
            return Box::pin(async move { Ok(response) });
        }

        Box::pin(async move {
            let mut res = service.call(req).await?;

            let headers = res.headers_mut();
            headers.append(header::VARY, header::HeaderValue::from_static("Origin"));

            if let Some(origin) = origin {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                headers.insert(
                    header::ACCESS_CONTROL_EXPOSE_HEADERS,
                    header::HeaderValue::from_static(EXPOSED_HEADERS),
                );
            }

            Ok(res)
        })
    }
}

pub fn origin_allowed(allowed_origins: &[String], origin: &str) -> bool {
    allowed_origins.iter().any(|allowed| {
        allowed == origin
            || (allowed == "*" && (origin.starts_with("http://") || origin.starts_with("https://")))
    })
}

/// Panic recovery middleware
///
/// Turns a panic in any inner service into [`RecoveredPanic`]: a 500
/// envelope on a connection that is then closed.
pub struct RecoverPanicMiddleware;

impl<S> Transform<S, ServiceRequest> for RecoverPanicMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RecoverPanicMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoverPanicMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct RecoverPanicMiddlewareService<S> {
    service: Arc<S>,
}

impl<S> Service<ServiceRequest> for RecoverPanicMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error>,
    S: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Arc::clone(&self.service);
        // The router needs sole ownership of the request, so only these are kept.
        let method = req.method().clone();
        let uri = req.uri().clone();

        Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { service.call(req).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(result) => result,
                Err(panic) => {
                    log::error!(
                        "Recovered panic in {} {}: {}",
                        method,
                        uri,
                        panic_message(panic.as_ref())
                    );
                    Err(RecoveredPanic.into())
                }
            }
        })
    }
}

/// Error returned in place of a response whose handler panicked.
#[derive(Debug, thiserror::Error)]
#[error("internal server error")]
pub struct RecoveredPanic;

impl ResponseError for RecoveredPanic {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = ApiError::InternalServer.error_response();
        response.head_mut().set_connection_type(ConnectionType::Close);
        response
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Logs every panic with the stack trace of the panicking thread.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        log::error!("{}\n{}", info, Backtrace::force_capture());
    }));
}
