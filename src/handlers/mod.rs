use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::DatabaseService;
use crate::errors::ApiError;
use crate::models::{ExampleRequest, PaginationParams};
use crate::response;
use crate::services::ExampleService;
use crate::validation::ValidatedJson;

/// Liveness probe, plain text.
pub async fn ping(config: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(format!("hello world: {}", config.env))
}

/// Health check endpoint, backed by a database round-trip
pub async fn health_check(req: HttpRequest, db: web::Data<Arc<DatabaseService>>) -> HttpResponse {
    match db.ping().await {
        Ok(()) => response::success(&req, "healthy"),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            response::failure(&req, &ApiError::InternalServer)
        }
    }
}

pub async fn get_example(req: HttpRequest, service: web::Data<Arc<ExampleService>>) -> HttpResponse {
    response::success(&req, service.get_example())
}

/// `GET /example/list?page=&limit=`
pub async fn list_examples(
    req: HttpRequest,
    service: web::Data<Arc<ExampleService>>,
) -> HttpResponse {
    let params = match web::Query::<PaginationParams>::from_query(req.query_string()) {
        Ok(query) => query.into_inner(),
        Err(e) => {
            log::warn!("Invalid pagination query {:?}: {}", req.query_string(), e);
            return response::failure(&req, &ApiError::BadRequest);
        }
    };

    match service.list_examples(&params) {
        Ok((items, meta)) => response::build_response(&req, "", items, Some(meta), None, Vec::new()),
        Err(e) => response::failure(&req, &e),
    }
}

pub async fn create_example(
    req: HttpRequest,
    payload: ValidatedJson<ExampleRequest>,
    service: web::Data<Arc<ExampleService>>,
) -> HttpResponse {
    response::success(&req, service.create_example(payload.into_inner()))
}

/// Envelope for unmatched routes.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    response::failure(&req, &ApiError::NotFound)
}

/// Registers every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ping", web::get().to(ping))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/example")
                .route("", web::get().to(get_example))
                .route("", web::post().to(create_example))
                .route("/list", web::get().to(list_examples)),
        );
}
