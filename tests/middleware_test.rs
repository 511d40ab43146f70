#[cfg(test)]
mod tests {
    use actix_web::{
        body,
        http::{ConnectionType, StatusCode},
        test, web, App, HttpRequest, HttpResponse,
    };
    use rest_boilerplate::handlers;
    use rest_boilerplate::middleware::{CorsMiddleware, LoggingMiddleware, RecoverPanicMiddleware};
    use rest_boilerplate::repository::StaticExampleRepository;
    use rest_boilerplate::response::{success, ResponseEnvelope};
    use rest_boilerplate::services::ExampleService;
    use serde_json::Value;
    use std::sync::Arc;

    async fn ok_handler(req: HttpRequest) -> HttpResponse {
        success(&req, "ok")
    }

    async fn panicking_handler() -> HttpResponse {
        panic!("handler exploded");
    }

    fn origins(list: &[&str]) -> Vec<String> {
        list.iter().map(|o| o.to_string()).collect()
    }

    #[actix_rt::test]
    async fn test_full_stack_serves_routes_and_recovers_panics() {
        let service = Arc::new(ExampleService::new(Arc::new(StaticExampleRepository::new())));
        // Same wrap order as the server binary.
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .wrap(RecoverPanicMiddleware)
                .wrap(CorsMiddleware {
                    allowed_origins: origins(&["*"]),
                })
                .wrap(LoggingMiddleware)
                .configure(handlers::configure)
                .route("/boom", web::get().to(panicking_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/example")
            .insert_header(("Origin", "https://app.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://app.example.com"
        );
        let body: ResponseEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.code, "success");

        let req = test::TestRequest::get().uri("/boom").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.head().connection_type(), ConnectionType::Close);

        let bytes = body::to_bytes(resp.into_body()).await.unwrap();
        let body: ResponseEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "internal server error");
        assert_eq!(body.data, Value::Null);

        // The worker keeps serving after a recovered panic.
        let req = test::TestRequest::get().uri("/example/list").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_cors_headers_on_allowed_origin() {
        let app = test::init_service(
            App::new()
                .wrap(CorsMiddleware {
                    allowed_origins: origins(&["*"]),
                })
                .route("/ok", web::get().to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ok")
            .insert_header(("Origin", "http://localhost:3000"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(resp.headers().get("access-control-expose-headers").unwrap(), "Link");
        assert!(!resp.headers().contains_key("access-control-allow-credentials"));
    }

    #[actix_rt::test]
    async fn test_cors_preflight() {
        let app = test::init_service(
            App::new()
                .wrap(CorsMiddleware {
                    allowed_origins: origins(&["https://app.example.com"]),
                })
                .route("/ok", web::get().to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/ok")
            .insert_header(("Origin", "https://app.example.com"))
            .insert_header(("Access-Control-Request-Method", "POST"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let headers = resp.headers();
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "GET, POST, PUT, DELETE, PATCH"
        );
        assert_eq!(
            headers.get("access-control-allow-headers").unwrap(),
            "Accept, Authorization, Content-Type, X-CSRF-Token"
        );
        assert_eq!(headers.get("access-control-max-age").unwrap(), "300");
    }

    #[actix_rt::test]
    async fn test_cors_ignores_unknown_origin() {
        let app = test::init_service(
            App::new()
                .wrap(CorsMiddleware {
                    allowed_origins: origins(&["https://app.example.com"]),
                })
                .route("/ok", web::get().to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ok")
            .insert_header(("Origin", "https://evil.example.com"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key("access-control-allow-origin"));
    }
}
