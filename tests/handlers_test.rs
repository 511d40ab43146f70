#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use rest_boilerplate::config::{
        AppConfig, CorsConfig, LoggingConfig, MongoConfig, PostgresConfig, ServerConfig,
    };
    use rest_boilerplate::database::DatabaseService;
    use rest_boilerplate::handlers;
    use rest_boilerplate::repository::StaticExampleRepository;
    use rest_boilerplate::response::ResponseEnvelope;
    use rest_boilerplate::services::ExampleService;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn test_config() -> AppConfig {
        AppConfig {
            env: "test".to_string(),
            server: ServerConfig {
                address: "127.0.0.1".to_string(),
                port: 0,
                workers: 1,
                write_timeout_seconds: 15,
                read_timeout_seconds: 15,
                idle_timeout_seconds: 60,
            },
            postgres: PostgresConfig {
                host: "127.0.0.1".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                name: "postgres".to_string(),
                // Nothing listens here.
                port: 1,
                ssl_mode: "disable".to_string(),
                timezone: "Asia/Jakarta".to_string(),
                max_connections: 1,
            },
            mongo: MongoConfig {
                url: "mongodb://127.0.0.1:1".to_string(),
                db_name: "example".to_string(),
                timeout_seconds: 1,
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    macro_rules! app {
        () => {{
            let config = test_config();
            let db = Arc::new(
                DatabaseService::new(&config.postgres, &config.mongo)
                    .await
                    .unwrap(),
            );
            let service = Arc::new(ExampleService::new(Arc::new(StaticExampleRepository::new())));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(config))
                    .app_data(web::Data::new(db))
                    .app_data(web::Data::new(service))
                    .configure(handlers::configure)
                    .default_service(web::to(handlers::not_found)),
            )
            .await
        }};
    }

    fn valid_payload() -> Value {
        json!({
            "name": "Widget",
            "email_address": "ops@example.com",
            "status": "published",
            "qty": 3,
            "schedule": { "start_at": "2024-01-15 10:30", "notes": "first run" }
        })
    }

    #[actix_rt::test]
    async fn test_ping_reports_environment() {
        let app = app!();
        let req = test::TestRequest::get().uri("/ping").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, "hello world: test");
    }

    #[actix_rt::test]
    async fn test_get_example() {
        let app = app!();
        let req = test::TestRequest::get().uri("/example").to_request();
        let body: ResponseEnvelope = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.code, "success");
        assert_eq!(body.data, json!({"app_name": "Example", "env": "DEV"}));
    }

    #[actix_rt::test]
    async fn test_list_defaults_to_first_page() {
        let app = app!();
        let req = test::TestRequest::get().uri("/example/list").to_request();
        let body: ResponseEnvelope = test::call_and_read_body_json(&app, req).await;
        let meta = body.meta.unwrap();
        assert_eq!((meta.page, meta.limit, meta.total_page), (1, 10, 3));
        assert_eq!(body.data[0], json!({"id": 1, "name": "alpha"}));
    }

    #[actix_rt::test]
    async fn test_create_example_echoes_valid_payload() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/example")
            .set_json(valid_payload())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: ResponseEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.data, valid_payload());
        assert_eq!(body.errors, None);
    }

    #[actix_rt::test]
    async fn test_create_example_rejects_wrong_type() {
        let app = app!();
        let mut payload = valid_payload();
        payload["qty"] = json!("ten");

        let req = test::TestRequest::post()
            .uri("/example")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "bad request");
        assert_eq!(body["data"], Value::Null);
        let message = body["errors"][0]["qty"].as_str().unwrap();
        assert!(message.contains("int") && message.contains("ten"), "{message}");
    }

    #[actix_rt::test]
    async fn test_create_example_rejects_non_json_content_type() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/example")
            .insert_header(("content-type", "text/plain"))
            .set_payload(valid_payload().to_string())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["errors"][0]["payload"].is_string());
    }

    #[actix_rt::test]
    async fn test_health_reports_unreachable_database() {
        let app = app!();
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ResponseEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.code, "internal server error");
    }
}
