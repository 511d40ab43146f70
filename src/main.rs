use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use rest_boilerplate::config::AppConfig;
use rest_boilerplate::database::DatabaseService;
use rest_boilerplate::handlers;
use rest_boilerplate::middleware::{
    install_panic_hook, CorsMiddleware, LoggingMiddleware, RecoverPanicMiddleware,
};
use rest_boilerplate::models::ExampleRequest;
use rest_boilerplate::repository::StaticExampleRepository;
use rest_boilerplate::services::ExampleService;
use rest_boilerplate::utils;
use rest_boilerplate::validation::audit_json_fields;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment from .env (if present)
    let _ = dotenv();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    // Initialize logging: file + stdout, falling back to env_logger
    let logger_handle = match flexi_logger::Logger::try_with_str(config.logging.level.clone()) {
        Ok(logger) => {
            let file_spec = flexi_logger::FileSpec::default().directory("logs").suppress_timestamp();
            logger
                .log_to_file(file_spec)
                .duplicate_to_stdout(flexi_logger::Duplicate::Info)
                .start()
                .ok()
        }
        Err(_) => None,
    };
    if logger_handle.is_none() {
        let log_level = utils::logging::level_from_string(&config.logging.level);
        env_logger::builder()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
    }
    install_panic_hook();

    log::info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    log::info!("Environment: {}", config.env);
    log::info!("Server: {}:{}", config.server.address, config.server.port);
    log::info!("Workers: {}", config.server.workers);

    audit_json_fields::<ExampleRequest>().map_err(std::io::Error::other)?;

    let db_service = Arc::new(
        DatabaseService::new(&config.postgres, &config.mongo)
            .await
            .map_err(std::io::Error::other)?,
    );
    match db_service.ping().await {
        Ok(()) => log::info!("Database: Connected to PostgreSQL and MongoDB"),
        Err(e) => log::warn!("Database not reachable at startup: {}", e),
    }

    let example_service = Arc::new(ExampleService::new(Arc::new(StaticExampleRepository::new())));

    let server_config = config.server.clone();
    let bind_address = config.bind_address();
    let app_config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(app_config.clone())
            .app_data(web::Data::new(Arc::clone(&db_service)))
            .app_data(web::Data::new(Arc::clone(&example_service)))

            // Registered innermost first: logging sees every request, panics
            // are converted closest to the handlers.
            .wrap(RecoverPanicMiddleware)
            .wrap(CorsMiddleware {
                allowed_origins: app_config.cors.allowed_origins.clone(),
            })
            .wrap(LoggingMiddleware)

            .configure(handlers::configure)
            .default_service(web::to(handlers::not_found))
    })
    .bind(bind_address)?
    .workers(server_config.workers)
    .keep_alive(Duration::from_secs(server_config.idle_timeout_seconds))
    .client_request_timeout(Duration::from_secs(server_config.read_timeout_seconds))
    .client_disconnect_timeout(Duration::from_secs(server_config.write_timeout_seconds))
    .shutdown_timeout(30)
    .run()
    .await
}
