use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, SslMode};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use tokio_postgres::NoTls;

use crate::config::{MongoConfig, PostgresConfig};
use crate::errors::ApiError;

/// Database connection pool
pub type DbPool = Pool;

/// Upper bound for one reachability check.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Relational and document database handles shared by repositories.
pub struct DatabaseService {
    pool: DbPool,
    mongo: mongodb::Database,
}

impl DatabaseService {
    /// Build both handles. Connections are opened lazily; call
    /// [`ping`](Self::ping) to check reachability.
    pub async fn new(
        postgres: &PostgresConfig,
        mongo: &MongoConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = postgres_pool(postgres)?;
        log::info!(
            "Database pool configured for {}@{}:{}/{}",
            postgres.user,
            postgres.host,
            postgres.port,
            postgres.name
        );

        let mongo_db = mongo_database(mongo).await?;
        log::info!("Document store configured for database {}", mongo.db_name);

        Ok(Self { pool, mongo: mongo_db })
    }

    pub async fn get_client(&self) -> Result<deadpool_postgres::Client, ApiError> {
        Ok(self.pool.get().await?)
    }

    /// Round-trips `SELECT 1` on the pool, then `ping` on the document store.
    pub async fn ping(&self) -> Result<(), ApiError> {
        with_timeout("postgres", async {
            let client = self.get_client().await?;
            client.execute("SELECT 1", &[]).await?;
            Ok::<(), ApiError>(())
        })
        .await?;

        with_timeout("mongodb", async {
            self.mongo.run_command(doc! { "ping": 1 }).await?;
            Ok::<(), ApiError>(())
        })
        .await
    }
}

fn postgres_pool(config: &PostgresConfig) -> Result<DbPool, deadpool_postgres::CreatePoolError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.name.clone());
    cfg.port = Some(config.port);
    cfg.ssl_mode = Some(ssl_mode(&config.ssl_mode));
    cfg.options = Some(format!("-c TimeZone={}", config.timezone));
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_connections));

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
}

async fn mongo_database(config: &MongoConfig) -> Result<mongodb::Database, mongodb::error::Error> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let mut options = ClientOptions::parse(config.url.as_str()).await?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    options.server_selection_timeout = Some(timeout);
    options.connect_timeout = Some(timeout);

    let client = mongodb::Client::with_options(options)?;
    Ok(client.database(&config.db_name))
}

async fn with_timeout<F>(store: &str, check: F) -> Result<(), ApiError>
where
    F: std::future::Future<Output = Result<(), ApiError>>,
{
    match tokio::time::timeout(PING_TIMEOUT, check).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Database(format!("{store} ping timed out"))),
    }
}

fn ssl_mode(mode: &str) -> SslMode {
    match mode.to_lowercase().as_str() {
        "require" | "verify-ca" | "verify-full" => SslMode::Require,
        "prefer" => SslMode::Prefer,
        _ => SslMode::Disable,
    }
}
