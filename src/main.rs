use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tuition_portal::{
    api::{AppState, build_router},
    config::{database, portal},
    core::catalog::seed_catalogs,
    errors::{Error, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load portal configuration (file + environment overrides)
    let config = portal::load_from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(bind_addr = %config.bind_addr, "Loaded configuration");

    // 4. Make sure the SQLite data directory exists before connecting
    if let Some(dir) = sqlite_parent_dir(&config.database_url) {
        tokio::fs::create_dir_all(dir).await?;
    }

    // 5. Connect and create the schema
    let db = database::connect(&config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 6. Seed catalogs listed in the config
    let seeded = seed_catalogs(&db, &config.fee_categories, &config.payment_methods).await?;
    info!(
        fee_categories = seeded.fee_categories,
        payment_methods = seeded.payment_methods,
        "Seeded catalogs"
    );

    // 7. Serve
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", config.bind_addr, e))?;
    info!(addr = %config.bind_addr, "Tuition portal listening");
    let app = build_router(AppState::new(db, config));
    axum::serve(listener, app).await.map_err(Error::from)
}

/// Directory holding a file-backed `SQLite` database, if `url` names one.
fn sqlite_parent_dir(url: &str) -> Option<&std::path::Path> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    std::path::Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
}
