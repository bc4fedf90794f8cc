//! `bibliod` — the library-management server binary.
//!
//! Usage:
//!   bibliod [-c <context-name-or-path>] [--listen <addr>]
//!
//! The context name resolves to `/etc/biblio/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.
//! Without `-c`, built-in defaults apply (data under `./data`).

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use biblio_core::Module;
use tracing::info;

use config::ServerConfig;

/// Library-management server.
#[derive(Parser, Debug)]
#[command(name = "bibliod", about = "Library-management server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Listen address (overrides the config file).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let mut server_config = match &cli.config {
        Some(name) => {
            let config_path = ServerConfig::resolve_path(name);
            info!("Loading configuration from {}", config_path.display());
            ServerConfig::load(&config_path)?
        }
        None => ServerConfig::default(),
    };
    if let Some(listen) = cli.listen {
        server_config.listen = listen;
    }

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = biblio_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: server_config.listen.clone(),
        ..Default::default()
    };

    // One embedded store, shared by all modules.
    let sql: Arc<dyn biblio_sql::SQLStore> = Arc::new(
        biblio_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    // ── Stores ──

    let catalog = Arc::new(
        biblio_catalog::CatalogStore::new(Arc::clone(&sql))
            .map_err(|e| anyhow::anyhow!("catalog init: {}", e))?,
    );
    let directory = Arc::new(
        biblio_directory::StudentStore::new(Arc::clone(&sql))
            .map_err(|e| anyhow::anyhow!("directory init: {}", e))?,
    );
    let circulation_store = Arc::new(
        biblio_circulation::CirculationStore::new(Arc::clone(&sql))
            .map_err(|e| anyhow::anyhow!("circulation init: {}", e))?,
    );
    let attendance_store = Arc::new(
        biblio_attendance::AttendanceStore::new(Arc::clone(&sql))
            .map_err(|e| anyhow::anyhow!("attendance init: {}", e))?,
    );
    let bulletin = Arc::new(
        biblio_bulletin::BulletinStore::new(Arc::clone(&sql))
            .map_err(|e| anyhow::anyhow!("bulletin init: {}", e))?,
    );
    let schedule = Arc::new(
        biblio_schedule::ScheduleStore::new(Arc::clone(&sql))
            .map_err(|e| anyhow::anyhow!("schedule init: {}", e))?,
    );

    // ── Services and modules ──

    let circulation_config = biblio_circulation::CirculationConfig {
        loan_period_days: server_config.circulation.loan_period_days,
    };
    let circulation_service = Arc::new(biblio_circulation::CirculationService::new(
        circulation_store,
        Arc::clone(&catalog),
        Arc::clone(&directory),
        circulation_config,
    ));

    let attendance_config = biblio_attendance::AttendanceConfig {
        max_capacity: server_config.attendance.max_capacity,
    };
    let attendance_tracker = Arc::new(biblio_attendance::AttendanceTracker::new(
        attendance_store,
        Arc::clone(&directory),
        attendance_config,
    ));

    let catalog_module = biblio_catalog::CatalogModule::new(catalog);
    let directory_module = biblio_directory::DirectoryModule::new(directory);
    let circulation_module = biblio_circulation::CirculationModule::new(circulation_service);
    let attendance_module = biblio_attendance::AttendanceModule::new(attendance_tracker);
    let bulletin_module = biblio_bulletin::BulletinModule::new(bulletin);
    let schedule_module = biblio_schedule::ScheduleModule::new(schedule);
    info!("All modules initialized");

    let module_routes = vec![
        (catalog_module.name(), catalog_module.routes()),
        (directory_module.name(), directory_module.routes()),
        (circulation_module.name(), circulation_module.routes()),
        (attendance_module.name(), attendance_module.routes()),
        (bulletin_module.name(), bulletin_module.routes()),
        (schedule_module.name(), schedule_module.routes()),
    ];

    // Build router.
    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&server_config.listen).await?;
    info!("bibliod listening on {}", server_config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
