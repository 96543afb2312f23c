use std::sync::Arc;

use tracing::{error, info, warn};

use mailroom::web::WebServer;
use mailroom::{Config, Database, EntryRepository, EntryService, RetentionWatcher};

#[tokio::main]
async fn main() {
    // Load configuration
    let path = Config::path_from_env();
    let (config, load_error) = match Config::load_with_env(&path) {
        Ok(config) => (config, None),
        Err(e) => {
            let mut config = Config::default();
            config.apply_env_overrides();
            (config, Some(e))
        }
    };

    // Initialize logging
    if let Err(e) = mailroom::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        mailroom::logging::init_console_only(&config.logging.level);
    }

    if let Some(e) = load_error {
        warn!("Failed to load {}: {}. Using default configuration.", path, e);
    }

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> mailroom::Result<()> {
    config.validate()?;

    info!("mailroom starting");
    let db = Database::open_with_wait(&config.database).await?;

    let store = Arc::new(EntryRepository::from_database(&db));
    let service = EntryService::new(store.clone());

    let watcher = RetentionWatcher::new(
        store,
        config.watcher.tick_period(),
        config.watcher.ttl(),
    );
    watcher.start().await;

    let server = WebServer::new(&config.server, &config.web, service)?;
    let served = server.run(shutdown_signal()).await;

    // Let any in-flight sweep finish before the pool goes away
    watcher.stop().await;
    db.close().await;

    served?;
    info!("mailroom stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
