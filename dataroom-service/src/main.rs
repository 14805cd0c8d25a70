use dataroom_service::{
    build_router,
    config::DataroomConfig,
    services::{MongoDb, OidcClient, SessionIssuer},
    AppState,
};
use service_core::observability::{init_tracing, install_prometheus_recorder};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = DataroomConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let metrics = match install_prometheus_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder; /metrics disabled");
            None
        }
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting dataroom service"
    );

    let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
    db.initialize_indexes().await?;
    tracing::info!("Database initialized successfully");

    let oidc = match &config.oidc {
        Some(oidc_config) => {
            let client = OidcClient::new(oidc_config, &config.public_base_url)?;
            tracing::info!(redirect_uri = %client.redirect_uri(), "Identity provider configured");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("No identity provider configured; admin login is disabled");
            None
        }
    };

    let sessions = SessionIssuer::new(&config.session, config.environment.is_production());
    let db = Arc::new(db);
    let config = Arc::new(config);

    let state = AppState {
        config: config.clone(),
        oidc,
        sessions,
        users: db.clone(),
        documents: db,
        metrics,
    };

    let app = build_router(state);

    let address = config.common.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    tracing::info!(address = %address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
