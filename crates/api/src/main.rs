use std::sync::Arc;

use anyhow::Context;
use beacon_api::app::{AppState, build_app};
use beacon_api::config::ApiConfig;
use beacon_auth::{CredentialStore, seed_default_catalog};
use beacon_infra::{InMemoryCredentialStore, PostgresCredentialStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    beacon_observability::init();

    let config = ApiConfig::from_env()?;

    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresCredentialStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("schema migration failed")?;
            tracing::info!("using Postgres credential store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let report = seed_default_catalog(store.as_ref())
        .await
        .context("failed to seed role catalog")?;
    tracing::info!(
        permissions = report.permissions_created,
        roles = report.roles_created,
        grants = report.grants_created,
        "role catalog ready"
    );

    let state = AppState::new(store, config.auth).context("invalid auth configuration")?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
