//! Duka marketplace HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, image backends, and the session token
//! issuer/verifier, then serves the API and the metrics endpoint.
//!
//! # Notes
//! `build_state` keeps wiring testable; `seed_bootstrap_admin` creates the
//! first admin since admin registration itself requires an admin session.
use anyhow::Context;
use axum::http::header::HeaderName;
use duka_authz::{TokenIssuer, TokenVerifier, now_epoch_seconds};
use marketplace::app::{AppState, build_router};
use marketplace::auth::password::hash_password;
use marketplace::auth::session::SessionAuthenticator;
use marketplace::config::{ImageBackend, MarketplaceConfig, StorageBackend};
use marketplace::images::ImageStore;
use marketplace::images::local::LocalImageStore;
use marketplace::images::memory::InMemoryImageStore;
use marketplace::model::{Admin, AdminRole};
use marketplace::observability;
use marketplace::store::memory::InMemoryStore;
use marketplace::store::postgres::PostgresStore;
use marketplace::store::{CredentialStore, MarketplaceStore, SessionStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const SERVICE_NAME: &str = "duka-marketplace";
const REVOCATION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MarketplaceConfig::from_env_or_yaml().context("marketplace config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: MarketplaceConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability(SERVICE_NAME);
    let state = build_state(&config).await?;
    seed_bootstrap_admin(&config, state.store.as_ref()).await?;

    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
        std::future::pending(),
    ));
    let purge_task = tokio::spawn(purge_revocations(state.store.clone()));

    let app = build_router(state.clone());
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(
        %addr,
        storage = state.store.backend_name(),
        images = state.images.backend_name(),
        "marketplace listening"
    );
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    purge_task.abort();
    Ok(())
}

async fn build_state(config: &MarketplaceConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn MarketplaceStore + Send + Sync> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };
    let images: Arc<dyn ImageStore + Send + Sync> = match config.images {
        ImageBackend::Memory => Arc::new(InMemoryImageStore::new()),
        ImageBackend::Local => {
            tokio::fs::create_dir_all(&config.images_dir)
                .await
                .with_context(|| format!("create image directory {}", config.images_dir))?;
            Arc::new(LocalImageStore::new(&config.images_dir))
        }
    };

    let auth = &config.auth;
    let secret = auth.token_secret.as_bytes();
    let issuer = TokenIssuer::new(secret, Duration::from_secs(auth.token_ttl_secs));
    let verifier = TokenVerifier::new(secret, auth.token_leeway_secs);
    let header_name =
        HeaderName::try_from(auth.header_name.as_str()).context("invalid auth header name")?;

    Ok(AppState {
        service_name: SERVICE_NAME.to_string(),
        api_version: "v1".to_string(),
        store,
        images,
        issuer: Arc::new(issuer),
        sessions: Arc::new(SessionAuthenticator::new(
            Arc::new(verifier),
            header_name,
            &auth.scheme,
        )),
    })
}

/// Create the configured bootstrap admin unless that email already exists.
async fn seed_bootstrap_admin(
    config: &MarketplaceConfig,
    store: &(dyn MarketplaceStore + Send + Sync),
) -> anyhow::Result<()> {
    let Some(bootstrap) = &config.bootstrap_admin else {
        return Ok(());
    };
    if store.find_admin_by_email(&bootstrap.email).await?.is_some() {
        tracing::debug!(email = %bootstrap.email, "bootstrap admin already present");
        return Ok(());
    }
    let password_hash =
        hash_password(&bootstrap.password).context("hash bootstrap admin password")?;
    let admin = Admin {
        admin_id: uuid::Uuid::new_v4().to_string(),
        admin_name: bootstrap.name.clone(),
        email: bootstrap.email.clone(),
        cell: String::new(),
        admin_image: String::new(),
        role: AdminRole::SuperAdmin,
        password_hash,
        last_token: None,
        date_added: now_epoch_seconds(),
        last_logged_in: 0,
    };
    let admin = store.create_admin(admin).await?;
    tracing::info!(admin_id = %admin.admin_id, "bootstrap admin created");
    Ok(())
}

async fn purge_revocations(store: Arc<dyn MarketplaceStore + Send + Sync>) {
    let mut ticker = tokio::time::interval(REVOCATION_PURGE_INTERVAL);
    loop {
        ticker.tick().await;
        match store.purge_expired_sessions(now_epoch_seconds()).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "purged expired session revocations"),
            Err(err) => tracing::warn!(error = %err, "failed to purge session revocations"),
        }
    }
}
