//! Application builder: wires collaborators, state, router and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use cipherbox_auth::{
    AuthGate, FirebaseIdentityProvider, JwtDecoder, JwtEncoder, MemoryIdentityProvider,
    SessionManager,
};
use cipherbox_core::config::{AppConfig, DatabaseProvider, IdentityProviderKind};
use cipherbox_core::error::{AppError, ErrorKind};
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::{BlobStore, IdentityProvider, SessionStore, UserDirectory};
use cipherbox_core::types::RetentionPolicy;
use cipherbox_database::{DatabasePool, MemorySessionStore, MemoryUserDirectory};
use cipherbox_service::{AccountService, BlobManager};
use cipherbox_storage::{EncryptionCodec, StorageManager};

use crate::router::build_router;
use crate::state::AppState;

/// The external systems the service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub blob_store: Arc<dyn BlobStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserDirectory>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Connect to whatever the configuration selects.
pub async fn connect_collaborators(config: &AppConfig) -> AppResult<Collaborators> {
    tracing::info!(provider = ?config.storage.provider, "Initializing blob storage");
    let blob_store: Arc<dyn BlobStore> = Arc::new(StorageManager::from_config(&config.storage).await?);

    let retention = RetentionPolicy::new(config.session.max_tokens_per_user)
        .with_expiry_grace(config.auth.leeway_seconds);
    let (session_store, users): (Arc<dyn SessionStore>, Arc<dyn UserDirectory>) =
        match config.database.provider {
            DatabaseProvider::Memory => {
                tracing::warn!("Using in-memory session store; sessions are lost on restart");
                (
                    Arc::new(MemorySessionStore::with_retention(retention)),
                    Arc::new(MemoryUserDirectory::new()),
                )
            }
            DatabaseProvider::Postgres => {
                let db = DatabasePool::open(&config.database).await?;
                (
                    Arc::new(db.session_store(retention)),
                    Arc::new(db.user_directory()),
                )
            }
        };

    let identity: Arc<dyn IdentityProvider> = match config.identity.provider {
        IdentityProviderKind::Memory => {
            tracing::warn!("Using in-memory identity provider; for development only");
            Arc::new(MemoryIdentityProvider::new())
        }
        IdentityProviderKind::Firebase => Arc::new(FirebaseIdentityProvider::new(&config.identity)?),
    };

    Ok(Collaborators {
        blob_store,
        session_store,
        users,
        identity,
    })
}

/// Build application state on top of already-connected collaborators.
pub fn assemble_state(config: AppConfig, collaborators: Collaborators) -> AppResult<AppState> {
    let codec = Arc::new(EncryptionCodec::from_config(&config.crypto)?);

    let jwt_encoder = Arc::new(JwtEncoder::new(&config.auth));
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
    let gate = Arc::new(AuthGate::new(Arc::clone(&jwt_decoder)));

    let sessions = SessionManager::new(
        jwt_encoder,
        jwt_decoder,
        collaborators.session_store,
        &config.session,
    );
    let accounts = Arc::new(AccountService::new(
        collaborators.identity,
        collaborators.users,
        sessions,
        Duration::from_secs(config.session.store_timeout_seconds),
    ));

    let blobs = Arc::new(BlobManager::new(
        collaborators.blob_store,
        codec,
        config.server.public_base_url.clone(),
        config.storage.max_upload_size_bytes,
    ));

    Ok(AppState {
        config: Arc::new(config),
        gate,
        accounts,
        blobs,
    })
}

/// Connect collaborators and assemble state.
pub async fn build_state(config: AppConfig) -> AppResult<AppState> {
    let collaborators = connect_collaborators(&config).await?;
    assemble_state(config, collaborators)
}

/// Runs the CipherBox server until Ctrl-C.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting CipherBox server...");

    if config.auth.uses_default_secrets() {
        tracing::warn!("Token secrets are the development defaults; set auth secrets for production");
    }
    if config.crypto.uses_default_key() {
        tracing::warn!("Encryption key is the development default; set crypto.encryption_key");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config).await?;
    let app = build_app(state);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Configuration, format!("Failed to bind {addr}"), e)
    })?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
