//! Application startup and lifecycle management.

use crate::config::AcsServiceConfig;
use crate::handlers;
use crate::services::{
    AcsDispatcher, AdapterCacheSettings, AdapterDependencies, AdapterRegistry, Clock, HttpTransport, ReqwestTransport,
    SystemClock,
};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AcsServiceConfig,
    pub dispatcher: Arc<AcsDispatcher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/v1/access/provision", post(handlers::provision_access))
        .route("/v1/access/revoke", post(handlers::revoke_access))
        .route("/v1/access/test-connection", post(handlers::test_connection))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build with the real HTTP client and system clock.
    pub async fn build(config: AcsServiceConfig) -> Result<Self, AppError> {
        let transport = ReqwestTransport::new(config.http_timeout()).map_err(|e| {
            tracing::error!("Failed to build ACS HTTP client: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        Self::build_with(config, Arc::new(transport), Arc::new(SystemClock)).await
    }

    /// Build with injected vendor transport and clock (port 0 = random port).
    pub async fn build_with(
        config: AcsServiceConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let registry = AdapterRegistry::with_defaults(AdapterDependencies {
            transport,
            clock,
            simulation: config.simulation_policy(),
            session_ttl: config.session_ttl(),
        });
        let dispatcher = if config.acs.adapter_cache_enabled {
            AcsDispatcher::with_cache(
                registry,
                AdapterCacheSettings::for_session_ttl(
                    config.acs.adapter_cache_capacity,
                    config.session_ttl(),
                ),
            )
        } else {
            AcsDispatcher::without_cache(registry)
        };

        tracing::info!(
            environment = ?config.environment,
            simulation = ?config.simulation_policy(),
            session_ttl_minutes = config.acs.session_ttl_minutes,
            adapter_cache = config.acs.adapter_cache_enabled,
            adapter_cache_capacity = config.acs.adapter_cache_capacity,
            "ACS dispatcher initialized"
        );

        let state = AppState {
            config: config.clone(),
            dispatcher: Arc::new(dispatcher),
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("acs-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn dispatcher(&self) -> Arc<AcsDispatcher> {
        self.state.dispatcher.clone()
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
