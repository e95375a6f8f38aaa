use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::clock::MonotonicClock;
use crate::config::Config;
use crate::handlers::{health_check, index, metrics_snapshot, ping};
use crate::limiter::AdmissionControl;
use crate::middleware::{admission_middleware, AdmissionState};
use crate::sweeper;

/// Assemble the router with the admission middleware in front of every route.
pub fn create_app(state: AdmissionState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ping", get(ping))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_snapshot))
        .with_state(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(state, admission_middleware)),
        )
}

pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let control = Arc::new(AdmissionControl::new(
            Arc::new(MonotonicClock::new()),
            self.config.admission.clone(),
        ));
        let _sweeper = sweeper::spawn(Arc::clone(&control), self.config.sweep_period());

        let state = AdmissionState {
            control,
            trust_forwarded_headers: self.config.trust_forwarded_headers,
            exempt_paths: Arc::new(self.config.exempt_paths.clone()),
        };
        let app = create_app(state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("turnstile listening on {}", self.config.bind_addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
