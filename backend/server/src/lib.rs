//! Backend of the creches delivery tracker.
//!
//! Citizens identify themselves with a CPF and a mobile number, administrators keep
//! the promised/delivered counters up to date, everyone sees the progress bar.
//!
//!
//!
//! # Identification
//!
//! - `POST /api/informacoes` with CPF + phone
//! - Both known and belonging to the same record: login
//! - Neither known: registration, the name may come later through `/api/completar-nome`
//! - Anything in between is rejected with a message saying which half is wrong
//! - A random session token goes in the `auth` cookie (HttpOnly), the user id stays server side
//!
//!
//!
//! # CSRF
//!
//! Double-submit cookie.
//!
//! - Every response to a client without `csrf_token` sets one, readable by page scripts
//! - Mutating endpoints require `X-CSRF-Token` to repeat the cookie value
//!
//!
//!
//! # Personal Data
//!
//! - Name, CPF and phone are stored AES-256-GCM encrypted
//! - SHA-256 digests of the CPF and phone digits are the lookup and uniqueness keys
//! - Nothing personal goes to the logs, only user ids
//!
//!
//!
//! # Setup
//!
//! Environment, secrets are read from `/run/secrets/<NAME>` first.
//! ```sh
//! SECRET_KEY=change-me \
//! REDIS_URL=redis://localhost:6379 \
//! ADMIN_CPFS=52998224725 \
//! RUST_LOG=info \
//! cargo run -p creches
//! ```
//!
//! Without `REDIS_URL` everything is kept in memory and lost on restart.
use std::{error::Error, sync::Arc, time::Duration};

use axum::{
    Router, middleware,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    admin_handler, atualizar_creches_handler, completar_nome_handler, creches_handler,
    dispositivo_handler, home_handler, index_handler, informacoes_handler, logout_handler,
    session_handler, status_handler,
};
use state::State;
use utils::{CSRF_HEADER, set_csrf_cookie};

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(index_handler))
        .route("/home", get(home_handler))
        .route("/admin", get(admin_handler))
        .route("/logout", get(logout_handler))
        .route("/api/session", get(session_handler))
        .route("/api/informacoes", post(informacoes_handler))
        .route("/api/usuario/status", get(status_handler))
        .route("/api/completar-nome", post(completar_nome_handler))
        .route(
            "/api/creches",
            get(creches_handler).patch(atualizar_creches_handler),
        )
        .route("/api/dispositivo", post(dispositivo_handler))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(middleware::from_fn(set_csrf_cookie))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), Box<dyn Error + Send + Sync>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
