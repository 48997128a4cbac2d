//! Web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api;
use crate::config::TlsConfig;
use crate::state::AppState;
use crate::{console, stream, ws};

/// Build the HTTP router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/nodes", get(api::list_devices))
        .route("/nodes/{id}", get(api::get_device))
        .route("/nodes/{id}/classes", get(api::get_classes))
        .route("/nodes/{id}/classes/{class}", get(api::get_class))
        .route(
            "/nodes/{id}/classes/{class}/{label}",
            get(api::get_parameter_by_label).put(api::set_parameter_by_label),
        )
        .route(
            "/nodes/{id}/classes/{class}/{instance}/{index}",
            get(api::get_parameter_by_index).put(api::set_parameter_by_index),
        )
        .route("/stats", get(api::get_stats))
        // WebSocket event stream
        .route("/events/ws", get(ws::websocket_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the optional console and event-stream listeners, then serve HTTP
pub async fn run(state: Arc<AppState>) -> Result<()> {
    if let Some(bind) = state.config.console.bind.clone() {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = console::serve(state, &bind).await {
                error!(error = %e, "Console listener failed");
            }
        });
    }

    if let Some(bind) = state.config.events.bind.clone() {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = stream::serve(state, &bind).await {
                error!(error = %e, "Event stream listener failed");
            }
        });
    }

    let bind = state.config.daemon.bind.clone();
    let tls = state.config.daemon.tls.clone();
    let app = router(state.clone());

    // Start server with or without TLS
    if let Some(tls_config) = tls {
        run_https(app, &bind, &tls_config, &state).await
    } else {
        run_http(app, &bind, &state).await
    }
}

/// Run plain HTTP server
async fn run_http(app: Router, bind: &str, state: &AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting API server");
    state
        .fanout
        .broadcast_log(&format!("Started HTTP API listener ({})", bind));
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run HTTPS server with TLS
async fn run_https(app: Router, bind: &str, tls: &TlsConfig, state: &AppState) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::path::PathBuf;

    let cert_path = PathBuf::from(&tls.cert);
    let key_path = PathBuf::from(&tls.key);

    // Verify files exist
    if !cert_path.exists() {
        anyhow::bail!("TLS certificate file not found: {}", tls.cert);
    }
    if !key_path.exists() {
        anyhow::bail!("TLS key file not found: {}", tls.key);
    }

    let rustls_config = RustlsConfig::from_pem_file(&cert_path, &key_path).await?;

    let addr: std::net::SocketAddr = bind.parse()?;
    info!(address = %bind, protocol = "HTTPS", cert = %tls.cert, "Starting API server with TLS");
    state
        .fanout
        .broadcast_log(&format!("Started HTTPS API listener ({})", bind));

    axum_server::bind_rustls(addr, rustls_config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
