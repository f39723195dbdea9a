//! Quill - HTTP server for the blog backend
//!
//! Exposes the blog, subscriber, auth and status endpoints over axum and
//! serves uploaded images from the asset directory.

pub mod routes;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::AUTHORIZATION, header::CONTENT_TYPE},
    routing::{get, post},
};
use blog::{AssetConfig, AssetKind};
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tower_http::{cors::CorsLayer, services::ServeDir};

pub use state::AppState;

/// Upper bound for a request body (image uploads)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// API routes without static files or CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/blog",
            get(routes::blog::list_or_get)
                .post(routes::blog::create)
                .delete(routes::blog::delete),
        )
        .route(
            "/api/email",
            get(routes::email::list)
                .post(routes::email::subscribe)
                .delete(routes::email::delete),
        )
        .route("/api/auth/signup", post(routes::auth::sign_up))
        .route("/api/auth/signin", post(routes::auth::sign_in))
        .route("/api/auth/signout", post(routes::auth::sign_out))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/status", get(routes::status::status))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Full application: API routes, uploaded images and CORS
pub fn app(state: AppState, assets: &AssetConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let mut app = router(state);
    if assets.kind == AssetKind::Directory {
        let files = ServeDir::new(&assets.root);
        let prefix = assets.url_prefix.trim_matches('/');
        app = if prefix.is_empty() {
            app.fallback_service(files)
        } else {
            app.nest_service(&format!("/{}", prefix), files)
        };
    }

    app.layer(cors)
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {}", e);
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
}
