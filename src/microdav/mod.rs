use crate::users::UserStore;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{any, get},
    Extension, Router,
};
use dav_server::{localfs::LocalFs, memls::MemLs, DavHandler};
use std::{path::Path, path::PathBuf, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

pub mod gate;
pub(crate) mod handlers;
pub mod rate_limit;

pub use self::gate::AccessGate;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub root: PathBuf,
    pub realm: String,
}

/// WebDAV engine over `root`, mounted under `prefix`, with an in-memory lock manager.
#[must_use]
pub fn dav_handler(root: &Path, prefix: &str) -> DavHandler {
    DavHandler::builder()
        .strip_prefix(prefix.trim_end_matches('/'))
        .filesystem(LocalFs::new(root, false, false, false))
        .locksystem(MemLs::new())
        .build_handler()
}

/// Routes: `/health` in the clear, the WebDAV mount behind the gate.
pub fn router(gate: AccessGate, dav: DavHandler) -> Router {
    let prefix = gate.prefix().trim_end_matches('/').to_string();

    let mount = Router::new()
        .route(&prefix, any(handlers::dav))
        .route(&format!("{prefix}/*path"), any(handlers::dav));

    gate.protect(mount)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(Arc::new(dav))),
        )
        .route("/health", get(handlers::health).options(handlers::health))
}

/// Start the server
/// # Errors
/// Return error if the realm is not a valid header value, the data directory
/// cannot be created or the server fails to start
pub async fn new(config: ServerConfig, store: UserStore) -> Result<()> {
    let gate = AccessGate::new(store.clone(), &config.realm)?;

    tokio::fs::create_dir_all(&config.root)
        .await
        .with_context(|| format!("Failed to create data directory {}", config.root.display()))?;

    let dav = dav_handler(&config.root, gate.prefix());
    let app = router(gate, dav);

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!(
        "Listening on [::]:{}, serving {}",
        config.port,
        config.root.display()
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
