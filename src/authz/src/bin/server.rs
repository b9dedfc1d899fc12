//! # Gatehouse demo server
//!
//! Serves every operation of the loaded API descriptions with an echo
//! handler, guarded by the strategies and permissions the descriptions
//! declare.
//!
//! ## Endpoints
//!
//! - every path/verb in the description directory - echoes the caller
//! - `GET /health` - Health check (never guarded)
//!
//! ## Verification functions
//!
//! - `apiUserService.getApiUserById` - service identities by alternate id (HMAC)
//! - `apiUserService.getWebUserByName` - session-bound identities by name (anonymous)

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{Method, Uri},
    response::Json,
    routing::{get, MethodFilter, MethodRouter},
    serve, Router,
};
use clap::Parser;
use gatehouse_authz::{
    cache::{IdentityCache, MemoryCacheBackend},
    config::GatehouseConfig,
    description::{DescriptionDir, DescriptionProvider, DescriptionSet},
    resolver::{IdentityResolver, ServiceIdentityVerifier, SessionIdentityVerifier},
    store::MemoryIdentityStore,
    to_router_path, AuthenticatedIdentity, RouteBinder, StrategyRegistry, VerifierCatalog,
};
use gatehouse_core::IdentityRecord;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gatehouse demo server CLI
#[derive(Parser)]
#[command(name = "gatehouse-server")]
#[command(about = "Serves API descriptions behind gatehouse authentication")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GATEHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of API descriptions (overrides config)
    #[arg(short, long, env = "GATEHOUSE_DESCRIPTIONS")]
    descriptions: Option<PathBuf>,

    /// JSON file holding an array of identity records
    #[arg(short, long, env = "GATEHOUSE_IDENTITIES")]
    identities: Option<PathBuf>,

    /// HTTP port (overrides config)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_identities(path: Option<&Path>) -> Result<Vec<IdentityRecord>> {
    let Some(path) = path else {
        warn!("No identity file given; every lookup will miss");
        return Ok(Vec::new());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identity file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse identity file {}", path.display()))
}

/// Echo the request and the identity that passed the guard
async fn echo(
    method: Method,
    uri: Uri,
    identity: Option<Extension<AuthenticatedIdentity>>,
) -> Json<Value> {
    let caller = identity.map(|Extension(AuthenticatedIdentity(identity))| {
        json!({
            "id": identity.id(),
            "name": identity.display_name(),
            "realm": identity.realm(),
        })
    });

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "caller": caller,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": gatehouse_authz::VERSION }))
}

/// One echo route per described operation
fn echo_routes(descriptions: &DescriptionSet) -> Router {
    let mut routes: BTreeMap<String, MethodRouter> = BTreeMap::new();

    for api in descriptions.values() {
        let base_path = api.base_path().trim_end_matches('/');
        for (path, item) in &api.paths {
            let route = format!("{}{}", base_path, to_router_path(path));
            for (method, _) in item.operations() {
                let Ok(filter) = MethodFilter::try_from(method.clone()) else {
                    continue;
                };
                let methods = routes.remove(&route).unwrap_or_default();
                routes.insert(route.clone(), methods.on(filter, echo));
            }
        }
    }

    routes
        .into_iter()
        .fold(Router::new(), |router, (route, methods)| router.route(&route, methods))
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gatehouse server v{}", gatehouse_authz::VERSION);

    let mut config = match &cli.config {
        Some(path) => GatehouseConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GatehouseConfig::default(),
    };
    if let Some(dir) = cli.descriptions {
        config.descriptions.dir = dir;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    // Identity resolution
    let store = Arc::new(MemoryIdentityStore::with_records(load_identities(
        cli.identities.as_deref(),
    )?));
    info!(identities = store.len(), "Loaded identity records");

    let backend = Arc::new(MemoryCacheBackend::new());
    let resolver = Arc::new(IdentityResolver::new(
        store.clone(),
        IdentityCache::new(backend.clone()),
        config.identity.resolver_config(),
    ));
    let _watcher = resolver
        .clone()
        .watch_changes()
        .await
        .context("Failed to follow identity changes")?;

    let cleanup_interval = Duration::from_secs(config.identity.cache_cleanup_secs.max(1));
    let sweeper = backend.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        loop {
            ticker.tick().await;
            sweeper.cleanup_expired();
        }
    });

    // Strategies and route binding
    let verifiers = VerifierCatalog::new()
        .with(
            "apiUserService",
            "getApiUserById",
            Arc::new(ServiceIdentityVerifier::new(resolver.clone())),
        )
        .with(
            "apiUserService",
            "getWebUserByName",
            Arc::new(SessionIdentityVerifier::new(resolver.clone())),
        );
    let registry = Arc::new(StrategyRegistry::with_config(Arc::new(
        config.authentication_tree(),
    )));
    let binder = RouteBinder::new(registry, verifiers);

    let provider = DescriptionDir::new(&config.descriptions.dir);
    let descriptions = provider.list_descriptions().with_context(|| {
        format!(
            "Failed to load API descriptions from {}",
            provider.path().display()
        )
    })?;
    info!(apis = descriptions.len(), dir = %provider.path().display(), "Loaded API descriptions");

    let app = binder
        .bind_routes(echo_routes(&descriptions), &descriptions)?
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO)),
            ),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.host))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let started = Instant::now();
    info!("Server listening on http://{}", listener.local_addr()?);

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!(uptime_secs = started.elapsed().as_secs(), "Server shut down gracefully");
    Ok(())
}
