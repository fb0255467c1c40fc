mod error;
mod routes;

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use stride_core::config::StrideConfig;
use stride_core::dispatch::Dispatcher;
use stride_core::identity::IdentityContext;
use stride_core::model::User;
use stride_core::seed;
use stride_core::store::Store;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub identity: RwLock<IdentityContext>,
    pub config: StrideConfig,
}

impl AppState {
    /// The identity context draws its fixed user list from the seed store.
    pub fn new(store: Store, config: StrideConfig) -> stride_core::Result<Self> {
        let identity = IdentityContext::new(store.users().to_vec())?;
        Ok(Self {
            dispatcher: Dispatcher::new(store, &config),
            identity: RwLock::new(identity),
            config,
        })
    }

    pub fn current_user(&self) -> User {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
            .clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STRIDE_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("stride_web=info")),
        )
        .init();

    let cwd = std::env::current_dir().ok();
    let config = StrideConfig::load(cwd.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config: {e}, using defaults");
        StrideConfig::default_config()
    });

    let store = seed::load_seed(&config.seed)?;
    tracing::info!(
        courses = store.courses().len(),
        enrollments = store.enrollments().len(),
        sessions = store.sessions().len(),
        "store seeded"
    );

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState::new(store, config)?);

    let app = routes::router()
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    tracing::info!("stride-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
