use crate::auth::{AuthConfig, AuthService};
use crate::config::Config;
use crate::error::{AppResult, Error};
use crate::events::{EventStore, InMemoryEventStore, RedisEventStore};
use crate::shutdown;
use crate::suggestions::{DisabledOracle, GeminiOracle, SchedulingOracle, SuggestionRequestor};
use crate::web::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,kalenteri=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => {
            rust_i18n::set_locale(&config.locale);
            info!("Setting locale to {}", config.locale);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Pick the event store, falling back to memory when Redis is unavailable
async fn build_store(config: &Config) -> Arc<dyn EventStore> {
    match &config.redis_url {
        Some(url) => match RedisEventStore::connect(url).await {
            Ok(store) => {
                info!("Connected to Redis successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to connect to Redis: {}", e);
                warn!("Using in-memory event store as fallback, events will not persist");
                Arc::new(InMemoryEventStore::new())
            }
        },
        None => {
            info!("REDIS_URL not set, using in-memory event store");
            Arc::new(InMemoryEventStore::new())
        }
    }
}

/// Pick the oracle used for slot suggestions
fn build_oracle(config: &Config) -> Arc<dyn SchedulingOracle> {
    match &config.gemini_api_key {
        Some(api_key) => Arc::new(GeminiOracle::new(
            api_key,
            &config.gemini_model,
            config.suggestion_temperature,
        )),
        None => {
            warn!("GEMINI_API_KEY not set, slot suggestions are disabled");
            Arc::new(DisabledOracle)
        }
    }
}

/// Assemble the shared application state
pub async fn build_state(config: Config) -> AppState {
    let auth_service = Arc::new(AuthService::new(AuthConfig::from(&config)));
    info!(
        "Using admin credentials from environment: username={}",
        config.admin_username
    );

    let store = build_store(&config).await;
    let requestor = SuggestionRequestor::new(build_oracle(&config));

    AppState {
        config: Arc::new(config),
        auth_service,
        store,
        requestor,
    }
}

/// Start the web server and run until a shutdown signal arrives
pub async fn start_server(config: Config) -> miette::Result<()> {
    let addr = socket_addr(&config)?;
    let state = build_state(config).await;
    let app = web::router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(Error::from)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Server shut down");
    Ok(())
}

fn socket_addr(config: &Config) -> AppResult<SocketAddr> {
    format!("{}:{}", config.host, config.port)
        .parse::<SocketAddr>()
        .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))
}
