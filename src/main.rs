//! Mafia lobby binary entrypoint wiring REST, SSE, chat ingestion, the messaging bot and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::mpsc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mafia_lobby_back::{
    config::AppConfig,
    dao::{
        lobby_store::{LobbyStore, MemoryLobbyStore},
        storage::StorageError,
    },
    routes,
    services::{
        chat_listener::{ChatConnector, ChatListener, ListenerPolicy},
        chat_service,
        messenger::{DisabledMessenger, Messenger},
        registration,
        relay_connector::{DisabledChatConnector, RelayChatConnector},
        sse_events, storage_supervisor,
        telegram::TelegramClient,
        telegram_bot,
    },
    state::{AppState, SharedState},
};

/// Buffered registration intents between the chat listener and the registration pump.
const INTENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let telegram = match env::var("TELEGRAM_BOT_TOKEN") {
        Ok(token) if !token.trim().is_empty() => {
            Some(TelegramClient::new(token.trim()).context("building messaging bot client")?)
        }
        _ => {
            warn!("TELEGRAM_BOT_TOKEN not set; role cards cannot be delivered");
            None
        }
    };
    let messenger: Arc<dyn Messenger> = match &telegram {
        Some(client) => Arc::new(client.clone()),
        None => Arc::new(DisabledMessenger),
    };

    let connector: Arc<dyn ChatConnector> = match env::var("CHAT_RELAY_URL") {
        Ok(url) if !url.trim().is_empty() => Arc::new(RelayChatConnector::new(url.trim())),
        _ => {
            warn!("CHAT_RELAY_URL not set; chat registration disabled");
            Arc::new(DisabledChatConnector)
        }
    };

    let (intents_tx, intents_rx) = mpsc::channel(INTENT_BUFFER);
    let policy = ListenerPolicy {
        registration_command: config.registration_command.clone(),
        reconnect_delay: config.reconnect_delay,
        max_attempts: config.max_reconnect_attempts,
    };
    let chat = ChatListener::new(connector, policy, intents_tx);

    let app_state = AppState::new(config, messenger, chat);

    spawn_storage_supervisor(app_state.clone());
    tokio::spawn(registration::run_pump(app_state.clone(), intents_rx));
    tokio::spawn(sse_events::forward_chat_status(app_state.clone()));
    tokio::spawn(resume_chat_when_ready(app_state.clone()));
    if let Some(client) = telegram {
        tokio::spawn(telegram_bot::run(app_state.clone(), client));
    }

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend from `STORAGE_BACKEND` (`mongo` by default, or `memory`).
fn spawn_storage_supervisor(state: SharedState) {
    let retention = state.config().registration_log_retention;
    let backend = env::var("STORAGE_BACKEND")
        .unwrap_or_else(|_| "mongo".into())
        .to_lowercase();

    match backend.as_str() {
        "memory" => {
            info!("using in-memory lobby store");
            let store: Arc<dyn LobbyStore> = Arc::new(MemoryLobbyStore::new(retention));
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(store) }
            }));
        }
        #[cfg(feature = "mongo-store")]
        _ => {
            use mafia_lobby_back::dao::lobby_store::mongodb::{MongoConfig, MongoLobbyStore};

            let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
            let db_name = env::var("MONGO_DB").ok();
            tokio::spawn(storage_supervisor::run(state, move || {
                let uri = uri.clone();
                let db_name = db_name.clone();
                async move {
                    let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
                    let store = MongoLobbyStore::connect(config, retention).await?;
                    Ok::<Arc<dyn LobbyStore>, StorageError>(Arc::new(store))
                }
            }));
        }
        #[cfg(not(feature = "mongo-store"))]
        other => {
            warn!(backend = %other, "mongo-store feature disabled; using in-memory lobby store");
            let store: Arc<dyn LobbyStore> = Arc::new(MemoryLobbyStore::new(retention));
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(store) }
            }));
        }
    }
}

/// The stored chat channel is only readable once storage is up.
async fn resume_chat_when_ready(state: SharedState) {
    let mut degraded = state.degraded_watcher();
    if degraded.wait_for(|degraded| !*degraded).await.is_err() {
        return;
    }
    chat_service::resume_listener(&state).await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
