//! Focus Timer - A countdown timer with background music sync
//!
//! This is the main entry point for the focus-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use focus_timer::{
    api::create_router,
    config::Config,
    content::load_content,
    services::{CommandPlayer, DesktopNotifier, EmbedPlayer, LogNotifier, MusicPlayer, Notifier},
    state::{AppState, Backends, Settings},
    storage::{FileStore, KeyValueStore, MemoryStore},
    tasks::{autosave_task, countdown_task, music_sync_task},
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, state={}, content={}",
          config.host, config.port, config.state_file.display(), config.content_dir.display());

    // Storage unavailable is not fatal: the session simply is not persisted
    let kv: Arc<dyn KeyValueStore> = match FileStore::open(&config.state_file) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Failed to open state file {}: {}; running in memory only",
                  config.state_file.display(), e);
            Arc::new(MemoryStore::new())
        }
    };

    let player: Arc<dyn MusicPlayer> = match config.player_command.as_deref() {
        Some(command_line) => Arc::new(CommandPlayer::from_command_line(command_line)?),
        None => Arc::new(EmbedPlayer::new()),
    };

    let notifier: Arc<dyn Notifier> = if config.no_notifications {
        Arc::new(LogNotifier)
    } else {
        Arc::new(DesktopNotifier)
    };

    let content = load_content(&config.content_dir).await;
    info!("Loaded {} tracks, {} images, {} messages",
          content.music.len(), content.images.len(), content.messages.len());

    // Create application state
    let state = Arc::new(AppState::new(
        Settings {
            port: config.port,
            host: config.host.clone(),
            sync_cooldown: config.sync_cooldown(),
        },
        Backends {
            kv,
            player,
            notifier,
            clock: Arc::new(SystemClock),
        },
        content,
    ));

    // Observers subscribe before anything can emit
    let timer_events = state.subscribe_timer_events();
    tokio::spawn(music_sync_task(Arc::clone(&state), timer_events));
    tokio::spawn(countdown_task(Arc::clone(&state)));
    tokio::spawn(autosave_task(Arc::clone(&state), config.autosave_period()));

    match state.restore() {
        Ok(Some(view)) => info!("Resuming at {} ({:?})", view.display, view.phase),
        Ok(None) => info!("No saved timer state"),
        Err(e) => error!("Failed to restore timer state: {}", e),
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timer, POST /timer/{{start,adjust,resume,pause,reset}}");
    info!("  GET  /music, POST /music/{{select,play,pause,stop,player-state}}");
    info!("  GET  /content/music, /content/images");
    info!("  GET/POST /messages, DELETE /messages/:index, PUT /messages/selected");
    info!("  GET  /status, /health");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.save_now();
    info!("Server shutdown complete");
    Ok(())
}
