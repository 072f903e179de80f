//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    content::BackgroundImage,
    error::{ContentError, MusicError, TimerError},
    services::PlayerState,
    state::AppState,
};
use super::responses::{
    CatalogueEntry, ErrorResponse, HealthResponse, MessagesResponse, MusicResponse, StatusResponse,
    TimerResponse,
};

/// Error half of every fallible handler
pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: String) -> ApiError {
    if status.is_server_error() {
        error!("{}", message);
    } else {
        warn!("{}", message);
    }
    (status, Json(ErrorResponse::new(message)))
}

fn timer_error(e: TimerError) -> ApiError {
    let status = match e {
        TimerError::NoTimeSet => StatusCode::CONFLICT,
        TimerError::InvalidDuration(_) => StatusCode::BAD_REQUEST,
        TimerError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

fn music_error(e: MusicError) -> ApiError {
    let status = match e {
        MusicError::InvalidLink(_) => StatusCode::BAD_REQUEST,
        MusicError::NoMusicSelected => StatusCode::CONFLICT,
        MusicError::Player(_) => StatusCode::BAD_GATEWAY,
        MusicError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

fn content_error(e: ContentError) -> ApiError {
    let status = match e {
        ContentError::EmptyMessage => StatusCode::BAD_REQUEST,
        ContentError::NoSuchMessage(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

/// Unwrap a JSON body, answering 400 for anything malformed
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| api_error(StatusCode::BAD_REQUEST, rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct MinutesRequest {
    pub minutes: f64,
}

#[derive(Debug, Deserialize)]
pub struct SelectMusicRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayerStateRequest {
    pub state: PlayerState,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

// Timer

/// Handle POST /timer/start - Start a countdown of `minutes`
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MinutesRequest>, JsonRejection>,
) -> Result<Json<TimerResponse>, ApiError> {
    let request = body(payload)?;
    let timer = state.start_timer(request.minutes).map_err(timer_error)?;
    Ok(Json(TimerResponse::new(
        format!("Timer started at {}", timer.display),
        timer,
    )))
}

/// Handle POST /timer/adjust - Add or remove minutes
pub async fn adjust_timer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MinutesRequest>, JsonRejection>,
) -> Result<Json<TimerResponse>, ApiError> {
    let request = body(payload)?;
    let timer = state.adjust_timer(request.minutes).map_err(timer_error)?;
    Ok(Json(TimerResponse::new(
        format!("Timer adjusted to {}", timer.display),
        timer,
    )))
}

/// Handle POST /timer/resume
pub async fn resume_timer_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.resume_timer().map_err(timer_error)?;
    Ok(Json(TimerResponse::new("Timer resumed".to_string(), timer)))
}

/// Handle POST /timer/pause
pub async fn pause_timer_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.pause_timer().map_err(timer_error)?;
    Ok(Json(TimerResponse::new("Timer paused".to_string(), timer)))
}

/// Handle POST /timer/reset
pub async fn reset_timer_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.reset_timer().map_err(timer_error)?;
    Ok(Json(TimerResponse::new("Timer reset".to_string(), timer)))
}

/// Handle GET /timer
pub async fn timer_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.timer_view().map_err(timer_error)?;
    Ok(Json(TimerResponse::new(timer.display.clone(), timer)))
}

// Music

/// Handle POST /music/select - Pick a YouTube link and play it
pub async fn select_music_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SelectMusicRequest>, JsonRejection>,
) -> Result<Json<MusicResponse>, ApiError> {
    let request = body(payload)?;
    let music = state.select_music(&request.url).map_err(music_error)?;
    info!("Music selected via API: {}", music.sync.current_url);
    let message = match &music.title {
        Some(title) => format!("Playing: {}", title),
        None => "Music selected".to_string(),
    };
    Ok(Json(MusicResponse::new(message, music)))
}

/// Handle POST /music/play
pub async fn play_music_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MusicResponse>, ApiError> {
    let music = state.play_music().map_err(music_error)?;
    Ok(Json(MusicResponse::new("Music playing".to_string(), music)))
}

/// Handle POST /music/pause
pub async fn pause_music_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MusicResponse>, ApiError> {
    let music = state.pause_music().map_err(music_error)?;
    Ok(Json(MusicResponse::new("Music paused".to_string(), music)))
}

/// Handle POST /music/stop
pub async fn stop_music_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MusicResponse>, ApiError> {
    let music = state.stop_music().map_err(music_error)?;
    Ok(Json(MusicResponse::new("Music stopped".to_string(), music)))
}

/// Handle POST /music/player-state - Player reports playing/paused/ended
pub async fn player_state_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlayerStateRequest>, JsonRejection>,
) -> Result<Json<MusicResponse>, ApiError> {
    let request = body(payload)?;
    let music = state.player_state_changed(request.state).map_err(music_error)?;
    Ok(Json(MusicResponse::new(
        format!("Player state: {:?}", request.state),
        music,
    )))
}

/// Handle GET /music
pub async fn music_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MusicResponse>, ApiError> {
    let music = state.music_view().map_err(music_error)?;
    let message = music.title.clone().unwrap_or_else(|| "No music selected".to_string());
    Ok(Json(MusicResponse::new(message, music)))
}

// Content

/// Handle GET /content/music - Music catalogue with picker labels
pub async fn music_catalogue_handler(State(state): State<Arc<AppState>>) -> Json<Vec<CatalogueEntry>> {
    Json(state.content.music.iter().map(CatalogueEntry::from).collect())
}

/// Handle GET /content/images - Background images
pub async fn images_handler(State(state): State<Arc<AppState>>) -> Json<Vec<BackgroundImage>> {
    Json(state.content.images.clone())
}

fn messages_response(state: &AppState) -> MessagesResponse {
    MessagesResponse {
        builtin: state.messages.builtin().to_vec(),
        custom: state.messages.custom(),
        selected: state.messages.selected(),
        active: state.messages.active(),
    }
}

/// Handle GET /messages
pub async fn messages_handler(State(state): State<Arc<AppState>>) -> Json<MessagesResponse> {
    Json(messages_response(&state))
}

/// Handle POST /messages - Add a custom message
pub async fn add_message_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessagesResponse>), ApiError> {
    let request = body(payload)?;
    state.messages.add_custom(&request.text).map_err(content_error)?;
    Ok((StatusCode::CREATED, Json(messages_response(&state))))
}

/// Handle DELETE /messages/:index - Remove a custom message
pub async fn remove_message_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<MessagesResponse>, ApiError> {
    state.messages.remove_custom(index).map_err(content_error)?;
    Ok(Json(messages_response(&state)))
}

/// Handle PUT /messages/selected - Choose the displayed message
pub async fn select_message_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let request = body(payload)?;
    state.messages.select(&request.text).map_err(content_error)?;
    Ok(Json(messages_response(&state)))
}

// Meta

/// Handle GET /status - Return current status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let timer = state.timer_view().map_err(timer_error)?;
    let music = state.music_view().map_err(music_error)?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer,
        music,
        active_message: state.messages.active(),
        status_message: state.status_message(),
        persistence_enabled: state.store.can_persist(),
        memory_only: state.store.is_memory_only(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
