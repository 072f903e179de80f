//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer", get(timer_handler))
        .route("/timer/start", post(start_timer_handler))
        .route("/timer/adjust", post(adjust_timer_handler))
        .route("/timer/resume", post(resume_timer_handler))
        .route("/timer/pause", post(pause_timer_handler))
        .route("/timer/reset", post(reset_timer_handler))
        .route("/music", get(music_handler))
        .route("/music/select", post(select_music_handler))
        .route("/music/play", post(play_music_handler))
        .route("/music/pause", post(pause_music_handler))
        .route("/music/stop", post(stop_music_handler))
        .route("/music/player-state", post(player_state_handler))
        .route("/content/music", get(music_catalogue_handler))
        .route("/content/images", get(images_handler))
        .route("/messages", get(messages_handler).post(add_message_handler))
        .route("/messages/selected", put(select_message_handler))
        .route("/messages/:index", delete(remove_message_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        content::{parse_music_list, Content},
        services::{EmbedPlayer, LogNotifier},
        state::{Backends, Settings},
        storage::MemoryStore,
        utils::ManualClock,
    };

    fn app() -> Router {
        app_with(Content::default())
    }

    fn app_with(content: Content) -> Router {
        let state = AppState::new(
            Settings {
                port: 0,
                host: "127.0.0.1".into(),
                sync_cooldown: Duration::from_secs(5),
            },
            Backends {
                kv: Arc::new(MemoryStore::new()),
                player: Arc::new(EmbedPlayer::new()),
                notifier: Arc::new(LogNotifier),
                clock: Arc::new(ManualClock::new(1_700_000_000_000)),
            },
            content,
        );
        state.restore().unwrap();
        create_router(Arc::new(state))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn start_pause_resume_round() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/timer/start", Some(json!({"minutes": 10}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timer"]["phase"], "running");
        assert_eq!(body["timer"]["display"], "10:00");

        let (status, body) = send(&app, Method::POST, "/timer/pause", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timer"]["phase"], "paused");

        let (status, body) = send(&app, Method::POST, "/timer/resume", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timer"]["phase"], "running");

        let (_, body) = send(&app, Method::POST, "/timer/reset", None).await;
        assert_eq!(body["timer"]["phase"], "idle");
        assert_eq!(body["timer"]["time_left_secs"], 0);
    }

    #[tokio::test]
    async fn resume_without_time_conflicts() {
        let (status, body) = send(&app(), Method::POST, "/timer/resume", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = app();
        let (status, _) = send(&app, Method::POST, "/timer/start", Some(json!({"minutes": "ten"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/timer/adjust", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/timer/start", Some(json!({"minutes": 1e17}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, Method::GET, "/timer", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_link_is_rejected_with_message() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/music/select",
            Some(json!({"url": "https://example.com/video"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("invalid YouTube link"));
    }

    #[tokio::test]
    async fn select_music_plays() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/music/select",
            Some(json!({"url": "https://www.youtube.com/watch?v=jfKfPfyJRdk"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["music"]["is_playing"], true);
        assert_eq!(body["music"]["player"]["video_id"], "jfKfPfyJRdk");
    }

    #[tokio::test]
    async fn play_without_selection_conflicts() {
        let (status, _) = send(&app(), Method::POST, "/music/play", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn catalogue_carries_picker_labels() {
        let music = parse_music_list(
            r#"[{"title":"Lofi","youtubeUrl":"https://youtu.be/jfKfPfyJRdk","category":"lofi","duration":"1h"}]"#,
        )
        .unwrap();
        let app = app_with(Content { music, ..Content::default() });

        let (status, body) = send(&app, Method::GET, "/content/music", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["label"], "Lofi (1h)");
        assert_eq!(body[0]["youtubeUrl"], "https://youtu.be/jfKfPfyJRdk");
    }

    #[tokio::test]
    async fn message_lifecycle() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/messages", Some(json!({"text": "Deep work"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["custom"], json!(["Deep work"]));

        let (status, body) = send(&app, Method::PUT, "/messages/selected", Some(json!({"text": "Deep work"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], "Deep work");

        let (status, body) = send(&app, Method::DELETE, "/messages/0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selected"], Value::Null);

        let (status, _) = send(&app, Method::DELETE, "/messages/3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::POST, "/messages", Some(json!({"text": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_includes_timer_and_music() {
        let (status, body) = send(&app(), Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timer"]["phase"], "idle");
        assert_eq!(body["music"]["is_selected"], false);
        assert_eq!(body["persistence_enabled"], true);
    }
}
