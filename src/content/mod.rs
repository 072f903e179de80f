//! Content module
//! 
//! Music, background images and motivational messages read from JSON
//! documents in the content directory. A missing or broken document never
//! stops the timer: each loader degrades to an empty list or a built-in
//! fallback.

pub mod images;
pub mod messages;
pub mod music;

use std::path::Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ContentError;

pub use images::{default_images, parse_images, BackgroundImage};
pub use messages::{parse_messages, MessageBook, FALLBACK_MESSAGE};
pub use music::{parse_music_list, title_for, MusicTrack, CUSTOM_MUSIC_TITLE};

pub const MUSIC_FILE: &str = "music.json";
pub const IMAGES_FILE: &str = "images.json";
pub const MESSAGES_FILE: &str = "messages.json";

/// Everything read from the content directory at startup
#[derive(Debug, Clone, Default, Serialize)]
pub struct Content {
    pub music: Vec<MusicTrack>,
    pub images: Vec<BackgroundImage>,
    pub messages: Vec<String>,
}

async fn read_document<T>(
    path: &Path,
    parse: fn(&str) -> Result<T, ContentError>,
) -> Result<T, ContentError> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse(&raw)
}

/// Load all content documents from `dir`
pub async fn load_content(dir: &Path) -> Content {
    let (music_path, images_path, messages_path) =
        (dir.join(MUSIC_FILE), dir.join(IMAGES_FILE), dir.join(MESSAGES_FILE));
    let (music, images, messages) = tokio::join!(
        read_document(&music_path, parse_music_list),
        read_document(&images_path, parse_images),
        read_document(&messages_path, parse_messages),
    );

    let music = music.unwrap_or_else(|e| {
        warn!("Failed to load {}: {}", MUSIC_FILE, e);
        Vec::new()
    });
    let images = images.unwrap_or_else(|e| {
        warn!("Failed to load {}: {}, using default image", IMAGES_FILE, e);
        default_images()
    });
    let messages = messages.unwrap_or_else(|e| {
        warn!("Failed to load {}: {}", MESSAGES_FILE, e);
        Vec::new()
    });

    info!("Content loaded: {} tracks, {} images, {} messages",
          music.len(), images.len(), messages.len());
    Content { music, images, messages }
}
