//! Background music catalogue

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ContentError;

/// Title shown for links that are not in the catalogue
pub const CUSTOM_MUSIC_TITLE: &str = "Custom music";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicTrack {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl MusicTrack {
    /// Playable link, preferring `youtubeUrl`
    pub fn link(&self) -> &str {
        self.youtube_url
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default()
    }

    /// `Title (duration)` as shown in the picker
    pub fn label(&self) -> String {
        let title = if self.title.is_empty() { "Untitled" } else { &self.title };
        match &self.duration {
            Some(duration) if !duration.is_empty() => format!("{} ({})", title, duration),
            _ => title.to_string(),
        }
    }
}

/// Parse a music document.
///
/// Accepts a top-level list or an object with a `backgroundMusic` list.
/// Records that do not fit are skipped.
pub fn parse_music_list(raw: &str) -> Result<Vec<MusicTrack>, ContentError> {
    let document: Value = serde_json::from_str(raw)?;
    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("backgroundMusic") {
            Some(Value::Array(records)) => records,
            _ => return Err(ContentError::Shape("missing backgroundMusic list".into())),
        },
        _ => return Err(ContentError::Shape("expected a list or an object".into())),
    };

    Ok(records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Skipping music record: {}", e);
                None
            }
        })
        .collect())
}

/// Title for `link`, falling back to [`CUSTOM_MUSIC_TITLE`]
pub fn title_for(tracks: &[MusicTrack], link: &str) -> String {
    tracks
        .iter()
        .find(|track| track.link() == link.trim())
        .map(|track| track.title.clone())
        .unwrap_or_else(|| CUSTOM_MUSIC_TITLE.to_string())
}
