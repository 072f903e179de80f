//! Background image list

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub url: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagesDocument {
    background_images: Vec<BackgroundImage>,
}

/// Parse `{"backgroundImages": [...]}`
pub fn parse_images(raw: &str) -> Result<Vec<BackgroundImage>, ContentError> {
    let document: ImagesDocument = serde_json::from_str(raw)?;
    Ok(document.background_images)
}

/// Single embedded image used when the document cannot be read
pub fn default_images() -> Vec<BackgroundImage> {
    vec![BackgroundImage {
        id: Some(1),
        url: "https://images.unsplash.com/photo-1427504494785-3a9ca7044f45?w=1200&h=800&fit=crop&crop=center"
            .to_string(),
        alt: "Students in a classroom".to_string(),
        category: "classroom".to_string(),
    }]
}
