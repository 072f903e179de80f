//! Motivational messages
//!
//! Built-in messages come from a content document; the user's selection and
//! their own messages live in the key-value store next to the timer state.

use std::sync::{Arc, Mutex, MutexGuard};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{error::ContentError, storage::KeyValueStore};

pub const SELECTED_MESSAGE_KEY: &str = "cronometro_selected_message";
pub const CUSTOM_MESSAGES_KEY: &str = "cronometro_custom_messages";

/// Shown when nothing else is available
pub const FALLBACK_MESSAGE: &str = "Stay focused, you've got this!";

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageRecord {
    Text(String),
    Object { text: String },
}

/// Parse a list of messages or `{"messages": [...]}`.
///
/// Entries may be strings or objects with a `text` field.
pub fn parse_messages(raw: &str) -> Result<Vec<String>, ContentError> {
    let document: Value = serde_json::from_str(raw)?;
    let records = match document {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("messages") {
            Some(Value::Array(records)) => records,
            _ => return Err(ContentError::Shape("missing messages list".into())),
        },
        _ => return Err(ContentError::Shape("expected a list or an object".into())),
    };

    Ok(records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<MessageRecord>(record).ok())
        .map(|record| match record {
            MessageRecord::Text(text) | MessageRecord::Object { text } => text.trim().to_string(),
        })
        .filter(|text| !text.is_empty())
        .collect())
}

/// Built-in, custom, and selected messages
pub struct MessageBook {
    kv: Arc<dyn KeyValueStore>,
    builtin: Vec<String>,
    /// Held across every read-modify-write of the stored messages
    edits: Mutex<()>,
}

impl MessageBook {
    pub fn new(kv: Arc<dyn KeyValueStore>, builtin: Vec<String>) -> Self {
        Self {
            kv,
            builtin,
            edits: Mutex::new(()),
        }
    }

    fn lock_edits(&self) -> Result<MutexGuard<'_, ()>, ContentError> {
        self.edits
            .lock()
            .map_err(|e| ContentError::Unavailable(format!("Failed to lock messages: {}", e)))
    }

    pub fn builtin(&self) -> &[String] {
        &self.builtin
    }

    /// User-authored messages; unreadable data counts as none
    pub fn custom(&self) -> Vec<String> {
        match self.kv.get(CUSTOM_MESSAGES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable custom messages: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read custom messages: {}", e);
                Vec::new()
            }
        }
    }

    pub fn selected(&self) -> Option<String> {
        match self.kv.get(SELECTED_MESSAGE_KEY) {
            Ok(selected) => selected.filter(|text| !text.is_empty()),
            Err(e) => {
                warn!("Failed to read selected message: {}", e);
                None
            }
        }
    }

    /// Message to display right now
    pub fn active(&self) -> String {
        self.selected()
            .or_else(|| self.builtin.first().cloned())
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
    }

    fn write_custom(&self, messages: &[String]) -> Result<(), ContentError> {
        self.kv
            .set(CUSTOM_MESSAGES_KEY, &serde_json::to_string(messages)?)?;
        Ok(())
    }

    pub fn add_custom(&self, text: &str) -> Result<Vec<String>, ContentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ContentError::EmptyMessage);
        }

        let _edits = self.lock_edits()?;
        let mut messages = self.custom();
        messages.push(text.to_string());
        self.write_custom(&messages)?;
        info!("Added custom message ({} total)", messages.len());
        Ok(messages)
    }

    /// Remove a custom message; deselects it if it was selected
    pub fn remove_custom(&self, index: usize) -> Result<Vec<String>, ContentError> {
        let _edits = self.lock_edits()?;
        let mut messages = self.custom();
        if index >= messages.len() {
            return Err(ContentError::NoSuchMessage(index));
        }

        let removed = messages.remove(index);
        self.write_custom(&messages)?;
        if self.selected().as_deref() == Some(removed.as_str()) {
            self.kv.remove(SELECTED_MESSAGE_KEY)?;
        }
        Ok(messages)
    }

    /// Select the message to display; empty text clears the selection
    pub fn select(&self, text: &str) -> Result<(), ContentError> {
        let text = text.trim();
        let _edits = self.lock_edits()?;
        if text.is_empty() {
            self.kv.remove(SELECTED_MESSAGE_KEY)?;
        } else {
            self.kv.set(SELECTED_MESSAGE_KEY, text)?;
        }
        Ok(())
    }
}
