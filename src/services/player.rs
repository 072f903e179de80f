//! Music player backends
//!
//! The sync controller only sees the [`MusicPlayer`] capability. Two
//! backends exist: [`EmbedPlayer`] hands an embed URL to whichever page
//! renders the frame and tracks its play/pause state, and [`CommandPlayer`]
//! runs an external program as a degraded fallback where pausing stops the
//! process and playing again restarts the track.

use std::{
    process::Stdio,
    sync::{Mutex, MutexGuard},
};
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::youtube::{embed_url, watch_url};
use crate::error::PlayerError;

/// State changes a player reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Playing,
    Paused,
    Ended,
}

/// What a backend currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub backend: String,
    pub video_id: Option<String>,
    pub embed_url: Option<String>,
    pub state: Option<PlayerState>,
}

/// External playback capability
pub trait MusicPlayer: Send + Sync {
    /// Cue a video without starting it
    fn load(&self, video_id: &str) -> Result<(), PlayerError>;
    fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;
    fn status(&self) -> PlayerStatus;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, PlayerError> {
    mutex
        .lock()
        .map_err(|e| PlayerError::Command(format!("Failed to lock player: {}", e)))
}

#[derive(Debug, Default)]
struct EmbedInner {
    video_id: Option<String>,
    state: Option<PlayerState>,
}

/// Player whose frame is rendered by the front-end
#[derive(Debug, Default)]
pub struct EmbedPlayer {
    inner: Mutex<EmbedInner>,
}

impl EmbedPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MusicPlayer for EmbedPlayer {
    fn load(&self, video_id: &str) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        inner.video_id = Some(video_id.to_string());
        inner.state = Some(PlayerState::Paused);
        debug!("Embed player cued {}", video_id);
        Ok(())
    }

    fn play(&self) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        if inner.video_id.is_none() {
            return Err(PlayerError::NotLoaded);
        }
        inner.state = Some(PlayerState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        if inner.video_id.is_none() {
            return Err(PlayerError::NotLoaded);
        }
        inner.state = Some(PlayerState::Paused);
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        inner.video_id = None;
        inner.state = None;
        Ok(())
    }

    fn status(&self) -> PlayerStatus {
        let (video_id, state) = match self.inner.lock() {
            Ok(inner) => (inner.video_id.clone(), inner.state),
            Err(_) => (None, None),
        };
        PlayerStatus {
            backend: "embed".to_string(),
            embed_url: video_id.as_deref().map(embed_url),
            video_id,
            state,
        }
    }
}

#[derive(Debug, Default)]
struct CommandInner {
    video_id: Option<String>,
    child: Option<Child>,
    paused: bool,
}

impl CommandInner {
    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!("Player process already gone: {}", e);
            }
        }
    }
}

/// Fallback player that runs an external program per track
#[derive(Debug)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    inner: Mutex<CommandInner>,
}

impl CommandPlayer {
    /// Build from a command line such as `mpv --no-video`; the watch URL is
    /// appended as the last argument.
    pub fn from_command_line(command_line: &str) -> Result<Self, PlayerError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PlayerError::Command("empty player command".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
            inner: Mutex::new(CommandInner::default()),
        })
    }
}

impl MusicPlayer for CommandPlayer {
    fn load(&self, video_id: &str) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        inner.kill_child();
        inner.video_id = Some(video_id.to_string());
        inner.paused = true;
        Ok(())
    }

    fn play(&self) -> Result<(), PlayerError> {
        let mut guard = lock(&self.inner)?;
        let inner = &mut *guard;
        let video_id = inner.video_id.clone().ok_or(PlayerError::NotLoaded)?;

        if let Some(child) = inner.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                inner.paused = false;
                return Ok(());
            }
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(watch_url(&video_id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayerError::Command(format!("Failed to spawn {}: {}", self.program, e)))?;

        info!("Started {} for video {}", self.program, video_id);
        inner.child = Some(child);
        inner.paused = false;
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        if inner.video_id.is_none() {
            return Err(PlayerError::NotLoaded);
        }
        // No pause support: stop the process, keep the track cued.
        warn!("{} cannot pause, stopping playback instead", self.program);
        inner.kill_child();
        inner.paused = true;
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        let mut inner = lock(&self.inner)?;
        inner.kill_child();
        inner.video_id = None;
        inner.paused = false;
        Ok(())
    }

    fn status(&self) -> PlayerStatus {
        let (video_id, state) = match self.inner.lock() {
            Ok(mut inner) => {
                let state = match (inner.video_id.is_some(), inner.paused, inner.child.as_mut()) {
                    (false, _, _) => None,
                    (true, true, _) => Some(PlayerState::Paused),
                    (true, false, Some(child)) => match child.try_wait() {
                        Ok(None) => Some(PlayerState::Playing),
                        _ => Some(PlayerState::Ended),
                    },
                    (true, false, None) => Some(PlayerState::Ended),
                };
                (inner.video_id.clone(), state)
            }
            Err(_) => (None, None),
        };

        PlayerStatus {
            backend: format!("command:{}", self.program),
            video_id,
            embed_url: None,
            state,
        }
    }
}
