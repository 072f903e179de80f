//! Music/timer synchronization
//!
//! Timer lifecycle events drive the player while sync is enabled. Any manual
//! music action disables sync for a cooldown window so the user's choice is
//! not immediately overridden; a fresh timer start always re-enables it.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::timer_state::TimerEvent;
use crate::{
    error::{MusicError, PlayerError},
    services::{extract_video_id, MusicPlayer, PlayerState},
};

/// Who touched the music last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastAction {
    Manual,
    TimerSync,
}

/// Timer-driven player command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Start,
    Pause,
    Stop,
}

/// Observable sync state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicSyncState {
    pub is_selected: bool,
    pub current_url: String,
    pub is_playing: bool,
    pub sync_enabled: bool,
    pub last_action: Option<LastAction>,
    /// Inline error indicator from the last failed player command
    pub last_error: Option<String>,
}

impl Default for MusicSyncState {
    fn default() -> Self {
        Self {
            is_selected: false,
            current_url: String::new(),
            is_playing: false,
            sync_enabled: true,
            last_action: None,
            last_error: None,
        }
    }
}

pub struct MusicSyncController {
    player: Arc<dyn MusicPlayer>,
    state: MusicSyncState,
    video_id: Option<String>,
    /// A track is loaded in the player and can be resumed with `play`
    cued: bool,
    manual_generation: u64,
}

impl MusicSyncController {
    pub fn new(player: Arc<dyn MusicPlayer>) -> Self {
        Self {
            player,
            state: MusicSyncState::default(),
            video_id: None,
            cued: false,
            manual_generation: 0,
        }
    }

    pub fn state(&self) -> &MusicSyncState {
        &self.state
    }

    pub fn player(&self) -> &Arc<dyn MusicPlayer> {
        &self.player
    }

    /// Generation of the most recent manual action
    pub fn manual_generation(&self) -> u64 {
        self.manual_generation
    }

    fn mark_manual(&mut self) {
        self.manual_generation += 1;
        self.state.last_action = Some(LastAction::Manual);
        self.state.sync_enabled = false;
        debug!("Manual music action #{}, sync suspended", self.manual_generation);
    }

    fn record_failure(&mut self, error: &PlayerError) {
        warn!("Music player command failed: {}", error);
        self.state.last_error = Some(error.to_string());
    }

    /// Load and play the cued or selected track
    fn start_playback(&mut self) -> Result<(), PlayerError> {
        if !self.cued {
            let video_id = self.video_id.clone().ok_or(PlayerError::NotLoaded)?;
            self.player.load(&video_id)?;
            self.cued = true;
        }
        self.player.play()?;
        self.state.is_playing = true;
        Ok(())
    }

    // Manual actions

    /// Select a YouTube link and start playing it
    pub fn select(&mut self, url: &str) -> Result<(), MusicError> {
        let video_id = extract_video_id(url)
            .ok_or_else(|| MusicError::InvalidLink(url.trim().to_string()))?;

        self.mark_manual();
        self.state.is_selected = true;
        self.state.current_url = url.trim().to_string();
        self.state.is_playing = false;
        self.state.last_error = None;
        self.video_id = Some(video_id);
        self.cued = false;

        info!("Music selected: {}", self.state.current_url);
        self.start_playback().map_err(|e| {
            self.record_failure(&e);
            MusicError::from(e)
        })
    }

    pub fn play(&mut self) -> Result<(), MusicError> {
        if !self.state.is_selected {
            return Err(MusicError::NoMusicSelected);
        }

        self.mark_manual();
        if self.state.is_playing {
            return Ok(());
        }
        self.start_playback().map_err(|e| {
            self.record_failure(&e);
            MusicError::from(e)
        })
    }

    pub fn pause(&mut self) -> Result<(), MusicError> {
        if !self.state.is_selected {
            return Err(MusicError::NoMusicSelected);
        }

        self.mark_manual();
        if !self.state.is_playing {
            return Ok(());
        }
        self.player.pause().map_err(|e| {
            self.record_failure(&e);
            MusicError::from(e)
        })?;
        self.state.is_playing = false;
        Ok(())
    }

    /// Stop playback; the selection is kept for the next timer start
    pub fn stop(&mut self) -> Result<(), MusicError> {
        self.mark_manual();
        self.player.stop().map_err(|e| {
            self.record_failure(&e);
            MusicError::from(e)
        })?;
        self.state.is_playing = false;
        self.cued = false;
        Ok(())
    }

    /// Cooldown timer fired for manual action `generation`.
    ///
    /// Returns true when sync was re-enabled.
    pub fn cooldown_elapsed(&mut self, generation: u64) -> bool {
        if generation != self.manual_generation
            || self.state.last_action != Some(LastAction::Manual)
            || self.state.sync_enabled
        {
            return false;
        }

        self.state.sync_enabled = true;
        debug!("Sync cooldown #{} elapsed, sync re-enabled", generation);
        true
    }

    /// Player reported a state change
    pub fn on_player_state(&mut self, state: PlayerState) {
        match state {
            PlayerState::Playing => {
                self.state.is_playing = true;
                self.cued = self.video_id.is_some();
            }
            PlayerState::Paused | PlayerState::Ended => self.state.is_playing = false,
        }
    }

    // Timer-driven actions

    /// React to a timer lifecycle event
    pub fn on_timer_event(&mut self, event: &TimerEvent) -> bool {
        match event {
            TimerEvent::Started { .. } => {
                self.state.sync_enabled = true;
                self.state.last_action = Some(LastAction::TimerSync);
                self.sync_with_timer(SyncAction::Start)
            }
            TimerEvent::Paused { .. } => self.sync_with_timer(SyncAction::Pause),
            TimerEvent::Stopped | TimerEvent::Expired => self.sync_with_timer(SyncAction::Stop),
        }
    }

    /// Drive the player from the timer.
    ///
    /// Returns true when a player command was issued. Failures are recorded
    /// in `last_error` and never propagated.
    pub fn sync_with_timer(&mut self, action: SyncAction) -> bool {
        if !self.state.is_selected || !self.state.sync_enabled {
            debug!("Skipping music sync for {:?}: selected={}, enabled={}",
                   action, self.state.is_selected, self.state.sync_enabled);
            return false;
        }

        let result = match action {
            SyncAction::Start if self.state.is_playing => return false,
            SyncAction::Start => self.start_playback(),
            SyncAction::Pause if !self.state.is_playing => return false,
            SyncAction::Pause => self.player.pause().map(|()| self.state.is_playing = false),
            SyncAction::Stop => self.player.stop().map(|()| {
                self.state.is_playing = false;
                self.cued = false;
            }),
        };

        match result {
            Ok(()) => {
                debug!("Music synced with timer: {:?}", action);
                self.state.last_error = None;
            }
            Err(e) => self.record_failure(&e),
        }
        true
    }
}
