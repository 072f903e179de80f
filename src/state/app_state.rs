//! Main application state management

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::{
    music_state::{MusicSyncController, MusicSyncState},
    timer_state::{TimerEffect, TimerEngine, TimerEvent, TimerView, NO_TIME_BODY, NO_TIME_TITLE},
};
use crate::{
    content::{title_for, Content, MessageBook},
    error::{MusicError, TimerError},
    services::{MusicPlayer, Notifier, PlayerState, PlayerStatus},
    storage::{KeyValueStore, TimerStore},
    utils::Clock,
};

/// How long inline status text stays visible
const STATUS_TTL_MS: i64 = 3_000;

/// Command for the countdown task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerCommand {
    Disarmed,
    /// Each arm carries a fresh generation so re-arming restarts the interval
    Armed(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Transient inline status text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub expires_at_ms: i64,
}

/// Music state as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicView {
    #[serde(flatten)]
    pub sync: MusicSyncState,
    pub title: Option<String>,
    pub player: PlayerStatus,
}

/// Server-level settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub host: String,
    pub sync_cooldown: Duration,
}

/// Pluggable collaborators
pub struct Backends {
    pub kv: Arc<dyn KeyValueStore>,
    pub player: Arc<dyn MusicPlayer>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Main application state shared by handlers and background tasks
pub struct AppState {
    /// Countdown engine
    pub engine: Arc<Mutex<TimerEngine>>,
    /// Gated snapshot persistence
    pub store: TimerStore,
    /// Music/timer sync controller
    pub music: Arc<Mutex<MusicSyncController>>,
    pub messages: MessageBook,
    pub content: Content,
    pub clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    pub sync_cooldown: Duration,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    status: Mutex<Option<StatusMessage>>,
    /// Timer lifecycle notifications
    pub timer_event_tx: broadcast::Sender<TimerEvent>,
    /// Countdown task control
    ticker_tx: watch::Sender<TickerCommand>,
    /// Keep the receiver alive to prevent channel closure
    _ticker_rx: watch::Receiver<TickerCommand>,
    ticker_generation: AtomicU64,
}

impl AppState {
    pub fn new(settings: Settings, backends: Backends, content: Content) -> Self {
        let (timer_event_tx, _) = broadcast::channel(100);
        let (ticker_tx, ticker_rx) = watch::channel(TickerCommand::Disarmed);

        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new())),
            store: TimerStore::new(Arc::clone(&backends.kv)),
            music: Arc::new(Mutex::new(MusicSyncController::new(backends.player))),
            messages: MessageBook::new(backends.kv, content.messages.clone()),
            content,
            clock: backends.clock,
            notifier: backends.notifier,
            sync_cooldown: settings.sync_cooldown,
            start_time: Instant::now(),
            port: settings.port,
            host: settings.host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            status: Mutex::new(None),
            timer_event_tx,
            ticker_tx,
            _ticker_rx: ticker_rx,
            ticker_generation: AtomicU64::new(0),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, TimerError> {
        self.engine
            .lock()
            .map_err(|e| TimerError::Unavailable(format!("Failed to lock timer engine: {}", e)))
    }

    fn lock_music(&self) -> Result<MutexGuard<'_, MusicSyncController>, MusicError> {
        self.music
            .lock()
            .map_err(|e| MusicError::Unavailable(format!("Failed to lock music state: {}", e)))
    }

    pub fn subscribe_ticker(&self) -> watch::Receiver<TickerCommand> {
        self.ticker_tx.subscribe()
    }

    pub fn subscribe_timer_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.timer_event_tx.subscribe()
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Carry out the effects of one engine transition, in order
    fn apply(&self, engine: &TimerEngine, effects: Vec<TimerEffect>, now_ms: i64) {
        for effect in effects {
            match effect {
                TimerEffect::Persist => self.store.save(&engine.snapshot(now_ms)),
                TimerEffect::ClearPersisted => self.store.clear(),
                TimerEffect::Emit(event) => {
                    debug!("Timer event: {:?}", event);
                    if let Err(e) = self.timer_event_tx.send(event) {
                        debug!("No timer event listeners: {}", e);
                    }
                }
                TimerEffect::Notify { title, body } => self.notify(&title, &body),
                TimerEffect::ArmTicker => {
                    let generation = self.ticker_generation.fetch_add(1, Ordering::SeqCst) + 1;
                    self.ticker_tx.send_replace(TickerCommand::Armed(generation));
                }
                TimerEffect::DisarmTicker => {
                    self.ticker_tx.send_replace(TickerCommand::Disarmed);
                }
            }
        }
    }

    /// Raise a notification and mirror it as inline status text
    pub fn notify(&self, title: &str, body: &str) {
        self.notifier.notify(title, body);
        self.set_status(format!("{} {}", title, body), StatusKind::Info);
    }

    pub fn set_status(&self, text: String, kind: StatusKind) {
        let message = StatusMessage {
            text,
            kind,
            expires_at_ms: self.now_ms() + STATUS_TTL_MS,
        };
        if let Ok(mut status) = self.status.lock() {
            *status = Some(message);
        }
    }

    /// Current status text, if it has not expired yet
    pub fn status_message(&self) -> Option<StatusMessage> {
        let now = self.now_ms();
        self.status
            .lock()
            .ok()
            .and_then(|status| status.clone())
            .filter(|message| message.expires_at_ms > now)
    }

    // Boot and persistence

    /// Restore persisted state, then open the persistence gate.
    ///
    /// The gate opens even when restoration fails so later saves are not
    /// blocked for the rest of the session.
    pub fn restore(&self) -> Result<Option<TimerView>, TimerError> {
        let now = self.now_ms();
        let restored = self.store.load(now);

        let mut engine = self.lock_engine();
        let result = engine
            .as_deref_mut()
            .map(|engine| {
                restored.as_ref().map(|snapshot| {
                    let effects = engine.prime(snapshot, now);
                    self.apply(engine, effects, now);
                    engine.view(now)
                })
            })
            .map_err(|e| e.clone());

        self.store.open_gate();
        if let Ok(engine) = &engine {
            self.store.save(&engine.snapshot(now));
        }
        drop(engine);

        if let Ok(Some(view)) = &result {
            info!("Timer restored: {} ({:?})", view.display, view.phase);
            self.set_status("Timer restored".to_string(), StatusKind::Success);
        }
        result
    }

    /// Best-effort save of the current state (autosave and shutdown)
    pub fn save_now(&self) {
        let now = self.now_ms();
        match self.lock_engine() {
            Ok(engine) => {
                if engine.is_running() || engine.time_left_secs(now) > 0 {
                    self.store.save(&engine.snapshot(now));
                }
            }
            Err(e) => warn!("Skipping save: {}", e),
        }
    }

    // Timer operations

    pub fn timer_view(&self) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        Ok(self.lock_engine()?.view(now))
    }

    pub fn start_timer(&self, minutes: f64) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        let mut engine = self.lock_engine()?;
        let effects = engine.start(minutes, now)?;
        self.apply(&engine, effects, now);
        info!("Timer started for {} minutes", minutes);
        self.record_action("start");
        Ok(engine.view(now))
    }

    pub fn adjust_timer(&self, delta_minutes: f64) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        let mut engine = self.lock_engine()?;
        let effects = engine.adjust(delta_minutes, now)?;
        self.apply(&engine, effects, now);
        info!("Timer adjusted by {} minutes", delta_minutes);
        self.record_action("adjust");
        Ok(engine.view(now))
    }

    pub fn resume_timer(&self) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        let mut engine = self.lock_engine()?;
        match engine.resume(now) {
            Ok(effects) => {
                self.apply(&engine, effects, now);
                info!("Timer resumed");
                self.record_action("resume");
                Ok(engine.view(now))
            }
            Err(TimerError::NoTimeSet) => {
                drop(engine);
                self.notify(NO_TIME_TITLE, NO_TIME_BODY);
                Err(TimerError::NoTimeSet)
            }
            Err(e) => Err(e),
        }
    }

    pub fn pause_timer(&self) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        let mut engine = self.lock_engine()?;
        let effects = engine.pause(now);
        if !effects.is_empty() {
            info!("Timer paused");
            self.record_action("pause");
        }
        self.apply(&engine, effects, now);
        Ok(engine.view(now))
    }

    pub fn reset_timer(&self) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        let mut engine = self.lock_engine()?;
        let effects = engine.reset();
        self.apply(&engine, effects, now);
        info!("Timer reset");
        self.record_action("reset");
        Ok(engine.view(now))
    }

    /// One-second heartbeat from the countdown task
    pub fn tick(&self) -> Result<TimerView, TimerError> {
        let now = self.now_ms();
        let mut engine = self.lock_engine()?;
        let effects = engine.tick(now);
        if effects.iter().any(|e| matches!(e, TimerEffect::Emit(TimerEvent::Expired))) {
            info!("Timer expired");
            self.record_action("expired");
        }
        self.apply(&engine, effects, now);
        Ok(engine.view(now))
    }

    // Music operations

    pub fn music_view(&self) -> Result<MusicView, MusicError> {
        let music = self.lock_music()?;
        let sync = music.state().clone();
        let title = sync
            .is_selected
            .then(|| title_for(&self.content.music, &sync.current_url));
        Ok(MusicView {
            title,
            player: music.player().status(),
            sync,
        })
    }

    /// Apply a timer event to the music controller
    pub fn sync_music(&self, event: &TimerEvent) {
        let failure = match self.lock_music() {
            Ok(mut music) => {
                let issued = music.on_timer_event(event);
                music.state().last_error.clone().filter(|_| issued)
            }
            Err(e) => {
                warn!("Skipping music sync: {}", e);
                None
            }
        };

        if let Some(error) = failure {
            self.set_status(format!("Music sync failed: {}", error), StatusKind::Error);
        }
    }

    /// Run a manual music action and schedule the sync cooldown
    fn manual_music<F>(self: &Arc<Self>, action: &str, run: F) -> Result<MusicView, MusicError>
    where
        F: FnOnce(&mut MusicSyncController) -> Result<(), MusicError>,
    {
        let (result, generation, suspended) = {
            let mut music = self.lock_music()?;
            let result = run(&mut *music);
            (result, music.manual_generation(), !music.state().sync_enabled)
        };

        if suspended {
            self.schedule_sync_cooldown(generation);
        }
        self.record_action(action);

        match result {
            Ok(()) => self.music_view(),
            Err(e) => {
                self.set_status(e.to_string(), StatusKind::Error);
                Err(e)
            }
        }
    }

    fn schedule_sync_cooldown(self: &Arc<Self>, generation: u64) {
        let state = Arc::clone(self);
        let cooldown = self.sync_cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            match state.music.lock() {
                Ok(mut music) => {
                    if music.cooldown_elapsed(generation) {
                        info!("Music sync re-enabled after manual action");
                    }
                }
                Err(e) => warn!("Failed to lock music state for cooldown: {}", e),
            }
        });
    }

    pub fn select_music(self: &Arc<Self>, url: &str) -> Result<MusicView, MusicError> {
        let view = self.manual_music("music-select", |music| music.select(url))?;
        if let Some(title) = &view.title {
            self.set_status(format!("🎵 Playing: {}", title), StatusKind::Info);
        }
        Ok(view)
    }

    pub fn play_music(self: &Arc<Self>) -> Result<MusicView, MusicError> {
        self.manual_music("music-play", MusicSyncController::play)
    }

    pub fn pause_music(self: &Arc<Self>) -> Result<MusicView, MusicError> {
        self.manual_music("music-pause", MusicSyncController::pause)
    }

    pub fn stop_music(self: &Arc<Self>) -> Result<MusicView, MusicError> {
        let view = self.manual_music("music-stop", MusicSyncController::stop)?;
        self.set_status("🔇 Music stopped".to_string(), StatusKind::Info);
        Ok(view)
    }

    /// Player reported a state change
    pub fn player_state_changed(&self, state: PlayerState) -> Result<MusicView, MusicError> {
        self.lock_music()?.on_player_state(state);
        self.music_view()
    }

    // Metadata

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::music_state::tests::RecordingPlayer,
        storage::{MemoryStore, TIMER_STATE_KEY},
        utils::ManualClock,
    };

    const T0: i64 = 1_700_000_000_000;
    const LINK: &str = "https://youtu.be/jfKfPfyJRdk";

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, _body: &str) {
            self.sent.lock().unwrap().push(title.to_string());
        }
    }

    struct Harness {
        state: Arc<AppState>,
        kv: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        player: Arc<RecordingPlayer>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(kv: Arc<MemoryStore>) -> Harness {
        let clock = Arc::new(ManualClock::new(T0));
        let player = Arc::new(RecordingPlayer::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = Arc::new(AppState::new(
            Settings {
                port: 0,
                host: "127.0.0.1".into(),
                sync_cooldown: Duration::from_secs(5),
            },
            Backends {
                kv: kv.clone(),
                player: player.clone(),
                notifier: notifier.clone(),
                clock: clock.clone(),
            },
            Content::default(),
        ));
        Harness { state, kv, clock, player, notifier }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MemoryStore::new()))
    }

    fn stored(kv: &MemoryStore) -> Option<String> {
        kv.get(TIMER_STATE_KEY).unwrap()
    }

    #[test]
    fn nothing_is_written_before_restore() {
        let h = harness();
        h.state.start_timer(5.0).unwrap();
        h.state.tick().unwrap();
        assert_eq!(stored(&h.kv), None);

        h.state.restore().unwrap();
        assert!(stored(&h.kv).is_some());
    }

    #[test]
    fn huge_duration_leaves_timer_usable() {
        let h = harness();
        h.state.restore().unwrap();

        assert!(matches!(h.state.start_timer(1e17), Err(TimerError::InvalidDuration(_))));
        assert!(matches!(h.state.adjust_timer(-1e17), Err(TimerError::InvalidDuration(_))));
        assert!(h.state.timer_view().is_ok());
        assert_eq!(h.state.start_timer(1.0).unwrap().display, "01:00");
    }

    #[test]
    fn restore_opens_gate_even_when_engine_is_unavailable() {
        let h = harness();
        let engine = Arc::clone(&h.state.engine);
        let _ = std::thread::spawn(move || {
            let _guard = engine.lock().unwrap();
            panic!("poison the engine lock");
        })
        .join();

        assert!(!h.state.store.can_persist());
        assert!(matches!(h.state.restore(), Err(TimerError::Unavailable(_))));
        assert!(h.state.store.can_persist());
        assert_eq!(stored(&h.kv), None);
    }

    #[test]
    fn restore_resumes_running_snapshot_and_arms_ticker() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            TIMER_STATE_KEY,
            &format!(
                r#"{{"timeLeft":150,"isRunning":true,"startTime":{},"pausedTime":0,"endTimestamp":{},"timestamp":{}}}"#,
                T0 - 30_000,
                T0 + 120_000,
                T0 - 1_000
            ),
        )
        .unwrap();
        let h = harness_with(kv);
        let ticker = h.state.subscribe_ticker();

        let view = h.state.restore().unwrap().unwrap();
        assert_eq!(view.time_left_secs, 120);
        assert_eq!(view.phase, crate::state::TimerPhase::Running);
        assert!(matches!(*ticker.borrow(), TickerCommand::Armed(_)));
        assert_eq!(h.state.status_message().unwrap().text, "Timer restored");
    }

    #[test]
    fn restore_discards_expired_snapshot() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            TIMER_STATE_KEY,
            &format!(
                r#"{{"timeLeft":10,"isRunning":true,"endTimestamp":{},"timestamp":{}}}"#,
                T0 - 5_000,
                T0 - 15_000
            ),
        )
        .unwrap();
        let h = harness_with(kv);

        assert_eq!(h.state.restore().unwrap(), None);
        assert_eq!(stored(&h.kv), None);
        assert!(h.state.store.can_persist());
    }

    #[test]
    fn expiry_clears_store_and_notifies_once() {
        let h = harness();
        h.state.restore().unwrap();
        let mut events = h.state.subscribe_timer_events();

        h.state.start_timer(1.0).unwrap();
        assert!(stored(&h.kv).is_some());

        h.clock.advance(60_000);
        h.state.tick().unwrap();
        h.state.tick().unwrap();

        assert_eq!(stored(&h.kv), None);
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
        assert!(matches!(events.try_recv(), Ok(TimerEvent::Started { .. })));
        assert_eq!(events.try_recv().ok(), Some(TimerEvent::Expired));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn pause_persists_paused_snapshot() {
        let h = harness();
        h.state.restore().unwrap();
        h.state.start_timer(10.0).unwrap();
        h.clock.advance(3_000);

        let view = h.state.pause_timer().unwrap();
        assert_eq!(view.time_left_secs, 597);

        let snapshot = crate::state::TimerSnapshot::decode(&stored(&h.kv).unwrap()).unwrap();
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.time_left_secs, 597);
        assert_eq!(snapshot.paused_duration_ms, 3_000);

        h.clock.advance(10_000);
        let view = h.state.resume_timer().unwrap();
        assert_eq!(view.end_timestamp_ms, Some(h.clock.now_ms() + 597_000));
    }

    #[test]
    fn resume_without_time_notifies() {
        let h = harness();
        assert_eq!(h.state.resume_timer(), Err(TimerError::NoTimeSet));
        assert_eq!(h.notifier.sent.lock().unwrap().as_slice(), [NO_TIME_TITLE]);
    }

    #[test]
    fn reset_clears_store() {
        let h = harness();
        h.state.restore().unwrap();
        h.state.start_timer(10.0).unwrap();
        h.state.reset_timer().unwrap();
        assert_eq!(stored(&h.kv), None);
    }

    #[tokio::test]
    async fn manual_stop_blocks_expiry_sync_until_new_run() {
        let h = harness();
        h.state.select_music(LINK).unwrap();
        h.state.stop_music().unwrap();
        let issued = h.player.commands().len();

        h.state.sync_music(&TimerEvent::Expired);
        assert_eq!(h.player.commands().len(), issued);

        let view = h.state.start_timer(5.0).unwrap();
        h.state.sync_music(&TimerEvent::Started {
            time_left_secs: view.time_left_secs,
            end_timestamp_ms: view.end_timestamp_ms.unwrap(),
        });
        assert!(h.state.music_view().unwrap().sync.sync_enabled);
        assert_eq!(h.player.commands()[issued..], ["load:jfKfPfyJRdk", "play"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_reenables_after_cooldown() {
        let h = harness();
        h.state.select_music(LINK).unwrap();
        assert!(!h.state.music_view().unwrap().sync.sync_enabled);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!h.state.music_view().unwrap().sync.sync_enabled);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(h.state.music_view().unwrap().sync.sync_enabled);
    }

    #[tokio::test]
    async fn invalid_link_reports_status_without_touching_timer() {
        let h = harness();
        h.state.start_timer(5.0).unwrap();
        let before = h.state.timer_view().unwrap();

        assert!(matches!(h.state.select_music("nope"), Err(MusicError::InvalidLink(_))));
        assert_eq!(h.state.timer_view().unwrap(), before);
        assert_eq!(h.state.status_message().unwrap().kind, StatusKind::Error);
        assert!(h.player.commands().is_empty());
    }

    #[test]
    fn status_message_expires() {
        let h = harness();
        h.state.set_status("hello".into(), StatusKind::Info);
        assert!(h.state.status_message().is_some());
        h.clock.advance(STATUS_TTL_MS);
        assert!(h.state.status_message().is_none());
    }
}
