//! External capability module
//! 
//! Music player backends, YouTube link handling and user notifications.

pub mod notifier;
pub mod player;
pub mod youtube;

// Re-export main types
pub use notifier::{DesktopNotifier, LogNotifier, Notifier};
pub use player::{CommandPlayer, EmbedPlayer, MusicPlayer, PlayerState, PlayerStatus};
pub use youtube::{embed_url, extract_video_id, watch_url};
