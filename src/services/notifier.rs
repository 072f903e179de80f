//! User-facing notifications

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Fire-and-forget notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Desktop notification through `notify-send`
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

/// Send one desktop notification
pub async fn send_desktop_notification(title: &str, body: &str) -> Result<(), String> {
    let output = Command::new("notify-send")
        .args(["--app-name=focus-timer", title, body])
        .output()
        .await
        .map_err(|e| format!("Failed to execute notify-send: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("notify-send failed: {}", stderr));
    }

    debug!("Desktop notification sent: {}", title);
    Ok(())
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime for notification, dropping: {} {}", title, body);
            return;
        };

        let (title, body) = (title.to_string(), body.to_string());
        handle.spawn(async move {
            if let Err(e) = send_desktop_notification(&title, &body).await {
                warn!("{}; showing inline status only", e);
            }
        });
    }
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!("Notification: {} - {}", title, body);
    }
}
