//! Desktop notification after a run

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;

use crate::config::APP_NAME;

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Best effort; failures are only logged.
    async fn notify(&self, title: &str, message: &str, success: bool);
}

/// Uses `notify-send` on Linux and `osascript` on macOS
pub struct DesktopNotifier;

/// Program and arguments that raise a notification on `os`
fn notification_command(
    os: &str,
    title: &str,
    message: &str,
    success: bool,
) -> Option<(&'static str, Vec<String>)> {
    match os {
        "linux" | "freebsd" | "openbsd" | "netbsd" => {
            let urgency = if success { "normal" } else { "critical" };
            Some((
                "notify-send",
                vec![
                    "-u".to_string(),
                    urgency.to_string(),
                    title.to_string(),
                    message.to_string(),
                ],
            ))
        }
        "macos" => Some((
            "osascript",
            vec![
                "-e".to_string(),
                format!(
                    "display notification {:?} with title {:?}",
                    message, title
                ),
            ],
        )),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, message: &str, success: bool) {
        let Some((program, args)) =
            notification_command(std::env::consts::OS, title, message, success)
        else {
            debug!("Desktop notification is not supported on this platform");
            return;
        };

        match Command::new(program).args(&args).output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => debug!("{} exited with {}", program, output.status),
            Err(e) => debug!("Can't run {}: {}", program, e),
        }
    }
}

/// Notifies the outcome of a run when `enabled`.
pub async fn notify_if_needed(notifier: &dyn Notifier, exit_code: i32, enabled: bool) {
    if !enabled {
        return;
    }
    if exit_code == 0 {
        notifier.notify(APP_NAME, "All update success", true).await;
    } else {
        notifier
            .notify(APP_NAME, "Some package can't update", false)
            .await;
    }
}
