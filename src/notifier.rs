//! Best-effort desktop notifications.
//!
//! Each successful move can pop an OS notification naming the moved file and
//! its category. Delivery is fire-and-forget: the child process result is
//! ignored and no failure ever reaches the mover. Environments without a
//! notification facility use [`NullNotifier`].

use std::process::Command;

/// Capability interface for the notification side-channel.
pub trait Notifier {
    fn notify(&self, summary: &str, body: &str);
}

/// Sends OS-level notifications via `notify-send` on Linux and `osascript`
/// on macOS. A no-op everywhere else.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, summary: &str, body: &str) {
        #[cfg(target_os = "linux")]
        {
            let _ = Command::new("notify-send")
                .arg("--app-name=downsort")
                .arg(summary)
                .arg(body)
                .spawn();
        }

        #[cfg(target_os = "macos")]
        {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                body.replace('"', "\\\""),
                summary.replace('"', "\\\"")
            );
            let _ = Command::new("osascript").arg("-e").arg(&script).spawn();
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let _ = (summary, body);
        }
    }
}

/// Notifier that does nothing. Used when notifications are disabled in the
/// config or the platform has no notification facility worth spawning.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _summary: &str, _body: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_notifier_is_silent() {
        // Nothing observable; this pins down that the call simply returns.
        NullNotifier.notify("Downloads sorted", "a.pdf → PDFs");
    }
}
