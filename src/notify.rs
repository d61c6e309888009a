// notify.rs

use crate::error::{Error, Result};
use tracing::{debug, warn};

#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::{Notification, Timeout};

#[cfg(target_os = "windows")]
use notifica::notify;

#[cfg(target_os = "macos")]
use mac_notification_sys::send_notification;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Unsupported,
}

/// System notification channel.
pub trait Notifier {
    /// Probes whether notifications can be shown. Callers cache the answer.
    fn request_permission(&mut self) -> Permission;
    fn notify(&mut self, title: &str, body: &str) -> Result<()>;
}

pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&mut self) -> Permission {
        if !self.enabled {
            debug!("desktop notifications disabled in config");
            return Permission::Denied;
        }
        platform_permission()
    }

    fn notify(&mut self, title: &str, body: &str) -> Result<()> {
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            Notification::new()
                .appname("taskdeck")
                .summary(title)
                .body(body)
                .timeout(Timeout::Never)
                .show()
                .map(|_| ())
                .map_err(|e| Error::Notify(e.to_string()))
        }
        #[cfg(target_os = "windows")]
        {
            notify(title, body)
                .map(|_| ())
                .map_err(|e| Error::Notify(format!("{:?}", e)))
        }
        #[cfg(target_os = "macos")]
        {
            send_notification(title, None, body, None)
                .map(|_| ())
                .map_err(|e| Error::Notify(e.to_string()))
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (title, body);
            Err(Error::Notify("not supported on this platform".to_string()))
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_permission() -> Permission {
    match notify_rust::get_server_information() {
        Ok(info) => {
            debug!(server = %info.name, "notification server found");
            Permission::Granted
        }
        Err(e) => {
            warn!(error = %e, "no notification server");
            Permission::Unsupported
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn platform_permission() -> Permission {
    Permission::Granted
}

#[cfg(not(any(unix, windows)))]
fn platform_permission() -> Permission {
    Permission::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_notifier_reports_denied() {
        assert_eq!(DesktopNotifier::new(false).request_permission(), Permission::Denied);
    }
}
