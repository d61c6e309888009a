// error.rs

use crate::task::TaskId;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Client-side validation problem. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not authenticated")]
    NotAuthenticated,

    /// Non-2xx answer from the task service; `detail` is the server's message.
    #[error("{detail}")]
    Remote { status: u16, detail: String },

    /// No response at all (DNS, refused connection, TLS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("task {0} is not loaded")]
    UnknownTask(TaskId),

    #[error("config: {0}")]
    Config(String),

    /// The desktop notification service refused or failed to show a toast.
    #[error("notification failed: {0}")]
    Notify(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors the UI shows as a login prompt instead of a failure.
    pub fn is_silent(&self) -> bool {
        matches!(self, Error::NotAuthenticated)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_displays_server_detail() {
        let e = Error::Remote {
            status: 404,
            detail: "Task with ID 9 not found".into(),
        };
        assert_eq!(e.to_string(), "Task with ID 9 not found");
    }

    #[test]
    fn validation_error_names_the_field() {
        let e: Error = ValidationError::new("title", "cannot be empty").into();
        assert_eq!(e.to_string(), "title: cannot be empty");
        assert!(!e.is_silent());
        assert!(Error::NotAuthenticated.is_silent());
    }

    #[test]
    fn notify_error_is_not_silent() {
        let e = Error::Notify("org.freedesktop.Notifications not available".into());
        assert_eq!(
            e.to_string(),
            "notification failed: org.freedesktop.Notifications not available"
        );
        assert!(!e.is_silent());
    }
}
