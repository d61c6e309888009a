// api.rs

use crate::error::{Error, Result};
use crate::task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Identity handed out by the external auth provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

pub trait SessionProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is logged in.
    fn current(&self) -> Option<Session>;
}

/// The remote task service. Every call is attempted exactly once.
pub trait TaskApi: Send + Sync {
    fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>>;
    fn get(&self, id: TaskId) -> Result<Task>;
    fn create(&self, draft: &TaskDraft) -> Result<Task>;
    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task>;
    fn delete(&self, id: TaskId) -> Result<()>;
    fn complete(&self, id: TaskId) -> Result<Task>;
    fn mark_reminded(&self, id: TaskId) -> Result<Task>;
}

pub struct HttpTaskApi {
    base_url: String,
    client: Client,
    sessions: Arc<dyn SessionProvider>,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>, sessions: Arc<dyn SessionProvider>) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(Error::Config("task service URL is empty".into()));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
            sessions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn execute(&self, method: Method, tail: &str, body: Option<Value>) -> Result<String> {
        let session = self.sessions.current().ok_or(Error::NotAuthenticated)?;
        let url = endpoint(&self.base_url, &session.user_id, tail);
        let auth = format!("Bearer {}", session.token);
        log_http_request(method.as_str(), &url, &auth, body.as_ref());

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, auth.as_str())
            .header(ACCEPT, "application/json");
        if let Some(ref b) = body {
            request = request.json(b);
        }
        let resp = request
            .send()
            .map_err(|e| Error::Transport(format!("{} {} failed: {}", method, url, e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| Error::Transport(format!("read {} failed: {}", url, e)))?;
        log_http_response(status.as_u16(), &text);
        if !status.is_success() {
            return Err(remote_error(status.as_u16(), &text));
        }
        Ok(text)
    }

    fn call<T: DeserializeOwned>(&self, method: Method, tail: &str, body: Option<Value>) -> Result<T> {
        let text = self.execute(method, tail, body)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl TaskApi for HttpTaskApi {
    fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let tail = match status {
            Some(s) => format!("?status_filter={}", s),
            None => String::new(),
        };
        self.call(Method::GET, &tail, None)
    }

    fn get(&self, id: TaskId) -> Result<Task> {
        self.call(Method::GET, &format!("/{}", id), None)
    }

    fn create(&self, draft: &TaskDraft) -> Result<Task> {
        self.call(Method::POST, "", Some(serde_json::to_value(draft)?))
    }

    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        self.call(Method::PUT, &format!("/{}", id), Some(serde_json::to_value(patch)?))
    }

    fn delete(&self, id: TaskId) -> Result<()> {
        self.execute(Method::DELETE, &format!("/{}", id), None)?;
        Ok(())
    }

    fn complete(&self, id: TaskId) -> Result<Task> {
        self.call(Method::PATCH, &format!("/{}/complete", id), None)
    }

    fn mark_reminded(&self, id: TaskId) -> Result<Task> {
        self.call(Method::PATCH, &format!("/{}/reminded", id), None)
    }
}

/// `{base}/api/{user}/tasks{tail}`
pub fn endpoint(base_url: &str, user_id: &str, tail: &str) -> String {
    format!("{}/api/{}/tasks{}", base_url.trim_end_matches('/'), user_id, tail)
}

/// Maps a non-2xx body to `Error::Remote`, preferring the service's `detail`.
pub fn remote_error(status: u16, body: &str) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| format!("HTTP {}", status));
    Error::Remote { status, detail }
}

fn log_http_request(method: &str, url: &str, auth: &str, body: Option<&Value>) {
    debug!(
        method,
        url,
        authorization = %mask_bearer(auth),
        body = %body.map(|b| truncate(&b.to_string(), 4000)).unwrap_or_default(),
        "http out"
    );
}

fn log_http_response(status: u16, body: &str) {
    debug!(status, body = %truncate(body, 4000), "http in");
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
        None => s.to_string(),
    }
}

fn mask_bearer(v: &str) -> String {
    if let Some(token) = v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")) {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= 10 {
            return "Bearer *****".to_string();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("Bearer {}…{}", head, tail)
    } else {
        "*****".to_string()
    }
}
