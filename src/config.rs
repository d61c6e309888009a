// config.rs

use crate::alarm::AlarmSettings;
use crate::api::{Session, SessionProvider};
use crate::error::{Error, Result};
use crate::reminder::ReminderSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const ENV_API_URL: &str = "TASKDECK_API_URL";
pub const ENV_CONFIG_DIR: &str = "TASKDECK_CONFIG_DIR";
pub const ENV_USER_ID: &str = "TASKDECK_USER_ID";
pub const ENV_TOKEN: &str = "TASKDECK_TOKEN";

const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "taskdeck")
}

/// Where `config.json` and `session.json` live.
pub fn config_dir() -> PathBuf {
    let dir = std::env::var_os(ENV_CONFIG_DIR)
        .map(PathBuf::from)
        .or_else(|| project_dirs().map(|p| p.config_dir().to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    ensure_dir(&dir);
    dir
}

/// Where the log file goes.
pub fn data_dir() -> PathBuf {
    let dir = project_dirs()
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(config_dir);
    ensure_dir(&dir);
    dir
}

/// Creates `dir` if needed. A failure is logged; the later open reports it to the user.
fn ensure_dir(dir: &Path) -> bool {
    match fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not create directory");
            false
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub notifications: bool,
    /// Player invocation for the alarm sound, e.g. `["paplay", "/usr/share/sounds/alarm.oga"]`.
    pub alarm_command: Option<Vec<String>>,
    pub scan_interval_secs: u64,
    pub refresh_interval_secs: u64,
    pub alarm_timeout_secs: u64,
    pub beep_count: u32,
    pub beep_gap_millis: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            notifications: true,
            alarm_command: None,
            scan_interval_secs: 15,
            refresh_interval_secs: 60,
            alarm_timeout_secs: 30,
            beep_count: 20,
            beep_gap_millis: 500,
        }
    }
}

impl ClientConfig {
    /// Reads `config.json` from `dir` (defaults if absent) and applies env overrides.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut cfg = Self::load_file(dir)?;
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                cfg.server_url = url.trim().to_string();
            }
        }
        Ok(cfg)
    }

    pub fn load_file(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        match File::open(&path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let file = File::create(dir.join(CONFIG_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        ReminderSettings {
            scan_interval: Duration::from_secs(self.scan_interval_secs.max(1)),
            alarm: AlarmSettings {
                timeout: Duration::from_secs(self.alarm_timeout_secs),
                beep_count: self.beep_count,
                beep_gap: Duration::from_millis(self.beep_gap_millis),
            },
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Session persisted by the login flow. `TASKDECK_USER_ID` + `TASKDECK_TOKEN`
/// win over the file when both are set.
pub struct FileSession {
    path: PathBuf,
    env: Option<Session>,
}

impl FileSession {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
            env: session_from(std::env::var(ENV_USER_ID).ok(), std::env::var(ENV_TOKEN).ok()),
        }
    }

    /// Ignores the environment; only the file counts.
    pub fn file_only(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
            env: None,
        }
    }

    pub fn login(&self, session: &Session) -> Result<()> {
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), session)?;
        debug!(user = %session.user_id, "session saved");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> Option<Session> {
        let file = File::open(&self.path).ok()?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable session file");
                None
            }
        }
    }
}

impl SessionProvider for FileSession {
    fn current(&self) -> Option<Session> {
        self.env.clone().or_else(|| self.load())
    }
}

fn session_from(user_id: Option<String>, token: Option<String>) -> Option<Session> {
    match (user_id, token) {
        (Some(u), Some(t)) if !u.trim().is_empty() && !t.trim().is_empty() => Some(Session {
            user_id: u.trim().to_string(),
            token: t.trim().to_string(),
        }),
        _ => None,
    }
}
