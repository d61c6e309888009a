// reminder.rs
//
// Scans the store for reminders whose time has come and drives the alarm:
// desktop notification, sound (beep fallback), persistent alert, then
// `mark reminded` on the server.
//
// The fired set lives only as long as the engine. A reminder that fired but
// whose `mark reminded` call failed can fire again after a restart.

use crate::alarm::{Alarm, AlarmSettings, Sound};
use crate::api::TaskApi;
use crate::notify::{Notifier, Permission};
use crate::store::TaskStore;
use crate::task::{Task, TaskId};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReminderState {
    /// No reminder, already reminded, completed, or not yet time.
    Idle,
    Due,
    /// Alarm raised, `mark reminded` not answered yet.
    Firing,
    Acknowledged,
    /// `mark reminded` failed; not retried this session.
    FireFailed,
}

/// A reminder banner that stays until the user dismisses it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub task_id: TaskId,
    pub title: String,
    pub reminder_time: Option<NaiveDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReminderSettings {
    pub scan_interval: Duration,
    pub alarm: AlarmSettings,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(15),
            alarm: AlarmSettings::default(),
        }
    }
}

pub struct ReminderEngine<N, S> {
    notifier: N,
    permission: Option<Permission>,
    alarm: Alarm<S>,
    fired: HashMap<TaskId, ReminderState>,
    alerts: Vec<Alert>,
    scan_interval: Duration,
    last_scan: Option<Instant>,
}

impl<N: Notifier, S: Sound> ReminderEngine<N, S> {
    pub fn new(notifier: N, sound: S, settings: ReminderSettings) -> Self {
        Self {
            notifier,
            permission: None,
            alarm: Alarm::new(sound, settings.alarm),
            fired: HashMap::new(),
            alerts: Vec::new(),
            scan_interval: settings.scan_interval,
            last_scan: None,
        }
    }

    /// Notification permission, asked for on first use and then cached.
    pub fn permission(&mut self) -> Permission {
        match self.permission {
            Some(p) => p,
            None => {
                let p = self.notifier.request_permission();
                info!(permission = ?p, "notification permission resolved");
                self.permission = Some(p);
                p
            }
        }
    }

    pub fn is_due(&self, task: &Task, now: NaiveDateTime) -> bool {
        task.is_pending()
            && !task.is_reminded
            && task.reminder_time.is_some_and(|at| at <= now)
            && !self.fired.contains_key(&task.id)
    }

    pub fn state_of(&self, task: &Task, now: NaiveDateTime) -> ReminderState {
        if let Some(state) = self.fired.get(&task.id) {
            return *state;
        }
        if self.is_due(task, now) {
            ReminderState::Due
        } else {
            ReminderState::Idle
        }
    }

    /// Fires every newly due reminder, in store order. Returns the fired ids.
    pub fn scan(&mut self, store: &TaskStore, now: NaiveDateTime, instant: Instant) -> Vec<TaskId> {
        let due: Vec<Task> = store
            .tasks()
            .iter()
            .filter(|t| self.is_due(t, now))
            .cloned()
            .collect();
        for task in &due {
            self.fire(task, instant);
        }
        due.iter().map(|t| t.id).collect()
    }

    fn fire(&mut self, task: &Task, instant: Instant) {
        // recorded first so a slow channel below cannot cause a second firing
        self.fired.insert(task.id, ReminderState::Firing);
        info!(id = task.id, title = %task.title, "reminder due");

        if self.permission() == Permission::Granted {
            let body = format!("Time to: {}", task.title);
            if let Err(e) = self.notifier.notify("⏰ Reminder!", &body) {
                warn!(id = task.id, error = %e, "desktop notification failed");
            }
        }

        self.alarm.ring(instant);

        self.alerts.retain(|a| a.task_id != task.id);
        self.alerts.push(Alert {
            task_id: task.id,
            title: task.title.clone(),
            reminder_time: task.reminder_time,
        });
    }

    /// Reports a fired reminder to the server. Failures are logged, never retried.
    pub fn acknowledge<A: TaskApi + ?Sized>(
        &mut self,
        store: &mut TaskStore,
        api: &A,
        id: TaskId,
    ) -> ReminderState {
        let state = match api.mark_reminded(id) {
            Ok(task) => {
                store.replace(task);
                store.mark_reminded(id);
                info!(id, "task marked as reminded");
                ReminderState::Acknowledged
            }
            Err(e) => {
                warn!(id, error = %e, "failed to mark task as reminded");
                ReminderState::FireFailed
            }
        };
        self.fired.insert(id, state);
        state
    }

    /// One full scan followed by acknowledgement of what fired.
    pub fn tick<A: TaskApi + ?Sized>(
        &mut self,
        store: &mut TaskStore,
        api: &A,
        now: NaiveDateTime,
        instant: Instant,
    ) -> Vec<TaskId> {
        self.last_scan = Some(instant);
        let fired = self.scan(store, now, instant);
        for id in &fired {
            self.acknowledge(store, api, *id);
        }
        fired
    }

    /// Called on every UI loop iteration: scans when the interval has elapsed
    /// (immediately the first time) and advances the alarm.
    pub fn poll<A: TaskApi + ?Sized>(
        &mut self,
        store: &mut TaskStore,
        api: &A,
        now: NaiveDateTime,
        instant: Instant,
    ) -> Vec<TaskId> {
        let scan_due = self
            .last_scan
            .is_none_or(|last| instant.saturating_duration_since(last) >= self.scan_interval);
        let fired = if scan_due {
            self.tick(store, api, now, instant)
        } else {
            Vec::new()
        };
        self.alarm.tick(instant);
        fired
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Removes the alert and silences the alarm.
    pub fn dismiss(&mut self, id: TaskId) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.task_id != id);
        self.alarm.stop();
        self.alerts.len() != before
    }

    pub fn dismiss_all(&mut self) {
        self.alerts.clear();
        self.alarm.stop();
    }

    pub fn alarm(&self) -> &Alarm<S> {
        &self.alarm
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
