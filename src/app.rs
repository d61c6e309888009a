// app.rs
use crate::alarm::{CommandSound, Sound};
use crate::api::{HttpTaskApi, Session, SessionProvider, TaskApi};
use crate::config::FileSession;
use crate::dates::{parse_due_date, parse_reminder_time};
use crate::error::{Error, ValidationError};
use crate::filter::{self, Filter, FilterCounts};
use crate::mutation::Mutations;
use crate::notify::{DesktopNotifier, Notifier, Permission};
use crate::reminder::{Alert, ReminderEngine};
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskDraft, TaskId, TaskPatch};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const MESSAGE_TTL: Duration = Duration::from_secs(5);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoginStep {
    UserId,
    Token,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    EditingTitle,
    EditingDescription,
    EditingDueDate,
    EditingReminder,
    Searching,
    Login,
}

/// Transient status line; errors render in red. Cleared after a few seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

/// The add/edit form, kept as raw text until submit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub editing: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub due: String,
    pub reminder: String,
    pub priority: Priority,
}

pub fn format_due(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_reminder(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

impl TaskForm {
    pub fn for_task(task: &Task) -> Self {
        Self {
            editing: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due: task.due_date.map(format_due).unwrap_or_default(),
            reminder: task.reminder_time.map(format_reminder).unwrap_or_default(),
            priority: task.priority,
        }
    }

    fn due_date(&self, now: NaiveDateTime) -> Result<Option<NaiveDate>, ValidationError> {
        if self.due.trim().is_empty() {
            return Ok(None);
        }
        parse_due_date(&self.due, now)
            .map(Some)
            .map_err(|e| ValidationError::new("due_date", e))
    }

    fn reminder_time(&self, now: NaiveDateTime) -> Result<Option<NaiveDateTime>, ValidationError> {
        if self.reminder.trim().is_empty() {
            return Ok(None);
        }
        parse_reminder_time(&self.reminder, now)
            .map(Some)
            .map_err(|e| ValidationError::new("reminder_time", e))
    }

    pub fn to_draft(&self, now: NaiveDateTime) -> Result<TaskDraft, ValidationError> {
        let mut draft = TaskDraft::new(self.title.clone()).priority(self.priority);
        if !self.description.trim().is_empty() {
            draft = draft.description(self.description.clone());
        }
        if let Some(d) = self.due_date(now)? {
            draft = draft.due_date(d);
        }
        if let Some(at) = self.reminder_time(now)? {
            draft = draft.reminder_time(at);
        }
        draft.validated()
    }

    /// Only fields that differ from `original` go into the patch. Unchanged
    /// date text is not re-parsed, so a past due date can be kept while editing.
    pub fn to_patch(&self, original: &Task, now: NaiveDateTime) -> Result<TaskPatch, ValidationError> {
        let before = TaskForm::for_task(original);
        let mut patch = TaskPatch::default();
        if self.title.trim() != before.title.trim() {
            patch.title = Some(self.title.clone());
        }
        if self.description.trim() != before.description.trim() {
            patch.description = Some(Some(self.description.clone()).filter(|d| !d.trim().is_empty()));
        }
        if self.priority != before.priority {
            patch.priority = Some(self.priority);
        }
        if self.due.trim() != before.due {
            patch.due_date = Some(self.due_date(now)?);
        }
        if self.reminder.trim() != before.reminder {
            patch.reminder_time = Some(self.reminder_time(now)?);
        }
        patch.validated()
    }
}

pub struct App<A = HttpTaskApi, N = DesktopNotifier, S = CommandSound> {
    pub store: TaskStore,
    pub filter: Filter,
    pub search_query: String,
    pub selected: usize,
    pub input_mode: InputMode,
    pub form: TaskForm,
    pub input_login: String,
    pub login_step: Option<LoginStep>,
    pub message: Option<Message>,
    pending_user_id: String,
    mutations: Mutations<A>,
    engine: ReminderEngine<N, S>,
    sessions: Arc<FileSession>,
    refresh_every: Duration,
    last_refresh: Option<Instant>,
}

impl<A: TaskApi + 'static, N: Notifier, S: Sound> App<A, N, S> {
    pub fn new(
        mutations: Mutations<A>,
        engine: ReminderEngine<N, S>,
        sessions: Arc<FileSession>,
        refresh_every: Duration,
    ) -> Self {
        Self {
            store: TaskStore::new(),
            filter: Filter::default(),
            search_query: String::new(),
            selected: 0,
            input_mode: InputMode::Normal,
            form: TaskForm::default(),
            input_login: String::new(),
            login_step: None,
            message: None,
            pending_user_id: String::new(),
            mutations,
            engine,
            sessions,
            refresh_every,
            last_refresh: None,
        }
    }

    pub fn engine(&self) -> &ReminderEngine<N, S> {
        &self.engine
    }

    pub fn in_flight(&self) -> usize {
        self.mutations.in_flight()
    }

    pub fn visible(&self) -> Vec<&Task> {
        filter::project(self.store.tasks(), self.filter, &self.search_query, filter::local_today())
    }

    pub fn counts(&self) -> FilterCounts {
        filter::counts(self.store.tasks(), filter::local_today())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.visible().get(self.selected).copied()
    }

    pub fn alerts(&self) -> &[Alert] {
        self.engine.alerts()
    }

    fn info<T: Into<String>>(&mut self, text: T) {
        self.message = Some(Message {
            text: text.into(),
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    fn report(&mut self, err: Error) {
        if err.is_silent() {
            self.info("Not logged in. Press 'L' to log in.");
            return;
        }
        self.message = Some(Message {
            text: err.to_string(),
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    pub fn clamp_selection(&mut self) {
        let n = self.visible().len();
        if self.selected >= n {
            self.selected = n.saturating_sub(1);
        }
    }

    /// Resolves notification permission once and tells the user the outcome.
    pub fn init_notifications(&mut self) {
        match self.engine.permission() {
            Permission::Granted => self.info("🔔 Reminder notifications enabled!"),
            Permission::Denied => self.info("Desktop notifications are off; alarms still ring."),
            Permission::Unsupported => self.info("No notification service found; alarms still ring."),
        }
    }

    pub fn refresh(&mut self) {
        self.last_refresh = Some(Instant::now());
        match self.mutations.refresh(&mut self.store) {
            Ok(n) => debug!(count = n, "refreshed"),
            Err(e) => self.report(e),
        }
        self.clamp_selection();
    }

    /// One pass of background work: settle toggles, periodic refresh, reminders.
    pub fn tick(&mut self, now: NaiveDateTime, instant: Instant) {
        for settled in self.mutations.drain(&mut self.store) {
            match settled {
                Ok(task) if task.is_completed() => self.info("Task completed!"),
                Ok(_) => self.info("Task reopened"),
                Err(e) => self.report(e),
            }
        }

        let refresh_due = self
            .last_refresh
            .is_none_or(|last| instant.saturating_duration_since(last) >= self.refresh_every);
        if refresh_due && self.mutations.in_flight() == 0 {
            self.last_refresh = Some(instant);
            if let Err(e) = self.mutations.refresh(&mut self.store) {
                if !e.is_silent() {
                    self.report(e);
                }
            }
        }

        let fired = self.engine.poll(&mut self.store, self.mutations.api(), now, instant);
        if !fired.is_empty() {
            debug!(?fired, "reminders fired");
        }

        if self
            .message
            .as_ref()
            .is_some_and(|m| instant.saturating_duration_since(m.shown_at) >= MESSAGE_TTL)
        {
            self.message = None;
        }
        self.clamp_selection();
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.selected = 0;
    }

    pub fn begin_add(&mut self) {
        self.form = TaskForm::default();
        self.input_mode = InputMode::EditingTitle;
        self.message = None;
    }

    pub fn begin_edit_selected(&mut self) {
        if let Some(task) = self.selected_task() {
            self.form = TaskForm::for_task(task);
            self.input_mode = InputMode::EditingTitle;
            self.message = None;
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.form = TaskForm::default();
        self.login_step = None;
        self.input_login.clear();
    }

    /// Moves the form to its next field; submits after the reminder field.
    pub fn advance_form(&mut self, now: NaiveDateTime) {
        self.input_mode = match self.input_mode {
            InputMode::EditingTitle => InputMode::EditingDescription,
            InputMode::EditingDescription => InputMode::EditingDueDate,
            InputMode::EditingDueDate => InputMode::EditingReminder,
            InputMode::EditingReminder => {
                if self.submit_form(now) {
                    InputMode::Normal
                } else {
                    return;
                }
            }
            other => other,
        };
    }

    /// Returns true when the form was accepted by the server.
    pub fn submit_form(&mut self, now: NaiveDateTime) -> bool {
        let result = match self.form.editing {
            None => self
                .form
                .to_draft(now)
                .map_err(Error::from)
                .and_then(|draft| self.mutations.create(&mut self.store, draft)),
            Some(id) => {
                let Some(original) = self.store.get(id).cloned() else {
                    self.report(Error::UnknownTask(id));
                    return false;
                };
                match self.form.to_patch(&original, now) {
                    Ok(patch) if patch.is_empty() => {
                        self.info("Nothing changed");
                        self.form = TaskForm::default();
                        return true;
                    }
                    Ok(patch) => self.mutations.update(&mut self.store, id, patch),
                    Err(e) => Err(e.into()),
                }
            }
        };
        match result {
            Ok(task) => {
                let verb = if self.form.editing.is_some() { "updated" } else { "created" };
                self.info(format!("Task {}!", verb));
                self.form = TaskForm::default();
                if let Some(pos) = self.visible().iter().position(|t| t.id == task.id) {
                    self.selected = pos;
                }
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    pub fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        if let Err(e) = self.mutations.toggle_in_background(&mut self.store, id) {
            self.report(e);
        }
        self.clamp_selection();
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        match self.mutations.delete(&mut self.store, id) {
            Ok(()) => self.info("Task deleted"),
            Err(e) => self.report(e),
        }
        self.clamp_selection();
    }

    /// Dismisses the oldest alert and silences the alarm.
    pub fn dismiss_alert(&mut self) -> bool {
        match self.engine.alerts().first().map(|a| a.task_id) {
            Some(id) => self.engine.dismiss(id),
            None => false,
        }
    }

    pub fn start_login(&mut self) {
        self.login_step = Some(LoginStep::UserId);
        self.input_login = self
            .sessions
            .current()
            .map(|s| s.user_id)
            .unwrap_or_default();
        self.input_mode = InputMode::Login;
        self.message = None;
    }

    pub fn submit_login(&mut self) {
        let Some(step) = self.login_step else {
            return;
        };
        match step {
            LoginStep::UserId => {
                self.pending_user_id = self.input_login.trim().to_string();
                self.input_login.clear();
                self.login_step = Some(LoginStep::Token);
            }
            LoginStep::Token => {
                let session = Session {
                    user_id: std::mem::take(&mut self.pending_user_id),
                    token: self.input_login.trim().to_string(),
                };
                self.input_login.clear();
                self.login_step = None;
                self.input_mode = InputMode::Normal;
                if session.user_id.is_empty() || session.token.is_empty() {
                    self.report(ValidationError::new("login", "user id and token are required").into());
                    return;
                }
                match self.sessions.login(&session) {
                    Ok(()) => {
                        self.refresh();
                        if !self.message.as_ref().is_some_and(|m| m.is_error) {
                            self.info(format!("Logged in as {}", session.user_id));
                        }
                    }
                    Err(e) => self.report(e),
                }
            }
        }
    }

    pub fn logout(&mut self) {
        match self.sessions.logout() {
            Ok(()) => {
                self.store = TaskStore::new();
                self.engine.dismiss_all();
                self.selected = 0;
                self.info("Logged out");
            }
            Err(e) => self.report(e),
        }
    }
}

/// Builds the production app from config.
pub fn build_app(
    cfg: &crate::config::ClientConfig,
    sessions: Arc<FileSession>,
) -> crate::error::Result<App> {
    let api = HttpTaskApi::new(cfg.server_url.clone(), sessions.clone())?;
    let engine = ReminderEngine::new(
        DesktopNotifier::new(cfg.notifications),
        CommandSound::new(cfg.alarm_command.clone()),
        cfg.reminder_settings(),
    );
    Ok(App::new(
        Mutations::new(Arc::new(api)),
        engine,
        sessions,
        cfg.refresh_interval(),
    ))
}

/// Local wall clock as the engine and form parser expect it.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
