// Shared fakes for the integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io;
use std::sync::Mutex;
use taskdeck::alarm::Sound;
use taskdeck::api::TaskApi;
use taskdeck::notify::{Notifier, Permission};
use taskdeck::task::{Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
use taskdeck::{Error, Result};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    ymd(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

pub fn task(id: TaskId, title: &str) -> Task {
    Task {
        id,
        user_id: Some("u-1".into()),
        title: title.to_string(),
        description: None,
        status: TaskStatus::Pending,
        priority: Priority::Medium,
        due_date: None,
        reminder_time: None,
        is_reminded: false,
        created_at: None,
        updated_at: None,
    }
}

/// In-memory task service. Operations named in `failing` answer with a 500.
#[derive(Default)]
pub struct FakeApi {
    pub tasks: Mutex<Vec<Task>>,
    pub calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: Mutex<TaskId>,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        Self {
            tasks: Mutex::new(tasks),
            next_id: Mutex::new(next),
            ..Self::default()
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.split(' ').next() == Some(op)).count()
    }

    fn enter(&self, op: &'static str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(op) {
            return Err(Error::Remote {
                status: 500,
                detail: format!("{op} unavailable"),
            });
        }
        Ok(())
    }

    fn edit<F: FnOnce(&mut Task)>(&self, id: TaskId, f: F) -> Result<Task> {
        let mut tasks = self.tasks.lock().unwrap();
        let t = tasks.iter_mut().find(|t| t.id == id).ok_or(Error::Remote {
            status: 404,
            detail: "Task not found".into(),
        })?;
        f(t);
        Ok(t.clone())
    }
}

impl TaskApi for FakeApi {
    fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        self.enter("list", "list".into())?;
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks
            .iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect())
    }

    fn get(&self, id: TaskId) -> Result<Task> {
        self.enter("get", format!("get {id}"))?;
        self.edit(id, |_| {})
    }

    fn create(&self, draft: &TaskDraft) -> Result<Task> {
        self.enter("create", format!("create {}", draft.title))?;
        let mut next = self.next_id.lock().unwrap();
        let id = (*next).max(1);
        *next = id + 1;
        let t = Task {
            description: draft.description.clone(),
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            reminder_time: draft.reminder_time,
            ..task(id, &draft.title)
        };
        self.tasks.lock().unwrap().push(t.clone());
        Ok(t)
    }

    fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        self.enter("update", format!("update {id}"))?;
        self.edit(id, |t| {
            if let Some(ref title) = patch.title {
                t.title = title.clone();
            }
            if let Some(ref d) = patch.description {
                t.description = d.clone();
            }
            if let Some(s) = patch.status {
                t.status = s;
            }
            if let Some(p) = patch.priority {
                t.priority = p;
            }
            if let Some(d) = patch.due_date {
                t.due_date = d;
            }
            if let Some(r) = patch.reminder_time {
                t.reminder_time = r;
                t.is_reminded = false;
            }
        })
    }

    fn delete(&self, id: TaskId) -> Result<()> {
        self.enter("delete", format!("delete {id}"))?;
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(Error::Remote {
                status: 404,
                detail: "Task not found".into(),
            });
        }
        Ok(())
    }

    fn complete(&self, id: TaskId) -> Result<Task> {
        self.enter("complete", format!("complete {id}"))?;
        self.edit(id, |t| t.status = TaskStatus::Completed)
    }

    fn mark_reminded(&self, id: TaskId) -> Result<Task> {
        self.enter("reminded", format!("reminded {id}"))?;
        self.edit(id, |t| t.is_reminded = true)
    }
}

pub struct FakeNotifier {
    pub answer: Permission,
    pub broken: bool,
    pub requests: u32,
    pub shown: Vec<(String, String)>,
}

impl FakeNotifier {
    pub fn new(answer: Permission) -> Self {
        Self {
            answer,
            broken: false,
            requests: 0,
            shown: Vec::new(),
        }
    }
}

impl Notifier for FakeNotifier {
    fn request_permission(&mut self) -> Permission {
        self.requests += 1;
        self.answer
    }

    fn notify(&mut self, title: &str, body: &str) -> Result<()> {
        if self.broken {
            return Err(Error::Notify("service went away".into()));
        }
        self.shown.push((title.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSound {
    pub broken: bool,
    pub starts: u32,
    pub stops: u32,
    pub beeps: u32,
}

impl Sound for FakeSound {
    fn start(&mut self) -> io::Result<()> {
        if self.broken {
            return Err(io::Error::other("no audio device"));
        }
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }

    fn beep(&mut self) {
        self.beeps += 1;
    }
}
