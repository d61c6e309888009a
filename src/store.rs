// store.rs

use crate::task::{Task, TaskId, TaskStatus};

/// Canonical in-memory copy of the user's tasks, in arrival order.
///
/// Every view (list, sidebar counts, reminder engine) reads from one store;
/// writes go through the few methods below, always addressed by id.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Replaces the whole collection with a fresh server listing, keeping any
    /// `is_reminded = true` we already know about.
    pub fn replace_all(&mut self, incoming: Vec<Task>) {
        let reminded: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|t| t.is_reminded)
            .map(|t| t.id)
            .collect();
        self.tasks = incoming;
        for task in &mut self.tasks {
            if reminded.contains(&task.id) {
                task.is_reminded = true;
            }
        }
    }

    /// Appends a newly created task. An id we already hold is replaced in place.
    pub fn push(&mut self, task: Task) {
        if self.get(task.id).is_some() {
            self.replace(task);
        } else {
            self.tasks.push(task);
        }
    }

    /// Swaps in the authoritative copy of a task. Returns false if the id is unknown.
    pub fn replace(&mut self, mut task: Task) -> bool {
        match self.get_mut(task.id) {
            Some(slot) => {
                task.is_reminded |= slot.is_reminded;
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(pos))
    }

    /// Sets the status and hands back the previous one.
    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Option<TaskStatus> {
        let task = self.get_mut(id)?;
        Some(std::mem::replace(&mut task.status, status))
    }

    pub fn mark_reminded(&mut self, id: TaskId) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.is_reminded = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: TaskId, title: &str) -> Task {
        Task {
            id,
            user_id: None,
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: Default::default(),
            due_date: None,
            reminder_time: None,
            is_reminded: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn push_keeps_arrival_order() {
        let mut store = TaskStore::new();
        store.push(task(3, "c"));
        store.push(task(1, "a"));
        store.push(task(2, "b"));
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn replace_never_clears_reminded_flag() {
        let mut store = TaskStore::from_tasks(vec![task(1, "a")]);
        store.mark_reminded(1);
        let mut stale = task(1, "a renamed");
        stale.is_reminded = false;
        assert!(store.replace(stale));
        let t = store.get(1).unwrap();
        assert_eq!(t.title, "a renamed");
        assert!(t.is_reminded);
    }

    #[test]
    fn replace_all_keeps_known_reminded_flags() {
        let mut store = TaskStore::from_tasks(vec![task(1, "a"), task(2, "b")]);
        store.mark_reminded(2);
        store.replace_all(vec![task(2, "b"), task(4, "d")]);
        assert_eq!(store.len(), 2);
        assert!(store.get(2).unwrap().is_reminded);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn set_status_returns_previous() {
        let mut store = TaskStore::from_tasks(vec![task(1, "a")]);
        assert_eq!(
            store.set_status(1, TaskStatus::Completed),
            Some(TaskStatus::Pending)
        );
        assert_eq!(store.get(1).unwrap().status, TaskStatus::Completed);
        assert_eq!(store.set_status(42, TaskStatus::Completed), None);
    }

    #[test]
    fn remove_unknown_is_none() {
        let mut store = TaskStore::from_tasks(vec![task(1, "a")]);
        assert!(store.remove(9).is_none());
        assert_eq!(store.remove(1).map(|t| t.id), Some(1));
        assert!(store.is_empty());
    }
}
