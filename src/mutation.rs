// mutation.rs
//
// Create/update/delete wait for the server before touching the store.
// Toggle-complete flips the store first and rolls back if the call fails.
// Concurrent toggles on one task are not serialized: whichever outcome
// settles last decides the final status.

use crate::api::TaskApi;
use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, info, warn};

/// An optimistic flip already applied to the store, awaiting the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingToggle {
    pub id: TaskId,
    pub previous: TaskStatus,
    pub target: TaskStatus,
}

/// A toggle whose remote call has finished, ready to settle into the store.
#[derive(Debug)]
pub struct ToggleOutcome {
    pub pending: PendingToggle,
    pub result: Result<Task>,
}

/// Applies the optimistic image of a toggle.
pub fn begin_toggle(store: &mut TaskStore, id: TaskId) -> Result<PendingToggle> {
    let previous = store.get(id).map(|t| t.status).ok_or(Error::UnknownTask(id))?;
    let target = previous.toggled();
    store.set_status(id, target);
    debug!(id, from = %previous, to = %target, "optimistic toggle applied");
    Ok(PendingToggle { id, previous, target })
}

/// The remote half of a toggle: `complete` when finishing, a status update when reopening.
pub fn send_toggle<A: TaskApi + ?Sized>(api: &A, pending: PendingToggle) -> ToggleOutcome {
    let result = match pending.target {
        TaskStatus::Completed => api.complete(pending.id),
        TaskStatus::Pending => api.update(pending.id, &TaskPatch::status(TaskStatus::Pending)),
    };
    ToggleOutcome { pending, result }
}

/// Commits the server copy, or restores the pre-toggle status on failure.
pub fn settle_toggle(store: &mut TaskStore, outcome: ToggleOutcome) -> Result<Task> {
    let ToggleOutcome { pending, result } = outcome;
    match result {
        Ok(task) => {
            store.replace(task.clone());
            Ok(task)
        }
        Err(e) => {
            store.set_status(pending.id, pending.previous);
            warn!(id = pending.id, error = %e, "toggle failed, rolled back to {}", pending.previous);
            Err(e)
        }
    }
}

pub struct Mutations<A> {
    api: Arc<A>,
    outcomes_tx: Sender<ToggleOutcome>,
    outcomes_rx: Receiver<ToggleOutcome>,
    in_flight: usize,
}

impl<A: TaskApi + 'static> Mutations<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::channel();
        Self {
            api,
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Background toggles whose outcome has not been drained yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Loads the full listing into the store.
    pub fn refresh(&self, store: &mut TaskStore) -> Result<usize> {
        let tasks = self.api.list(None)?;
        let n = tasks.len();
        store.replace_all(tasks);
        debug!(count = n, "tasks refreshed");
        Ok(n)
    }

    pub fn create(&self, store: &mut TaskStore, draft: TaskDraft) -> Result<Task> {
        let draft = draft.validated()?;
        let task = self.api.create(&draft)?;
        info!(id = task.id, "task created");
        store.push(task.clone());
        Ok(task)
    }

    pub fn update(&self, store: &mut TaskStore, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validated()?;
        if store.get(id).is_none() {
            return Err(Error::UnknownTask(id));
        }
        let task = self.api.update(id, &patch)?;
        store.replace(task.clone());
        info!(id, "task updated");
        Ok(task)
    }

    pub fn delete(&self, store: &mut TaskStore, id: TaskId) -> Result<()> {
        if store.get(id).is_none() {
            return Err(Error::UnknownTask(id));
        }
        self.api.delete(id)?;
        store.remove(id);
        info!(id, "task deleted");
        Ok(())
    }

    /// Optimistic toggle, resolved before returning.
    pub fn toggle_complete(&self, store: &mut TaskStore, id: TaskId) -> Result<Task> {
        let pending = begin_toggle(store, id)?;
        let outcome = send_toggle(self.api.as_ref(), pending);
        settle_toggle(store, outcome)
    }

    /// Optimistic toggle whose remote call runs on a worker thread.
    /// The result lands in the store on a later [`Mutations::drain`].
    pub fn toggle_in_background(&mut self, store: &mut TaskStore, id: TaskId) -> Result<PendingToggle> {
        let pending = begin_toggle(store, id)?;
        let api = Arc::clone(&self.api);
        let tx = self.outcomes_tx.clone();
        thread::spawn(move || {
            let outcome = send_toggle(api.as_ref(), pending);
            let _ = tx.send(outcome);
        });
        self.in_flight += 1;
        Ok(pending)
    }

    /// Settles every finished background toggle, in completion order.
    pub fn drain(&mut self, store: &mut TaskStore) -> Vec<Result<Task>> {
        let mut settled = Vec::new();
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            settled.push(settle_toggle(store, outcome));
        }
        settled
    }
}
