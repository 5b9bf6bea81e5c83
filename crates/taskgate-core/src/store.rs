use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{decode_tasks, encode_tasks};
use crate::form::{TaskForm, ValidationError};
use crate::storage::{Storage, TASKS_KEY};
use crate::task::{Task, TaskStatus};
use crate::view::{Stats, stats};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("task not found: {0}")]
    NotFound(i64),

    #[error("no task id left after {0}")]
    IdsExhausted(i64),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Immutable view of the collection after a change.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tasks: Arc<[Task]>,
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Created(i64),
    Updated(i64),
    StatusChanged(i64, TaskStatus),
    Deleted(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Change, &Snapshot)>;

/// Owns the task collection and mediates every mutation.
///
/// Each mutation is applied to a copy, the copy is written back as a whole,
/// and only then does it replace the in-memory collection and notify
/// subscribers. A failed write leaves the store untouched.
pub struct TaskStore<S> {
    storage: S,
    tasks: Arc<[Task]>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S: Storage> TaskStore<S> {
    /// Reads the collection from storage. A missing or undecodable payload
    /// starts an empty collection.
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: S) -> anyhow::Result<Self> {
        let tasks = match storage.get(TASKS_KEY)? {
            None => {
                debug!("no stored tasks; starting empty");
                Vec::new()
            }
            Some(raw) => match decode_tasks(&raw) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "discarding unreadable task collection");
                    Vec::new()
                }
            },
        };

        info!(count = tasks.len(), "loaded tasks");
        Ok(Self {
            storage,
            tasks: tasks.into(),
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: Arc::clone(&self.tasks),
            stats: stats(&self.tasks),
        }
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&Change, &Snapshot) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    #[tracing::instrument(skip(self, form, now))]
    pub fn create(&mut self, form: TaskForm, now: DateTime<Utc>) -> Result<Task, StoreError> {
        let (start_date, end_date) = form.checked_schedule().map_err(StoreError::Validation)?;

        let task = Task {
            id: self.next_id(now)?,
            title: form.title,
            start_date,
            end_date,
            priority: form.priority,
            description: form.description,
            completed: false,
            created_at: now,
        };

        let mut next = self.tasks.to_vec();
        next.push(task.clone());
        self.commit(next, Change::Created(task.id))?;

        info!(id = task.id, "task created");
        Ok(task)
    }

    /// Replaces the editable fields of task `id`. The id, completion flag
    /// and creation time are kept.
    #[tracing::instrument(skip(self, form))]
    pub fn update(&mut self, id: i64, form: TaskForm) -> Result<Task, StoreError> {
        let (start_date, end_date) = form.checked_schedule().map_err(StoreError::Validation)?;

        let mut next = self.tasks.to_vec();
        let slot = next
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))?;

        slot.title = form.title;
        slot.start_date = start_date;
        slot.end_date = end_date;
        slot.priority = form.priority;
        slot.description = form.description;
        let updated = slot.clone();

        self.commit(next, Change::Updated(id))?;
        info!(id, "task updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub fn set_status(&mut self, id: i64, status: TaskStatus) -> Result<Task, StoreError> {
        let mut next = self.tasks.to_vec();
        let slot = next
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))?;
        slot.completed = status.is_completed();
        let updated = slot.clone();

        self.commit(next, Change::StatusChanged(id, status))?;
        info!(id, ?status, "task status set");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: i64) -> Result<Task, StoreError> {
        let mut next = self.tasks.to_vec();
        let idx = next
            .iter()
            .position(|task| task.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = next.remove(idx);

        self.commit(next, Change::Deleted(id))?;
        info!(id, "task deleted");
        Ok(removed)
    }

    /// Millisecond clock value, bumped past the largest existing id when the
    /// clock has not moved on.
    fn next_id(&self, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let candidate = now.timestamp_millis();
        match self.tasks.iter().map(|task| task.id).max() {
            Some(max) if max >= candidate => {
                max.checked_add(1).ok_or(StoreError::IdsExhausted(max))
            }
            _ => Ok(candidate),
        }
    }

    fn commit(&mut self, next: Vec<Task>, change: Change) -> Result<(), StoreError> {
        let raw = encode_tasks(&next)?;
        self.storage
            .set(TASKS_KEY, &raw)
            .context("failed to persist tasks")?;
        self.tasks = next.into();

        let snapshot = self.snapshot();
        debug!(?change, total = snapshot.stats.total, "notifying subscribers");
        for (_, listener) in &mut self.listeners {
            listener(&change, &snapshot);
        }
        Ok(())
    }
}
