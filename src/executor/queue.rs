//! Shared FIFO of task records and the lock/condvar pair guarding it.

use super::task::{Status, TaskId, TaskRecord};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    /// Records in admission order. A record stays here from spawn until its
    /// result is retrieved or drained, whatever its status.
    pub(crate) records: VecDeque<Arc<TaskRecord>>,
    pub(crate) started: bool,
}

impl QueueState {
    /// First Pending record in admission order.
    pub(crate) fn first_pending(&self) -> Option<&Arc<TaskRecord>> {
        self.records
            .iter()
            .find(|record| record.status() == Status::Pending)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    work: Condvar,
    stop: AtomicBool,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }

    /// Append a record and wake one idle worker.
    pub(crate) fn push(&self, mut state: MutexGuard<'_, QueueState>, record: Arc<TaskRecord>) {
        state.records.push_back(record);
        drop(state);
        self.work.notify_one();
    }

    /// Remove the record with `id`, if still queued, and wake every waiter.
    pub(crate) fn remove(&self, id: TaskId) {
        let mut state = self.state.lock();
        if let Some(pos) = state.records.iter().position(|record| record.id() == id) {
            state.records.remove(pos);
        }
        drop(state);
        self.work.notify_all();
    }

    pub(crate) fn front(&self) -> Option<Arc<TaskRecord>> {
        self.state.lock().records.front().cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub(crate) fn wait(&self, state: &mut MutexGuard<'_, QueueState>) {
        self.work.wait(state);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Raise the stop flag under the lock and wake every worker.
    pub(crate) fn stop(&self) {
        let state = self.state.lock();
        self.stop.store(true, Ordering::Release);
        drop(state);
        self.work.notify_all();
    }
}
