//! Task records and the caller-facing [`Task`] handle.

use super::cell::{RawHandle, Slot};
use super::panic::PanicInfo;
use super::queue::TaskQueue;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::marker::PhantomData;
use std::panic;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a task. Only ever advances Pending -> Running -> Finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Status {
    Pending = 0,
    Running = 1,
    Finished = 2,
}

impl Status {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Status::Pending,
            1 => Status::Running,
            _ => Status::Finished,
        }
    }
}

/// Queue entry for one spawned call.
///
/// `status` moves to Running under the queue lock (so two workers never
/// claim the same record) and to Finished under `handle`'s lock (so a
/// waiter on `done` cannot miss the transition).
pub(crate) struct TaskRecord {
    id: TaskId,
    status: AtomicU8,
    handle: Mutex<Option<RawHandle>>,
    done: Condvar,
}

impl TaskRecord {
    pub(crate) fn new(handle: RawHandle) -> Self {
        Self {
            id: TaskId::next(),
            status: AtomicU8::new(Status::Pending as u8),
            handle: Mutex::new(Some(handle)),
            done: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Pending -> Running. Caller must hold the queue lock.
    pub(crate) fn claim(&self) {
        debug_assert_eq!(self.status(), Status::Pending);
        self.status.store(Status::Running as u8, Ordering::Release);
    }

    /// Run the stored call and mark the record Finished. Returns `false` if
    /// the call panicked.
    pub(crate) fn execute(&self) -> bool {
        let mut handle = self.handle.lock();
        let completed = match handle.as_mut() {
            Some(raw) => raw.run(),
            None => true,
        };
        self.status.store(Status::Finished as u8, Ordering::Release);
        drop(handle);

        self.done.notify_all();
        completed
    }

    /// Block until the record is Finished, hand its handle to `consume`, then
    /// drop the record from `queue`.
    ///
    /// The handle is `None` if someone else already settled this record.
    pub(crate) fn settle<T>(
        &self,
        queue: &TaskQueue,
        consume: impl FnOnce(Option<RawHandle>) -> T,
    ) -> T {
        let mut handle = self.handle.lock();
        while self.status() != Status::Finished {
            self.done.wait(&mut handle);
        }

        let out = consume(handle.take());
        queue.remove(self.id);
        drop(handle);
        out
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

/// Handle to a spawned task and its eventual result of type `R`.
///
/// Dropping a `Task` without retrieving it is allowed: the result is still
/// computed, and released when the runtime shuts down.
#[must_use = "dropping a Task discards its result"]
pub struct Task<R> {
    record: Arc<TaskRecord>,
    queue: Arc<TaskQueue>,
    _output: PhantomData<fn() -> R>,
}

impl<R: Send + 'static> Task<R> {
    pub(crate) fn new(record: Arc<TaskRecord>, queue: Arc<TaskQueue>) -> Self {
        Self {
            record,
            queue,
            _output: PhantomData,
        }
    }

    pub fn id(&self) -> TaskId {
        self.record.id()
    }

    /// Whether a worker has finished running this task.
    pub fn is_finished(&self) -> bool {
        self.record.status() == Status::Finished
    }

    /// Block until the task has run and return its result.
    ///
    /// # Panics
    ///
    /// Resumes the task's panic on the calling thread if the task panicked,
    /// and panics if the result was already drained by runtime shutdown.
    /// Use [`Task::try_retrieve`] to get these as errors instead.
    pub fn retrieve(self) -> R {
        let id = self.id();
        match self.take() {
            Some(Ok(value)) => value,
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => panic!("result of task {} was drained by runtime shutdown", id),
        }
    }

    /// Block until the task has run and return its result, reporting a
    /// panicked task as [`Error::TaskPanicked`].
    pub fn try_retrieve(self) -> Result<R> {
        match self.take() {
            Some(Ok(value)) => Ok(value),
            Some(Err(payload)) => Err(Error::TaskPanicked(
                PanicInfo::from_payload(&*payload).message,
            )),
            None => Err(Error::Drained),
        }
    }

    fn take(self) -> Slot<R> {
        let id = self.record.id();
        let slot = self.record.settle(&self.queue, |handle| {
            handle.and_then(|mut raw| {
                // SAFETY: `Runtime::spawn` built this record's handle from a
                // callable whose output type is `R`.
                unsafe { raw.take_output::<R>() }
            })
        });
        tracing::trace!(task = %id, "task retrieved");
        slot
    }
}

impl<R> fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.record.id())
            .field("status", &self.record.status())
            .finish()
    }
}
