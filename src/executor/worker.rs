// worker thread stuff
use super::queue::TaskQueue;
use super::task::TaskRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub tasks_panicked: AtomicU64,
}

impl WorkerState {
    pub(crate) fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
        }
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub queue: Arc<TaskQueue>,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId, queue: Arc<TaskQueue>) -> Self {
        Self {
            id,
            queue,
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop
    pub fn run(&self) {
        debug!(worker = self.id, "worker started");

        while let Some(record) = self.next_task() {
            self.execute_task(&record);
        }

        debug!(worker = self.id, "worker stopped");
    }

    /// Claim the oldest Pending record, sleeping while there is none.
    /// Returns `None` once the queue has been stopped.
    fn next_task(&self) -> Option<Arc<TaskRecord>> {
        let mut state = self.queue.lock();

        loop {
            if self.queue.is_stopped() {
                return None;
            }

            if let Some(record) = state.first_pending() {
                record.claim();
                return Some(Arc::clone(record));
            }

            // records that are all claimed or awaiting retrieval are not work
            self.queue.wait(&mut state);
        }
    }

    fn execute_task(&self, record: &TaskRecord) {
        let tid = record.id();
        trace!(worker = self.id, task = %tid, "running task");

        if !record.execute() {
            warn!(worker = self.id, task = %tid, "task panicked");
            self.state.tasks_panicked.fetch_add(1, Ordering::Relaxed);
        }

        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::cell::RawHandle;
    use crate::executor::task::Status;
    use std::thread;

    #[test]
    fn test_worker_exits_on_stop() {
        let queue = Arc::new(TaskQueue::new());
        let worker = Worker::new(0, queue.clone());
        let handle = thread::spawn(move || worker.run());

        queue.stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_worker_runs_queued_tasks_in_order() {
        let queue = Arc::new(TaskQueue::new());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let records: Vec<_> = (0..5)
            .map(|i| {
                let order = order.clone();
                let record = Arc::new(TaskRecord::new(RawHandle::new(
                    move || order.lock().push(i),
                    (),
                )));
                queue.push(queue.lock(), record.clone());
                record
            })
            .collect();

        let worker = Worker::new(0, queue.clone());
        let stats = worker.state.clone();
        let handle = thread::spawn(move || worker.run());

        for record in &records {
            record.settle(&queue, |_| ());
            assert_eq!(record.status(), Status::Finished);
        }

        queue.stop();
        handle.join().unwrap();

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(stats.tasks_executed.load(Ordering::Relaxed), 5);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_worker_survives_panicking_task() {
        let queue = Arc::new(TaskQueue::new());
        let bad = Arc::new(TaskRecord::new(RawHandle::new(|| panic!("bad task"), ())));
        let good = Arc::new(TaskRecord::new(RawHandle::new(|| 9u32, ())));
        queue.push(queue.lock(), bad.clone());
        queue.push(queue.lock(), good.clone());

        let worker = Worker::new(0, queue.clone());
        let stats = worker.state.clone();
        let handle = thread::spawn(move || worker.run());

        let value = good.settle(&queue, |h| {
            h.and_then(|mut raw| unsafe { raw.take_output::<u32>() })
        });
        assert_eq!(value.unwrap().unwrap(), 9);
        bad.settle(&queue, drop);

        queue.stop();
        handle.join().unwrap();
        assert_eq!(stats.tasks_panicked.load(Ordering::Relaxed), 1);
    }
}
