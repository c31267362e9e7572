use super::queue::TaskQueue;
use super::task::TaskRecord;
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::Config;
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            tracing::warn!(
                thread = std::thread::current().name().unwrap_or("unknown"),
                core = core_id,
                "failed to pin worker thread"
            );
        }
    }
}

/// Fixed set of worker threads pulling from one shared [`TaskQueue`].
///
/// Threads are not created until the first task is submitted.
pub struct CpuPool {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<WorkerHandle>>,
    num_threads: usize,
    available_cores: usize,
    pin_workers: bool,
    stack_size: Option<usize>,
    thread_name_prefix: String,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    state: Arc<WorkerState>,
}

impl CpuPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();

        Ok(Self {
            queue: Arc::new(TaskQueue::new()),
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            num_threads,
            available_cores: config.available_cores(),
            pin_workers: config.pin_workers,
            stack_size: config.stack_size,
            thread_name_prefix: config.thread_name_prefix.clone(),
        })
    }

    pub(crate) fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Enqueue a record, starting the workers first if this is the first
    /// submission.
    pub(crate) fn submit(&self, record: Arc<TaskRecord>) -> Result<()> {
        let mut state = self.queue.lock();

        if !state.started {
            let spawned = self.start_workers();
            state.started = !self.workers.lock().is_empty();
            spawned?;
        }

        trace!(task = %record.id(), "task queued");
        self.queue.push(state, record);
        Ok(())
    }

    // caller holds the queue lock, so workers block until the first record lands
    fn start_workers(&self) -> Result<()> {
        let mut workers = self.workers.lock();

        for id in workers.len()..self.num_threads {
            let worker = Worker::new(id, self.queue.clone());
            let state = worker.state.clone();
            let name = format!("{}-{}", self.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = self.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = self.pin_workers;
            let core_id = id % self.available_cores;
            let thread = builder.spawn(move || {
                // Pin worker to core if requested
                #[cfg(target_os = "linux")]
                if pin_workers {
                    pin_thread_to_core(core_id);
                }
                #[cfg(not(target_os = "linux"))]
                let _ = (pin_workers, core_id);

                worker.run();
            })?;

            workers.push(WorkerHandle {
                id,
                thread: Some(thread),
                state,
            });
        }

        debug!(workers = workers.len(), "worker pool started");
        Ok(())
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn is_started(&self) -> bool {
        self.queue.lock().started
    }

    /// Records spawned but not yet retrieved or drained.
    pub fn queued_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn tasks_executed(&self) -> u64 {
        self.workers
            .lock()
            .iter()
            .map(|w| w.state.tasks_executed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn tasks_panicked(&self) -> u64 {
        self.workers
            .lock()
            .iter()
            .map(|w| w.state.tasks_panicked.load(Ordering::Relaxed))
            .sum()
    }

    /// Settle every record still queued, front to back, releasing results
    /// nobody retrieved.
    fn drain(&self) {
        let mut drained = 0usize;
        while let Some(record) = self.queue.front() {
            record.settle(&self.queue, drop);
            drained += 1;
        }
        if drained > 0 {
            debug!(tasks = drained, "drained unretrieved tasks");
        }
    }

    pub fn shutdown(&self) {
        self.drain();

        if !self.queue.lock().started {
            return;
        }

        // wake everyone up to check the stop flag
        self.queue.stop();

        let mut joined = 0usize;
        for worker in self.workers.lock().iter_mut() {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::error!(worker = worker.id, "worker thread panicked");
                }
                joined += 1;
            }
        }
        if joined > 0 {
            debug!(workers = joined, "worker pool stopped");
        }
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("num_threads", &self.num_threads)
            .field("started", &self.is_started())
            .field("queued_tasks", &self.queued_tasks())
            .finish()
    }
}
