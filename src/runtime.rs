use crate::config::Config;
use crate::error::Result;
use crate::executor::cell::RawHandle;
use crate::executor::task::TaskRecord;
use crate::executor::{Callable, CpuPool, Task};
use std::sync::Arc;

/// A fixed-size pool of worker threads that runs spawned calls and hands
/// their results back through [`Task`] handles.
///
/// Workers are started on the first [`spawn`](Runtime::spawn). Dropping the
/// runtime, or calling [`shutdown`](Runtime::shutdown), waits for every task
/// still queued, releases results nobody retrieved and joins the workers.
#[derive(Debug)]
pub struct Runtime {
    pool: CpuPool,
    config: Config,
}

impl Runtime {
    /// Runtime with one worker per logical core.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Runtime with exactly `cores` workers.
    ///
    /// Fails with [`Error::InvalidCpuCount`](crate::Error::InvalidCpuCount)
    /// if `cores` is zero or larger than the logical core count.
    pub fn with_cores(cores: usize) -> Result<Self> {
        Self::with_config(Config::builder().num_threads(cores).build()?)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let pool = CpuPool::new(&config)?;

        Ok(Self { pool, config })
    }

    /// Queue `func(args...)` for execution and return a handle to its result.
    ///
    /// `args` is a tuple matching the function's parameters: `()` for none,
    /// `(a,)` for one, `(a, b)` for two and so on.
    ///
    /// ```no_run
    /// let rt = kriya::Runtime::new().unwrap();
    /// let task = rt
    ///     .spawn(|name: String, n: i32| format!("{name}{n}"), ("job".to_string(), 3))
    ///     .unwrap();
    /// assert_eq!(task.retrieve(), "job3");
    /// ```
    pub fn spawn<F, Args>(&self, func: F, args: Args) -> Result<Task<F::Output>>
    where
        F: Callable<Args>,
        Args: Send + 'static,
    {
        let record = Arc::new(TaskRecord::new(RawHandle::new(func, args)));
        self.pool.submit(Arc::clone(&record))?;

        Ok(Task::new(record, Arc::clone(self.pool.queue())))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }

    /// Whether the worker threads have been started.
    pub fn is_started(&self) -> bool {
        self.pool.is_started()
    }

    /// Tasks spawned whose results have not been retrieved yet.
    pub fn queued_tasks(&self) -> usize {
        self.pool.queued_tasks()
    }

    pub fn tasks_executed(&self) -> u64 {
        self.pool.tasks_executed()
    }

    pub fn tasks_panicked(&self) -> u64 {
        self.pool.tasks_panicked()
    }

    /// Drain outstanding tasks and stop the workers.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}
