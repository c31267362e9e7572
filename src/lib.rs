//! kriya - a fixed-size task runtime
//!
//! A small thread pool that accepts heterogeneous, arbitrarily typed calls,
//! runs them on a fixed set of worker threads and lets callers block for
//! each call's typed result.
//!
//! # Quick Start
//!
//! ```no_run
//! use kriya::prelude::*;
//!
//! let rt = Runtime::new().unwrap();
//!
//! let answer = rt.spawn(|| 42, ()).unwrap();
//! let greeting = rt
//!     .spawn(|name: String, n: i32| format!("{} #{}", name, n), ("worker".to_string(), 1))
//!     .unwrap();
//!
//! assert_eq!(greeting.retrieve(), "worker #1");
//! assert_eq!(answer.retrieve(), 42);
//!
//! rt.shutdown();
//! ```
//!
//! # Model
//!
//! - **One shared queue**: every worker pulls the oldest pending task from
//!   the same FIFO; there is no work stealing.
//! - **Lazy start**: worker threads are created by the first `spawn`.
//! - **Typed results**: `spawn` returns a [`Task<R>`](Task) whose `R` is the
//!   function's return type, so results come back without runtime type tags.
//! - **Draining shutdown**: tasks nobody retrieved are still run to
//!   completion and released before the workers are joined.

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod runtime;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{Callable, Task, TaskId};
pub use runtime::Runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_spawn_retrieve() {
        let rt = Runtime::with_cores(1).unwrap();

        let task = rt.spawn(|| 42, ()).unwrap();
        assert_eq!(task.retrieve(), 42);

        rt.shutdown();
    }

    #[test]
    fn test_mixed_result_types() {
        let rt = Runtime::new().unwrap();

        let number = rt.spawn(|x: u64| x * 2, (21,)).unwrap();
        let text = rt
            .spawn(|s: String, n: i32| format!("{}{}", s, n), ("abc".to_string(), 5))
            .unwrap();
        let list = rt.spawn(|n: usize| vec![n; n], (3,)).unwrap();

        assert_eq!(list.retrieve(), vec![3, 3, 3]);
        assert_eq!(text.retrieve(), "abc5");
        assert_eq!(number.retrieve(), 42);

        rt.shutdown();
    }

    #[test]
    fn test_scoped_producers() {
        let rt = Runtime::new().unwrap();

        std::thread::scope(|s| {
            for t in 0..4u64 {
                let rt = &rt;
                s.spawn(move || {
                    let tasks: Vec<_> = (0..10u64)
                        .map(|i| rt.spawn(|a: u64, b: u64| a * 100 + b, (t, i)).unwrap())
                        .collect();
                    for (i, task) in tasks.into_iter().enumerate() {
                        assert_eq!(task.retrieve(), t * 100 + i as u64);
                    }
                });
            }
        });

        assert_eq!(rt.queued_tasks(), 0);
        rt.shutdown();
    }
}
