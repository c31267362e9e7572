//! Task execution infrastructure.
//!
//! This module provides the core task execution primitives: the type-erased
//! task cell, task records and handles, the shared queue, worker threads and
//! the CPU thread pool that ties them together.

pub mod cell;
pub mod cpu_pool;
pub mod panic;
pub(crate) mod queue;
pub mod task;
pub mod worker;

pub use cell::Callable;
pub use cpu_pool::CpuPool;
pub use panic::PanicInfo;
pub use task::{Task, TaskId};
