pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{Callable, Task, TaskId};
pub use crate::runtime::Runtime;
