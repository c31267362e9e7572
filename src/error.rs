pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid cpu count: requested {requested} workers, {available} logical cores available")]
    InvalidCpuCount { requested: usize, available: usize },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("task result was drained by runtime shutdown")]
    Drained,
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn invalid_cpu_count(requested: usize, available: usize) -> Self {
        Error::InvalidCpuCount {
            requested,
            available,
        }
    }
}
