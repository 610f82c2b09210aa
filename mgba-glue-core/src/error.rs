use thiserror::Error;

/// Errors surfaced by the adapter.
///
/// Absent optional exports are not errors: calls through them are no-ops.
#[derive(Debug, Error)]
pub enum GlueError {
    #[error("failed to fetch ROM from {url}: HTTP status {status}")]
    Fetch { url: String, status: u16 },

    #[error("ROM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("module built without required {0} support")]
    Capability(&'static str),

    #[error("failed to instantiate native module: {0:#}")]
    Instantiation(anyhow::Error),

    #[error("native call trapped: {0:#}")]
    Trap(wasmtime::Error),

    #[error("linear memory access failed: {0}")]
    Memory(String),

    #[error("virtual filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid ROM filename: {0:?}")]
    InvalidRomName(String),

    #[error("native module is not initialized")]
    NotInitialized,

    #[error("native module is already initialized")]
    AlreadyInitialized,
}

impl From<wasmtime::MemoryAccessError> for GlueError {
    fn from(e: wasmtime::MemoryAccessError) -> Self {
        GlueError::Memory(e.to_string())
    }
}

pub type GlueResult<T> = Result<T, GlueError>;
