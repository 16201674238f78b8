use eval_engine::{EvalError, ShapeCache};
use geom_kernel::{KernelBundle, KernelError};
use tracing::debug;

use crate::config::WorkerConfig;

/// State owned by the worker thread besides the kernel itself.
#[derive(Debug)]
pub struct WorkerState {
    pub cache: ShapeCache,
    pub config: WorkerConfig,
    /// Consumers that have registered, in order.
    pub consumers: Vec<String>,
}

impl WorkerState {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            cache: config.build_cache(),
            config,
            consumers: Vec::new(),
        }
    }

    /// Releases handles the cache evicted since the last call.
    pub fn release_evicted(&mut self, kernel: &mut dyn KernelBundle) {
        let evicted = self.cache.drain_evicted();
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "releasing evicted shapes");
        }
        for handle in evicted {
            kernel.release(&handle);
        }
    }

    /// Empties the cache and releases everything it held.
    pub fn release_all(&mut self, kernel: &mut dyn KernelBundle) {
        for handle in self.cache.clear() {
            kernel.release(&handle);
        }
    }
}

/// Errors surfaced to consumers as ERROR replies.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("kernel unavailable: {0}")]
    Bootstrap(String),

    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("not implemented: {operation}")]
    NotImplemented { operation: String },

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker reported an error: {message}")]
    Remote { message: String, fatal: bool },

    #[error("worker has shut down")]
    Disconnected,
}

impl WorkerError {
    /// Whether the worker can no longer serve requests.
    pub fn is_fatal(&self) -> bool {
        match self {
            WorkerError::Bootstrap(_) | WorkerError::Disconnected => true,
            WorkerError::Remote { fatal, .. } => *fatal,
            _ => false,
        }
    }
}
