//! Worker channel: one kernel and one shape cache on a dedicated thread,
//! driven by REGISTER / LOAD_FILE / SAVE_FILE requests.

pub mod collab;
pub mod config;
pub mod dispatch;
pub mod messages;
pub mod worker;
pub mod worker_state;

pub use collab::{DisplaySink, DocumentSource};
pub use config::{EvictionConfig, WorkerConfig};
pub use dispatch::dispatch;
pub use messages::*;
pub use worker::{Consumer, Worker};
pub use worker_state::{WorkerError, WorkerState};
