pub mod parallel;
pub mod pool;

pub use parallel::{FetchOrchestrator, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WORKERS};
pub use pool::{PooledSession, SessionPool};
