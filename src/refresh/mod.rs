//! Periodic refresh of pending rate updates.

pub mod engine;
pub mod scheduler;

pub use engine::{update_pending_rates, RefreshError};
pub use scheduler::RefreshScheduler;
