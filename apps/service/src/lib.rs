//! Uptime monitoring engine.
//!
//! Periodically probes registered HTTP/HTTPS checks, tracks their up/down
//! state, keeps a per-check audit log and alerts owners on transitions.

pub mod config;
pub mod error;
pub mod logs;
pub mod monitoring;
pub mod notifier;
pub mod orchestrator;
pub mod store;

pub use config::Config;
pub use orchestrator::{Engine, EngineHandle};
