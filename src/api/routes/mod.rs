//! Route handlers
//!
//! - [`system`] - liveness, health, events
//! - [`jobs`] - job snapshots

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;
