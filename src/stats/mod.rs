//! Collection statistics.
//!
//! Tracks how many packets and samples a session has processed and how many
//! packets were dropped, and persists the totals between runs.

pub mod session;

// Re-export commonly used types
pub use session::{PersistedStats, SessionStats, SharedSessionStats, StatsSnapshot};
