//! Clock port for timestamping tasks, history and backups.

use chrono::{DateTime, Utc};

/// Provides the current time.
///
/// Every `createdAt`, `updatedAt`, `deletedAt` and history timestamp is
/// taken from this port so tests can pin and advance time explicitly.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
