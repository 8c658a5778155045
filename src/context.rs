//! Service context bundling all port trait objects.

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::memory::{ManualClock, MemoryFileSystem, SequentialIdGenerator};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::id_gen::IdGenerator;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live or in-memory).
pub struct ServiceContext {
    /// Clock for timestamps.
    pub clock: Box<dyn Clock>,
    /// Filesystem for store documents.
    pub fs: Box<dyn FileSystem>,
    /// ID generator for tasks and archives.
    pub id_gen: Box<dyn IdGenerator>,
}

impl ServiceContext {
    /// Creates a live context using the system clock, real disk and UUIDs.
    #[must_use]
    pub fn live() -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            id_gen: Box::new(LiveIdGenerator),
        }
    }

    /// Creates a fully in-memory context with a fixed clock and sequential ids.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_memory(ManualClock::default(), MemoryFileSystem::new())
    }

    /// Creates an in-memory context around caller-held clock and filesystem
    /// handles, so the caller can advance time or inspect files afterwards.
    #[must_use]
    pub fn with_memory(clock: ManualClock, fs: MemoryFileSystem) -> Self {
        Self {
            clock: Box::new(clock),
            fs: Box::new(fs),
            id_gen: Box::new(SequentialIdGenerator::new("task")),
        }
    }
}
