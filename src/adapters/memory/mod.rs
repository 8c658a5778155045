//! In-memory adapters for deterministic runs.

pub mod clock;
pub mod filesystem;
pub mod id_gen;

pub use clock::ManualClock;
pub use filesystem::MemoryFileSystem;
pub use id_gen::SequentialIdGenerator;
