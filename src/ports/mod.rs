//! Port traits defining the store's external boundaries.
//!
//! The core never touches time, disk or randomness directly; it goes
//! through these traits so tests can swap in deterministic adapters.
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod id_gen;

pub use clock::Clock;
pub use filesystem::{FileSystem, FsResult};
pub use id_gen::IdGenerator;
