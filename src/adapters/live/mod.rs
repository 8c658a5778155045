//! Live adapters backed by the system clock, real disk and random UUIDs.

pub mod clock;
pub mod filesystem;
pub mod id_gen;
