//! Adapter implementations of the port traits.
//!
//! `live` talks to the real system; `memory` keeps everything in process
//! with a hand-driven clock and predictable ids.

pub mod live;
pub mod memory;
