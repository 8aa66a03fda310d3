//! Target store abstraction.
//!
//! This crate defines the `TargetSink` trait that the apply engine writes
//! through. `postgresql-sink` implements it for the real target table and
//! [`MemorySink`] implements it in memory for dry runs and tests.

mod memory;
mod traits;

pub use memory::MemorySink;
pub use traits::TargetSink;
