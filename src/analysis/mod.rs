//! Analysis modules.
//!
//! Turns the raw per-host probe results into a check verdict.

pub mod consistency;

pub use consistency::*;
