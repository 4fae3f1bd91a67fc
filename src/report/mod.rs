//! Check result rendering.

pub mod generator;

pub use generator::*;
