//! Supporting infrastructure.
//!
//! Error types shared across the parsing, synchronization and player
//! layers.

pub mod errors;
