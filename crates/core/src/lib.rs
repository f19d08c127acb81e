//! Plain data model shared by the image-generation fan-out pipeline.
//!
//! Nothing in this crate performs I/O. It defines the terminal outcome of
//! a single poll loop, the per-attempt record, the per-prompt aggregate,
//! and the environment-driven configuration consumed by the client and
//! pipeline crates.

pub mod config;
pub mod error;
pub mod outcome;
pub mod result;
pub mod types;
