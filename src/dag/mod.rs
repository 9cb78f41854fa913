// src/dag/mod.rs

//! Static graph diagnostics.
//!
//! - [`graph`] builds a `petgraph` view of submitted tasks to report roots,
//!   external inputs and cycles. Scheduling itself never uses it.

pub mod graph;

pub use graph::{StuckReport, TaskGraph};
