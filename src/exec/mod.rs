// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessRunner` trait the scheduler drives, and
//!   which tests replace with a scripted fake.
//! - [`process`] is the production runner on top of `tokio::process::Command`.

pub mod backend;
pub mod process;

pub use backend::{ProcessRunner, ProcessStatus};
pub use process::{ChildProcess, SystemProcessRunner};
