//! CLI subcommand implementations.
//!
//! Each command writes its output to a caller-supplied writer and takes the
//! current time as an argument, so output is deterministic under test.

pub mod employee;
pub mod holiday;
pub mod leave;
pub mod status;
pub mod task;
pub mod timer;
pub mod util;
