//! Work time CLI library.
//!
//! This crate provides the `wt` command-line interface over the engine in
//! `wt-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{
    Cli, Commands, DecisionArg, EmployeeAction, HolidayAction, LeaveAction, TaskAction,
    TimerAction,
};
pub use config::Config;
