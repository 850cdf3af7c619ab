//! Library room reservation CLI library.
//!
//! This crate provides the `lr` command line: configuration, the booking
//! scheduler and the subcommands built on them.

mod cli;
pub mod commands;
mod config;
pub mod scheduler;

pub use cli::{Cli, Commands};
pub use config::{BookingConfig, Config};
pub use scheduler::ReservationScheduler;
