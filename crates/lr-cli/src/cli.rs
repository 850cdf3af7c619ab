//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Library discussion room reservation bot.
///
/// Logs in to the passport service and books the configured weekly slots,
/// recording every confirmed booking in an iCalendar file.
#[derive(Debug, Parser)]
#[command(name = "lr", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Book the configured slots for a day.
    Schedule {
        /// Days from today (0 = today). A negative value books immediately.
        #[arg(allow_negative_numbers = true)]
        days: i64,
    },

    /// Book the immediate resource for the next half hour.
    Now,

    /// Create an empty booking calendar.
    Init,

    /// List recorded bookings.
    Events {
        /// Output as JSON lines.
        #[arg(long)]
        json: bool,
    },
}
