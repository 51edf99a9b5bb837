//! CLI definitions for the task-manager binary.
//!
//! The main entry point is [`Cli`]; running without a subcommand serves HTTP.

use clap::{Args, Parser, Subcommand};

/// Task manager server and admin commands
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Address to listen on (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (default if no subcommand given)
    Serve,

    /// Create a worker account
    AddWorker(AddWorkerArgs),

    /// Create a position
    AddPosition {
        /// Position name
        name: String,
    },

    /// Create a task type
    AddTaskType {
        /// Task type name
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct AddWorkerArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,

    #[arg(long)]
    pub email: Option<String>,

    /// Name of an existing position
    #[arg(long)]
    pub position: Option<String>,

    /// Grant staff rights
    #[arg(long)]
    pub staff: bool,
}
