//! CLI module for the knowledge query service
//!
//! - `serve`: run the HTTP API
//! - `ask`: answer a single query and print the JSON response

pub mod ask;
pub mod serve;

use clap::{Parser, Subcommand};

/// Knowledge Query - multi-source vector search with LLM answer synthesis
#[derive(Parser)]
#[command(name = "knowledge-query")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Run one query and print the response as JSON
    Ask(ask::AskArgs),
}
