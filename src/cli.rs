// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "consign")]
#[command(about = "Smart contract deployment through a custody approval platform")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new consign.yml configuration file
    Init {
        /// Overwrite an existing consign.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Run the deployment API server
    Serve {
        /// Address to listen on (overrides server.listen)
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Show the stored state of a deployment
    Status {
        /// Request id assigned by the custody platform
        request_id: String,

        /// Print the deployment as JSON
        #[arg(long)]
        json: bool,
    },
}
