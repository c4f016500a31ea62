use clap::{Parser, Subcommand};

use super::commands::{convert::ConvertArgs, inspect::InspectArgs, serve::ServeArgs};

#[derive(Debug, Parser)]
#[command(name = "rethread", version, about = "Chat-export conversion pipeline and service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Convert(ConvertArgs),
    Inspect(InspectArgs),
    Serve(ServeArgs),
}
