pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "atrium",
    about = "Atrium real-estate dataset Q&A agent",
    long_about = "Ask natural-language questions against the ledger dataset, inspect the \
                  startup profile, or run an interactive chat session.",
    after_help = "Examples:\n  atrium ask \"Show me P&L for 2024-Q1\"\n  atrium chat\n  atrium profile"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the atrium.toml config file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Ask a single question and print the final answer")]
    Ask {
        #[arg(required = true, help = "The question to ask, quoted or as trailing words")]
        question: Vec<String>,
    },
    #[command(about = "Interactive chat session; history stays in this process")]
    Chat,
    #[command(about = "Print the startup dataset profile as JSON")]
    Profile,
}
