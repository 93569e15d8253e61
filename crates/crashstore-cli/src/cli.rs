use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "crashstore",
    about = "Save and load crash reports in a blob store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save a raw crash and its dumps
    Save(SaveArgs),
    /// Load a crash and write it out
    Load(LoadArgs),
    /// Check the health of the configured store
    Health,
    /// Show the effective runtime configuration
    Config,
}

#[derive(Args)]
pub struct SaveArgs {
    /// JSON file holding the raw crash object
    #[arg(long)]
    pub raw: PathBuf,
    /// Dump to attach as NAME=FILE; an empty NAME is the primary dump
    #[arg(long = "dump", value_name = "NAME=FILE")]
    pub dumps: Vec<String>,
    /// Use this crash id instead of generating one
    #[arg(long)]
    pub crash_id: Option<String>,
}

#[derive(Args)]
pub struct LoadArgs {
    pub crash_id: String,
    /// Directory to write raw_crash.json and dumps/<name> into
    #[arg(long)]
    pub out: Option<PathBuf>,
}
