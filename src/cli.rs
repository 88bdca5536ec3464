use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file (environment variables are used otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read assets from the local test fixture instead of the live API
    #[arg(short, long)]
    pub test_mode: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
