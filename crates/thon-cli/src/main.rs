mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thon", about = "CTF estimation for electron micrographs")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the CTF of a micrograph or power spectrum
    Fit(commands::fit::FitArgs),
    /// Write a synthetic power spectrum image
    Simulate(commands::simulate::SimulateArgs),
    /// Print or save the default fit config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Fit(args) => commands::fit::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
