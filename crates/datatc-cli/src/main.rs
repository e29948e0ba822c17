use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(
    name = "datatc",
    version,
    about = "Browse project data directories and inspect self-aware datasets"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: output::OutputFormat,

    /// Project registry file (defaults to the user config directory)
    #[arg(long, global = true, env = "DATATC_REGISTRY")]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = commands::registry(cli.registry.as_deref())?;
    match &cli.command {
        commands::Commands::Projects => commands::projects::run(&registry, cli.format),
        commands::Commands::Register(args) => commands::register::run(args, &registry),
        commands::Commands::Unregister(args) => commands::unregister::run(args, &registry),
        commands::Commands::Ls(args) => commands::ls::run(args, &registry, cli.format),
        commands::Commands::Latest(args) => commands::latest::run(args, &registry, cli.format),
        commands::Commands::Info(args) => commands::info::run(args, cli.format),
        commands::Commands::Find(args) => commands::find::run(args, &registry, cli.format),
    }
}
