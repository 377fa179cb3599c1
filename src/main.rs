mod ai;
mod cmd_optimize;
#[allow(dead_code)]
mod dockerfile;
mod dockerignore;
mod package_json;
mod project;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "shrinkah")]
#[command(about = "A Dockerfile optimizer for Node.js server images")]
struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version
    Version,
    /// Optimize a project's Docker image definition
    Optimize(Box<cmd_optimize::OptimizeArgs>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting shrinkah");

    match cli.command {
        Command::Version => println!("shrinkah {}", env!("CARGO_PKG_VERSION")),
        Command::Optimize(args) => cmd_optimize::run(&args)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let format = fmt::format().without_time().with_target(false).compact();

    // CLI -v flags take precedence, then RUST_LOG, then default to info
    let env_filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shrinkah=info")),
        1 => EnvFilter::new("shrinkah=debug"),
        _ => EnvFilter::new("shrinkah=trace"),
    };

    tracing_subscriber::fmt()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();
}
