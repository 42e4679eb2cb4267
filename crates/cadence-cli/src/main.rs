//! Cadence CLI - Inspect and exercise participant execution orders

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, order, simulate};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Resolve, check and simulate lifecycle execution orders", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved execution rank of every participant type
    Order {
        /// Declaration file, or a directory containing participants/*.toml
        path: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,
    },

    /// Report configuration errors and unordered types sharing a rank
    Check {
        /// Declaration file, or a directory containing participants/*.toml
        path: String,
    },

    /// Bring up one tracing instance per type and run frames
    Simulate {
        /// Declaration file, or a directory containing participants/*.toml
        path: String,

        /// Number of frames to run after bring-up
        #[arg(long, default_value = "1")]
        frames: u32,

        /// TOML file with a [loop] table
        #[arg(long)]
        config: Option<String>,

        /// Simulated seconds per frame (defaults to one fixed step)
        #[arg(long)]
        frame_time: Option<f64>,
    },
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Order { path, format } => order::run(&path, &format),
        Commands::Check { path } => check::run(&path),
        Commands::Simulate {
            path,
            frames,
            config,
            frame_time,
        } => simulate::run(simulate::SimulateArgs {
            path,
            frames,
            config,
            frame_time,
        }),
    }
}
