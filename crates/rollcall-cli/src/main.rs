use anyhow::Result;
use clap::{Parser, Subcommand};

mod attend;
mod attendance;
mod capture;
mod config;
mod convert;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize captured images into the registration format
    Convert,
    /// Interactively capture face images from the camera
    Capture,
    /// Run the live attendance loop
    Attend,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert => convert::run(&config),
        Commands::Capture => capture::run(&config),
        Commands::Attend => attend::run(&config),
    }
}
