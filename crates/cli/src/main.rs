//! flightdeck CLI, the main entry point.
//!
//! Commands:
//! - `serve`          Start the HTTP + SSE gateway
//! - `ask`            Run one question and print its events
//! - `tools`          List the tool catalog the model sees
//! - `flight-server`  Serve the flight tools over MCP stdio
//! - `init`           Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "flightdeck",
    about = "flightdeck: watch an LLM agent reason over flight data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question and stream the agent's steps
    Ask {
        question: String,

        /// Print each event as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// List the tools available to the agent
    Tools,

    /// Serve the flight-data tools over MCP stdio
    FlightServer,

    /// Write a default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries MCP frames and answers; logs go to stderr.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { question, json } => commands::ask::run(question, json).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::FlightServer => commands::flight_server::run().await?,
        Commands::Init => commands::init::run()?,
    }

    Ok(())
}
