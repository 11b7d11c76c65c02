mod config;
mod process;
mod render;
mod service;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hubble", about = "Hubble CLI - turn legal documents into timeline visualizations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a turn: upload a PDF with an optional request, or plain text
    Process {
        /// PDF document to analyze
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// What to visualize (defaults to all stakeholders when a file is given)
        request: Vec<String>,

        /// Save the finished chart; optionally to PATH instead of the configured location
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        download: Option<Option<PathBuf>>,

        /// Print the final session state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the processing service is up
    Health,

    /// Request changes to a finished timeline
    Regenerate {
        /// Session ID printed after processing
        #[arg(long)]
        session: String,

        /// Modification, e.g. "Move legend to right side"
        modification: Vec<String>,
    },

    /// Download a chart artifact by path or URL
    Download {
        /// Service-relative path (e.g. /output/timeline.png) or absolute URL
        reference: String,

        /// Destination file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List example requests
    Suggestions,

    /// Show or set configuration
    Config {
        /// Set the processing service URL
        #[arg(long)]
        server: Option<String>,

        /// Set the default download directory
        #[arg(long)]
        download_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            file,
            request,
            download,
            json,
        } => process::run_process(file.as_deref(), &request.join(" "), download, json).await,
        Commands::Health => service::run_health().await,
        Commands::Regenerate {
            session,
            modification,
        } => service::run_regenerate(&session, &modification.join(" ")).await,
        Commands::Download { reference, output } => {
            service::run_download(&reference, output.as_deref()).await
        }
        Commands::Suggestions => {
            for suggestion in hubble_core::coordinator::SUGGESTED_REQUESTS {
                println!("{suggestion}");
            }
            Ok(())
        }
        Commands::Config {
            server,
            download_dir,
        } => {
            if server.is_none() && download_dir.is_none() {
                config::show_config()
            } else {
                config::set_config(server, download_dir)
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
