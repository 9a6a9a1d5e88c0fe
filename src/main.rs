use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nestegg::api::{ProjectionPayload, build_projection_response, run_http_server};

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Deterministic year-by-year retirement projection (accounts, Social Security, taxes, debt)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection from a JSON request file and print the rows.
    Project {
        request: PathBuf,
        #[arg(long, help = "Pretty-print the JSON output")]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { port } => run_http_server(port)
            .await
            .context("HTTP server stopped"),
        Command::Project { request, pretty } => {
            let raw = fs::read_to_string(&request)
                .with_context(|| format!("reading {}", request.display()))?;
            let payload: ProjectionPayload = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", request.display()))?;
            let inputs = payload.into_inputs()?;
            let response = build_projection_response(&inputs);
            let out = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{out}");
            Ok(())
        }
    }
}
