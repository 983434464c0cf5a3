//! couchstate CLI - Command-line interface for couchstate
//!
//! Provides `couchstate init`, `couchstate get` and `couchstate save` for
//! inspecting and seeding host state kept in CouchDB.

mod payload;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use couchstate_core::{LogicalResource, Storage};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "couchstate")]
#[command(about = "couchstate - flows, credentials and settings stored in CouchDB")]
#[command(version)]
struct Cli {
    /// Connection descriptor JSON: {"url": "...", "databaseName": "..."}
    #[arg(long, global = true, env = "CLOUDANT_CREDENTIALS", hide_env_values = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and create the application database if needed
    Init,
    /// Print a stored resource as JSON
    Get {
        /// Resource to read (flows, credentials, settings)
        resource: LogicalResource,
    },
    /// Store a resource from a JSON file or stdin
    Save {
        /// Resource to write (flows, credentials, settings)
        resource: LogicalResource,
        /// JSON file to read (defaults to stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => {
            let storage = connect(cli.config.as_deref()).await?;
            println!("Using database '{}'.", storage.connection()?.database());
        }
        Commands::Get { resource } => {
            let storage = connect(cli.config.as_deref()).await?;
            let value = match resource {
                LogicalResource::Flows => Value::Array(storage.get_flows().await?),
                LogicalResource::Credentials => Value::Object(storage.get_credentials().await?),
                LogicalResource::Settings => Value::Object(storage.get_settings().await?),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Save { resource, file } => {
            // Validate before touching the network
            let value = payload::read(resource, file.as_deref())?;
            let storage = connect(cli.config.as_deref()).await?;

            match (resource, value) {
                (LogicalResource::Flows, Value::Array(flows)) => storage.save_flows(flows).await?,
                (LogicalResource::Credentials, Value::Object(credentials)) => {
                    storage.save_credentials(credentials).await?;
                }
                (LogicalResource::Settings, Value::Object(settings)) => {
                    storage.save_settings(settings).await?;
                }
                (resource, _) => bail!("Invalid payload for {resource}"),
            }
            println!("Saved {resource}.");
        }
    }
    Ok(())
}

async fn connect(config: Option<&str>) -> Result<Storage> {
    let storage = Storage::new();
    storage
        .init(config)
        .await
        .context("Failed to initialize storage")?;
    Ok(storage)
}
