//! Athletes Sync CLI
//!
//! Lists, adds and removes athletes in a remote collection, or serves the
//! in-memory mock backend.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use athletes_sync::backend::{self, CollectionStore};
use athletes_sync::form::DraftForm;
use athletes_sync::{Config, HttpCollectionClient, Record, RecordId, SyncController};

#[derive(Parser, Debug)]
#[command(name = "athletes-sync", version, about = "Sync a local athlete list with a REST collection")]
struct Cli {
    /// Server origin (overrides ATHLETES_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and print the collection
    List,
    /// Create a new athlete
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        country: String,
    },
    /// Delete an athlete by id
    Remove { id: String },
    /// Run the in-memory mock backend
    Serve {
        /// Start with a few demo records
        #[arg(long)]
        seed: bool,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "athletes_sync=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });
    if let Some(base_url) = cli.base_url.clone() {
        config.client.base_url = base_url;
    }

    if let Command::Serve { seed, port } = &cli.command {
        if let Some(port) = port {
            config.server.port = *port;
        }
        let store = if *seed {
            CollectionStore::seeded()
        } else {
            CollectionStore::new()
        };
        return backend::serve(&config.server, store, &config.client.resource)
            .await
            .context("mock backend failed");
    }

    let client = HttpCollectionClient::new(&config.client)?;
    tracing::debug!(endpoint = client.endpoint(), "Using remote collection");
    let controller = SyncController::new(Arc::new(client));

    let outcome = run(&cli, &config, &controller).await;
    controller.dispose();
    outcome
}

async fn run(cli: &Cli, config: &Config, controller: &SyncController) -> anyhow::Result<()> {
    match &cli.command {
        Command::List => {
            let records = controller.load().await.context("failed to load collection")?;
            print_records(&records, cli.json)?;
        }
        Command::Add { name, country } => {
            let mut form = DraftForm::new(config.client.form_clear);
            form.set_name(name);
            form.set_country(country);
            let record = form.submit(controller).await.context("failed to add athlete")?;
            print_records(std::slice::from_ref(&record), cli.json)?;
        }
        Command::Remove { id } => {
            let id = RecordId::parse(id);
            controller.load().await.context("failed to load collection")?;
            controller
                .remove(&id)
                .await
                .with_context(|| format!("failed to remove athlete {}", id))?;
            if cli.json {
                println!("{}", serde_json::json!({ "removed": id }));
            } else {
                println!("Removed {}", id);
            }
        }
        Command::Serve { .. } => anyhow::bail!("serve does not use the remote client"),
    }
    Ok(())
}

fn print_records(records: &[Record], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No athletes");
    }
    for record in records {
        println!("{:>6}  {:<30}  {}", record.id.to_string(), record.name, record.country);
    }
    Ok(())
}
