use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use bal_catalog::{
    DatasetStore, ReferenceIndex,
    config::{Config, ReferenceConfig},
    expand::{GeoApiIndex, StaticIndex},
    ingest::{self, DataGouvCatalog, HttpValidator},
    kv::SqliteClient,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "BAL_CATALOG_CONFIG")]
    config: PathBuf,
    /// SQLite file overriding `storage.url`.
    #[clap(long, env = "DATASETS_DB_PATH")]
    database: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the catalog, validate every dataset and replace stored records.
    Refresh,
    Datasets,
    Stats,
    Report {
        dataset: String,
    },
    Summary {
        dataset: String,
    },
    Commune {
        dataset: String,
        commune: String,
    },
    Voie {
        dataset: String,
        commune: String,
        voie: String,
    },
}

fn print(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute<R: ReferenceIndex>(
    command: Command,
    config: &Config,
    store: &DatasetStore<SqliteClient, R>,
) -> anyhow::Result<()> {
    match command {
        Command::Refresh => {
            let Some(validator) = &config.validator else {
                bail!("refresh requires a validator endpoint in the config");
            };
            let client = reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()?;
            let catalog =
                DataGouvCatalog::new(client.clone(), config.catalog.url.clone(), &config.catalog.tag);
            let entries = catalog.fetch().await.with_context(|| "fetch catalog")?;
            let validator = HttpValidator::new(client, validator.endpoint.clone());
            let datasets = ingest::refresh(entries, &validator, store, config.concurrency())
                .await
                .with_context(|| "refresh catalog")?;
            ingest::write_catalog(&config.output, &datasets)
                .await
                .with_context(|| format!("write {}", config.output.display()))?;
            info!(count = datasets.len(), output = %config.output.display(), "done");
        }
        Command::Datasets => print(&store.get_datasets().await?)?,
        Command::Stats => {
            let datasets = store.get_datasets().await?.unwrap_or_default();
            print(&bal_catalog::compute_stats(&datasets))?;
        }
        Command::Report { dataset } => print(&store.get_report(&dataset).await?)?,
        Command::Summary { dataset } => print(&store.get_summary(&dataset).await?)?,
        Command::Commune { dataset, commune } => {
            print(&store.get_commune(&dataset, &commune).await?)?
        }
        Command::Voie {
            dataset,
            commune,
            voie,
        } => print(&store.get_voie(&dataset, &commune, &voie).await?)?,
    }
    Ok(())
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = tokio::fs::read_to_string(&opts.config)
        .await
        .with_context(|| "read config")?;
    let config: Config = serde_yaml::from_str(&config)
        .with_context(|| format!("parse config from {}", opts.config.display()))?;
    config.validate().map_err(|msg| anyhow!("{msg}"))?;

    let url = match &opts.database {
        Some(path) => format!("sqlite://{}", path.display()),
        None => config.storage.url.clone(),
    };
    let kv = SqliteClient::open(&url, config.storage.namespace.as_deref())
        .await
        .with_context(|| format!("open {url}"))?;

    match &config.reference {
        ReferenceConfig::Static { path } => {
            let index = StaticIndex::load(path)
                .await
                .with_context(|| format!("load {}", path.display()))?;
            let store = DatasetStore::new(kv, index);
            let result = execute(opts.command, &config, &store).await;
            store.close().await;
            result
        }
        ReferenceConfig::GeoApi { url } => {
            let store = DatasetStore::new(kv, GeoApiIndex::new(reqwest::Client::new(), url.clone()));
            let result = execute(opts.command, &config, &store).await;
            store.close().await;
            result
        }
    }
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = run(opts).await {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
