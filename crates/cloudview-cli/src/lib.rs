//! Headless operator CLI over the cloudview cache.
//!
//! Stands in for the browser shell: the same cache, store, and listing
//! client, driven from subcommands instead of page mounts and refresh
//! buttons. `show`, `purge`, and `status` work entirely offline against
//! the file-backed store; only `refresh` touches the network.

#![allow(clippy::print_stdout)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Parser;
use cloudview_client_core::cache::{CachePolicy, CacheStatus, ResourceCache};
use cloudview_client_core::listing::{ListingError, RegionListing};
use cloudview_client_core::resources::{
    ComputeInstance, ContainerCluster, DatabaseInstance, RegionMap, ResourceKind, StorageBucket,
    parse_resource_kind,
};
use cloudview_client_core::store::{FileKeyValueStore, STORE_FILE_NAME};
use cloudview_listing_client::{
    DEFAULT_TIMEOUT_MS, ListingClient, ListingClientConfig, ListingEndpoint,
    resolve_listing_base_url,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(name = "cloudview")]
#[command(about = "Operator CLI for cached cloud resource listings")]
pub struct CloudviewCli {
    /// Listing API base url; falls back to CLOUDVIEW_LISTING_BASE_URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Path of the persistent snapshot store
    #[arg(long)]
    pub store: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Print the persisted snapshot for one resource kind (no network)
    Show { kind: String },
    /// Fetch the listing endpoint and replace the persisted snapshot
    Refresh { kind: String },
    /// Drop the persisted snapshot for one resource kind
    Purge { kind: String },
    /// Summarize cache state for all resource kinds
    Status,
}

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    execute(CloudviewCli::parse()).await
}

pub async fn execute(cli: CloudviewCli) -> Result<()> {
    let store = FileKeyValueStore::open(store_path(cli.store.clone()));
    match &cli.command {
        Commands::Show { kind } => show(&store, resolve_kind(kind)?),
        Commands::Refresh { kind } => {
            let kind = resolve_kind(kind)?;
            match kind {
                ResourceKind::Instances => refresh::<ComputeInstance>(&cli, &store, kind).await,
                ResourceKind::Databases => refresh::<DatabaseInstance>(&cli, &store, kind).await,
                ResourceKind::Clusters => refresh::<ContainerCluster>(&cli, &store, kind).await,
                ResourceKind::Buckets => refresh::<StorageBucket>(&cli, &store, kind).await,
            }
        }
        Commands::Purge { kind } => purge(&store, resolve_kind(kind)?),
        Commands::Status => status(&store),
    }
}

fn resolve_kind(raw: &str) -> Result<ResourceKind> {
    parse_resource_kind(raw)
        .with_context(|| format!("unknown resource kind: {raw} (try ec2, rds, eks, or s3)"))
}

fn store_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Some(mut dir) = dirs::data_local_dir() {
        dir.push("cloudview");
        dir.push(STORE_FILE_NAME);
        return dir;
    }
    PathBuf::from(STORE_FILE_NAME)
}

/// Offline stand-in for pages that never fetch.
struct NoListing;

#[async_trait(?Send)]
impl<T> RegionListing<T> for NoListing {
    async fn list_by_region(&self) -> Result<RegionMap<T>, ListingError> {
        Err(ListingError::Request {
            message: "no listing transport configured".to_string(),
        })
    }
}

fn offline_cache(
    store: &FileKeyValueStore,
    kind: ResourceKind,
) -> ResourceCache<serde_json::Value, &FileKeyValueStore, NoListing> {
    ResourceCache::new(kind, CachePolicy::default(), store, NoListing)
}

fn show(store: &FileKeyValueStore, kind: ResourceKind) -> Result<()> {
    let mut cache = offline_cache(store, kind);
    cache.hydrate();
    println!("{}", summary_line(&cache));
    if cache.status() == CacheStatus::Empty {
        return Ok(());
    }
    let rendered =
        serde_json::to_string_pretty(cache.snapshot()).context("render snapshot as JSON")?;
    println!("{rendered}");
    Ok(())
}

async fn refresh<T>(cli: &CloudviewCli, store: &FileKeyValueStore, kind: ResourceKind) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let base_url = resolve_listing_base_url(cli.base_url.as_deref()).context(
        "a listing base url is required (--base-url or CLOUDVIEW_LISTING_BASE_URL)",
    )?;
    let mut config = ListingClientConfig::new(base_url);
    config.timeout_ms = cli.timeout_ms;
    let client = ListingClient::new(config)?;

    let mut cache = ResourceCache::new(
        kind,
        CachePolicy::default(),
        store,
        ListingEndpoint::<T>::new(client, kind),
    );
    cache.hydrate();
    let snapshot = cache
        .refresh()
        .await
        .with_context(|| format!("failed to refresh {}", kind.label()))?;

    let records: usize = snapshot.values().map(Vec::len).sum();
    println!(
        "{}: fetched {} records across {} regions",
        kind.label(),
        records,
        snapshot.len()
    );
    Ok(())
}

fn purge(store: &FileKeyValueStore, kind: ResourceKind) -> Result<()> {
    let mut cache = offline_cache(store, kind);
    cache.purge();
    println!("{}: persisted snapshot dropped", kind.label());
    Ok(())
}

fn status(store: &FileKeyValueStore) -> Result<()> {
    for kind in ResourceKind::ALL {
        let mut cache = offline_cache(store, kind);
        cache.hydrate();
        println!("{}", summary_line(&cache));
    }
    Ok(())
}

fn summary_line(
    cache: &ResourceCache<serde_json::Value, &FileKeyValueStore, NoListing>,
) -> String {
    let kind = cache.kind();
    let regions = cache.snapshot().len();
    let records: usize = cache.snapshot().values().map(Vec::len).sum();
    let fetched = match cache.fetched_at() {
        Some(at) => format!("fetched {}", at.to_rfc3339()),
        None => "fetch time unknown".to_string(),
    };
    let staleness = if cache.is_stale(Utc::now()) {
        "stale"
    } else {
        "fresh"
    };
    format!(
        "{}: {} ({} regions, {} records, {}, {})",
        kind.label(),
        cache.status().as_str(),
        regions,
        records,
        fetched,
        staleness
    )
}
