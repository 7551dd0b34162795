use anyhow::{Context, Result};
use clap::Parser;
use parquetize::{
    catalog::{CatalogTrigger, HttpCatalogTrigger, LogOnlyTrigger},
    config::Config,
    event::ObjectCreatedEvent,
    store::FsObjectStore,
    Handler,
};
use std::{io::Read, path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Convert the JSON object named by an object-created event into Parquet.
#[derive(Parser, Debug)]
struct Args {
    /// Event payload file, or `-` for stdin
    #[arg(long, default_value = "-")]
    event: String,

    /// Directory acting as the object store (`<root>/<bucket>/<key>`)
    #[arg(long)]
    store_root: PathBuf,

    /// YAML config; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) config + collaborators ───────────────────────────────────
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let catalog: Arc<dyn CatalogTrigger> = match &config.catalog_endpoint {
        Some(endpoint) => Arc::new(
            HttpCatalogTrigger::new(reqwest::Client::new(), endpoint)
                .context("configuring catalog trigger")?,
        ),
        None => Arc::new(LogOnlyTrigger),
    };
    let store = Arc::new(FsObjectStore::new(&args.store_root));
    info!(root = %store.root().display(), prefix = %config.output_prefix, "startup");
    let handler = Handler::from_config(store, catalog, &config)?;

    // ─── 3) read event + run ─────────────────────────────────────────
    let payload = read_event(&args.event)?;
    let event = ObjectCreatedEvent::from_slice(&payload)?;
    let response = handler.handle(&event).await?;

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn read_event(source: &str) -> Result<Vec<u8>> {
    if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading event from stdin")?;
        Ok(buf)
    } else {
        std::fs::read(source).with_context(|| format!("reading event file {source}"))
    }
}
