use anyhow::{Context, Result};
use clap::Parser;
use influencer_admin::brmh::BrmhClient;
use influencer_admin::cache::SearchCache;
use influencer_admin::catalog::Catalog;
use influencer_admin::config;
use influencer_admin::http::{self, AppState};
use influencer_admin::shopify::{CommerceService, ShopifyClient};
use influencer_admin::store::Repository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "influencer-admin", about = "Influencer marketing admin service")]
struct Args {
    /// Path to the YAML config file (defaults to ./config.yaml).
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref()).context("failed to load configuration")?;
    cfg.ensure_dirs().context("failed to create data directory")?;

    if cfg.shopify.webhook_secret.is_empty() {
        warn!("shopify.webhook_secret is empty, webhook signatures will not be verified");
    }

    let brmh = BrmhClient::new(&cfg.brmh.base_url, cfg.brmh.item_per_page)?;
    let repo = Repository::new(Arc::new(brmh), cfg.brmh.tables.clone());

    let commerce: Arc<dyn CommerceService> = Arc::new(ShopifyClient::new(&cfg.shopify)?);
    let cache = SearchCache::new(Path::new(&cfg.app.data_dir), cfg.app.cache_ttl_secs);
    let catalog = Catalog::new(commerce.clone(), cache);

    let state = Arc::new(AppState {
        repo,
        commerce,
        catalog,
        webhook_secret: cfg.shopify.webhook_secret.clone(),
    });
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.app.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.app.bind_addr))?;
    info!(addr = %cfg.app.bind_addr, "admin service listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
