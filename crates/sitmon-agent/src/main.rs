use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::FutureExt;

/// Situation Monitor is a situational-awareness aggregator: it polls a heterogeneous set
/// of public feeds, normalizes records into a uniform item schema, clusters items into
/// incidents, and streams incident updates over SSE.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file.
    #[clap(long = "db-path", env = "DATABASE_PATH", default_value = "./situation-monitor.db")]
    db_path: String,
    /// Port the read API and SSE endpoint listen on.
    #[clap(long = "api-port", env = "API_PORT", default_value = "8080")]
    api_port: u16,
    /// User-Agent header sent on every outbound fetch.
    #[clap(
        long = "user-agent",
        env = "USER_AGENT",
        default_value = "situation-monitor/0.1 (+https://situation-monitor.dev)"
    )]
    user_agent: String,
    /// Default map tile URL template, handed to the (out-of-scope) map UI via AppConfig.
    #[clap(
        long = "map-tile-url",
        env = "MAP_TILE_URL",
        default_value = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"
    )]
    map_tile_url: String,
    /// Directory holding the gazetteer's country/admin1/populated-place corpora.
    #[clap(long = "gazetteer-data-dir", env = "GAZETTEER_DATA_DIR")]
    gazetteer_data_dir: Option<String>,
    /// NASA FIRMS API key, required to enable the VIIRS hotspot CSV feed.
    #[clap(long = "firms-map-key", env = "FIRMS_MAP_KEY")]
    firms_map_key: Option<String>,
    /// NVD API key, used by the (disabled-by-default) CVE feed's `build_url` date window.
    #[clap(long = "nvd-api-key", env = "NVD_API_KEY")]
    nvd_api_key: Option<String>,
    /// Bluesky handle, for the (disabled-by-default) authenticated social search feed.
    #[clap(long = "bluesky-handle", env = "BLUESKY_HANDLE")]
    bluesky_handle: Option<String>,
    /// Bluesky app password, paired with `bluesky_handle`.
    #[clap(long = "bluesky-app-password", env = "BLUESKY_APP_PASSWORD")]
    bluesky_app_password: Option<String>,
    /// Days an item is retained once its incident is no longer active/cooling.
    #[clap(long = "items-retention-days", env = "ITEMS_RETENTION_DAYS", default_value = "30")]
    items_retention_days: i64,
    /// Days a resolved incident is retained before deletion.
    #[clap(long = "incidents-retention-days", env = "INCIDENTS_RETENTION_DAYS", default_value = "14")]
    incidents_retention_days: i64,
}

fn main() -> Result<(), anyhow::Error> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(?args, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}

async fn async_main(args: Args) -> Result<(), anyhow::Error> {
    let api_listener = tokio::net::TcpListener::bind(format!("[::]:{}", args.api_port))
        .await
        .context("failed to bind API port")?;

    let store = Arc::new(sitmon_store::Store::open(&args.db_path).context("opening store")?);

    store
        .with_conn(|conn| {
            sitmon_store::queries::config::set(conn, "map_tile_url", &args.map_tile_url)?;
            sitmon_store::queries::config::set(
                conn,
                "items_retention_days",
                &args.items_retention_days.to_string(),
            )?;
            sitmon_store::queries::config::set(
                conn,
                "incidents_retention_days",
                &args.incidents_retention_days.to_string(),
            )?;
            Ok(())
        })
        .context("seeding AppConfig")?;

    if let Some(data_dir) = &args.gazetteer_data_dir {
        sitmon_geo::seed_places(&store, std::path::Path::new(data_dir)).context("seeding gazetteer")?;
    }

    let mut plugins = sitmon_scheduler::default_plugins();
    if let Some(firms_key) = &args.firms_map_key {
        for plugin in &mut plugins {
            if plugin.url.contains("__FIRMS_MAP_KEY__") {
                plugin.url = plugin.url.replace("__FIRMS_MAP_KEY__", firms_key);
                plugin.default_enabled = true;
            }
        }
    }
    if let Some(nvd_api_key) = &args.nvd_api_key {
        for plugin in &mut plugins {
            if plugin.source_id == "nvd_recent_cves" {
                plugin.default_enabled = true;
                plugin.headers.push(("apiKey".to_string(), nvd_api_key.clone()));
            }
        }
    }
    if let (Some(handle), Some(app_password)) = (&args.bluesky_handle, &args.bluesky_app_password) {
        sitmon_scheduler::attach_bluesky_credentials(&mut plugins, handle.clone(), app_password.clone());
    }

    sitmon_scheduler::ensure_sources(&store, &plugins).context("registering default sources")?;
    let registry = Arc::new(sitmon_scheduler::PluginRegistry::new(plugins));
    let bus = Arc::new(sitmon_bus::EventBus::new());

    let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();

    let api_router = sitmon_api::build_router(store.clone(), bus.clone());
    let api_server = axum::serve(api_listener, api_router).with_graceful_shutdown(shutdown.clone());
    let api_server = async move { anyhow::Result::Ok(api_server.await?) };

    let scheduler = sitmon_scheduler::run(store.clone(), bus.clone(), registry, args.user_agent, shutdown.clone());
    let scheduler = scheduler.map(anyhow::Result::Ok);

    let ((), ()) = tokio::try_join!(scheduler, api_server)?;

    Ok(())
}
