//! The scheduler (spec.md §4.6): a single long-running task that picks due sources,
//! fetches/parses/normalizes/inserts/clusters/publishes each one under two semaphores
//! (global concurrency, per-host concurrency), and drives hourly retention.

pub mod plugin;
pub mod registry;
mod retention;
mod work_unit;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep, Duration};

use sitmon_bus::EventBus;
use sitmon_store::{queries, Store};

pub use plugin::{Plugin, SessionAuth};
pub use registry::{attach_bluesky_credentials, default_plugins, ensure_sources};

const GLOBAL_CONCURRENCY: usize = 4;
const MAX_DUE_PER_CYCLE: i64 = 12;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const POLLING_DISABLED_SLEEP: Duration = Duration::from_secs(2);
const RETENTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shared, mutex-guarded plugin registry. Most adapters are static; a handful expand or
/// contract it at runtime (the HANS elevated-volcano list spawns one RSS plugin per
/// currently-elevated volcano and disables the ones that drop off the list).
pub struct PluginRegistry {
    plugins: Mutex<Vec<Plugin>>,
}

impl PluginRegistry {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        PluginRegistry { plugins: Mutex::new(plugins) }
    }

    pub async fn snapshot(&self) -> Vec<Plugin> {
        self.plugins.lock().await.clone()
    }

    pub async fn get(&self, source_id: &str) -> Option<Plugin> {
        self.plugins.lock().await.iter().find(|p| p.source_id == source_id).cloned()
    }

    /// Registers a newly-discovered plugin if not already present, and disables any
    /// tracked plugin whose source_id is not in `still_present` (spec.md §4.6 step 10).
    pub async fn reconcile_dynamic_family(
        &self,
        store: &Store,
        family_prefix: &str,
        discovered: Vec<Plugin>,
    ) -> sitmon_store::Result<()> {
        let mut plugins = self.plugins.lock().await;
        let discovered_ids: std::collections::HashSet<&str> =
            discovered.iter().map(|p| p.source_id.as_str()).collect();

        for plugin in discovered {
            if !plugins.iter().any(|p| p.source_id == plugin.source_id) {
                store.with_conn(|conn| {
                    queries::sources::register(
                        conn,
                        &sitmon_model::Source {
                            source_id: plugin.source_id.clone(),
                            name: plugin.name.clone(),
                            source_type: plugin.source_type,
                            url: plugin.url.clone(),
                            poll_interval_seconds: plugin.poll_interval_seconds,
                            enabled: plugin.default_enabled,
                            etag: None,
                            last_modified: None,
                            next_fetch_at: None,
                            last_fetch_at: None,
                            last_success_at: None,
                            last_error_at: None,
                            consecutive_failures: 0,
                            last_status_code: None,
                            last_fetch_ms: None,
                            last_error: None,
                            success_count: 0,
                            error_count: 0,
                            cursor: None,
                        },
                    )
                })?;
                plugins.push(plugin);
            }
        }

        let mut stale_ids = Vec::new();
        for plugin in plugins.iter() {
            if plugin.source_id.starts_with(family_prefix) && !discovered_ids.contains(plugin.source_id.as_str())
            {
                stale_ids.push(plugin.source_id.clone());
            }
        }
        for source_id in &stale_ids {
            store.with_conn(|conn| {
                conn.execute(
                    "UPDATE sources SET enabled = 0 WHERE source_id = ?1;",
                    rusqlite::params![source_id],
                )?;
                Ok(())
            })?;
        }
        plugins.retain(|p| !stale_ids.contains(&p.source_id));
        Ok(())
    }
}

/// Per-host semaphores, created lazily so the map doesn't need the full host set upfront.
#[derive(Default)]
struct HostLimiter {
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    async fn acquire(&self, host: &str) -> tokio::sync::OwnedSemaphorePermit {
        let sem = {
            let mut hosts = self.hosts.lock().await;
            hosts
                .entry(host.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned().await.expect("host semaphore never closed")
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| url.to_string())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Runs the scheduler loop until `shutdown` resolves. `user_agent` is sent on every fetch;
/// `data_dir` is unused here but kept for symmetry with the binary's gazetteer seeding call.
pub async fn run(
    store: Arc<Store>,
    bus: Arc<EventBus>,
    registry: Arc<PluginRegistry>,
    user_agent: String,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let client = sitmon_fetch::build_client().expect("failed to build HTTP client");
    let global = Arc::new(Semaphore::new(GLOBAL_CONCURRENCY));
    let host_limiter = Arc::new(HostLimiter::default());
    let mut last_retention = Utc::now();

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("scheduler received shutdown signal, draining in-flight work units");
                break;
            }
            _ = tick(
                &store,
                &bus,
                &registry,
                &client,
                &global,
                &host_limiter,
                &user_agent,
            ) => {}
        }

        if Utc::now().signed_duration_since(last_retention).num_seconds()
            >= RETENTION_INTERVAL.as_secs() as i64
        {
            if let Err(error) = retention::run(&store) {
                tracing::error!(?error, "retention sweep failed");
            }
            last_retention = Utc::now();
        }
    }
}

async fn tick(
    store: &Arc<Store>,
    bus: &Arc<EventBus>,
    registry: &Arc<PluginRegistry>,
    client: &reqwest::Client,
    global: &Arc<Semaphore>,
    host_limiter: &Arc<HostLimiter>,
    user_agent: &str,
) {
    let polling_enabled = store
        .with_conn(|conn| queries::config::polling_enabled(conn))
        .unwrap_or(true);
    if !polling_enabled {
        sleep(POLLING_DISABLED_SLEEP).await;
        return;
    }

    let now = now_iso();
    let due = match store.with_conn(|conn| queries::sources::due(conn, &now, MAX_DUE_PER_CYCLE)) {
        Ok(sources) => sources,
        Err(error) => {
            tracing::error!(?error, "failed to select due sources");
            sleep(IDLE_POLL_INTERVAL).await;
            return;
        }
    };

    if due.is_empty() {
        sleep(IDLE_POLL_INTERVAL).await;
        return;
    }

    let mut handles = Vec::with_capacity(due.len());
    for source in due {
        let Some(plugin) = registry.get(&source.source_id).await else {
            // Source row exists (e.g. a once-dynamic plugin that was disabled) but no
            // live plugin backs it any more; skip silently rather than fail the cycle.
            continue;
        };
        let store = store.clone();
        let bus = bus.clone();
        let client = client.clone();
        let global = global.clone();
        let host_limiter = host_limiter.clone();
        let user_agent = user_agent.to_string();
        let host = host_of(&plugin.url);

        handles.push(tokio::spawn(async move {
            let _global_permit = global.acquire_owned().await.expect("global semaphore never closed");
            let _host_permit = host_limiter.acquire(&host).await;
            work_unit::run(&store, &bus, &client, &plugin, &user_agent).await;
        }));
    }

    for handle in handles {
        if let Err(error) = handle.await {
            tracing::error!(?error, "work unit task panicked");
        }
    }
}
