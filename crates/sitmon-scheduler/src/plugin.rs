use std::sync::Arc;

use sitmon_model::{Item, Source, SourceType};
use sitmon_parsers::RawRecord;

/// Every parser shares this shape regardless of wire format (spec.md §4.4).
pub type ParseFn = fn(&[u8]) -> sitmon_parsers::Result<Vec<RawRecord>>;

/// Normalizer functions are heterogeneous in their input type and some close over extra
/// state (an advice level, a volcano name), so they're boxed rather than plain fn pointers.
pub type NormalizeFn = Arc<dyn Fn(&RawRecord) -> Option<Item> + Send + Sync>;

/// `build_url(source)` injects secrets, date windows, or continuation cursors into the
/// static URL ahead of a cycle's fetch (spec.md §4.6 work-unit step 1), reading whatever
/// schedule state (`cursor`, `last_success_at`) the plugin needs off the source row.
pub type BuildUrlFn = Arc<dyn Fn(&Source) -> String + Send + Sync>;

/// Credentials for an authenticated social adapter (spec.md §4.6 work-unit step 2):
/// a prior POST to `login_url` trades `identifier`/`password` for a session token that
/// is then sent as a bearer header on the real fetch.
#[derive(Clone)]
pub struct SessionAuth {
    pub login_url: String,
    pub identifier: String,
    pub password: String,
}

/// A single polled feed: how to fetch it, parse it, and turn each record into an `Item`.
#[derive(Clone)]
pub struct Plugin {
    pub source_id: String,
    pub name: String,
    pub url: String,
    pub source_type: SourceType,
    pub poll_interval_seconds: i64,
    pub parse: ParseFn,
    pub normalize: NormalizeFn,
    pub default_enabled: bool,
    /// Extra request headers beyond User-Agent/Accept/conditional validators.
    pub headers: Vec<(String, String)>,
    /// Cursored feeds (social timelines) remember the newest ID fetched last cycle.
    pub cursored: bool,
    /// Rewrites the static URL for this cycle (date windows, secrets, cursors).
    pub build_url: Option<BuildUrlFn>,
    /// Set for adapters that must obtain a session token before the real fetch.
    pub session_auth: Option<SessionAuth>,
}

impl Plugin {
    pub fn new(
        source_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        source_type: SourceType,
        poll_interval_seconds: i64,
        parse: ParseFn,
        normalize: NormalizeFn,
    ) -> Self {
        Plugin {
            source_id: source_id.into(),
            name: name.into(),
            url: url.into(),
            source_type,
            poll_interval_seconds,
            parse,
            normalize,
            default_enabled: true,
            headers: Vec::new(),
            cursored: false,
            build_url: None,
            session_auth: None,
        }
    }
}
