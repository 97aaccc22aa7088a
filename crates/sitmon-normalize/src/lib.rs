pub mod builder;
pub mod error;
mod families;
mod helpers;
pub mod location;
pub mod simhash;
pub mod text;

pub use builder::{build_item, NewItem};
pub use error::{NormalizeError, Result};
pub use location::Location;
pub use simhash::{hamming_distance, i64_to_u64, sha256_hex, simhash64, token_jaccard, u64_to_i64};
pub use text::{canonicalize_url, normalize_title};

pub use families::aviation::normalize_faa_airport_disruption;
pub use families::cyber::{normalize_cisa_kev, normalize_nvd_cve};
pub use families::cyclone::normalize_nhc_item;
pub use families::disaster::{
    normalize_eonet_event, normalize_gdacs_rss, normalize_reliefweb_disaster, normalize_reliefweb_report,
};
pub use families::earthquake::normalize_usgs_earthquake;
pub use families::maritime::normalize_msi_broadcast_warning;
pub use families::rss_generic::{normalize_country_level_rss, normalize_generic_rss};
pub use families::social::{normalize_bluesky_post, normalize_mastodon_status};
pub use families::travel::{
    normalize_govuk_travel_advice, normalize_smartraveller_export, normalize_smartraveller_rss,
};
pub use families::tsunami::{normalize_tsunami_atom, normalize_tsunami_cap};
pub use families::volcano::{normalize_hans_elevated_notice, normalize_hans_volcano_rss_item};
pub use families::weather::normalize_nws_alert;
pub use families::wildfire::normalize_firms_hotspot;
