use indexmap::IndexMap;
use serde_json::Value;

/// A GeoJSON-style point or polygon geometry, carried through as raw JSON so that
/// downstream normalizers can reuse `sitmon_geo::bbox_from_geojson` directly.
pub type Geometry = Value;

/// A single syndicated-feed entry (RSS `<item>` or Atom `<entry>`).
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub geom: Option<Geometry>,
}

/// A generic `<item>`-shaped XML record (NHC, GDACS, tsunami/volcano feeds).
#[derive(Debug, Clone, Default)]
pub struct XmlItem {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub georss: Option<Geometry>,
    pub links: Vec<String>,
}

/// One CAP `<alert>`, flattened to its first `<info>` block per the source feeds,
/// which never emit more than one language/info per alert.
#[derive(Debug, Clone, Default)]
pub struct CapAlert {
    pub identifier: Option<String>,
    pub sent: Option<String>,
    pub status: Option<String>,
    pub msg_type: Option<String>,
    pub event: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub area_desc: Option<String>,
    pub geom: Option<Geometry>,
}

/// The closed set of shapes a feed fetch can be parsed into. Families that don't map
/// cleanly onto a shape of their own (FAA airport status, GOV.UK travel advice index)
/// are represented as `Json`, built to mirror the upstream record's own key layout.
#[derive(Debug, Clone)]
pub enum RawRecord {
    GeoJsonFeature(Value),
    Feed(FeedEntry),
    Xml(XmlItem),
    Cap(CapAlert),
    Csv(IndexMap<String, String>),
    Json(Value),
}
