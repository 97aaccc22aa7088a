mod atom;
mod cap;
mod csv;
mod dates;
mod error;
mod faa;
mod geojson;
mod govuk;
mod json;
mod record;
mod rss;
mod xml;
mod xmltree;

pub use atom::parse_atom;
pub use cap::parse_cap;
pub use csv::parse_csv_records;
pub use error::{ParseError, Result};
pub use faa::parse_faa_airport_status;
pub use geojson::parse_geojson;
pub use govuk::parse_govuk_travel_advice_index;
pub use json::parse_json_records;
pub use record::{CapAlert, FeedEntry, Geometry, RawRecord, XmlItem};
pub use rss::parse_rss;
pub use xml::parse_xml_georss;
