pub mod coords_extract;
pub mod gazetteer;
pub mod geometry;

pub use coords_extract::{extract_coords, extract_coords_centroid, extract_decimal_coords};
pub use gazetteer::{
    find_country_centroid, match_country_in_text, match_place_in_text, normalize_place_name,
    seed_places, suggest_places, PlaceMatch,
};
pub use geometry::{bbox_from_geojson, haversine_km, Bbox};
