/// Bounding box in `(min_lon, min_lat, max_lon, max_lat)` order, the incident `bbox` column shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bbox {
    pub fn centroid(&self) -> (f64, f64) {
        ((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }

    pub fn merge(&self, other: &Bbox) -> Bbox {
        Bbox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// `"min_lon,min_lat,max_lon,max_lat"`, the stored column format.
    pub fn to_column(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    pub fn from_column(s: &str) -> Option<Bbox> {
        let mut parts = s.split(',');
        Some(Bbox {
            min_lon: parts.next()?.parse().ok()?,
            min_lat: parts.next()?.parse().ok()?,
            max_lon: parts.next()?.parse().ok()?,
            max_lat: parts.next()?.parse().ok()?,
        })
    }
}

/// Extract the bbox from a GeoJSON `geometry` value. Supports Point/Polygon/MultiPolygon/
/// LineString/MultiLineString, mirroring the shapes the normalizers actually emit.
pub fn bbox_from_geojson(geom: &serde_json::Value) -> Option<Bbox> {
    let geom_type = geom.get("type")?.as_str()?;
    let coords = geom.get("coordinates")?;

    let mut points: Vec<(f64, f64)> = Vec::new();
    match geom_type {
        "Point" => {
            let arr = coords.as_array()?;
            points.push((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?));
        }
        "Polygon" => collect_rings(coords.as_array()?, &mut points)?,
        "MultiPolygon" => {
            for polygon in coords.as_array()? {
                collect_rings(polygon.as_array()?, &mut points)?;
            }
        }
        "LineString" => collect_points(coords.as_array()?, &mut points)?,
        "MultiLineString" => {
            for line in coords.as_array()? {
                collect_points(line.as_array()?, &mut points)?;
            }
        }
        _ => return None,
    }

    if points.is_empty() {
        return None;
    }
    let min_lon = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let min_lat = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_lon = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let max_lat = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    Some(Bbox { min_lon, min_lat, max_lon, max_lat })
}

fn collect_rings(rings: &[serde_json::Value], out: &mut Vec<(f64, f64)>) -> Option<()> {
    for ring in rings {
        collect_points(ring.as_array()?, out)?;
    }
    Some(())
}

fn collect_points(points: &[serde_json::Value], out: &mut Vec<(f64, f64)>) -> Option<()> {
    for point in points {
        let arr = point.as_array()?;
        out.push((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?));
    }
    Some(())
}

/// Great-circle distance in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bbox_from_point() {
        let geom = serde_json::json!({"type": "Point", "coordinates": [139.0, 35.0]});
        let bbox = bbox_from_geojson(&geom).unwrap();
        assert_eq!(bbox, Bbox { min_lon: 139.0, min_lat: 35.0, max_lon: 139.0, max_lat: 35.0 });
    }

    #[test]
    fn bbox_column_round_trips() {
        let bbox = Bbox { min_lon: 1.0, min_lat: 2.0, max_lon: 3.0, max_lat: 4.0 };
        assert_eq!(Bbox::from_column(&bbox.to_column()).unwrap(), bbox);
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        assert!(haversine_km(35.0, 139.0, 35.0, 139.0) < 1e-9);
    }

    #[test]
    fn haversine_matches_known_distance_tokyo_osaka() {
        // ~400km between Tokyo and Osaka, allow a generous tolerance.
        let dist = haversine_km(35.6895, 139.6917, 34.6937, 135.5023);
        assert!((350.0..450.0).contains(&dist), "got {dist}");
    }
}
