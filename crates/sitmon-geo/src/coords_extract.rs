use regex::Regex;
use std::sync::OnceLock;

fn decimal_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(-?\d{1,2}\.\d+)\s*,\s*(-?\d{1,3}\.\d+)").unwrap())
}

fn decimal_hem_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2}(?:\.\d+)?)\s*([NS])\s*[, ]\s*(\d{1,3}(?:\.\d+)?)\s*([EW])").unwrap()
    })
}

fn degmin_hem_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d{1,2})[- ](\d{1,2}(?:\.\d+)?)\s*([NS])\s*[, ]\s*(\d{1,3})[- ](\d{1,2}(?:\.\d+)?)\s*([EW])",
        )
        .unwrap()
    })
}

/// Every `(lat, lon)` pair found in `text`, degree-minute/hemisphere patterns first, then
/// decimal-with-hemisphere, then bare decimal pairs — matching the source's scan order.
pub fn extract_coords(text: &str) -> Vec<(f64, f64)> {
    let mut coords = Vec::new();

    for caps in degmin_hem_pair_re().captures_iter(text) {
        let lat_deg: f64 = caps[1].parse().unwrap_or(0.0);
        let lat_min: f64 = caps[2].parse().unwrap_or(0.0);
        let mut lat = lat_deg + lat_min / 60.0;
        if caps[3].eq_ignore_ascii_case("s") {
            lat = -lat;
        }
        let lon_deg: f64 = caps[4].parse().unwrap_or(0.0);
        let lon_min: f64 = caps[5].parse().unwrap_or(0.0);
        let mut lon = lon_deg + lon_min / 60.0;
        if caps[6].eq_ignore_ascii_case("w") {
            lon = -lon;
        }
        coords.push((lat, lon));
    }

    for caps in decimal_hem_pair_re().captures_iter(text) {
        let mut lat: f64 = caps[1].parse().unwrap_or(0.0);
        if caps[2].eq_ignore_ascii_case("s") {
            lat = -lat;
        }
        let mut lon: f64 = caps[3].parse().unwrap_or(0.0);
        if caps[4].eq_ignore_ascii_case("w") {
            lon = -lon;
        }
        coords.push((lat, lon));
    }

    for caps in decimal_pair_re().captures_iter(text) {
        let lat: f64 = caps[1].parse().unwrap_or(0.0);
        let lon: f64 = caps[2].parse().unwrap_or(0.0);
        coords.push((lat, lon));
    }

    coords
}

pub fn extract_decimal_coords(text: &str) -> Option<(f64, f64)> {
    let caps = decimal_pair_re().captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Centroid of every coordinate pair found in `text`, or `None` if none were found.
pub fn extract_coords_centroid(text: &str) -> Option<(f64, f64)> {
    let coords = extract_coords(text);
    if coords.is_empty() {
        return None;
    }
    let n = coords.len() as f64;
    let lat = coords.iter().map(|c| c.0).sum::<f64>() / n;
    let lon = coords.iter().map(|c| c.1).sum::<f64>() / n;
    Some((lat, lon))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_plain_decimal_pair() {
        let got = extract_decimal_coords("epicenter near 35.68, 139.69 reported").unwrap();
        assert!((got.0 - 35.68).abs() < 1e-9);
        assert!((got.1 - 139.69).abs() < 1e-9);
    }

    #[test]
    fn extracts_hemisphere_pair() {
        let coords = extract_coords("position 12.5N, 45.2W observed");
        assert_eq!(coords.len(), 1);
        assert!((coords[0].0 - 12.5).abs() < 1e-9);
        assert!((coords[0].1 - (-45.2)).abs() < 1e-9);
    }

    #[test]
    fn no_coords_returns_none() {
        assert!(extract_decimal_coords("no coordinates here").is_none());
        assert!(extract_coords_centroid("no coordinates here").is_none());
    }
}
