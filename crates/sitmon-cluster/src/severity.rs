use sitmon_model::Category;

/// Deterministic severity formula over an item's raw payload.
pub fn severity_score(category: Category, raw: &serde_json::Value) -> f64 {
    match category {
        Category::Earthquake => match raw.get("mag").and_then(|v| v.as_f64()) {
            Some(mag) => ((mag - 3.0) * 20.0).round().clamp(0.0, 100.0),
            None => 40.0,
        },
        Category::WeatherAlert => match raw.get("severity").and_then(|v| v.as_str()) {
            Some("Extreme") => 95.0,
            Some("Severe") => 80.0,
            Some("Moderate") => 55.0,
            Some("Minor") => 35.0,
            _ => 50.0,
        },
        Category::TropicalCyclone => 75.0,
        Category::TravelAdvisory => match raw.get("advice_level").and_then(|v| v.as_str()) {
            Some("do_not_travel") => 85.0,
            Some("reconsider_your_need_to_travel") => 65.0,
            _ => 50.0,
        },
        Category::Tsunami => 90.0,
        Category::Volcano => {
            let level = raw
                .get("severity_level_1_5")
                .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())));
            match level {
                Some(level) => ((level * 20) as f64).clamp(0.0, 100.0),
                None => 70.0,
            }
        }
        Category::Wildfire => match raw.get("frp").and_then(|v| v.as_f64()) {
            Some(frp) => (frp * 3.0).round().clamp(0.0, 100.0),
            None => 55.0,
        },
        Category::AviationDisruption => {
            match raw.get("severity_kind").and_then(|v| v.as_str()) {
                Some("closure") => 90.0,
                Some("ground_stop") => 80.0,
                Some("gdp") => 65.0,
                _ => match raw.get("avg_delay_min").and_then(|v| v.as_i64()) {
                    Some(avg) => (avg as f64).clamp(40.0, 80.0),
                    None => 50.0,
                },
            }
        }
        Category::HealthAdvisory => 55.0,
        Category::CyberKev => 75.0,
        Category::CyberCve => 60.0,
        Category::Disaster => 60.0,
        Category::News | Category::Social | Category::MaritimeWarning => 40.0,
    }
}

/// Category-specific shaping of the incident `summary` column (spec.md §4.7).
pub fn incident_summary_from_item(category: Category, title: &str, summary: &str) -> String {
    match category {
        Category::Earthquake
        | Category::TropicalCyclone
        | Category::TravelAdvisory
        | Category::CyberCve
        | Category::CyberKev => title.to_owned(),
        _ if summary.trim().is_empty() => title.to_owned(),
        _ => summary.to_owned(),
    }
}

/// First six `[a-z0-9]+` tokens of the casefolded summary, space-joined.
pub fn token_signature(summary: &str) -> String {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"[a-z0-9]+").unwrap());
    re.find_iter(&summary.to_lowercase())
        .take(6)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earthquake_severity_scales_with_magnitude() {
        let raw = serde_json::json!({"mag": 6.0});
        assert_eq!(severity_score(Category::Earthquake, &raw), 60.0);
    }

    #[test]
    fn earthquake_severity_clamps_to_zero_for_small_quakes() {
        let raw = serde_json::json!({"mag": 1.0});
        assert_eq!(severity_score(Category::Earthquake, &raw), 0.0);
    }

    #[test]
    fn weather_alert_extreme_is_ninety_five() {
        let raw = serde_json::json!({"severity": "Extreme"});
        assert_eq!(severity_score(Category::WeatherAlert, &raw), 95.0);
    }

    #[test]
    fn wildfire_falls_back_without_frp() {
        let raw = serde_json::json!({});
        assert_eq!(severity_score(Category::Wildfire, &raw), 55.0);
    }

    #[test]
    fn token_signature_caps_at_six_tokens() {
        let sig = token_signature("M 6.1 earthquake strikes near Oaxaca Mexico today evening");
        assert_eq!(sig, "m 6 1 earthquake strikes near");
    }
}
