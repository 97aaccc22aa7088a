use serde_json::{json, Value};

use crate::error::Result;
use crate::record::RawRecord;
use crate::xmltree;

/// Parses the FAA airport-status feed, keeping only airports currently reporting a
/// delay. Shaped as `Json` because the record layout (flat dict, nested `Status`
/// block flattened into top-level keys) doesn't match any of the other record kinds.
pub fn parse_faa_airport_status(data: &[u8]) -> Result<Vec<RawRecord>> {
    let root = xmltree::parse(data)?;
    let mut out = Vec::new();

    for airport in root.find_all("AirportStatus") {
        let status = airport.find("Status");
        let delay_text = status.and_then(|s| s.findtext("Delay"));
        let delay = delay_text.map(|d| d.trim().eq_ignore_ascii_case("true")).unwrap_or(false);
        if !delay {
            continue;
        }

        let record: Value = json!({
            "name": airport.findtext("Name").unwrap_or(""),
            "iata": airport.findtext("IATA").unwrap_or(""),
            "icao": airport.findtext("ICAO").unwrap_or(""),
            "city": airport.findtext("City").unwrap_or(""),
            "state": airport.findtext("State").unwrap_or(""),
            "reason": status.and_then(|s| s.findtext("Reason")),
            "delay": delay,
            "avg_delay": status.and_then(|s| s.findtext("AvgDelay")),
            "trend": status.and_then(|s| s.findtext("Trend")),
            "type": status.and_then(|s| s.findtext("Type")),
            "program": status.and_then(|s| s.findtext("Program")),
            "end_time": status.and_then(|s| s.findtext("EndTime")),
            "update_time": airport.findtext("UpdateTime"),
        });
        out.push(RawRecord::Json(record));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_airports_without_delay() {
        let data = br#"<AirportStatuses>
            <AirportStatus><Name>Calm</Name><IATA>CLM</IATA><Status><Delay>false</Delay></Status></AirportStatus>
            <AirportStatus><Name>Busy</Name><IATA>BSY</IATA><Status><Delay>true</Delay><Reason>Weather</Reason></Status><UpdateTime>Mon Jan 01 00:00:00 2024 UTC</UpdateTime></AirportStatus>
        </AirportStatuses>"#;
        let records = parse_faa_airport_status(data).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Json(v) => assert_eq!(v["iata"], "BSY"),
            _ => panic!("expected json record"),
        }
    }
}
