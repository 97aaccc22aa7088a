use indexmap::IndexMap;

use crate::error::Result;
use crate::record::RawRecord;

/// Parses a UTF-8 (lossy) CSV body into one `IndexMap` per data row, keyed by header.
/// Used for the FIRMS wildfire-hotspot feed, which ships as plain CSV.
pub fn parse_csv_records(data: &[u8]) -> Result<Vec<RawRecord>> {
    let text = String::from_utf8_lossy(data);
    let mut reader = ::csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = IndexMap::with_capacity(headers.len());
        for (key, value) in headers.iter().zip(record.iter()) {
            row.insert(key.to_string(), value.to_string());
        }
        out.push(RawRecord::Csv(row));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_into_maps() {
        let data = b"latitude,longitude,brightness\n10.5,20.5,330.2\n";
        let records = parse_csv_records(data).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Csv(row) => assert_eq!(row.get("brightness").unwrap(), "330.2"),
            _ => panic!("expected csv record"),
        }
    }
}
