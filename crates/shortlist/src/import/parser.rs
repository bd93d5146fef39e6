use std::io::Read;

use super::normalizer::normalize_header;

/// One CSV data row with its headers, before any interpretation.
#[derive(Debug)]
pub(crate) struct RawListing {
    pub(crate) line: u64,
    /// `(original header, normalized header, value)`; blank values are dropped.
    pub(crate) cells: Vec<(String, String, String)>,
}

impl RawListing {
    pub(crate) fn value(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(_, normalized, _)| normalized == column)
            .map(|(_, _, value)| value.as_str())
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<(Vec<String>, Vec<RawListing>), csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let normalized: Vec<String> = headers.iter().map(|header| normalize_header(header)).collect();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or_default();
        let cells = headers
            .iter()
            .zip(&normalized)
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|((header, normalized), value)| {
                (header.clone(), normalized.clone(), value.to_string())
            })
            .collect();
        rows.push(RawListing { line, cells });
    }

    Ok((normalized, rows))
}
