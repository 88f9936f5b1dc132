//! CSV access for the dashboard's static tables, on top of the `csv` crate.
//!
//! Two flavors exist: the alerts feed, read positionally, and header-keyed
//! tables deserialized straight into typed records. A row that fails to
//! convert is set aside in [`Parsed::rejected`] and the rest are kept.

use std::io;

use crate::coordinates::GeoCoord;
use crate::hotspot::{Alert, ParseSeverityError};
use ::csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const ALERT_COLUMNS: [&str; 7] = [
    "id",
    "name",
    "lat",
    "lon",
    "severity",
    "displaced",
    "confidence",
];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv input has no header line")]
    MissingHeader,
    #[error("table has no `{0}` column")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Csv(#[from] ::csv::Error),
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: column `{column}` is not a number: {value:?}")]
    NotANumber {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: {source}")]
    Severity {
        line: u64,
        #[source]
        source: ParseSeverityError,
    },
    #[error("line {line}: {source}")]
    Record {
        line: u64,
        #[source]
        source: ::csv::Error,
    },
    #[error("failed to flush csv output: {0}")]
    Write(#[source] io::Error),
    #[error("csv output is not utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Rows that converted, plus one error per row that did not.
#[derive(Debug)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rejected: Vec<CsvError>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    fn push(&mut self, row: Result<T, CsvError>) {
        match row {
            Ok(record) => self.records.push(record),
            Err(err) => self.rejected.push(err),
        }
    }
}

fn reader(text: &str) -> ::csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.is_empty())
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |position| position.line())
}

/// Header of `reader`, or [`CsvError::MissingHeader`] when the input has none.
fn read_header(reader: &mut ::csv::Reader<&[u8]>) -> Result<StringRecord, CsvError> {
    let headers = reader.headers()?.clone();
    if is_blank(&headers) {
        return Err(CsvError::MissingHeader);
    }
    Ok(headers)
}

fn number_field(line: u64, column: &'static str, raw: &str) -> Result<f64, CsvError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CsvError::NotANumber {
            line,
            column,
            value: raw.to_string(),
        }),
    }
}

fn alert_from_record(record: &StringRecord) -> Result<Alert, CsvError> {
    let line = line_of(record);
    if record.len() != ALERT_COLUMNS.len() {
        return Err(CsvError::ColumnCount {
            line,
            expected: ALERT_COLUMNS.len(),
            found: record.len(),
        });
    }

    let severity = record[4]
        .parse()
        .map_err(|source| CsvError::Severity { line, source })?;

    Ok(Alert {
        id: record[0].to_string(),
        name: record[1].to_string(),
        coord: GeoCoord::new(
            number_field(line, "lat", &record[2])?,
            number_field(line, "lon", &record[3])?,
        ),
        severity,
        displaced: number_field(line, "displaced", &record[5])?,
        confidence: number_field(line, "confidence", &record[6])?,
    })
}

/// Parses the alerts feed. The header is skipped and columns are read
/// positionally in [`ALERT_COLUMNS`] order.
pub fn parse_alerts(text: &str) -> Result<Parsed<Alert>, CsvError> {
    let mut reader = reader(text);
    read_header(&mut reader)?;

    let mut parsed = Parsed::default();
    for result in reader.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        parsed.push(alert_from_record(&record));
    }
    Ok(parsed)
}

/// A header-keyed table held as raw records.
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self, CsvError> {
        let mut reader = reader(text);
        let headers = read_header(&mut reader)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if !is_blank(&record) {
                rows.push(record);
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn require(&self, column: &'static str) -> Result<(), CsvError> {
        if self.headers.iter().any(|header| header == column) {
            Ok(())
        } else {
            Err(CsvError::MissingColumn(column))
        }
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Parsed<T> {
        let mut parsed = Parsed::default();
        for row in &self.rows {
            parsed.push(
                row.deserialize(Some(&self.headers))
                    .map_err(|source| CsvError::Record {
                        line: line_of(row),
                        source,
                    }),
            );
        }
        parsed
    }
}

pub fn write_table<I>(headers: &[&str], rows: I) -> Result<String, CsvError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush().map_err(CsvError::Write)?;
    let bytes = writer
        .into_inner()
        .map_err(|err| CsvError::Write(io::Error::other(err.error().to_string())))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_alerts(alerts: &[Alert]) -> Result<String, CsvError> {
    write_table(
        &ALERT_COLUMNS,
        alerts.iter().map(|alert| {
            vec![
                alert.id.clone(),
                alert.name.clone(),
                alert.coord.lat.to_string(),
                alert.coord.lon.to_string(),
                alert.severity.label().to_string(),
                alert.displaced.to_string(),
                alert.confidence.to_string(),
            ]
        }),
    )
}
