//! CSV file series provider.
//!
//! One file per security, `<base>/<code>.csv`, with a header row and the
//! columns `date,open,high,low,close,volume` (date as `YYYY-MM-DD`). Rows may
//! be in any order; they are sorted and de-duplicated on read.

use crate::domain::error::WatchError;
use crate::domain::ohlcv::{OhlcvBar, Series};
use crate::ports::data_port::SeriesProvider;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

fn parse_column<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
    code: &str,
) -> Result<T, WatchError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| WatchError::BadData {
            code: code.to_string(),
            reason: format!("missing {} column", column),
        })?
        .trim()
        .parse()
        .map_err(|e: T::Err| WatchError::BadData {
            code: code.to_string(),
            reason: format!("invalid {} value: {}", column, e),
        })
}

/// Parse CSV content into bars, in file order.
pub fn parse_bars(content: &str, code: &str) -> Result<Vec<OhlcvBar>, WatchError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| WatchError::BadData {
            code: code.to_string(),
            reason: format!("CSV parse error: {}", e),
        })?;

        let date_str: String = parse_column(&record, 0, "date", code)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            WatchError::BadData {
                code: code.to_string(),
                reason: format!("invalid date '{}': {}", date_str, e),
            }
        })?;

        bars.push(OhlcvBar {
            date,
            open: parse_column(&record, 1, "open", code)?,
            high: parse_column(&record, 2, "high", code)?,
            low: parse_column(&record, 3, "low", code)?,
            close: parse_column(&record, 4, "close", code)?,
            volume: parse_column(&record, 5, "volume", code)?,
        });
    }

    Ok(bars)
}

/// Read a whole CSV file as a series.
pub fn read_series_file(path: &Path) -> Result<Series, WatchError> {
    let code = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = fs::read_to_string(path)?;
    let bars = parse_bars(&content, &code)?;
    Ok(Series::from_unordered(bars, usize::MAX))
}

impl SeriesProvider for CsvAdapter {
    fn fetch_series(&self, code: &str, count: usize) -> Result<Series, WatchError> {
        let path = self.csv_path(code);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WatchError::NoData {
                    code: code.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let bars = parse_bars(&content, code)?;
        Ok(Series::from_unordered(bars, count))
    }
}
