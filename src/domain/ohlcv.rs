//! OHLCV bar and series representation.
//!
//! A [`Series`] is assumed to be ascending by date with unique dates. That
//! ordering is the provider's contract; the engine does not re-check it, and
//! it does not check OHLC consistency either.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Which column of a bar a formula refers to (`O`, `H`, `L`, `C`, `V`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    /// Resolve a formula identifier. Case-insensitive.
    pub fn from_identifier(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "O" => Some(PriceField::Open),
            "H" => Some(PriceField::High),
            "L" => Some(PriceField::Low),
            "C" => Some(PriceField::Close),
            "V" => Some(PriceField::Volume),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            PriceField::Open => 'O',
            PriceField::High => 'H',
            PriceField::Low => 'L',
            PriceField::Close => 'C',
            PriceField::Volume => 'V',
        }
    }
}

impl OhlcvBar {
    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
        }
    }
}

/// An immutable, time-ascending run of bars for one security.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    bars: Vec<OhlcvBar>,
}

impl Series {
    /// Wrap bars that are already ascending by date.
    pub fn new(bars: Vec<OhlcvBar>) -> Self {
        Self { bars }
    }

    /// Sort by date, keep the last bar seen for a duplicated date, and retain only
    /// the most recent `count` bars. Used by providers whose source is unordered.
    pub fn from_unordered(mut bars: Vec<OhlcvBar>, count: usize) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        let skip = deduped.len().saturating_sub(count);
        Self {
            bars: deduped.split_off(skip),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// One column across every bar, oldest first.
    pub fn column(&self, field: PriceField) -> Vec<f64> {
        self.bars.iter().map(|b| b.field(field)).collect()
    }
}

impl From<Vec<OhlcvBar>> for Series {
    fn from(bars: Vec<OhlcvBar>) -> Self {
        Series::new(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn price_field_identifiers() {
        assert_eq!(PriceField::from_identifier("C"), Some(PriceField::Close));
        assert_eq!(PriceField::from_identifier("v"), Some(PriceField::Volume));
        assert_eq!(PriceField::from_identifier("CLOSE"), None);
        assert_eq!(PriceField::from_identifier("X"), None);
    }

    #[test]
    fn column_extracts_field() {
        let series = Series::new(vec![bar(1, 10.0), bar(2, 11.0)]);
        assert_eq!(series.column(PriceField::Close), vec![10.0, 11.0]);
        assert_eq!(series.column(PriceField::High), vec![11.0, 12.0]);
        assert_eq!(series.column(PriceField::Volume), vec![100.0, 100.0]);
    }

    #[test]
    fn from_unordered_sorts_dedups_and_truncates() {
        let series = Series::from_unordered(
            vec![bar(3, 12.0), bar(1, 10.0), bar(2, 11.0), bar(3, 13.0)],
            2,
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, 11.0);
        assert_eq!(series.bars()[1].close, 13.0);
    }

    #[test]
    fn empty_series() {
        let series = Series::default();
        assert!(series.is_empty());
        assert!(series.last().is_none());
        assert!(series.column(PriceField::Close).is_empty());
    }
}
