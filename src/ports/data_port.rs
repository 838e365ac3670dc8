//! Market data port trait: where series come from.

use crate::domain::error::WatchError;
use crate::domain::ohlcv::Series;

/// Supplies daily bars for a security.
///
/// Implementations return at most `count` of the most recent bars, ascending
/// by date with unique dates. A known code with no bars yields an empty
/// series; a code the provider has never heard of is `WatchError::NoData`.
pub trait SeriesProvider {
    fn fetch_series(&self, code: &str, count: usize) -> Result<Series, WatchError>;
}
