//! Indicator function library.
//!
//! Pure vector functions over a numeric series of length N. Every function
//! returns a vector of the same length; leading indices without enough
//! history are NaN where the function has a warm-up.
//!
//! - `IndicatorFn`: the callable vocabulary, resolved from formula names
//! - one submodule per function family

pub mod cross;
pub mod ema;
pub mod extremes;
pub mod lag;
pub mod ma;

use std::fmt;

pub use cross::cross;
pub use ema::ema;
pub use extremes::{hhv, llv};
pub use lag::lag;
pub use ma::ma;

/// What a call's arguments are expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// `(series, window)`, window a scalar integer >= 1.
    SeriesWindow,
    /// `(series, series)`.
    SeriesSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorFn {
    Ma,
    Ema,
    Ref,
    Hhv,
    Llv,
    Cross,
}

impl IndicatorFn {
    /// Resolve a formula function name. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MA" => Some(IndicatorFn::Ma),
            "EMA" => Some(IndicatorFn::Ema),
            "REF" => Some(IndicatorFn::Ref),
            "HHV" => Some(IndicatorFn::Hhv),
            "LLV" => Some(IndicatorFn::Llv),
            "CROSS" => Some(IndicatorFn::Cross),
            _ => None,
        }
    }

    pub fn signature(self) -> Signature {
        match self {
            IndicatorFn::Cross => Signature::SeriesSeries,
            _ => Signature::SeriesWindow,
        }
    }

    pub fn arity(self) -> usize {
        2
    }

    /// Apply a `(series, window)` function. `None` for CROSS.
    pub fn apply_window(self, x: &[f64], n: usize) -> Option<Vec<f64>> {
        match self {
            IndicatorFn::Ma => Some(ma(x, n)),
            IndicatorFn::Ema => Some(ema(x, n)),
            IndicatorFn::Ref => Some(lag(x, n)),
            IndicatorFn::Hhv => Some(hhv(x, n)),
            IndicatorFn::Llv => Some(llv(x, n)),
            IndicatorFn::Cross => None,
        }
    }
}

impl fmt::Display for IndicatorFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorFn::Ma => write!(f, "MA"),
            IndicatorFn::Ema => write!(f, "EMA"),
            IndicatorFn::Ref => write!(f, "REF"),
            IndicatorFn::Hhv => write!(f, "HHV"),
            IndicatorFn::Llv => write!(f, "LLV"),
            IndicatorFn::Cross => write!(f, "CROSS"),
        }
    }
}
