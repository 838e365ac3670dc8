//! Trigger resolution: the engine's public entry point.
//!
//! `evaluate(series, formula)` parses the formula, evaluates it over the whole
//! series and reads the final value at the last bar. It holds no state between
//! calls, so independent evaluations can run on any number of threads.

use crate::domain::error::FormulaError;
use crate::domain::formula_eval;
use crate::domain::formula_parser;
use crate::domain::ohlcv::Series;
use crate::domain::value::Value;
use serde::{Deserialize, Serialize};

/// Outcome of one formula on one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub triggered: bool,
    /// Index of the last bar, or -1 for an empty series.
    pub index: i64,
    /// Date of the last bar as `YYYY-MM-DD`, empty for an empty series.
    pub date: String,
    pub explain: String,
}

impl TriggerResult {
    pub fn no_data() -> Self {
        Self {
            triggered: false,
            index: -1,
            date: String::new(),
            explain: "no data".to_string(),
        }
    }
}

/// Parse and evaluate `formula` over `series`, resolved at the latest bar.
///
/// An empty series is not an error: it resolves to [`TriggerResult::no_data`]
/// without looking at the formula.
pub fn evaluate(series: &Series, formula: &str) -> Result<TriggerResult, FormulaError> {
    if series.is_empty() {
        return Ok(TriggerResult::no_data());
    }
    let expr = formula_parser::parse(formula)?;
    let value = formula_eval::evaluate(&expr, series)?;
    Ok(resolve(&value, series))
}

/// Coerce an evaluated value at the last index of `series` into a result.
pub fn resolve(value: &Value, series: &Series) -> TriggerResult {
    let Some(last) = series.last() else {
        return TriggerResult::no_data();
    };
    let index = series.len() - 1;
    let triggered = value.truthy_at(index);
    let date = last.date.format("%Y-%m-%d").to_string();
    let explain = if triggered {
        format!("triggered at {}", date)
    } else {
        "not triggered".to_string()
    };

    TriggerResult {
        triggered,
        index: index as i64,
        date,
        explain,
    }
}
