//! Core domain types and logic: the formula engine plus the watch-rule records
//! built around it.

pub mod ohlcv;
pub mod formula;
pub mod formula_lexer;
pub mod formula_parser;
pub mod value;
pub mod indicator;
pub mod formula_eval;
pub mod trigger;
pub mod watch_rule;
pub mod sweep;
pub mod error;

pub use trigger::{evaluate, TriggerResult};
