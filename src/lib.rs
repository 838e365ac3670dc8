//! tdxwatch: formula alerts over daily price history.
//!
//! Hexagonal architecture: the formula engine and rule records in [`domain`],
//! port traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
