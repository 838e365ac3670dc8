//! Port traits for the collaborators around the formula engine.

pub mod alert_sink_port;
pub mod config_port;
pub mod data_port;
pub mod rule_store_port;
