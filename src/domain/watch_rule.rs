//! Watch rules and the alerts they raise.
//!
//! A watch rule pins a formula to one security. Rules are persisted by a
//! [`RuleStore`](crate::ports::rule_store_port::RuleStore); the engine itself
//! only ever sees the `(series, formula)` pair taken from a rule.

use crate::domain::error::WatchError;
use crate::domain::formula_parser;
use crate::domain::trigger::TriggerResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRule {
    pub id: String,
    pub code: String,
    pub name: String,
    pub exchange: String,
    pub formula: String,
    pub enabled: bool,
    /// Unix millis.
    pub created_at: i64,
    /// Unix millis.
    pub updated_at: i64,
}

/// Fields supplied when creating a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub code: String,
    pub name: String,
    /// Inferred from the code when absent.
    pub exchange: Option<String>,
    pub formula: String,
    pub enabled: bool,
}

/// Partial update of a rule. A patch with no fields set changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    pub enabled: Option<bool>,
    pub formula: Option<String>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.formula.is_none()
    }

    pub fn validate(&self) -> Result<(), WatchError> {
        if let Some(formula) = &self.formula {
            formula_parser::parse(formula)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub code: String,
    pub exchange: String,
    pub name: String,
    /// `YYYY-MM-DD` of the bar the rule triggered on.
    pub trigger_date: String,
    pub message: String,
    /// Unix millis.
    pub created_at: i64,
}

/// Exchange a mainland A-share code trades on, judged by its leading digit.
pub fn infer_exchange(code: &str) -> &'static str {
    match code.chars().next() {
        Some('6') => "SH",
        Some('8') | Some('4') | Some('9') => "BJ",
        _ => "SZ",
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl NewRule {
    /// Check the rule can be stored: a code is present and the formula parses.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.code.trim().is_empty() {
            return Err(WatchError::RuleInvalid {
                reason: "code must not be empty".into(),
            });
        }
        formula_parser::parse(&self.formula)?;
        Ok(())
    }

    /// Validate and stamp a fresh id and timestamps.
    pub fn into_rule(self) -> Result<WatchRule, WatchError> {
        self.validate()?;
        let now = now_millis();
        let code = self.code.trim().to_string();
        let exchange = self
            .exchange
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| infer_exchange(&code).to_string());
        Ok(WatchRule {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name: self.name,
            exchange,
            formula: self.formula,
            enabled: self.enabled,
            created_at: now,
            updated_at: now,
        })
    }
}

impl WatchRule {
    /// Build the alert for a triggered result, or `None` if it did not trigger.
    pub fn alert_for(&self, result: &TriggerResult) -> Option<Alert> {
        if !result.triggered {
            return None;
        }
        Some(Alert {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: self.id.clone(),
            code: self.code.clone(),
            exchange: self.exchange.clone(),
            name: self.name.clone(),
            trigger_date: result.date.clone(),
            message: format!("triggered: {}", self.formula),
            created_at: now_millis(),
        })
    }

    /// Apply an already validated patch in place.
    pub fn apply(&mut self, patch: &RulePatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(formula) = &patch.formula {
            self.formula = formula.clone();
        }
        self.updated_at = now_millis();
    }
}
