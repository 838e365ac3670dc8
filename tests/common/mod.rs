#![allow(dead_code)]

use chrono::NaiveDate;
pub use tdxwatch::domain::ohlcv::{OhlcvBar, Series};
use tdxwatch::domain::error::WatchError;
use tdxwatch::domain::watch_rule::{Alert, NewRule, RulePatch, WatchRule};
use tdxwatch::ports::alert_sink_port::{AlertSink, RECENT_ALERT_LIMIT};
use tdxwatch::ports::data_port::SeriesProvider;
use tdxwatch::ports::rule_store_port::RuleStore;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockSeriesProvider {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockSeriesProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl SeriesProvider for MockSeriesProvider {
    fn fetch_series(&self, code: &str, count: usize) -> Result<Series, WatchError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(WatchError::Database {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) => Ok(Series::from_unordered(bars.clone(), count)),
            None => Err(WatchError::NoData {
                code: code.to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryRuleStore {
    pub rules: Mutex<Vec<WatchRule>>,
}

impl RuleStore for MemoryRuleStore {
    fn list_rules(&self) -> Result<Vec<WatchRule>, WatchError> {
        Ok(self.rules.lock().unwrap().clone())
    }

    fn insert_rule(&self, rule: &WatchRule) -> Result<(), WatchError> {
        self.rules.lock().unwrap().push(rule.clone());
        Ok(())
    }

    fn update_rule(&self, id: &str, patch: &RulePatch) -> Result<(), WatchError> {
        patch.validate()?;
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| WatchError::RuleNotFound { id: id.to_string() })?;
        rule.apply(patch);
        Ok(())
    }

    fn delete_rule(&self, id: &str) -> Result<(), WatchError> {
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(WatchError::RuleNotFound { id: id.to_string() });
        }
        Ok(())
    }
}

/// Alert sink keeping alerts in insertion order.
#[derive(Default)]
pub struct MemoryAlertSink {
    pub alerts: Mutex<Vec<Alert>>,
    pub fail_with: Option<String>,
}

impl MemoryAlertSink {
    pub fn failing(reason: &str) -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

impl AlertSink for MemoryAlertSink {
    fn record_alert(&self, alert: &Alert) -> Result<bool, WatchError> {
        if let Some(reason) = &self.fail_with {
            return Err(WatchError::DatabaseQuery {
                reason: reason.clone(),
            });
        }
        let mut alerts = self.alerts.lock().unwrap();
        if alerts
            .iter()
            .any(|a| a.rule_id == alert.rule_id && a.trigger_date == alert.trigger_date)
        {
            return Ok(false);
        }
        alerts.push(alert.clone());
        Ok(true)
    }

    fn recent_alerts(&self) -> Result<Vec<Alert>, WatchError> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(RECENT_ALERT_LIMIT)
            .cloned()
            .collect())
    }

    fn clear_alerts(&self) -> Result<(), WatchError> {
        self.alerts.lock().unwrap().clear();
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: date(date_str),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

/// Daily bars from 2024-01-01 with the given closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// `count` bars with a steadily rising close starting at `start_price`.
pub fn generate_bars(count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(&closes)
}

pub fn make_rule(code: &str, formula: &str) -> WatchRule {
    NewRule {
        code: code.to_string(),
        name: format!("watch {}", code),
        exchange: None,
        formula: formula.to_string(),
        enabled: true,
    }
    .into_rule()
    .unwrap()
}

pub fn disabled_rule(code: &str, formula: &str) -> WatchRule {
    WatchRule {
        enabled: false,
        ..make_rule(code, formula)
    }
}
