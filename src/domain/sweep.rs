//! Batch check of every enabled watch rule.
//!
//! Each rule is fetched and evaluated independently on the rayon pool; the
//! engine keeps no shared state, so no coordination is needed beyond collecting
//! the outcomes. Alerts are then written one by one, in rule order. A failing
//! rule is logged and reported but never stops the sweep.

use crate::domain::error::WatchError;
use crate::domain::trigger::{self, TriggerResult};
use crate::domain::watch_rule::WatchRule;
use crate::ports::alert_sink_port::AlertSink;
use crate::ports::data_port::SeriesProvider;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Bars fetched per rule when the config does not say otherwise.
pub const DEFAULT_SWEEP_BARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub triggered: usize,
    pub alerts_written: usize,
    pub failures: Vec<RuleFailure>,
}

fn check_one<P>(rule: &WatchRule, provider: &P, bar_count: usize) -> Result<TriggerResult, WatchError>
where
    P: SeriesProvider + Sync + ?Sized,
{
    let series = provider.fetch_series(&rule.code, bar_count)?;
    debug!(rule_id = %rule.id, code = %rule.code, bars = series.len(), "evaluating rule");
    Ok(trigger::evaluate(&series, &rule.formula)?)
}

/// Check every enabled rule in `rules` and record an alert for each trigger.
pub fn check_rules<P, S>(
    rules: &[WatchRule],
    provider: &P,
    sink: &S,
    bar_count: usize,
) -> SweepReport
where
    P: SeriesProvider + Sync + ?Sized,
    S: AlertSink + ?Sized,
{
    let enabled: Vec<&WatchRule> = rules.iter().filter(|r| r.enabled).collect();
    info!(enabled = enabled.len(), total = rules.len(), "starting rule sweep");

    let outcomes: Vec<(&WatchRule, Result<TriggerResult, WatchError>)> = enabled
        .par_iter()
        .map(|rule| (*rule, check_one(rule, provider, bar_count)))
        .collect();

    let mut report = SweepReport {
        checked: outcomes.len(),
        ..SweepReport::default()
    };

    for (rule, outcome) in outcomes {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(rule_id = %rule.id, code = %rule.code, error = %e, "rule check failed");
                report.failures.push(RuleFailure {
                    rule_id: rule.id.clone(),
                    code: rule.code.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let Some(alert) = rule.alert_for(&result) else {
            debug!(rule_id = %rule.id, explain = %result.explain, "rule not triggered");
            continue;
        };
        report.triggered += 1;
        info!(rule_id = %rule.id, code = %rule.code, date = %result.date, "rule triggered");

        match sink.record_alert(&alert) {
            Ok(true) => report.alerts_written += 1,
            Ok(false) => debug!(rule_id = %rule.id, date = %alert.trigger_date, "alert already recorded"),
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "failed to record alert");
                report.failures.push(RuleFailure {
                    rule_id: rule.id.clone(),
                    code: rule.code.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        checked = report.checked,
        triggered = report.triggered,
        alerts = report.alerts_written,
        failures = report.failures.len(),
        "rule sweep finished"
    );
    report
}
