//! Rule persistence port trait.

use crate::domain::error::WatchError;
use crate::domain::watch_rule::{RulePatch, WatchRule};

pub trait RuleStore {
    /// All rules, oldest first.
    fn list_rules(&self) -> Result<Vec<WatchRule>, WatchError>;

    fn insert_rule(&self, rule: &WatchRule) -> Result<(), WatchError>;

    /// Apply `patch` to the rule with `id`. Fails with `RuleNotFound` for an
    /// unknown id; an empty patch succeeds without touching the rule.
    fn update_rule(&self, id: &str, patch: &RulePatch) -> Result<(), WatchError>;

    fn delete_rule(&self, id: &str) -> Result<(), WatchError>;

    /// Default implementation: filter `list_rules`.
    fn enabled_rules(&self) -> Result<Vec<WatchRule>, WatchError> {
        Ok(self
            .list_rules()?
            .into_iter()
            .filter(|r| r.enabled)
            .collect())
    }
}
