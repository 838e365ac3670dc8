//! Alert sink port trait.

use crate::domain::error::WatchError;
use crate::domain::watch_rule::Alert;

/// Number of alerts returned by `recent_alerts`.
pub const RECENT_ALERT_LIMIT: usize = 50;

pub trait AlertSink {
    /// Record an alert. Returns `false` when an alert for the same rule and
    /// trigger date was already recorded.
    fn record_alert(&self, alert: &Alert) -> Result<bool, WatchError>;

    /// Most recent alerts first, at most [`RECENT_ALERT_LIMIT`].
    fn recent_alerts(&self) -> Result<Vec<Alert>, WatchError>;

    fn clear_alerts(&self) -> Result<(), WatchError>;
}
