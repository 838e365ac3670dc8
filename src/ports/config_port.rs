//! Configuration access port trait.

use crate::domain::error::WatchError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    /// Like `get_string`, but a missing or blank key is an error.
    fn require_string(&self, section: &str, key: &str) -> Result<String, WatchError> {
        self.get_string(section, key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| WatchError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }

    /// A positive count, falling back to `default` when the key is absent.
    fn get_count(&self, section: &str, key: &str, default: usize) -> Result<usize, WatchError> {
        let value = self.get_int(section, key, default as i64);
        if value < 1 {
            return Err(WatchError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("must be at least 1, got {}", value),
            });
        }
        Ok(value as usize)
    }
}
