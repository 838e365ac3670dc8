//! SQLite adapter: bar history, watch rules and alerts in one database.

use crate::domain::error::WatchError;
use crate::domain::ohlcv::{OhlcvBar, Series};
use crate::domain::watch_rule::{Alert, RulePatch, WatchRule};
use crate::ports::alert_sink_port::{AlertSink, RECENT_ALERT_LIMIT};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::SeriesProvider;
use crate::ports::rule_store_port::RuleStore;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ohlcv (
        code TEXT NOT NULL,
        date TEXT NOT NULL,
        open REAL NOT NULL,
        high REAL NOT NULL,
        low REAL NOT NULL,
        close REAL NOT NULL,
        volume REAL NOT NULL,
        PRIMARY KEY (code, date)
    );
    CREATE TABLE IF NOT EXISTS rules (
        id TEXT PRIMARY KEY,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        exchange TEXT NOT NULL,
        formula TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS alerts (
        id TEXT PRIMARY KEY,
        rule_id TEXT NOT NULL,
        code TEXT NOT NULL,
        exchange TEXT NOT NULL,
        name TEXT NOT NULL,
        trigger_date TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (rule_id, trigger_date)
    );
    CREATE INDEX IF NOT EXISTS idx_alerts_created_at ON alerts(created_at);";

fn pool_err(e: r2d2::Error) -> WatchError {
    WatchError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> WatchError {
    WatchError::DatabaseQuery {
        reason: e.to_string(),
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, WatchError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_count("sqlite", "pool_size", 4)? as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, WatchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, WatchError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), WatchError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    /// Upsert daily bars for `code`; a bar for an existing date replaces it.
    pub fn insert_bars(&self, code: &str, bars: &[OhlcvBar]) -> Result<(), WatchError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (code, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    code,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    pub fn get_rule(&self, id: &str) -> Result<Option<WatchRule>, WatchError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, code, name, exchange, formula, enabled, created_at, updated_at
             FROM rules WHERE id = ?1",
            params![id],
            row_to_rule,
        )
        .optional()
        .map_err(query_err)
    }
}

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatchRule> {
    Ok(WatchRule {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        exchange: row.get(3)?,
        formula: row.get(4)?,
        enabled: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl SeriesProvider for SqliteAdapter {
    fn fetch_series(&self, code: &str, count: usize) -> Result<Series, WatchError> {
        let conn = self.conn()?;

        let known: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ohlcv WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        if known == 0 {
            return Err(WatchError::NoData {
                code: code.to_string(),
            });
        }

        // newest `count` rows, flipped back to ascending below
        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM ohlcv WHERE code = ?1
                 ORDER BY date DESC LIMIT ?2",
            )
            .map_err(query_err)?;

        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![code, limit], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(OhlcvBar {
                    date,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }
        bars.reverse();

        Ok(Series::new(bars))
    }
}

impl RuleStore for SqliteAdapter {
    fn list_rules(&self) -> Result<Vec<WatchRule>, WatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, code, name, exchange, formula, enabled, created_at, updated_at
                 FROM rules ORDER BY created_at ASC, id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt.query_map([], row_to_rule).map_err(query_err)?;
        let mut rules = Vec::new();
        for row in rows {
            rules.push(row.map_err(query_err)?);
        }
        Ok(rules)
    }

    fn insert_rule(&self, rule: &WatchRule) -> Result<(), WatchError> {
        self.conn()?
            .execute(
                "INSERT INTO rules (id, code, name, exchange, formula, enabled, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    rule.id,
                    rule.code,
                    rule.name,
                    rule.exchange,
                    rule.formula,
                    rule.enabled as i64,
                    rule.created_at,
                    rule.updated_at
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn update_rule(&self, id: &str, patch: &RulePatch) -> Result<(), WatchError> {
        patch.validate()?;
        let Some(mut rule) = self.get_rule(id)? else {
            return Err(WatchError::RuleNotFound { id: id.to_string() });
        };
        if patch.is_empty() {
            return Ok(());
        }
        rule.apply(patch);

        self.conn()?
            .execute(
                "UPDATE rules SET enabled = ?1, formula = ?2, updated_at = ?3 WHERE id = ?4",
                params![rule.enabled as i64, rule.formula, rule.updated_at, id],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn delete_rule(&self, id: &str) -> Result<(), WatchError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM rules WHERE id = ?1", params![id])
            .map_err(query_err)?;
        if deleted == 0 {
            return Err(WatchError::RuleNotFound { id: id.to_string() });
        }
        Ok(())
    }

    fn enabled_rules(&self) -> Result<Vec<WatchRule>, WatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, code, name, exchange, formula, enabled, created_at, updated_at
                 FROM rules WHERE enabled = 1 ORDER BY created_at ASC, id ASC",
            )
            .map_err(query_err)?;

        let rows = stmt.query_map([], row_to_rule).map_err(query_err)?;
        let mut rules = Vec::new();
        for row in rows {
            rules.push(row.map_err(query_err)?);
        }
        Ok(rules)
    }
}

impl AlertSink for SqliteAdapter {
    fn record_alert(&self, alert: &Alert) -> Result<bool, WatchError> {
        let inserted = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO alerts
                 (id, rule_id, code, exchange, name, trigger_date, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    alert.id,
                    alert.rule_id,
                    alert.code,
                    alert.exchange,
                    alert.name,
                    alert.trigger_date,
                    alert.message,
                    alert.created_at
                ],
            )
            .map_err(query_err)?;
        Ok(inserted > 0)
    }

    fn recent_alerts(&self) -> Result<Vec<Alert>, WatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, rule_id, code, exchange, name, trigger_date, message, created_at
                 FROM alerts ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![RECENT_ALERT_LIMIT as i64], |row| {
                Ok(Alert {
                    id: row.get(0)?,
                    rule_id: row.get(1)?,
                    code: row.get(2)?,
                    exchange: row.get(3)?,
                    name: row.get(4)?,
                    trigger_date: row.get(5)?,
                    message: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })
            .map_err(query_err)?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row.map_err(query_err)?);
        }
        Ok(alerts)
    }

    fn clear_alerts(&self) -> Result<(), WatchError> {
        self.conn()?
            .execute("DELETE FROM alerts", [])
            .map_err(query_err)?;
        Ok(())
    }
}
