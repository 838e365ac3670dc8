//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::{FormulaError, WatchError};
use crate::domain::formula_parser;
use crate::domain::trigger::{self, TriggerResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::SeriesProvider;

#[cfg(feature = "sqlite")]
use crate::adapters::sqlite_adapter::SqliteAdapter;

/// Bars fetched by `test` when neither the flag nor the config says otherwise.
pub const DEFAULT_TEST_BARS: usize = 200;

/// Log filter used when neither `RUST_LOG` nor `[log] level` is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(name = "tdxwatch", about = "TDX-style formula watcher for daily bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a formula against a CSV file of daily bars
    Eval {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        formula: String,
    },
    /// Parse a formula and print its canonical form
    Check {
        #[arg(short, long)]
        formula: String,
    },
    /// Evaluate a formula against the configured data for one code
    Test {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        formula: String,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Manage watch rules
    Rules {
        #[arg(short, long)]
        config: PathBuf,
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Check every enabled rule and record alerts
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show or clear recent alerts
    Alerts {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        clear: bool,
    },
    /// Load a CSV file of daily bars into the SQLite store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        data: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum RuleAction {
    /// List all rules
    List,
    /// Add a rule
    Add {
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        formula: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(long)]
        disabled: bool,
    },
    /// Enable a rule
    Enable { id: String },
    /// Disable a rule
    Disable { id: String },
    /// Replace a rule's formula
    SetFormula {
        id: String,
        #[arg(short, long)]
        formula: String,
    },
    /// Delete a rule
    Delete { id: String },
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        match &self.command {
            Command::Test { config, .. }
            | Command::Rules { config, .. }
            | Command::Sweep { config }
            | Command::Alerts { config, .. }
            | Command::Import { config, .. } => Some(config),
            Command::Eval { .. } | Command::Check { .. } => None,
        }
    }
}

/// Filter directive for the log subscriber, from `[log] level` when the
/// command has a readable config.
pub fn log_directive(cli: &Cli) -> String {
    cli.config_path()
        .and_then(|path| FileConfigAdapter::from_file(path).ok())
        .and_then(|config| config.get_string("log", "level"))
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Eval { data, formula } => run_eval(&data, &formula),
        Command::Check { formula } => run_check(&formula),
        Command::Test {
            config,
            code,
            formula,
            count,
        } => run_test(&config, &code, &formula, count),
        #[cfg(feature = "sqlite")]
        Command::Rules { config, action } => run_rules(&config, action),
        #[cfg(feature = "sqlite")]
        Command::Sweep { config } => run_sweep(&config),
        #[cfg(feature = "sqlite")]
        Command::Alerts { config, clear } => run_alerts(&config, clear),
        #[cfg(feature = "sqlite")]
        Command::Import { config, code, data } => run_import(&config, &code, &data),
        #[cfg(not(feature = "sqlite"))]
        Command::Rules { .. }
        | Command::Sweep { .. }
        | Command::Alerts { .. }
        | Command::Import { .. } => {
            eprintln!("error: this command needs the sqlite feature");
            ExitCode::from(1)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = WatchError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &WatchError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn fail_formula(err: FormulaError, formula: &str) -> ExitCode {
    eprintln!("error: {}", err.display_with_context(formula));
    (&WatchError::from(err)).into()
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&WatchError::from(e)),
    }
}

pub fn run_eval(data_path: &Path, formula: &str) -> ExitCode {
    let series = match csv_adapter::read_series_file(data_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    debug!(file = %data_path.display(), bars = series.len(), "loaded series");

    match trigger::evaluate(&series, formula) {
        Ok(result) => print_json(&result),
        Err(e) => fail_formula(e, formula),
    }
}

pub fn run_check(formula: &str) -> ExitCode {
    match formula_parser::parse(formula) {
        Ok(expr) => {
            println!("{expr}");
            ExitCode::SUCCESS
        }
        Err(e) => fail_formula(e, formula),
    }
}

/// Series source for `test` and `sweep`: the CSV directory when
/// `[data] csv_dir` is set, otherwise the SQLite store.
pub fn open_provider(config: &dyn ConfigPort) -> Result<Box<dyn SeriesProvider + Sync>, WatchError> {
    if let Some(dir) = config
        .get_string("data", "csv_dir")
        .filter(|d| !d.trim().is_empty())
    {
        debug!(dir = %dir, "using CSV series provider");
        return Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))));
    }

    #[cfg(feature = "sqlite")]
    {
        debug!("using SQLite series provider");
        Ok(Box::new(SqliteAdapter::from_config(config)?))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(WatchError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })
    }
}

/// Evaluate `formula` over the last `count` bars of `code`.
pub fn test_formula(
    provider: &dyn SeriesProvider,
    code: &str,
    formula: &str,
    count: usize,
) -> Result<TriggerResult, WatchError> {
    let series = provider.fetch_series(code, count)?;
    Ok(trigger::evaluate(&series, formula)?)
}

fn run_test(config_path: &Path, code: &str, formula: &str, count: Option<usize>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let count = match count {
        Some(0) => {
            eprintln!("error: --count must be at least 1");
            return ExitCode::from(2);
        }
        Some(n) => n,
        None => match config.get_count("watch", "test_bar_count", DEFAULT_TEST_BARS) {
            Ok(n) => n,
            Err(e) => return fail(&e),
        },
    };

    let provider = match open_provider(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    match test_formula(provider.as_ref(), code, formula, count) {
        Ok(result) => print_json(&result),
        Err(WatchError::Formula(e)) => fail_formula(e, formula),
        Err(e) => fail(&e),
    }
}

#[cfg(feature = "sqlite")]
fn open_store(config_path: &Path) -> Result<(FileConfigAdapter, SqliteAdapter), ExitCode> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config).map_err(|e| fail(&e))?;
    Ok((config, store))
}

#[cfg(feature = "sqlite")]
fn run_rules(config_path: &Path, action: RuleAction) -> ExitCode {
    let store = match open_store(config_path) {
        Ok((_, store)) => store,
        Err(code) => return code,
    };
    match apply_rule_action(&store, action) {
        Ok(Some(output)) => print_json(&output),
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

/// Run one `rules` subcommand against a store. Returns the JSON to print,
/// if the action produces any.
pub fn apply_rule_action(
    store: &dyn crate::ports::rule_store_port::RuleStore,
    action: RuleAction,
) -> Result<Option<serde_json::Value>, WatchError> {
    use crate::domain::watch_rule::{NewRule, RulePatch};

    match action {
        RuleAction::List => Ok(Some(serde_json::to_value(store.list_rules()?)?)),
        RuleAction::Add {
            code,
            formula,
            name,
            exchange,
            disabled,
        } => {
            let rule = NewRule {
                name: name.unwrap_or_else(|| code.clone()),
                code,
                exchange,
                formula,
                enabled: !disabled,
            }
            .into_rule()?;
            store.insert_rule(&rule)?;
            info!(rule_id = %rule.id, code = %rule.code, "rule added");
            Ok(Some(serde_json::to_value(&rule)?))
        }
        RuleAction::Enable { id } => {
            store.update_rule(
                &id,
                &RulePatch {
                    enabled: Some(true),
                    formula: None,
                },
            )?;
            Ok(None)
        }
        RuleAction::Disable { id } => {
            store.update_rule(
                &id,
                &RulePatch {
                    enabled: Some(false),
                    formula: None,
                },
            )?;
            Ok(None)
        }
        RuleAction::SetFormula { id, formula } => {
            store.update_rule(
                &id,
                &RulePatch {
                    enabled: None,
                    formula: Some(formula),
                },
            )?;
            Ok(None)
        }
        RuleAction::Delete { id } => {
            store.delete_rule(&id)?;
            info!(rule_id = %id, "rule deleted");
            Ok(None)
        }
    }
}

#[cfg(feature = "sqlite")]
fn run_sweep(config_path: &Path) -> ExitCode {
    use crate::domain::sweep::{check_rules, DEFAULT_SWEEP_BARS};
    use crate::ports::rule_store_port::RuleStore;

    let (config, store) = match open_store(config_path) {
        Ok(opened) => opened,
        Err(code) => return code,
    };
    let bar_count = match config.get_count("watch", "bar_count", DEFAULT_SWEEP_BARS) {
        Ok(n) => n,
        Err(e) => return fail(&e),
    };
    let provider = match open_provider(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let rules = match store.enabled_rules() {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    let report = check_rules(&rules, provider.as_ref(), &store, bar_count);
    print_json(&report)
}

#[cfg(feature = "sqlite")]
fn run_alerts(config_path: &Path, clear: bool) -> ExitCode {
    use crate::ports::alert_sink_port::AlertSink;

    let store = match open_store(config_path) {
        Ok((_, store)) => store,
        Err(code) => return code,
    };

    if clear {
        return match store.clear_alerts() {
            Ok(()) => {
                info!("alerts cleared");
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        };
    }

    match store.recent_alerts() {
        Ok(alerts) => print_json(&alerts),
        Err(e) => fail(&e),
    }
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub code: String,
    pub bars: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Read a CSV file of daily bars and upsert it into `store` under `code`.
#[cfg(feature = "sqlite")]
pub fn import_bars(
    store: &SqliteAdapter,
    code: &str,
    data_path: &Path,
) -> Result<ImportSummary, WatchError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(WatchError::BadData {
            code: String::new(),
            reason: "code must not be blank".into(),
        });
    }
    let series = csv_adapter::read_series_file(data_path)?;
    store.insert_bars(code, series.bars())?;
    let day = |bar: Option<&crate::domain::ohlcv::OhlcvBar>| {
        bar.map(|b| b.date.format("%Y-%m-%d").to_string())
    };
    info!(code = %code, bars = series.len(), file = %data_path.display(), "bars imported");
    Ok(ImportSummary {
        code: code.to_string(),
        bars: series.len(),
        first_date: day(series.bars().first()),
        last_date: day(series.bars().last()),
    })
}

#[cfg(feature = "sqlite")]
fn run_import(config_path: &Path, code: &str, data_path: &Path) -> ExitCode {
    let store = match open_store(config_path) {
        Ok((_, store)) => store,
        Err(exit) => return exit,
    };
    match import_bars(&store, code, data_path) {
        Ok(summary) => print_json(&summary),
        Err(e) => fail(&e),
    }
}
