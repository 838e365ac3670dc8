//! Domain error types.
//!
//! [`FormulaError`] is what the formula engine surfaces to whoever authored the
//! formula. [`WatchError`] is the application-level error that wraps it together
//! with storage, configuration and data failures.

/// An error raised while parsing or evaluating a formula.
///
/// Every variant carries the offending token or name and the zero-based
/// character position it was found at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        message: String,
        token: String,
        position: usize,
    },

    #[error("unknown identifier '{name}' at position {position}")]
    UnknownIdentifier { name: String, position: usize },

    #[error("unknown function '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },

    #[error("{function} expects {expected} arguments, found {found} (position {position})")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
        position: usize,
    },

    #[error("{function} argument {argument} must be {expected}, found {found} (position {position})")]
    ArgumentType {
        function: String,
        argument: usize,
        expected: String,
        found: String,
        position: usize,
    },
}

impl FormulaError {
    pub fn position(&self) -> usize {
        match self {
            FormulaError::Syntax { position, .. }
            | FormulaError::UnknownIdentifier { position, .. }
            | FormulaError::UnknownFunction { position, .. }
            | FormulaError::ArgumentCount { position, .. }
            | FormulaError::ArgumentType { position, .. } => *position,
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position()) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for tdxwatch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("rule not found: {id}")]
    RuleNotFound { id: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("bad market data for {code}: {reason}")]
    BadData { code: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&WatchError> for std::process::ExitCode {
    fn from(err: &WatchError) -> Self {
        let code: u8 = match err {
            WatchError::Io(_) | WatchError::Json(_) => 1,
            WatchError::ConfigParse { .. }
            | WatchError::ConfigMissing { .. }
            | WatchError::ConfigInvalid { .. } => 2,
            WatchError::Database { .. } | WatchError::DatabaseQuery { .. } => 3,
            WatchError::Formula(_)
            | WatchError::RuleInvalid { .. }
            | WatchError::RuleNotFound { .. } => 4,
            WatchError::NoData { .. } | WatchError::BadData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
