//! Domain error types.

use super::exact::Exact;

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum StratbenchError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("insufficient funds: trade needs {requested} cash, ledger holds {available}")]
    InsufficientFunds { requested: Exact, available: Exact },

    #[error("insufficient asset: trade needs {requested} asset, ledger holds {available}")]
    InsufficientAsset { requested: Exact, available: Exact },

    #[error("division by zero")]
    DivisionByZero,

    #[error("value out of range: {reason}")]
    ValueOutOfRange { reason: String },

    #[error("invalid price series {window}: {reason}")]
    InvalidSeries { window: String, reason: String },

    #[error("no data for {what}")]
    NoData { what: String },

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
    Io(#[from] std::io::Error),
}

impl StratbenchError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        StratbenchError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<&StratbenchError> for std::process::ExitCode {
    fn from(err: &StratbenchError) -> Self {
        let code: u8 = match err {
            StratbenchError::Io(_) => 1,
            StratbenchError::ConfigParse { .. }
            | StratbenchError::ConfigMissing { .. }
            | StratbenchError::ConfigInvalid { .. } => 2,
            StratbenchError::Database { .. } | StratbenchError::DatabaseQuery { .. } => 3,
            StratbenchError::InvalidArgument { .. }
            | StratbenchError::InsufficientFunds { .. }
            | StratbenchError::InsufficientAsset { .. }
            | StratbenchError::DivisionByZero
            | StratbenchError::ValueOutOfRange { .. } => 4,
            StratbenchError::InvalidSeries { .. } | StratbenchError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
