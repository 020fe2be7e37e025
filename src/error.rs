use std::fmt;
use thiserror::Error;

/// Why a single row of price history was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingField,
    InvalidDate(String),
    InvalidNumber(String),
    NegativeValue,
    InconsistentOhlc,
    DuplicateDate,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::MissingField => write!(f, "field is missing"),
            ParseErrorKind::InvalidDate(raw) => write!(f, "'{}' is not a YYYY-MM-DD date", raw),
            ParseErrorKind::InvalidNumber(raw) => write!(f, "'{}' is not a finite number", raw),
            ParseErrorKind::NegativeValue => write!(f, "value must not be negative"),
            ParseErrorKind::InconsistentOhlc => {
                write!(f, "high/low do not bracket open and close")
            }
            ParseErrorKind::DuplicateDate => write!(f, "date already present in series"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {row_index}, field '{field}': {reason}")]
pub struct ParseError {
    pub row_index: usize,
    pub field: &'static str,
    pub reason: ParseErrorKind,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("invalid period {period} for a series of {len} records")]
    InvalidPeriod { period: usize, len: usize },

    #[error("need at least 2 records, got {len}")]
    InsufficientData { len: usize },

    #[error("previous close is zero at index {index}")]
    DivisionByZero { index: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("provider error for {ticker}: {message}")]
    Provider { ticker: String, message: String },

    #[error("price lookup for {ticker} timed out after {secs}s")]
    Timeout { ticker: String, secs: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StockWatchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("status server error: {0}")]
    Server(#[from] ServerError),

    #[error("{task} task failed: {source}")]
    TaskFailed {
        task: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("alert pipeline stopped before shutdown was requested")]
    PipelineStopped,
}
