use thiserror::Error;
use url::ParseError;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Non-success status returned by the org's REST API.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A run could not start: no session, no selections, no fields.
    #[error("{0}")]
    Precondition(String),

    #[error("A profiling run is already in progress")]
    RunInProgress,

    #[error("Nothing to report: {0}")]
    EmptyReport(String),

    #[error("Report mixes summary and distribution results")]
    MixedReportModes,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid Uri: {0}")]
    InvalidUri(String),

    #[error("{0}")]
    Other(String),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidUri(format!("URL parse error: {}", err))
    }
}

impl Error {
    /// Message shown to the user for item-level failures. API errors keep
    /// the status so a failed composite call stays diagnosable.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { status, body } => format!("Salesforce API error ({}): {}", status, body),
            other => other.to_string(),
        }
    }
}
