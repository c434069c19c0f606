use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the timeline engine and its configuration layer.
///
/// Rendering and classification never produce these; they degrade to empty output.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// The pan/zoom container was not available at mount time. Safe to retry.
    #[error("timeline container is not mounted")]
    MissingContainer,
    #[error("invalid time interval: start {start} is after end {end}")]
    InvalidInterval { start: String, end: String },
    /// No local midnight could be resolved for the given day.
    #[error("cannot resolve the start of {date} in the requested time zone")]
    AmbiguousMidnight { date: NaiveDate },
    #[error("unknown time zone `{0}`")]
    UnknownTimeZone(String),
    #[error("settings I/O failed: {0}")]
    Settings(#[from] std::io::Error),
    #[error("settings are not valid JSON: {0}")]
    SettingsFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Failure modes of a cancelable fetch against an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request was superseded or torn down before it resolved.
    #[error("request was cancelled")]
    Cancelled,
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
