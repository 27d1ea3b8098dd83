use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("render service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("page load failed: {0}")]
    Navigation(String),
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed calendar event: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("notification relay returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that abort a monitoring run before anything is persisted.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to load calendar page: {0}")]
    PageLoad(#[source] RenderError),
    #[error("no slot data could be read from the calendar: {0}")]
    NoPageData(#[source] RenderError),
    #[error("a scan is already in progress")]
    ScanInProgress,
}
