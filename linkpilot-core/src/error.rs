use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Local store is closed")]
    Closed,

    #[error("Store job panicked: {0}")]
    JobPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while handling a routed message.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Invalid payload for '{action}': {reason}")]
    BadPayload { action: String, reason: String },

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Scrape failure: {0}")]
    Scan(#[from] linkpilot_scanner::ScanError),

    #[error("{0}")]
    Refused(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl RouterError {
    pub fn bad_payload(action: &str, reason: impl ToString) -> Self {
        RouterError::BadPayload {
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Transport failures between a sender and a router.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("No listener for message")]
    NoListener,

    #[error("Channel closed before a response was sent")]
    Closed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Not a local chart file: {0}")]
    ChartLocation(String),
}
