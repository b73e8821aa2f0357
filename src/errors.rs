use thiserror::Error;

/// Error type for admin API access and row browsing.
#[derive(Error, Debug)]
pub enum AdminError {
    /// Transport level failure reported by the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Fetch error: {0}")]
    Fetch(String),
    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
    /// A stored cell payload could not be rendered (e.g. malformed file descriptor).
    #[error("Render error: {0}")]
    Render(String),
    #[error("Missing primary key: {0}")]
    MissingPrimaryKey(String),
    #[error("Relation is read-only: {0}")]
    ReadOnly(String),
    /// Configuration error (e.g. missing admin URL or invalid page size).
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Error: {0}")]
    General(String),
}

impl AdminError {
    /// Whether the error came from fetching or decoding a response, i.e. the kind of
    /// failure that stale data may cover for.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AdminError::Http(_)
                | AdminError::Status { .. }
                | AdminError::Fetch(_)
                | AdminError::Decode(_)
        )
    }
}
