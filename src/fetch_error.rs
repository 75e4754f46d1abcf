use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Forecast API returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Invalid forecast URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Rate limiting, server errors, timeouts and connection failures are worth retrying.
    /// Anything else (4xx, undecodable body) fails the fetch immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Request(e) => e.is_timeout() || e.is_connect(),
            FetchError::InvalidUrl(_) => false,
        }
    }
}
