use thiserror::Error;

/// Failures of a remote backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response is missing field `{0}`")]
    MissingField(&'static str),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Backend not reachable at {0}")]
    BackendNotReachable(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Short message suitable for showing to the runner.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Request(_) | ApiError::BackendNotReachable(_) => {
                "Could not reach the server. Check your connection."
            }
            _ => "The server could not process the request.",
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tracker task has stopped")]
    TrackerStopped,
}

impl TrackerError {
    /// Short message suitable for showing to the runner.
    pub fn user_message(&self) -> &'static str {
        match self {
            TrackerError::Api(e) => e.user_message(),
            TrackerError::Gpx(_) | TrackerError::Io(_) => "Could not export the route.",
            TrackerError::InvalidInput(_) => "Invalid input.",
            TrackerError::TrackerStopped => "Tracking has stopped unexpectedly.",
        }
    }
}
