use thiserror::Error;

/// Failures talking to the weather API.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("request to weather API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API returned status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("failed to decode weather API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no location matching '{0}'")]
    NotFound(String),

    #[error("weather API response contained no forecast days")]
    EmptyForecast,
}

/// Failures of the persistent key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[source] serde_json::Error),
}
