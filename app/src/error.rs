use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid {key} value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{upstream} returned {status}")]
    Status { upstream: &'static str, status: u16 },
    #[error("{upstream} request failed: {source}")]
    Transport {
        upstream: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{upstream} sent invalid JSON: {source}")]
    Payload {
        upstream: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },
    #[error(transparent)]
    Database(#[from] DBError),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn upstream(context: &'static str, source: UpstreamError) -> Self {
        ApiError::Upstream { context, source }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DBError),
    #[error("Failed building http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed binding server: {0}")]
    Bind(#[from] warp::Error),
}
