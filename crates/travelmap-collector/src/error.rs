use thiserror::Error;
use travelmap_db::DbError;
use travelmap_youtube::YouTubeError;

/// Failure reported by a [`crate::VideoGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found upstream: {0}")]
    NotFound(String),

    #[error("upstream quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl From<YouTubeError> for GatewayError {
    fn from(err: YouTubeError) -> Self {
        match err {
            YouTubeError::NotFound(what) => Self::NotFound(what),
            YouTubeError::QuotaExceeded(message) => Self::QuotaExceeded(message),
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Failure reported by a [`crate::CollectorStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Db(DbError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound,
            other => Self::Db(other),
        }
    }
}

/// Workflow-level error returned by [`crate::Collector`].
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("a bulk collection is already running")]
    AlreadyRunning,

    #[error("channel {external_id} is already registered as '{name}'")]
    AlreadyRegistered { external_id: String, name: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Gateway(GatewayError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<GatewayError> for CollectError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(what) => Self::NotFound(what),
            other => Self::Gateway(other),
        }
    }
}

impl From<StoreError> for CollectError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("stored record".to_string()),
            other => Self::Store(other),
        }
    }
}
