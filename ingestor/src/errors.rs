use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage write error: {0}")]
    StorageWrite(#[source] sqlx::Error),

    #[error("Storage write timed out after {0:?}")]
    StorageWriteTimeout(Duration),

    #[error("Query error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("No data available")]
    NotFound,

    #[error("Decode error: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        payload: String,
    },

    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
}

impl Error {
    /// Raw payload attached to a decode failure.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Error::Decode { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
