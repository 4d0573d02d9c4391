use serde::{Deserialize, Serialize};

/// A stored sensor sample. `id` is assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: i64,
    pub timestamp: String,
    pub temperature: f64,
    pub humidity: f64,
}

/// A decoded sample that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub timestamp: String,
    pub temperature: f64,
    pub humidity: f64,
}

/// Message body as published on the broker topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub timestamp: String,
    pub temp: f64,
    pub humidity: f64,
}

impl From<ReadingPayload> for NewReading {
    fn from(payload: ReadingPayload) -> Self {
        Self {
            timestamp: payload.timestamp,
            temperature: payload.temp,
            humidity: payload.humidity,
        }
    }
}

/// REST API error body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
