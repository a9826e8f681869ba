use std::time::Duration;
use thiserror::Error;

/// Errors raised while establishing the broker or store connection at startup
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("MQTT broker connection failed: {0}")]
    Broker(String),

    #[error("No CONNACK from MQTT broker within {0:?}")]
    ConnectTimeout(Duration),

    #[error("Failed to subscribe to {topic}: {message}")]
    Subscribe { topic: String, message: String },

    #[error("Object store bucket {bucket} is not reachable: {message}")]
    Store { bucket: String, message: String },
}
