//! Error taxonomy for the bridge, matching the failure classes a careful
//! operator would want to distinguish in logs: configuration problems are
//! fatal at startup, queue closure is an expected shutdown signal, and
//! broker/WebSocket errors are reported but absorbed by the worker that hit
//! them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("queue is closed")]
    QueueClosed,

    #[error("broker error: {0}")]
    Broker(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
