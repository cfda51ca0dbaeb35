use crate::dispatch::error::QueueError;
use crate::engine::error::EngineError;
use crate::store::error::StoreError;
use crate::types::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Unknown engine driver: {0}")]
    UnknownEngine(String),
}
