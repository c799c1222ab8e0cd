//! Application-wide error types.

use thiserror::Error;

use crate::graph::GraphError;
use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("llm error: {0}")]
    Llm(#[from] ProviderError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("qa error: {0}")]
    Qa(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
