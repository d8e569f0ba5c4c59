use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Index build error: {0}")]
    IndexBuild(String),

    #[error("Retrieval mismatch: {0}")]
    RetrievalMismatch(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod cleaning;
pub mod commands;
pub mod completion;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod prompt;
pub mod session;
pub mod table;
