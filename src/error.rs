use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Channel error: {0}")]
    ChannelError(String),
    #[error("Task error: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BankError>;
