use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Invalid task data: {0}")]
    InvalidData(String),

    #[error("No valid tasks found in {0}")]
    NoValidTasks(String),

    #[error("Invalid month format: {0}")]
    MonthParse(String),

    #[error("Invalid filter: {0}")]
    Filter(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
