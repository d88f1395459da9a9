use thiserror::Error;

pub type DocvaultResult<T> = Result<T, DocvaultError>;

#[derive(Debug, Error)]
pub enum DocvaultError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
