use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not a supported page: {0}")]
    NotTargetPage(String),

    #[error("No keyword found for page: {0}")]
    MissingKeyword(String),

    #[error("Page not ready after {0} attempts")]
    Timeout(u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
