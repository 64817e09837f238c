use thiserror::Error;

/// Failures talking to the data catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found in catalog: {0}")]
    NotFound(String),

    #[error("catalog rejected the credentials for {action}: {message}")]
    Unauthorized { action: String, message: String },

    #[error("catalog action {action} failed with status {status}: {message}")]
    Api {
        action: String,
        status: u16,
        message: String,
    },

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid catalog URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CatalogError::Unauthorized { .. })
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
