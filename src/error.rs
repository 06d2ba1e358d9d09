use thiserror::Error;

/// Main error type for similar-entities
#[derive(Error, Debug)]
pub enum SimilarError {
    /// Malformed entity id or other caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity payload is missing expected structure
    #[error("Entity data error: {0}")]
    EntityData(String),

    /// No usable conditions could be derived for the entity
    #[error("Could not make any conditions for entity {0}")]
    NoConditions(String),

    /// A single condition group does not fit within the query length budget
    #[error("Query size error: {0}")]
    QuerySize(String),

    /// SPARQL endpoint or upstream API failure
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimilarError {
    /// True for errors caused by the caller's input rather than upstream systems.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SimilarError::InvalidInput(_))
    }
}

/// Convenient Result type using SimilarError
pub type Result<T> = std::result::Result<T, SimilarError>;
