use thiserror::Error;

/// Main error type for Skypath
#[derive(Error, Debug)]
pub enum SkypathError {
    /// Transport-level failure talking to the XRPC service
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status from the XRPC service
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Handle or identifier did not resolve to an actor
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system / socket I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frontier bookkeeping produced an edge set that does not connect the endpoints
    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Another search is still running and the server rejects concurrent searches
    #[error("A search is already in progress")]
    SearchBusy,
}

/// Convenient Result type using SkypathError
pub type Result<T> = std::result::Result<T, SkypathError>;
