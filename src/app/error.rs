use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("PINCODE must be set to select a store")]
    MissingStoreSelection,

    #[error("No products found in the catalog response for store {store:?}")]
    EmptyCatalog { store: String },

    #[error("Could not open any fetch session: {0}")]
    NoSessions(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, WatchError>;
