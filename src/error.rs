use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("catalog introspection failed for table {table}: {message}")]
    CatalogIntrospection { table: String, message: String },

    #[error("model transport error: {0}")]
    ModelTransport(String),

    #[error("no usable SQL found in model output")]
    ExtractionEmpty { raw: String },

    #[error("query failed: {message}\n  sql: {sql}")]
    QueryExecution { sql: String, message: String },

    #[error("empty query")]
    EmptyQuery,

    #[error("cannot {action} while {phase}")]
    InvalidTransition { phase: String, action: String },

    #[error("no history entry {index} (history has {len} entries)")]
    HistoryEntryMissing { index: usize, len: usize },

    #[error("schema has not been analyzed yet")]
    NotAnalyzed,

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;

/// Prefer the server-reported message over the driver's wrapper text.
pub fn engine_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => db.message().to_string(),
        None => err.to_string(),
    }
}
