use crate::db::{ColumnMeta, QueryResult, Relationship};
use crate::error::Result;
use async_trait::async_trait;

/// Read-only view of the database's own metadata for the working schema.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnMeta>>;

    /// `(table, column)` pairs ordered by table, then key position.
    async fn list_primary_keys(&self) -> Result<Vec<(String, String)>>;

    async fn list_foreign_keys(&self) -> Result<Vec<Relationship>>;

    async fn table_comment(&self, table: &str) -> Result<Option<String>>;

    async fn column_comment(&self, table: &str, column: &str) -> Result<Option<String>>;

    async fn sample_rows(&self, table: &str, limit: usize) -> Result<QueryResult>;
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Fails with `AssistantError::QueryExecution` carrying the engine message.
    async fn execute(&self, sql: &str) -> Result<QueryResult>;

    async fn ping(&self) -> bool;

    async fn reconnect(&mut self) -> Result<()>;
}

/// Everything a session needs from the database.
pub trait Backend: Catalog + Executor {}

impl<T: Catalog + Executor> Backend for T {}
