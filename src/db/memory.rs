//! In-memory catalog and executor used by the unit tests.

use crate::db::{Catalog, ColumnMeta, Executor, QueryResult, Relationship};
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryDatabase {
    pub tables: Vec<(String, Vec<ColumnMeta>)>,
    pub primary_keys: Vec<(String, String)>,
    pub foreign_keys: Vec<Relationship>,
    pub table_comments: HashMap<String, String>,
    pub column_comments: HashMap<String, String>,
    pub samples: HashMap<String, QueryResult>,
    pub failing_samples: HashSet<String>,
    pub failing_columns: HashSet<String>,
    pub failing_sql: HashMap<String, String>,
    pub comment_lookups: AtomicUsize,
    pub executed: Mutex<Vec<String>>,
    pub dead: AtomicBool,
    pub reconnect_fails: bool,
    pub reconnects: AtomicUsize,
}

pub fn column(name: &str, data_type: &str, nullable: bool) -> ColumnMeta {
    ColumnMeta {
        name: name.to_string(),
        data_type: data_type.to_string(),
        nullable,
        default: None,
        max_length: None,
        precision: None,
        scale: None,
    }
}

impl MemoryDatabase {
    pub fn with_table(mut self, name: &str, columns: Vec<ColumnMeta>) -> Self {
        self.tables.push((name.to_string(), columns));
        self
    }

    pub fn with_primary_key(mut self, table: &str, column: &str) -> Self {
        self.primary_keys.push((table.to_string(), column.to_string()));
        self
    }

    pub fn with_foreign_key(mut self, table: &str, column: &str, references_table: &str, references_column: &str) -> Self {
        self.foreign_keys.push(Relationship {
            table: table.to_string(),
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: references_column.to_string(),
        });
        self
    }

    pub fn with_sample(mut self, table: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        self.samples.insert(
            table.to_string(),
            QueryResult {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|v| v.to_string()).collect())
                    .collect(),
            },
        );
        self
    }

    pub fn with_column_comment(mut self, table: &str, column: &str, comment: &str) -> Self {
        self.column_comments
            .insert(format!("{}.{}", table, column), comment.to_string());
        self
    }

    pub fn failing_sql(mut self, sql: &str, message: &str) -> Self {
        self.failing_sql.insert(sql.to_string(), message.to_string());
        self
    }

    /// The standard shop schema used across tests.
    pub fn shop() -> Self {
        MemoryDatabase::default()
            .with_table(
                "customers",
                vec![
                    column("id", "integer", false),
                    column("name", "character varying", false),
                    column("email", "text", true),
                ],
            )
            .with_table(
                "orders",
                vec![
                    column("order_id", "integer", false),
                    column("customer_id", "integer", false),
                    column("order_date", "timestamp without time zone", false),
                    column("delivery_date", "timestamp without time zone", true),
                ],
            )
            .with_primary_key("customers", "id")
            .with_primary_key("orders", "order_id")
            .with_foreign_key("orders", "customer_id", "customers", "id")
            .with_sample(
                "customers",
                &["id", "name", "email"],
                &[&["1", "Ada", "ada@example.com"], &["2", "Linus", "(NULL)"], &["3", "Grace", "grace@example.com"]],
            )
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Catalog for MemoryDatabase {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        if self.failing_columns.contains(table) {
            return Err(AssistantError::CatalogIntrospection {
                table: table.to_string(),
                message: "permission denied for table".to_string(),
            });
        }
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.clone())
            .ok_or_else(|| AssistantError::CatalogIntrospection {
                table: table.to_string(),
                message: "no such table".to_string(),
            })
    }

    async fn list_primary_keys(&self) -> Result<Vec<(String, String)>> {
        Ok(self.primary_keys.clone())
    }

    async fn list_foreign_keys(&self) -> Result<Vec<Relationship>> {
        Ok(self.foreign_keys.clone())
    }

    async fn table_comment(&self, table: &str) -> Result<Option<String>> {
        Ok(self.table_comments.get(table).cloned())
    }

    async fn column_comment(&self, table: &str, column: &str) -> Result<Option<String>> {
        self.comment_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.column_comments.get(&format!("{}.{}", table, column)).cloned())
    }

    async fn sample_rows(&self, table: &str, limit: usize) -> Result<QueryResult> {
        if self.failing_samples.contains(table) {
            return Err(AssistantError::CatalogIntrospection {
                table: table.to_string(),
                message: "permission denied".to_string(),
            });
        }
        let mut sample = self.samples.get(table).cloned().unwrap_or_default();
        sample.rows.truncate(limit);
        Ok(sample)
    }
}

#[async_trait]
impl Executor for MemoryDatabase {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        if let Some(message) = self.failing_sql.get(sql) {
            return Err(AssistantError::QueryExecution {
                sql: sql.to_string(),
                message: message.clone(),
            });
        }
        Ok(QueryResult {
            columns: vec!["count".to_string()],
            rows: vec![vec!["42".to_string()]],
        })
    }

    async fn ping(&self) -> bool {
        !self.dead.load(Ordering::SeqCst)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        if self.reconnect_fails {
            return Err(AssistantError::Connection("connection refused".to_string()));
        }
        self.dead.store(false, Ordering::SeqCst);
        Ok(())
    }
}
