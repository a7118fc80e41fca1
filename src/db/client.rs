use crate::db::{Catalog, ColumnMeta, Executor, QueryResult, Relationship, NULL_DISPLAY};
use crate::error::{engine_message, AssistantError, Result};
use async_trait::async_trait;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

pub struct Database {
    client: Client,
    connection_string: String,
    ssl: bool,
    schema: String,
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// Collects the first result set of a simple-protocol query as text.
// NULLs are rendered as NULL_DISPLAY.
fn collect_simple_rows(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut seen_result = false;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(description) if !seen_result => {
                columns = description.iter().map(|c| c.name().to_string()).collect();
            }
            SimpleQueryMessage::Row(row) if !seen_result => {
                if columns.is_empty() {
                    columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let values = (0..row.len())
                    .map(|i| row.get(i).unwrap_or(NULL_DISPLAY).to_string())
                    .collect();
                rows.push(values);
            }
            SimpleQueryMessage::CommandComplete(_) => {
                if !columns.is_empty() || !rows.is_empty() {
                    seen_result = true;
                }
            }
            _ => {}
        }
    }

    QueryResult { columns, rows }
}

async fn open_client(connection_string: &str, ssl: bool) -> Result<Client> {
    let client = if ssl {
        let connector = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| AssistantError::Connection(format!("TLS setup failed: {}", e)))?;
        let (client, connection) = tokio_postgres::connect(connection_string, MakeTlsConnector::new(connector))
            .await
            .map_err(|e| AssistantError::Connection(e.to_string()))?;

        // Keep connection alive in background task
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("database connection error: {}", e);
            }
        });
        client
    } else {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| AssistantError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("database connection error: {}", e);
            }
        });
        client
    };

    Ok(client)
}

impl Database {
    pub async fn connect(connection_string: &str, ssl: bool, schema: &str) -> Result<Self> {
        let client = open_client(connection_string, ssl).await?;
        tracing::info!("connected to database (schema {})", schema);

        Ok(Database {
            client,
            connection_string: connection_string.to_string(),
            ssl,
            schema: schema.to_string(),
        })
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }
}

#[async_trait]
impl Catalog for Database {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT table_name::text FROM information_schema.tables
                 WHERE table_schema = $1
                 AND table_type IN ('BASE TABLE', 'VIEW')
                 ORDER BY table_name",
                &[&self.schema],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        let rows = self
            .client
            .query(
                "SELECT
                    c.column_name::text,
                    c.data_type::text,
                    c.is_nullable::text,
                    c.column_default::text,
                    c.character_maximum_length::int4,
                    c.numeric_precision::int4,
                    c.numeric_scale::int4
                 FROM information_schema.columns c
                 WHERE c.table_schema = $1 AND c.table_name = $2
                 ORDER BY c.ordinal_position",
                &[&self.schema, &table],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let nullable: String = row.get(2);
                ColumnMeta {
                    name: row.get(0),
                    data_type: row.get(1),
                    nullable: nullable == "YES",
                    default: row.get(3),
                    max_length: row.get(4),
                    precision: row.get(5),
                    scale: row.get(6),
                }
            })
            .collect())
    }

    async fn list_primary_keys(&self) -> Result<Vec<(String, String)>> {
        let rows = self
            .client
            .query(
                "SELECT tc.table_name::text, kcu.column_name::text
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                     ON tc.constraint_name = kcu.constraint_name
                     AND tc.table_schema = kcu.table_schema
                 WHERE tc.constraint_type = 'PRIMARY KEY'
                     AND tc.table_schema = $1
                 ORDER BY tc.table_name, kcu.ordinal_position",
                &[&self.schema],
            )
            .await?;

        Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
    }

    async fn list_foreign_keys(&self) -> Result<Vec<Relationship>> {
        let rows = self
            .client
            .query(
                "SELECT
                    tc.table_name::text,
                    kcu.column_name::text,
                    ccu.table_name::text,
                    ccu.column_name::text
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                     ON tc.constraint_name = kcu.constraint_name
                     AND tc.table_schema = kcu.table_schema
                 JOIN information_schema.constraint_column_usage ccu
                     ON ccu.constraint_name = tc.constraint_name
                     AND ccu.constraint_schema = tc.table_schema
                 WHERE tc.constraint_type = 'FOREIGN KEY'
                     AND tc.table_schema = $1
                 ORDER BY tc.table_name, kcu.ordinal_position",
                &[&self.schema],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| Relationship {
                table: row.get(0),
                column: row.get(1),
                references_table: row.get(2),
                references_column: row.get(3),
            })
            .collect())
    }

    async fn table_comment(&self, table: &str) -> Result<Option<String>> {
        let row = self
            .client
            .query_one(
                "SELECT obj_description(($1::text)::regclass, 'pg_class')",
                &[&self.qualified(table)],
            )
            .await?;

        Ok(row.get(0))
    }

    async fn column_comment(&self, table: &str, column: &str) -> Result<Option<String>> {
        let row = self
            .client
            .query_opt(
                "SELECT col_description(a.attrelid, a.attnum)
                 FROM pg_catalog.pg_attribute a
                 WHERE a.attrelid = ($1::text)::regclass
                     AND a.attname = $2
                     AND NOT a.attisdropped",
                &[&self.qualified(table), &column],
            )
            .await?;

        Ok(row.and_then(|r| r.get(0)))
    }

    async fn sample_rows(&self, table: &str, limit: usize) -> Result<QueryResult> {
        let sql = format!("SELECT * FROM {} LIMIT {}", self.qualified(table), limit);
        let messages = self
            .client
            .simple_query(&sql)
            .await
            .map_err(|e| AssistantError::CatalogIntrospection {
                table: table.to_string(),
                message: engine_message(&e),
            })?;

        Ok(collect_simple_rows(messages))
    }
}

#[async_trait]
impl Executor for Database {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| AssistantError::QueryExecution {
                sql: sql.to_string(),
                message: engine_message(&e),
            })?;

        Ok(collect_simple_rows(messages))
    }

    async fn ping(&self) -> bool {
        if self.client.is_closed() {
            return false;
        }
        self.client.simple_query("SELECT 1").await.is_ok()
    }

    async fn reconnect(&mut self) -> Result<()> {
        tracing::warn!("reconnecting to database");
        self.client = open_client(&self.connection_string, self.ssl).await?;
        Ok(())
    }
}
