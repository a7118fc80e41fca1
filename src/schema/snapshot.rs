use crate::db::{Catalog, ColumnDescriptor, ColumnMeta, Relationship, TableDescriptor};
use crate::error::Result;
use crate::semantic::SemanticInference;
use serde::Serialize;
use std::collections::HashMap;

/// Point-in-time capture of the working schema with inferred semantics.
/// Never refreshed in place: rebuild to pick up schema changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaSnapshot {
    /// Catalog discovery order.
    pub tables: Vec<TableDescriptor>,
    pub relationships: Vec<Relationship>,
    pub primary_keys: HashMap<String, Vec<String>>,
    /// `table.column` -> label, non-empty labels only.
    pub semantics: HashMap<String, String>,
    /// Tables skipped because their metadata could not be read.
    pub warnings: Vec<String>,
}

impl SchemaSnapshot {
    #[cfg(test)]
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn semantic(&self, table: &str, column: &str) -> &str {
        self.semantics
            .get(&SemanticInference::key(table, column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}

struct RawTable {
    name: String,
    columns: Vec<ColumnMeta>,
    comment: Option<String>,
    sample: Result<crate::db::QueryResult>,
}

/// Scans the catalog and labels every column. Per-table failures are logged
/// and isolated; only the global table/key listings can fail the build.
pub async fn build_snapshot<C: Catalog + ?Sized>(catalog: &C, sample_limit: usize) -> Result<SchemaSnapshot> {
    let table_names = catalog.list_tables().await?;
    let mut warnings = Vec::new();
    let mut raw_tables = Vec::with_capacity(table_names.len());

    for name in table_names {
        let columns = match catalog.list_columns(&name).await {
            Ok(columns) => columns,
            Err(e) => {
                tracing::warn!("skipping table {}: {}", name, e);
                warnings.push(format!("{}: {}", name, e));
                continue;
            }
        };

        let comment = catalog.table_comment(&name).await.unwrap_or_else(|e| {
            tracing::warn!("could not read comment for {}: {}", name, e);
            None
        });

        let sample = catalog.sample_rows(&name, sample_limit).await;
        raw_tables.push(RawTable { name, columns, comment, sample });
    }

    let mut primary_keys: HashMap<String, Vec<String>> = HashMap::new();
    for (table, column) in catalog.list_primary_keys().await? {
        primary_keys.entry(table).or_default().push(column);
    }

    let relationships = catalog.list_foreign_keys().await?;

    let mut inference = SemanticInference::new();
    let mut semantics = HashMap::new();
    let mut tables = Vec::with_capacity(raw_tables.len());

    for raw in raw_tables {
        let mut columns = Vec::with_capacity(raw.columns.len());
        for meta in raw.columns {
            let label = inference
                .infer(catalog, &raw.name, &meta.name, &meta.data_type)
                .await;
            if !label.is_empty() {
                semantics.insert(SemanticInference::key(&raw.name, &meta.name), label.clone());
            }
            columns.push(ColumnDescriptor::from_meta(meta, label));
        }

        let (sample_rows, sample_error) = match raw.sample {
            Ok(result) => (result.records(), None),
            Err(e) => {
                tracing::warn!("no sample data for {}: {}", raw.name, e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        tables.push(TableDescriptor {
            primary_key: primary_keys.get(&raw.name).cloned().unwrap_or_default(),
            name: raw.name,
            columns,
            comment: raw.comment,
            sample_rows,
            sample_error,
        });
    }

    let snapshot = SchemaSnapshot {
        tables,
        relationships,
        primary_keys,
        semantics,
        warnings,
    };

    tracing::info!(
        "analyzed {} tables, {} columns ({} with known meaning), {} relationships",
        snapshot.tables.len(),
        snapshot.column_count(),
        snapshot.semantics.len(),
        snapshot.relationships.len()
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{column, MemoryDatabase};

    #[tokio::test]
    async fn test_orders_dates_get_distinct_roles() {
        let snapshot = build_snapshot(&MemoryDatabase::shop(), 3).await.unwrap();

        assert_eq!(snapshot.semantic("orders", "order_date"), "Date when the order was placed");
        assert_eq!(
            snapshot.semantic("orders", "delivery_date"),
            "Date when items were actually delivered to the customer"
        );
        let orders = snapshot.table("orders").unwrap();
        assert_eq!(orders.column("order_date").unwrap().semantic, "Date when the order was placed");
        assert_eq!(orders.primary_key, vec!["order_id".to_string()]);
    }

    #[tokio::test]
    async fn test_tables_keep_discovery_order_and_samples() {
        let snapshot = build_snapshot(&MemoryDatabase::shop(), 3).await.unwrap();

        let names: Vec<&str> = snapshot.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["customers", "orders"]);

        let customers = snapshot.table("customers").unwrap();
        assert_eq!(customers.sample_rows.len(), 3);
        assert_eq!(customers.sample_rows[0].get("name"), Some("Ada"));
        assert!(snapshot.table("orders").unwrap().sample_rows.is_empty());
        assert_eq!(snapshot.relationships.len(), 1);
    }

    #[tokio::test]
    async fn test_sample_limit_is_respected() {
        let snapshot = build_snapshot(&MemoryDatabase::shop(), 1).await.unwrap();
        assert_eq!(snapshot.table("customers").unwrap().sample_rows.len(), 1);
    }

    #[tokio::test]
    async fn test_sample_failure_is_isolated() {
        let mut db = MemoryDatabase::shop();
        db.failing_samples.insert("customers".to_string());

        let snapshot = build_snapshot(&db, 3).await.unwrap();

        let customers = snapshot.table("customers").unwrap();
        assert!(customers.sample_rows.is_empty());
        assert!(customers.sample_error.as_deref().unwrap().contains("permission denied"));
        assert_eq!(snapshot.tables.len(), 2);
        assert_eq!(snapshot.semantic("customers", "email"), "Email");
    }

    #[tokio::test]
    async fn test_unreadable_columns_skip_only_that_table() {
        let mut db = MemoryDatabase::shop();
        db.failing_columns.insert("customers".to_string());

        let snapshot = build_snapshot(&db, 3).await.unwrap();

        let names: Vec<&str> = snapshot.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders"]);
        assert_eq!(snapshot.warnings.len(), 1);
        assert!(snapshot.warnings[0].starts_with("customers: "));
        assert!(snapshot.warnings[0].contains("permission denied"));
        assert_eq!(snapshot.semantic("orders", "order_date"), "Date when the order was placed");
        assert_eq!(snapshot.semantic("customers", "email"), "");
        assert_eq!(snapshot.relationships.len(), 1);
    }

    #[tokio::test]
    async fn test_dangling_relationship_is_kept() {
        let db = MemoryDatabase::default()
            .with_table("invoices", vec![column("account_id", "uuid", false)])
            .with_foreign_key("invoices", "account_id", "accounts", "id");

        let snapshot = build_snapshot(&db, 3).await.unwrap();
        assert_eq!(snapshot.relationships[0].references_table, "accounts");
        assert_eq!(snapshot.semantic("invoices", "account_id"), "Identifier for a account");
    }

    #[tokio::test]
    async fn test_empty_labels_are_not_recorded() {
        let db = MemoryDatabase::default().with_table("events", vec![column("payload", "jsonb", true)]);

        let snapshot = build_snapshot(&db, 3).await.unwrap();
        assert!(snapshot.semantics.is_empty());
        assert_eq!(snapshot.table("events").unwrap().columns[0].semantic, "");
    }

    #[tokio::test]
    async fn test_rebuild_is_fresh() {
        let db = MemoryDatabase::shop();
        let first = build_snapshot(&db, 3).await.unwrap();
        let second = build_snapshot(&db, 3).await.unwrap();

        assert_eq!(first.semantics, second.semantics);
        // one lookup per column per build
        let columns = first.column_count();
        assert_eq!(db.comment_lookups.load(std::sync::atomic::Ordering::SeqCst), columns * 2);
    }
}
