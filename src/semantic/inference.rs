use crate::db::Catalog;
use crate::semantic::rules::infer_from_rules;
use std::collections::HashMap;

/// Memoising semantic labeller. One instance lives for one snapshot build;
/// each `table.column` key is resolved (comment lookup included) exactly once.
#[derive(Debug, Default)]
pub struct SemanticInference {
    cache: HashMap<String, String>,
}

impl SemanticInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(table: &str, column: &str) -> String {
        format!("{}.{}", table, column)
    }

    /// A stored column comment wins verbatim; otherwise the name/type rules
    /// decide. Returns an empty string when nothing is known.
    pub async fn infer<C: Catalog + ?Sized>(
        &mut self,
        catalog: &C,
        table: &str,
        column: &str,
        data_type: &str,
    ) -> String {
        let key = Self::key(table, column);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let comment = match catalog.column_comment(table, column).await {
            Ok(comment) => comment.filter(|c| !c.trim().is_empty()),
            Err(e) => {
                tracing::warn!("comment lookup failed for {}: {}", key, e);
                None
            }
        };

        let label = comment.unwrap_or_else(|| infer_from_rules(column, data_type));
        self.cache.insert(key, label.clone());
        label
    }

    #[cfg(test)]
    pub fn cached(&self, table: &str, column: &str) -> Option<&str> {
        self.cache.get(&Self::key(table, column)).map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDatabase;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_comment_wins_verbatim() {
        let db = MemoryDatabase::default().with_column_comment("orders", "order_date", "When the invoice was printed");
        let mut inference = SemanticInference::new();

        let label = inference
            .infer(&db, "orders", "order_date", "timestamp without time zone")
            .await;
        assert_eq!(label, "When the invoice was printed");
    }

    #[tokio::test]
    async fn test_repeat_calls_hit_the_cache() {
        let db = MemoryDatabase::default();
        let mut inference = SemanticInference::new();

        let first = inference.infer(&db, "orders", "delivery_date", "date").await;
        let second = inference.infer(&db, "orders", "delivery_date", "date").await;

        assert_eq!(first, second);
        assert_eq!(first, "Date when items were actually delivered to the customer");
        assert_eq!(db.comment_lookups.load(Ordering::SeqCst), 1);
        assert_eq!(inference.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_columns_are_cached_as_empty() {
        let db = MemoryDatabase::default();
        let mut inference = SemanticInference::new();

        assert_eq!(inference.infer(&db, "t", "payload", "jsonb").await, "");
        assert_eq!(inference.infer(&db, "t", "payload", "jsonb").await, "");
        assert_eq!(inference.cached("t", "payload"), Some(""));
        assert_eq!(db.comment_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_comment_falls_back_to_rules() {
        let db = MemoryDatabase::default().with_column_comment("orders", "unit_price", "   ");
        let mut inference = SemanticInference::new();

        assert_eq!(inference.infer(&db, "orders", "unit_price", "numeric").await, "Monetary value");
    }
}
