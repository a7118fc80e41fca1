use serde::{Deserialize, Serialize};

/// Text shown for SQL NULL in result cells.
pub const NULL_DISPLAY: &str = "(NULL)";

/// Raw column metadata as reported by the catalog, before semantics are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    /// Empty when no rule fired.
    pub semantic: String,
}

impl ColumnDescriptor {
    pub fn from_meta(meta: ColumnMeta, semantic: String) -> Self {
        Self {
            name: meta.name,
            data_type: meta.data_type,
            nullable: meta.nullable,
            default: meta.default,
            max_length: meta.max_length,
            precision: meta.precision,
            scale: meta.scale,
            semantic,
        }
    }

    /// Declared type with its length or precision, e.g. `character varying(80)`.
    pub fn display_type(&self) -> String {
        let lower = self.data_type.to_lowercase();
        match (self.max_length, self.precision, self.scale) {
            (Some(len), _, _) => format!("{}({})", self.data_type, len),
            (None, Some(p), Some(s)) if lower == "numeric" || lower == "decimal" => {
                format!("{}({},{})", self.data_type, p, s)
            }
            _ => self.data_type.clone(),
        }
    }
}

/// One row keyed by column name, in the order the database returned the columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| {
                let value = if v == NULL_DISPLAY {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(v.clone())
                };
                (k.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| Record {
                fields: self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub comment: Option<String>,
    pub primary_key: Vec<String>,
    pub sample_rows: Vec<Record>,
    /// Why sample rows are missing, when fetching them failed.
    pub sample_error: Option<String>,
}

impl TableDescriptor {
    #[cfg(test)]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }
}

/// Foreign key edge: `table.column` references `references_table.references_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub table: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_keep_column_order() {
        let result = QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec!["1".to_string(), "Ada".to_string()]],
        };
        let records = result.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(records[0].get("name"), Some("Ada"));
        assert_eq!(records[0].get("missing"), None);
        assert_eq!(records[0].to_string(), "{id: 1, name: Ada}");
    }

    #[test]
    fn test_null_cells_become_json_null() {
        let result = QueryResult {
            columns: vec!["name".to_string(), "email".to_string()],
            rows: vec![vec!["Linus".to_string(), NULL_DISPLAY.to_string()]],
        };
        let json = result.records()[0].to_json();
        assert_eq!(json["name"], serde_json::json!("Linus"));
        assert!(json["email"].is_null());
    }
}
