use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?i:sql)?(.*?)```").unwrap());

static LABEL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:SQL query|Query|SQL):\s*").unwrap());

/// Pulls a single SQL statement out of free-form model output.
///
/// The first fenced block wins; without one the whole reply is used. A
/// leading `SQL query:` / `Query:` / `SQL:` label and any stray backticks are
/// removed. An empty result means the model produced nothing runnable.
pub fn extract_sql(response: &str) -> String {
    let sql = match FENCE_REGEX.captures(response) {
        Some(captures) => captures.get(1).map(|m| m.as_str()).unwrap_or("").trim(),
        None => response.trim(),
    };

    let sql = LABEL_REGEX.replace(sql, "");
    sql.replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_sql_tag() {
        assert_eq!(extract_sql("Here:\n```sql\nSELECT 1;\n```"), "SELECT 1;");
    }

    #[test]
    fn test_label_prefix_without_fence() {
        assert_eq!(extract_sql("SQL: SELECT 1;"), "SELECT 1;");
        assert_eq!(extract_sql("sql query: SELECT 2;"), "SELECT 2;");
        assert_eq!(extract_sql("Query:\nSELECT 3;"), "SELECT 3;");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_sql(""), "");
        assert_eq!(extract_sql("   \n"), "");
        assert_eq!(extract_sql("```sql\n```"), "");
    }

    #[test]
    fn test_first_block_wins() {
        let response = "Option A:\n```sql\nSELECT a FROM t;\n```\nOption B:\n```sql\nSELECT b FROM t;\n```";
        assert_eq!(extract_sql(response), "SELECT a FROM t;");
    }

    #[test]
    fn test_untagged_and_uppercase_tagged_fences() {
        assert_eq!(extract_sql("```\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(extract_sql("```SQL\nSELECT 1;\n```"), "SELECT 1;");
    }

    #[test]
    fn test_label_requires_colon() {
        assert_eq!(extract_sql("SQLSELECT 1"), "SQLSELECT 1");
        assert_eq!(extract_sql("Query results are below"), "Query results are below");
    }

    #[test]
    fn test_stray_backticks_removed() {
        assert_eq!(extract_sql("`SELECT 1;`"), "SELECT 1;");
        assert_eq!(extract_sql("SELECT `id` FROM t;"), "SELECT id FROM t;");
    }
}
