use crate::db::QueryResult;

pub fn sql_generation_prompt(schema_brief: &str, question: &str) -> String {
    format!(
        r#"
You are an expert SQL query generator for PostgreSQL databases.
Given the database schema below, generate a SQL query to answer the question.

{}

Question: {}

IMPORTANT GUIDELINES:
1. Pay close attention to column semantics and meanings when choosing tables and columns.
2. Distinguish between similar but functionally different columns.
3. Use appropriate joins based on the relationships defined in the schema.
4. Ensure data types match when making comparisons.
5. For date/time operations, use appropriate PostgreSQL functions.
6. Use OR conditions when the information could be in two different columns.
7. Provide only ONE query, not multiple options.
8. Use LIMIT and OFFSET if you need to return a limited number of results.
9. Use ILIKE with % wildcards for every text comparison.

Place the SQL statement inside triple backticks like this:
```sql
SELECT * FROM table WHERE condition;
```
Do not explain or send anything else.
"#,
        schema_brief, question
    )
}

/// Only the first `row_limit` rows are sent to keep the prompt bounded.
pub fn result_explanation_prompt(question: &str, sql: &str, result: &QueryResult, row_limit: usize) -> String {
    let rows: Vec<serde_json::Value> = result
        .records()
        .iter()
        .take(row_limit)
        .map(|r| r.to_json())
        .collect();
    let rows_json = serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"
Question: {}

SQL Query: {}

Results ({} rows in total): {}

Provide a natural language explanation of these results that directly answers the original question.
Keep your explanation clear, concise, and focused on what the user actually asked.
If the results contain a lot of data, summarize the key points.
"#,
        question,
        sql,
        result.row_count(),
        rows_json
    )
}

pub fn error_explanation_prompt(question: &str, sql: &str, error: &str) -> String {
    format!(
        r#"
Question: {}

SQL Query: {}

Error: {}

Please explain what went wrong with this query in simple terms and suggest how to fix it.
Be specific about any syntax errors or invalid references.
"#,
        question, sql, error
    )
}
