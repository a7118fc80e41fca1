//! Text renderings of a [`SchemaSnapshot`]: one for people, one for the model.

use crate::db::{Record, Relationship, TableDescriptor};
use crate::schema::SchemaSnapshot;
use crate::semantic::TypeCategory;
use std::fmt::Write;

const SAMPLE_ROWS_SHOWN: usize = 2;

pub const BRIEF_GUIDANCE: &str = "\
Column meanings below were inferred from column names, data types and stored comments.
Several columns can look alike (for example an order date and a delivery date); \
choose the one whose meaning matches the question.
Join tables only along the relationships listed below and compare values of matching types.
Sample rows show the shape of real data, not the full contents of a table.";

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sentence linking the two ends of a relationship, when either side has a
/// known meaning. Without a target meaning the referenced table is named.
pub fn connective(owner_semantic: &str, references_table: &str, target_semantic: &str) -> Option<String> {
    match (owner_semantic.is_empty(), target_semantic.is_empty()) {
        (true, true) => None,
        (false, false) => Some(format!("{} refers to {}", owner_semantic, lower_first(target_semantic))),
        (false, true) => Some(format!("{} refers to a record in {}", owner_semantic, references_table)),
        (true, false) => Some(format!(
            "Refers to {} in {}",
            lower_first(target_semantic),
            references_table
        )),
    }
}

fn relationship_connective(snapshot: &SchemaSnapshot, rel: &Relationship) -> Option<String> {
    connective(
        snapshot.semantic(&rel.table, &rel.column),
        &rel.references_table,
        snapshot.semantic(&rel.references_table, &rel.references_column),
    )
}

fn table_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// Human-readable schema overview.
pub fn describe_schema(snapshot: &SchemaSnapshot) -> String {
    let mut out = String::from("Database Schema:\n\n");

    for table in &snapshot.tables {
        describe_table(&mut out, table);
    }

    if !snapshot.relationships.is_empty() {
        out.push_str("Relationships:\n");
        for rel in &snapshot.relationships {
            let _ = write!(
                out,
                "  - {}.{} references {}.{}",
                rel.table, rel.column, rel.references_table, rel.references_column
            );
            if let Some(sentence) = relationship_connective(snapshot, rel) {
                let _ = write!(out, " ({})", sentence);
            }
            out.push('\n');
        }
    }

    out
}

fn describe_table(out: &mut String, table: &TableDescriptor) {
    let _ = write!(out, "Table: {}", table.name);
    if let Some(comment) = &table.comment {
        let _ = write!(out, " - {}", comment);
    }
    out.push_str("\nColumns:\n");

    for column in &table.columns {
        let nullable = if column.nullable { "NULLABLE" } else { "NOT NULL" };
        let _ = write!(out, "  - {} ({}, {}", column.name, column.display_type(), nullable);
        if let Some(default) = &column.default {
            let _ = write!(out, ", DEFAULT: {}", default);
        }
        out.push(')');
        if !column.semantic.is_empty() {
            let _ = write!(out, " - {}", column.semantic);
        }
        out.push('\n');
    }

    if !table.primary_key.is_empty() {
        let _ = writeln!(out, "Primary Key: {}", table.primary_key.join(", "));
    }

    if !table.sample_rows.is_empty() {
        out.push_str("Sample data:\n");
        for (i, row) in table.sample_rows.iter().take(SAMPLE_ROWS_SHOWN).enumerate() {
            let _ = writeln!(out, "  Row {}: {}", i + 1, row);
        }
    } else if let Some(reason) = &table.sample_error {
        let _ = writeln!(out, "Sample data unavailable: {}", reason);
    }

    out.push('\n');
}

/// Structured brief handed to the language model.
pub fn render_model_brief(snapshot: &SchemaSnapshot) -> String {
    let mut out = String::from("# Database Schema\n\n");
    out.push_str(BRIEF_GUIDANCE);
    out.push_str("\n\n");

    for table in &snapshot.tables {
        brief_table(&mut out, table);
    }

    if !snapshot.relationships.is_empty() {
        out.push_str("## Relationships\n");
        for rel in &snapshot.relationships {
            let _ = write!(
                out,
                "- {}.{} → {}.{}",
                rel.table, rel.column, rel.references_table, rel.references_column
            );
            if let Some(sentence) = relationship_connective(snapshot, rel) {
                let _ = write!(out, " ({})", sentence);
            }
            out.push('\n');
        }
        out.push('\n');
    }

    let date_rows: Vec<String> = snapshot
        .tables
        .iter()
        .flat_map(|table| {
            table
                .columns
                .iter()
                .filter(|c| !c.semantic.is_empty() && TypeCategory::of(&c.data_type) == TypeCategory::DateTime)
                .map(move |c| {
                    format!(
                        "| {} | {} | {} | {} |",
                        table.name,
                        c.name,
                        c.data_type,
                        table_cell(&c.semantic)
                    )
                })
        })
        .collect();

    if !date_rows.is_empty() {
        out.push_str("## Date/Time Columns Quick Reference\n");
        out.push_str("| Table | Column | Type | Meaning |\n");
        out.push_str("|-------|--------|------|---------|\n");
        for row in date_rows {
            out.push_str(&row);
            out.push('\n');
        }
    }

    out
}

fn brief_table(out: &mut String, table: &TableDescriptor) {
    let _ = writeln!(out, "## Table: {}", table.name);
    if let Some(comment) = &table.comment {
        let _ = writeln!(out, "Description: {}", comment);
    }

    out.push_str("| Column | Type | Nullable | Default | PK | Meaning |\n");
    out.push_str("|--------|------|----------|---------|----|---------|\n");
    for column in &table.columns {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            column.name,
            column.display_type(),
            if column.nullable { "Y" } else { "N" },
            table_cell(column.default.as_deref().unwrap_or("")),
            if table.is_primary_key(&column.name) { "Y" } else { "N" },
            table_cell(&column.semantic)
        );
    }

    if let Some(first) = table.sample_rows.first() {
        let keys: Vec<&str> = first.keys().collect();
        out.push_str("\nSample data:\n```\n");
        out.push_str(&keys.join(", "));
        out.push('\n');
        for row in table.sample_rows.iter().take(SAMPLE_ROWS_SHOWN) {
            out.push_str(&sample_line(row, &keys));
            out.push('\n');
        }
        out.push_str("```\n");
    }

    out.push('\n');
}

fn sample_line(row: &Record, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| row.get(k).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(", ")
}
