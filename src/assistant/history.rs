use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MANUAL_QUESTION: &str = "MANUAL QUERY";
pub const MANUAL_EXPLANATION: &str = "Manually entered query";
pub const FIXED_EXPLANATION: &str = "Manually fixed query";

pub fn fixed_question(question: &str) -> String {
    format!("FIXED: {}", question)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    pub id: Uuid,
    pub question: String,
    pub sql: String,
    pub row_count: usize,
    pub explanation: String,
    /// Engine message when the attempt failed.
    pub error: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl QueryHistoryEntry {
    pub fn new(question: &str, sql: &str, row_count: usize, explanation: &str, error: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.to_string(),
            sql: sql.to_string(),
            row_count,
            explanation: explanation.to_string(),
            error,
            timestamp: Local::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Append-only log of attempts. Stored oldest first, presented newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryHistory {
    entries: Vec<QueryHistoryEntry>,
}

impl QueryHistory {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueryHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were recorded.
    #[cfg(test)]
    pub fn entries(&self) -> &[QueryHistoryEntry] {
        &self.entries
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &QueryHistoryEntry> {
        self.entries.iter().rev()
    }

    /// `index` counts from the most recent entry (0 = latest).
    pub fn get(&self, index: usize) -> Option<&QueryHistoryEntry> {
        self.newest_first().nth(index)
    }
}
