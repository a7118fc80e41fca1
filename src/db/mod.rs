mod catalog;
mod client;
#[cfg(test)]
pub mod memory;
mod models;

pub use catalog::{Backend, Catalog, Executor};
pub use client::Database;
pub use models::{ColumnDescriptor, ColumnMeta, QueryResult, Record, Relationship, TableDescriptor, NULL_DISPLAY};
