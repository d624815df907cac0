//! Store abstractions consumed by the orchestrator
//!
//! The orchestrator never owns storage. It only asks presence questions of the
//! relational store and reconciles the text index on the document store. Each
//! call is one unit of work: implementations open a connection, use it, and
//! release it before returning, on success and on error alike.

mod error;
pub mod mongo;
pub mod postgres;

pub use error::StoreError;
pub use mongo::MongoStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Observed state of a relational table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Missing,
    Empty,
    Populated,
}

impl TableState {
    pub fn is_populated(self) -> bool {
        self == TableState::Populated
    }
}

#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Two-step presence check: does the table exist, and does it hold a row.
    async fn inspect_table(&self, table: &str) -> Result<TableState, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// True when the recipe collection holds at least one document.
    async fn has_recipes(&self) -> Result<bool, StoreError>;

    /// True when at least one recipe has a non-empty `parsed_ingredients_details`.
    async fn has_parsed_recipes(&self) -> Result<bool, StoreError>;

    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>, StoreError>;

    async fn create_index(&self, index: &IndexDescriptor) -> Result<(), StoreError>;

    async fn drop_index(&self, name: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Ascending,
    Descending,
    Text,
    Other(String),
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Ascending => f.write_str("1"),
            IndexKind::Descending => f.write_str("-1"),
            IndexKind::Text => f.write_str("text"),
            IndexKind::Other(kind) => f.write_str(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub kind: IndexKind,
}

impl IndexField {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: IndexKind::Text,
        }
    }
}

/// A named index definition: index name plus its ordered field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub fields: Vec<IndexField>,
}

impl IndexDescriptor {
    pub fn new(name: &str, fields: Vec<IndexField>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    /// Compares field sets while ignoring declaration order.
    pub fn has_same_fields(&self, other: &IndexDescriptor) -> bool {
        let ours: BTreeSet<&IndexField> = self.fields.iter().collect();
        let theirs: BTreeSet<&IndexField> = other.fields.iter().collect();
        ours == theirs && self.fields.len() == other.fields.len()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_fields_ignores_order() {
        let a = IndexDescriptor::new(
            "idx",
            vec![IndexField::text("title"), IndexField::text("description")],
        );
        let b = IndexDescriptor::new(
            "idx",
            vec![IndexField::text("description"), IndexField::text("title")],
        );
        assert!(a.has_same_fields(&b));
    }

    #[test]
    fn test_same_fields_detects_kind_mismatch() {
        let a = IndexDescriptor::new("idx", vec![IndexField::text("title")]);
        let b = IndexDescriptor::new(
            "idx",
            vec![IndexField {
                name: "title".to_string(),
                kind: IndexKind::Ascending,
            }],
        );
        assert!(!a.has_same_fields(&b));
    }

    #[test]
    fn test_same_fields_detects_missing_field() {
        let a = IndexDescriptor::new(
            "idx",
            vec![IndexField::text("title"), IndexField::text("keywords")],
        );
        let b = IndexDescriptor::new("idx", vec![IndexField::text("title")]);
        assert!(!a.has_same_fields(&b));
        assert!(!b.has_same_fields(&a));
    }

    #[test]
    fn test_table_state_populated() {
        assert!(TableState::Populated.is_populated());
        assert!(!TableState::Empty.is_populated());
        assert!(!TableState::Missing.is_populated());
    }
}
