use crate::store::{DocumentStore, IndexDescriptor, IndexField, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const RECIPE_TEXT_INDEX: &str = "recipes_content_text_search";
pub const RECIPE_TEXT_FIELDS: [&str; 3] = ["title", "keywords", "description"];

/// Full-text index over recipe content used by search.
pub fn recipe_text_index() -> IndexDescriptor {
    IndexDescriptor::new(
        RECIPE_TEXT_INDEX,
        RECIPE_TEXT_FIELDS.iter().map(|f| IndexField::text(*f)).collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IndexAction {
    Created,
    Unchanged,
    Recreated { previous_fields: Vec<String> },
    Failed { error: String },
}

pub struct IndexMaintainer {
    documents: Arc<dyn DocumentStore>,
    expected: IndexDescriptor,
}

impl IndexMaintainer {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self::with_expected(documents, recipe_text_index())
    }

    pub fn with_expected(documents: Arc<dyn DocumentStore>, expected: IndexDescriptor) -> Self {
        Self {
            documents,
            expected,
        }
    }

    pub fn expected(&self) -> &IndexDescriptor {
        &self.expected
    }

    /// Brings the named index to the expected definition. Never fails the
    /// run: errors come back as `IndexAction::Failed`.
    pub async fn reconcile(&self) -> IndexAction {
        match self.try_reconcile().await {
            Ok(action) => action,
            Err(e) => {
                error!(index = %self.expected.name, error = %e, "Index reconciliation failed");
                IndexAction::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_reconcile(&self) -> Result<IndexAction, StoreError> {
        let existing = self.documents.list_indexes().await?;
        let current = existing.iter().find(|i| i.name == self.expected.name);

        match current {
            None => {
                self.documents.create_index(&self.expected).await?;
                info!(
                    index = %self.expected.name,
                    fields = ?self.expected.field_names(),
                    "Created text index"
                );
                Ok(IndexAction::Created)
            }
            Some(index) if index.has_same_fields(&self.expected) => {
                info!(index = %self.expected.name, "Text index already up to date");
                Ok(IndexAction::Unchanged)
            }
            Some(index) => {
                let previous_fields: Vec<String> =
                    index.field_names().into_iter().map(String::from).collect();
                warn!(
                    index = %self.expected.name,
                    current = ?previous_fields,
                    expected = ?self.expected.field_names(),
                    "Text index fields differ, recreating"
                );
                self.documents.drop_index(&self.expected.name).await?;
                self.documents.create_index(&self.expected).await?;
                info!(index = %self.expected.name, "Recreated text index");
                Ok(IndexAction::Recreated { previous_fields })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_index_covers_recipe_content() {
        let index = recipe_text_index();
        assert_eq!(index.name, "recipes_content_text_search");
        assert_eq!(index.field_names(), vec!["title", "keywords", "description"]);
    }

    #[test]
    fn test_index_action_serializes_tagged() {
        let json = serde_json::to_value(IndexAction::Recreated {
            previous_fields: vec!["title".to_string()],
        })
        .unwrap();
        assert_eq!(json["action"], "recreated");
        assert_eq!(json["previous_fields"][0], "title");
    }
}
