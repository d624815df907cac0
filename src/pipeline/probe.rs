use super::artifact::{Artifact, Location};
use crate::store::{DocumentStore, RelationalStore};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Point-in-time presence of every tracked artifact, taken once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresenceSnapshot {
    present: BTreeSet<Artifact>,
}

impl PresenceSnapshot {
    pub fn from_present(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        Self {
            present: artifacts.into_iter().collect(),
        }
    }

    pub fn is_present(&self, artifact: Artifact) -> bool {
        self.present.contains(&artifact)
    }

    pub fn present(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.present.iter().copied()
    }

    pub fn absent(&self) -> Vec<Artifact> {
        Artifact::ALL
            .into_iter()
            .filter(|a| !self.present.contains(a))
            .collect()
    }
}

pub struct StateProbe {
    relational: Arc<dyn RelationalStore>,
    documents: Arc<dyn DocumentStore>,
}

impl StateProbe {
    pub fn new(relational: Arc<dyn RelationalStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            relational,
            documents,
        }
    }

    pub async fn snapshot(&self) -> PresenceSnapshot {
        let mut present = BTreeSet::new();
        for artifact in Artifact::ALL {
            if self.probe(artifact).await {
                present.insert(artifact);
            }
        }

        let snapshot = PresenceSnapshot { present };
        debug!(
            present = ?snapshot.present,
            absent = ?snapshot.absent(),
            "Presence snapshot taken"
        );
        snapshot
    }

    /// A failed check counts as absent: re-attempting work is safer than
    /// skipping it.
    pub async fn probe(&self, artifact: Artifact) -> bool {
        let result = match artifact.location() {
            Location::Table(table) => self.relational.inspect_table(table).await.map(|state| {
                debug!(artifact = %artifact, table, state = ?state, "Inspected table");
                state.is_populated()
            }),
            Location::RecipeCollection => self.documents.has_recipes().await,
            Location::ParsedRecipePredicate => self.documents.has_parsed_recipes().await,
        };

        match result {
            Ok(present) => present,
            Err(e) => {
                warn!(
                    artifact = %artifact,
                    error = %e,
                    "Presence check failed, treating artifact as absent"
                );
                false
            }
        }
    }
}
