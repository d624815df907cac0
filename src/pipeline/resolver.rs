use super::artifact::Artifact;
use super::probe::PresenceSnapshot;
use serde::Serialize;
use std::collections::BTreeSet;

/// Artifacts that must be (re)produced during this run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NeedSet {
    needed: BTreeSet<Artifact>,
}

impl NeedSet {
    pub fn from_snapshot(snapshot: &PresenceSnapshot) -> Self {
        Self {
            needed: Artifact::ALL
                .into_iter()
                .filter(|a| !snapshot.is_present(*a))
                .collect(),
        }
    }

    pub fn is_needed(&self, artifact: Artifact) -> bool {
        self.needed.contains(&artifact)
    }

    /// Forces `artifact` to be produced. Returns false if it was already needed.
    pub fn raise(&mut self, artifact: Artifact) -> bool {
        self.needed.insert(artifact)
    }

    pub fn is_empty(&self) -> bool {
        self.needed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.needed.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Converged,
    Pending(NeedSet),
}

impl Resolution {
    pub fn is_converged(&self) -> bool {
        matches!(self, Resolution::Converged)
    }
}

/// Pure mapping from presence to need: an artifact is needed iff absent.
pub fn resolve(snapshot: &PresenceSnapshot) -> Resolution {
    let needs = NeedSet::from_snapshot(snapshot);
    if needs.is_empty() {
        Resolution::Converged
    } else {
        Resolution::Pending(needs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_present_converges() {
        let snapshot = PresenceSnapshot::from_present(Artifact::ALL);
        assert!(resolve(&snapshot).is_converged());
    }

    #[test]
    fn test_empty_stores_need_everything() {
        let snapshot = PresenceSnapshot::default();
        match resolve(&snapshot) {
            Resolution::Pending(needs) => {
                assert_eq!(needs.iter().collect::<Vec<_>>(), Artifact::ALL.to_vec());
            }
            Resolution::Converged => panic!("empty stores cannot be converged"),
        }
    }

    #[test]
    fn test_unparsed_recipes_need_parsing_only() {
        let snapshot = PresenceSnapshot::from_present(
            Artifact::ALL
                .into_iter()
                .filter(|a| *a != Artifact::ParsedRecipes),
        );
        match resolve(&snapshot) {
            Resolution::Pending(needs) => {
                assert!(needs.is_needed(Artifact::ParsedRecipes));
                assert!(!needs.is_needed(Artifact::Recipes));
                assert!(!needs.is_needed(Artifact::IngredientLink));
            }
            Resolution::Converged => panic!("unparsed recipes must be pending"),
        }
    }

    #[test]
    fn test_raise_reports_new_needs_only() {
        let mut needs = NeedSet::default();
        assert!(needs.raise(Artifact::IngredientLink));
        assert!(!needs.raise(Artifact::IngredientLink));
        assert!(needs.is_needed(Artifact::IngredientLink));
    }
}
