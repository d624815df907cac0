use super::artifact::Artifact;
use super::probe::PresenceSnapshot;
use super::resolver::NeedSet;
use crate::producers::{PrefixScope, Producers};
use serde::Serialize;
use std::collections::BTreeSet;

/// What every stage gets to work with.
#[derive(Clone)]
pub struct StageContext {
    pub producers: Producers,
    pub fallback_scope: PrefixScope,
}

impl StageContext {
    pub fn new(producers: Producers, fallback_scope: PrefixScope) -> Self {
        Self {
            producers,
            fallback_scope,
        }
    }
}

/// A need raised on `target` because `source` changed during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    pub source: Artifact,
    pub target: Artifact,
}

/// Run state owned by the driver: the initial snapshot, the live need-set and
/// the artifacts stages have reported as changed so far.
#[derive(Debug, Clone)]
pub struct RunPlan {
    snapshot: PresenceSnapshot,
    needs: NeedSet,
    changed: BTreeSet<Artifact>,
}

impl RunPlan {
    pub fn new(snapshot: PresenceSnapshot, needs: NeedSet) -> Self {
        Self {
            snapshot,
            needs,
            changed: BTreeSet::new(),
        }
    }

    pub fn needs(&self, artifact: Artifact) -> bool {
        self.needs.is_needed(artifact)
    }

    pub fn was_present(&self, artifact: Artifact) -> bool {
        self.snapshot.is_present(artifact)
    }

    pub fn has_changed(&self, artifact: Artifact) -> bool {
        self.changed.contains(&artifact)
    }

    /// Present at snapshot time or produced earlier in this run.
    pub fn is_available(&self, artifact: Artifact) -> bool {
        self.was_present(artifact) || self.has_changed(artifact)
    }

    pub fn need_set(&self) -> &NeedSet {
        &self.needs
    }

    /// Records what a stage changed and raises the needs of their dependents,
    /// whatever their presence at snapshot time. Returns only needs that were
    /// not already raised.
    pub fn record_changes(&mut self, changed: &[Artifact]) -> Vec<Invalidation> {
        let mut raised = Vec::new();
        for &source in changed {
            self.changed.insert(source);
            for &target in source.dependents() {
                if self.needs.raise(target) {
                    raised.push(Invalidation { source, target });
                }
            }
        }
        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converged_plan() -> RunPlan {
        let snapshot = PresenceSnapshot::from_present(Artifact::ALL);
        let needs = NeedSet::from_snapshot(&snapshot);
        RunPlan::new(snapshot, needs)
    }

    #[test]
    fn test_product_vector_change_raises_links() {
        let mut plan = converged_plan();
        assert!(!plan.needs(Artifact::IngredientLink));

        let raised = plan.record_changes(&[Artifact::ProductVector]);

        assert_eq!(
            raised,
            vec![Invalidation {
                source: Artifact::ProductVector,
                target: Artifact::IngredientLink,
            }]
        );
        assert!(plan.needs(Artifact::IngredientLink));
        assert!(plan.has_changed(Artifact::ProductVector));
    }

    #[test]
    fn test_already_needed_dependent_is_not_reported_twice() {
        let snapshot = PresenceSnapshot::default();
        let needs = NeedSet::from_snapshot(&snapshot);
        let mut plan = RunPlan::new(snapshot, needs);

        assert!(plan.record_changes(&[Artifact::Recipes]).is_empty());
        assert!(plan.needs(Artifact::ParsedRecipes));
    }

    #[test]
    fn test_leaf_change_raises_nothing() {
        let mut plan = converged_plan();
        assert!(plan.record_changes(&[Artifact::Nutrition]).is_empty());
        assert!(plan.is_available(Artifact::Nutrition));
    }

    #[test]
    fn test_availability_counts_run_changes() {
        let snapshot = PresenceSnapshot::default();
        let needs = NeedSet::from_snapshot(&snapshot);
        let mut plan = RunPlan::new(snapshot, needs);

        assert!(!plan.is_available(Artifact::Recipes));
        plan.record_changes(&[Artifact::Recipes]);
        assert!(plan.is_available(Artifact::Recipes));
    }
}
