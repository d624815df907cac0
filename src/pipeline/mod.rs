pub mod artifact;
pub mod context;
pub mod driver;
pub mod index;
pub mod probe;
pub mod report;
pub mod resolver;
pub mod stage_trait;
pub mod stages;

pub use artifact::{Artifact, Location};
pub use context::{Invalidation, RunPlan, StageContext};
pub use driver::PipelineDriver;
pub use index::{recipe_text_index, IndexAction, IndexMaintainer, RECIPE_TEXT_INDEX};
pub use probe::{PresenceSnapshot, StateProbe};
pub use report::{PlanReport, RunReport, RunStatus, StageRecord, StageStatus};
pub use resolver::{resolve, NeedSet, Resolution};
pub use stage_trait::{FailurePolicy, Stage, StageId, StageOutcome};
