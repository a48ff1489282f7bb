pub mod config;
pub mod dataset;
pub mod entities;
pub mod errors;
pub mod gate;
pub mod guards;
pub mod intent;
pub mod plan;
pub mod profile;
pub mod sandbox;
pub mod table;

pub use dataset::{load_dataset, EXPECTED_COLUMNS};
pub use entities::{EntityBundle, RankMode, Ranking, TimeScope, TimeScopeMode};
pub use errors::{DatasetError, PlanParseError, SandboxError};
pub use guards::{pre_route, GuardConfig, PreRoute};
pub use intent::{
    FallbackKind, Intent, RoutingAction, MSG_CANNOT_PROCEED, MSG_GIBBERISH,
    MSG_MULTIPLE_QUESTIONS, MSG_NOT_PRESENT, MSG_NO_MATCHING_RECORDS, MSG_OUT_OF_SCOPE,
};
pub use plan::{validate, QueryPlan, SafetyVerdict, ValidatedPlan};
pub use profile::{DatasetProfile, MetricDefinition, TimeRanges};
pub use sandbox::{ExecLimits, ExecutionResult, Executor};
pub use table::{CellValue, Table};
