//! Triage workflow routing: decide which organisational workflow handles a report.
//!
//! The evaluator itself (`conditions`, `selector`, `assignment`) is pure and does
//! no I/O. The service and router wrap it with the repositories that load
//! workflow snapshots and persist assignments onto reports.

pub mod assignment;
pub mod builder;
pub mod conditions;
pub mod config;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod selector;
pub mod service;

#[cfg(test)]
mod tests;

pub use assignment::{apply_assignment, AssignmentResult, DeadlineSource, EffectiveDeadlines};
pub use builder::{split_tags, ValidatedWorkflow, WorkflowDraft, WorkflowValidationError};
pub use conditions::{
    matches, AgeBound, ConditionCheck, ConditionDimension, ConditionRecord, ConditionSet,
    Constraint, FormKeyRule, RejectReason,
};
pub use config::TriageConfig;
pub use domain::{
    AssignmentState, DeadlineConfig, DeadlineValues, DepartmentId, FilterResult,
    OrganisationDefaults, OrganizationId, PreprocessingConfig, ReportAttributes, ReportId,
    StatusActionConfig, Workflow, WorkflowId,
};
pub use memory::{InMemoryReportRepository, InMemoryWorkflowRepository};
pub use repository::{
    ReportRecord, ReportRepository, RepositoryError, WorkflowRepository, WorkflowSnapshot,
};
pub use router::{triage_router, PreviewBody, ReassignBody};
pub use selector::{select_workflow, trace_selection, SelectionTrace, WorkflowCheck};
pub use service::{
    AssignmentOutcome, ReassignmentFailure, ReassignmentMode, ReassignmentRequest,
    ReassignmentSummary, TriagePreview, TriageService, TriageServiceError,
};
