use serde::{Deserialize, Serialize};

use super::assignment::AssignmentResult;
use super::builder::ValidatedWorkflow;
use super::domain::{
    AssignmentState, OrganisationDefaults, OrganizationId, ReportAttributes, ReportId, Workflow,
    WorkflowId,
};

/// Consistent view of an organisation's routing configuration for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub defaults: OrganisationDefaults,
    pub workflows: Vec<Workflow>,
}

/// Stored report as seen by the triage subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub report_id: ReportId,
    pub attributes: ReportAttributes,
    #[serde(default)]
    pub assignment_state: AssignmentState,
    #[serde(default)]
    pub assignment: Option<AssignmentResult>,
}

impl ReportRecord {
    pub fn new(report_id: ReportId, attributes: ReportAttributes) -> Self {
        Self {
            report_id,
            attributes,
            assignment_state: AssignmentState::NeverEvaluated,
            assignment: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment_state.workflow_id().is_some()
    }
}

/// Storage abstraction for workflows and their condition sets.
pub trait WorkflowRepository: Send + Sync {
    /// Active workflows plus organisation defaults, read as one snapshot.
    fn snapshot(&self, organization_id: OrganizationId)
        -> Result<WorkflowSnapshot, RepositoryError>;
    /// Every workflow of the organisation, active or not, in priority order.
    fn list(&self, organization_id: OrganizationId) -> Result<Vec<Workflow>, RepositoryError>;
    fn insert(
        &self,
        organization_id: OrganizationId,
        workflow: ValidatedWorkflow,
    ) -> Result<Workflow, RepositoryError>;
    /// Replace a workflow and upsert its condition set, keyed by workflow identity.
    fn update(
        &self,
        organization_id: OrganizationId,
        workflow_id: WorkflowId,
        workflow: ValidatedWorkflow,
    ) -> Result<Workflow, RepositoryError>;
    fn delete(
        &self,
        organization_id: OrganizationId,
        workflow_id: WorkflowId,
    ) -> Result<(), RepositoryError>;
}

/// Storage abstraction for the reports being routed.
pub trait ReportRepository: Send + Sync {
    fn fetch(&self, report_id: ReportId) -> Result<Option<ReportRecord>, RepositoryError>;
    /// Reports of one organisation ordered by id, strictly after `after`.
    fn page(
        &self,
        organization_id: OrganizationId,
        after: Option<ReportId>,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError>;
    fn save_assignment(
        &self,
        report_id: ReportId,
        assignment: &AssignmentResult,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
