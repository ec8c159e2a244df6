use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::assignment::{apply_assignment, AssignmentResult};
use super::builder::{WorkflowDraft, WorkflowValidationError};
use super::config::TriageConfig;
use super::domain::{OrganizationId, ReportAttributes, ReportId, Workflow, WorkflowId};
use super::repository::{
    ReportRecord, ReportRepository, RepositoryError, WorkflowRepository, WorkflowSnapshot,
};
use super::selector::{select_workflow, trace_selection, WorkflowCheck};

/// Which reports a bulk reassignment run may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignmentMode {
    /// Only reports without a workflow (never evaluated or previously unmatched).
    UnassignedOnly,
    RebuildAll,
}

impl ReassignmentMode {
    pub const fn from_only_unassigned(only_unassigned: bool) -> Self {
        if only_unassigned {
            ReassignmentMode::UnassignedOnly
        } else {
            ReassignmentMode::RebuildAll
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentRequest {
    pub organization_id: OrganizationId,
    pub mode: ReassignmentMode,
    /// Resume a previous run after this report id.
    #[serde(default)]
    pub resume_after: Option<ReportId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentFailure {
    pub report_id: ReportId,
    pub error: String,
}

/// Per-report tally of a bulk reassignment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentSummary {
    pub organization_id: OrganizationId,
    pub mode: ReassignmentMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<ReassignmentFailure>,
    /// Last report the run looked at; pass it as `resume_after` to continue.
    pub cursor: Option<ReportId>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_reason: Option<String>,
}

impl ReassignmentSummary {
    fn start(request: &ReassignmentRequest) -> Self {
        let now = Utc::now();
        Self {
            organization_id: request.organization_id,
            mode: request.mode,
            started_at: now,
            finished_at: now,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
            cursor: request.resume_after,
            completed: false,
            halted_reason: None,
        }
    }

    fn halt(mut self, reason: impl Into<String>) -> Self {
        self.finished_at = Utc::now();
        self.halted_reason = Some(reason.into());
        self
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.completed = true;
        self
    }

    pub fn processed(&self) -> usize {
        self.updated + self.unchanged + self.skipped + self.failed
    }
}

/// Assignment preview for a report that has not been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriagePreview {
    pub assignment: AssignmentResult,
    pub checks: Vec<WorkflowCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub report_id: ReportId,
    pub assignment: AssignmentResult,
    pub changed: bool,
}

enum ReportOutcome {
    Updated,
    Unchanged,
    Skipped,
}

/// Service composing the workflow store, report store, and the triage evaluator.
pub struct TriageService<W, R> {
    workflows: Arc<W>,
    reports: Arc<R>,
    config: TriageConfig,
}

impl<W, R> TriageService<W, R>
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    pub fn new(workflows: Arc<W>, reports: Arc<R>, config: TriageConfig) -> Self {
        let config = if config.reassign_batch_size == 0 {
            TriageConfig::default()
        } else {
            config
        };

        Self {
            workflows,
            reports,
            config,
        }
    }

    /// Evaluate report attributes without persisting anything.
    pub fn preview(&self, attributes: &ReportAttributes) -> Result<TriagePreview, TriageServiceError> {
        let snapshot = self.workflows.snapshot(attributes.organization_id)?;
        let trace = trace_selection(attributes, &snapshot.workflows);
        let assignment = apply_assignment(trace.selected, &snapshot.defaults);

        Ok(TriagePreview {
            assignment,
            checks: trace.checks,
        })
    }

    /// Route one stored report and persist the result if it changed.
    pub fn assign_report(&self, report_id: ReportId) -> Result<AssignmentOutcome, TriageServiceError> {
        let record = self
            .reports
            .fetch(report_id)?
            .ok_or(RepositoryError::NotFound)?;
        let snapshot = self.workflows.snapshot(record.attributes.organization_id)?;

        let assignment = resolve(&record.attributes, &snapshot);
        let changed = needs_update(&record, &assignment);
        if changed {
            self.reports.save_assignment(report_id, &assignment)?;
        }

        info!(
            report_id = report_id.0,
            organization_id = record.attributes.organization_id.0,
            state = assignment.state.label(),
            changed,
            "report triage assignment resolved"
        );

        Ok(AssignmentOutcome {
            report_id,
            assignment,
            changed,
        })
    }

    pub fn reassign_organisation(
        &self,
        request: ReassignmentRequest,
    ) -> Result<ReassignmentSummary, TriageServiceError> {
        self.reassign_organisation_until(request, &AtomicBool::new(false))
    }

    /// Bulk re-evaluation of an organisation's reports against one workflow snapshot.
    ///
    /// Each report is updated independently; failures are recorded and the run
    /// continues. Setting `stop` halts the run before the next report, leaving a
    /// cursor to resume from.
    pub fn reassign_organisation_until(
        &self,
        request: ReassignmentRequest,
        stop: &AtomicBool,
    ) -> Result<ReassignmentSummary, TriageServiceError> {
        let organization_id = request.organization_id;
        let snapshot = self.workflows.snapshot(organization_id)?;
        let batch_size = self.config.reassign_batch_size;
        let mut summary = ReassignmentSummary::start(&request);
        let mut first_page = true;

        info!(
            organization_id = organization_id.0,
            mode = ?request.mode,
            workflows = snapshot.workflows.len(),
            "bulk triage reassignment started"
        );

        loop {
            let page = match self.reports.page(organization_id, summary.cursor, batch_size) {
                Ok(page) => page,
                Err(error) if first_page => return Err(error.into()),
                Err(error) => {
                    warn!(
                        organization_id = organization_id.0,
                        cursor = ?summary.cursor,
                        %error,
                        "bulk triage reassignment interrupted"
                    );
                    return Ok(summary.halt(format!("report listing failed: {error}")));
                }
            };
            first_page = false;

            let page_len = page.len();
            for record in page {
                if stop.load(Ordering::Acquire) {
                    info!(
                        organization_id = organization_id.0,
                        cursor = ?summary.cursor,
                        "bulk triage reassignment stopped"
                    );
                    return Ok(summary.halt("stopped by operator"));
                }

                let report_id = record.report_id;
                match self.reassign_one(&record, &request, &snapshot) {
                    Ok(ReportOutcome::Updated) => summary.updated += 1,
                    Ok(ReportOutcome::Unchanged) => summary.unchanged += 1,
                    Ok(ReportOutcome::Skipped) => summary.skipped += 1,
                    Err(error) => {
                        warn!(report_id = report_id.0, %error, "report reassignment failed");
                        summary.failed += 1;
                        summary.failures.push(ReassignmentFailure {
                            report_id,
                            error: error.to_string(),
                        });
                    }
                }
                summary.cursor = Some(report_id);
            }

            if page_len < batch_size {
                break;
            }
        }

        let summary = summary.finish();
        info!(
            organization_id = organization_id.0,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "bulk triage reassignment finished"
        );
        Ok(summary)
    }

    fn reassign_one(
        &self,
        record: &ReportRecord,
        request: &ReassignmentRequest,
        snapshot: &WorkflowSnapshot,
    ) -> Result<ReportOutcome, RepositoryError> {
        if record.attributes.organization_id != request.organization_id {
            warn!(
                report_id = record.report_id.0,
                expected = request.organization_id.0,
                found = record.attributes.organization_id.0,
                "skipping report from another organisation"
            );
            return Ok(ReportOutcome::Skipped);
        }
        if request.mode == ReassignmentMode::UnassignedOnly && record.is_assigned() {
            return Ok(ReportOutcome::Skipped);
        }

        let assignment = resolve(&record.attributes, snapshot);
        if !needs_update(record, &assignment) {
            return Ok(ReportOutcome::Unchanged);
        }

        self.reports.save_assignment(record.report_id, &assignment)?;
        Ok(ReportOutcome::Updated)
    }

    /// Every workflow of the organisation, in evaluation order.
    pub fn list_workflows(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Workflow>, TriageServiceError> {
        let mut workflows = self.workflows.list(organization_id)?;
        workflows.sort_by_key(|workflow| workflow.ordering_key());
        Ok(workflows)
    }

    /// Create a workflow, or replace an existing one when `workflow_id` is given.
    pub fn save_workflow(
        &self,
        organization_id: OrganizationId,
        workflow_id: Option<WorkflowId>,
        draft: WorkflowDraft,
    ) -> Result<Workflow, TriageServiceError> {
        let validated = draft.validate()?;
        let workflow = match workflow_id {
            Some(workflow_id) => self
                .workflows
                .update(organization_id, workflow_id, validated)?,
            None => self.workflows.insert(organization_id, validated)?,
        };

        info!(
            organization_id = organization_id.0,
            workflow_id = workflow.workflow_id.0,
            priority = workflow.priority,
            "triage workflow saved"
        );
        Ok(workflow)
    }

    pub fn delete_workflow(
        &self,
        organization_id: OrganizationId,
        workflow_id: WorkflowId,
    ) -> Result<(), TriageServiceError> {
        self.workflows.delete(organization_id, workflow_id)?;
        info!(
            organization_id = organization_id.0,
            workflow_id = workflow_id.0,
            "triage workflow deleted"
        );
        Ok(())
    }
}

fn resolve(attributes: &ReportAttributes, snapshot: &WorkflowSnapshot) -> AssignmentResult {
    let workflow = select_workflow(attributes, &snapshot.workflows);
    apply_assignment(workflow, &snapshot.defaults)
}

fn needs_update(record: &ReportRecord, assignment: &AssignmentResult) -> bool {
    record.assignment_state != assignment.state
        || record.assignment.as_ref() != Some(assignment)
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Validation(#[from] WorkflowValidationError),
}
