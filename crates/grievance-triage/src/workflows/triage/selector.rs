use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::conditions::ConditionCheck;
use super::domain::{ReportAttributes, Workflow, WorkflowId};

/// Audit entry describing how one candidate workflow fared against a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCheck {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub priority: i32,
    pub check: ConditionCheck,
}

/// Selection result plus the evaluation trail, in evaluation order.
#[derive(Debug, Clone)]
pub struct SelectionTrace<'a> {
    pub selected: Option<&'a Workflow>,
    pub checks: Vec<WorkflowCheck>,
}

/// Active workflows of the report's organisation in deterministic evaluation order.
fn candidates<'a>(report: &ReportAttributes, workflows: &'a [Workflow]) -> Vec<&'a Workflow> {
    let mut candidates: Vec<&Workflow> = workflows
        .iter()
        .filter(|workflow| workflow.is_active)
        .filter(|workflow| workflow.organization_id == report.organization_id)
        .collect();
    candidates.sort_by_key(|workflow| workflow.ordering_key());
    candidates
}

fn evaluate(workflow: &Workflow, report: &ReportAttributes) -> ConditionCheck {
    let check = workflow.conditions.check(report);
    if let ConditionCheck::Rejected { dimension, .. } = check {
        if check.is_malformed() {
            warn!(
                workflow_id = workflow.workflow_id.0,
                organization_id = workflow.organization_id.0,
                %dimension,
                "skipping workflow with malformed condition data"
            );
        } else {
            debug!(
                workflow_id = workflow.workflow_id.0,
                %dimension,
                "workflow conditions rejected report"
            );
        }
    }
    check
}

/// Pick the highest-priority active workflow whose conditions match the report.
///
/// Ties on priority go to the workflow created first. Returns `None` when the
/// organisation has no workflows or none of them match.
pub fn select_workflow<'a>(
    report: &ReportAttributes,
    workflows: &'a [Workflow],
) -> Option<&'a Workflow> {
    candidates(report, workflows)
        .into_iter()
        .find(|workflow| evaluate(workflow, report).is_match())
}

/// Same selection as [`select_workflow`], but evaluates every candidate for auditing.
pub fn trace_selection<'a>(
    report: &ReportAttributes,
    workflows: &'a [Workflow],
) -> SelectionTrace<'a> {
    let mut selected = None;
    let mut checks = Vec::new();

    for workflow in candidates(report, workflows) {
        let check = evaluate(workflow, report);
        if selected.is_none() && check.is_match() {
            selected = Some(workflow);
        }
        checks.push(WorkflowCheck {
            workflow_id: workflow.workflow_id,
            workflow_name: workflow.name.clone(),
            priority: workflow.priority,
            check,
        });
    }

    SelectionTrace { selected, checks }
}
