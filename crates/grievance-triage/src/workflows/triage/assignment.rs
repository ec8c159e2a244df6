use serde::{Deserialize, Serialize};

use super::domain::{
    AssignmentState, DeadlineConfig, DeadlineValues, DepartmentId, OrganisationDefaults,
    PreprocessingConfig, StatusActionConfig, Workflow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineSource {
    Workflow,
    Organisation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveDeadlines {
    pub source: DeadlineSource,
    pub values: DeadlineValues,
}

/// Configuration snapshot written back onto a report once routing has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub state: AssignmentState,
    pub department_id: Option<DepartmentId>,
    pub preprocessing: PreprocessingConfig,
    pub status_actions: StatusActionConfig,
    pub deadlines: EffectiveDeadlines,
}

impl AssignmentResult {
    pub fn is_assigned(&self) -> bool {
        self.state.workflow_id().is_some()
    }
}

/// Resolve the concrete assignment for a selected workflow, or organisation defaults.
///
/// Pure: the same inputs always produce an equal result, so callers can re-run it
/// on already routed reports without drift.
pub fn apply_assignment(
    workflow: Option<&Workflow>,
    defaults: &OrganisationDefaults,
) -> AssignmentResult {
    match workflow {
        Some(workflow) => AssignmentResult {
            state: AssignmentState::Assigned {
                workflow_id: workflow.workflow_id,
            },
            department_id: workflow.default_department_id,
            preprocessing: workflow.preprocessing,
            status_actions: workflow.status_actions.clone(),
            deadlines: effective_deadlines(&workflow.deadlines, &defaults.deadlines),
        },
        None => AssignmentResult {
            state: AssignmentState::Unmatched,
            department_id: defaults.default_department_id,
            preprocessing: PreprocessingConfig::conservative(),
            status_actions: defaults.status_actions.clone(),
            deadlines: EffectiveDeadlines {
                source: DeadlineSource::Organisation,
                values: defaults.deadlines,
            },
        },
    }
}

fn effective_deadlines(config: &DeadlineConfig, defaults: &DeadlineValues) -> EffectiveDeadlines {
    if !config.use_workflow_deadlines {
        return EffectiveDeadlines {
            source: DeadlineSource::Organisation,
            values: *defaults,
        };
    }

    // Blank override fields keep the organisation's value for that phase.
    EffectiveDeadlines {
        source: DeadlineSource::Workflow,
        values: DeadlineValues {
            first_response_hours: config
                .first_response_hours
                .or(defaults.first_response_hours),
            investigation_days: config.investigation_days.or(defaults.investigation_days),
            remediation_days: config.remediation_days.or(defaults.remediation_days),
        },
    }
}
