use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conditions::{AgeBound, ConditionDimension, ConditionRecord, ConditionSet};
use super::domain::{
    DeadlineConfig, DepartmentId, OrganizationId, PreprocessingConfig, StatusActionConfig,
    Workflow, WorkflowId,
};

pub const DEFAULT_REPORT_TYPE: &str = "default";
pub const DEFAULT_PRIORITY: i32 = 100;

/// Validation errors raised when an administrator saves a workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowValidationError {
    #[error("workflow name is required")]
    MissingName,
    #[error("invalid {dimension} condition: {reason}")]
    MalformedCondition {
        dimension: ConditionDimension,
        reason: String,
    },
    #[error("reporter age range is inverted (min {min} > max {max})")]
    InvertedAgeRange { min: u8, max: u8 },
    #[error("{field} must be greater than zero")]
    NonPositiveDeadline { field: &'static str },
    #[error("allowed_status_codes must not be empty while status changes are allowed")]
    EmptyStatusCodes,
}

/// Workflow as submitted from the builder, before validation.
///
/// Conditions keep the loose backend shape so the builder can report exactly
/// which column is wrong instead of rejecting the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub default_department_id: Option<DepartmentId>,
    #[serde(default)]
    pub conditions: ConditionRecord,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub status_actions: StatusActionConfig,
    #[serde(default)]
    pub deadlines: DeadlineConfig,
}

fn default_report_type() -> String {
    DEFAULT_REPORT_TYPE.to_string()
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_active() -> bool {
    true
}

impl WorkflowDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            report_type: default_report_type(),
            priority: DEFAULT_PRIORITY,
            is_active: true,
            default_department_id: None,
            conditions: ConditionRecord::default(),
            preprocessing: PreprocessingConfig::default(),
            status_actions: StatusActionConfig::default(),
            deadlines: DeadlineConfig::default(),
        }
    }

    /// Normalise free-text fields and reject anything the evaluator would have to skip.
    pub fn validate(self) -> Result<ValidatedWorkflow, WorkflowValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(WorkflowValidationError::MissingName);
        }

        let description = self
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let report_type = match self.report_type.trim() {
            "" => default_report_type(),
            other => other.to_string(),
        };

        let conditions = ConditionSet::from(self.conditions);
        if let Some((dimension, malformed)) = conditions.malformed_dimensions().first() {
            return Err(WorkflowValidationError::MalformedCondition {
                dimension: *dimension,
                reason: malformed.reason.clone(),
            });
        }
        if let (AgeBound::At(min), AgeBound::At(max)) =
            (&conditions.reporter_min_age, &conditions.reporter_max_age)
        {
            if min > max {
                return Err(WorkflowValidationError::InvertedAgeRange {
                    min: *min,
                    max: *max,
                });
            }
        }

        validate_deadlines(&self.deadlines)?;

        if self.status_actions.allow_change_status
            && self.status_actions.allowed_status_codes.is_empty()
        {
            return Err(WorkflowValidationError::EmptyStatusCodes);
        }

        Ok(ValidatedWorkflow {
            name,
            description,
            report_type,
            priority: self.priority,
            is_active: self.is_active,
            default_department_id: self.default_department_id,
            conditions,
            preprocessing: self.preprocessing,
            status_actions: self.status_actions,
            deadlines: self.deadlines,
        })
    }
}

/// Split the builder's comma-separated membership tag input into a tag set.
pub fn split_tags(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_deadlines(deadlines: &DeadlineConfig) -> Result<(), WorkflowValidationError> {
    let fields = [
        ("first_response_hours", deadlines.first_response_hours),
        ("investigation_days", deadlines.investigation_days),
        ("remediation_days", deadlines.remediation_days),
    ];
    for (field, value) in fields {
        if value == Some(0) {
            return Err(WorkflowValidationError::NonPositiveDeadline { field });
        }
    }
    Ok(())
}

/// Draft that passed validation; repositories turn it into a stored [`Workflow`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub report_type: String,
    pub priority: i32,
    pub is_active: bool,
    pub default_department_id: Option<DepartmentId>,
    pub conditions: ConditionSet,
    pub preprocessing: PreprocessingConfig,
    pub status_actions: StatusActionConfig,
    pub deadlines: DeadlineConfig,
}

impl ValidatedWorkflow {
    pub fn into_workflow(
        self,
        workflow_id: WorkflowId,
        organization_id: OrganizationId,
        created_at: DateTime<Utc>,
    ) -> Workflow {
        Workflow {
            workflow_id,
            organization_id,
            name: self.name,
            description: self.description,
            report_type: self.report_type,
            priority: self.priority,
            is_active: self.is_active,
            default_department_id: self.default_department_id,
            created_at,
            conditions: self.conditions,
            preprocessing: self.preprocessing,
            status_actions: self.status_actions,
            deadlines: self.deadlines,
        }
    }

    /// Apply an edit to an existing workflow, keeping its identity and creation time.
    pub fn apply_to(self, existing: &Workflow) -> Workflow {
        self.into_workflow(
            existing.workflow_id,
            existing.organization_id,
            existing.created_at,
        )
    }
}
