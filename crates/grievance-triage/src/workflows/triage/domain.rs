use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conditions::ConditionSet;

/// Identifier wrapper for organisations (tenants and related suppliers alike).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub i64);

/// Identifier wrapper for triage workflows, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub i64);

/// Attributes of an incoming report that routing rules may constrain.
///
/// Every attribute except the organisation is optional: intake forms differ per
/// organisation and a report may be routed before a risk category is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAttributes {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub risk_category_id: Option<i64>,
    #[serde(default)]
    pub risk_subcategory_id: Option<i64>,
    #[serde(default)]
    pub severity_level: Option<u8>,
    #[serde(default)]
    pub supplier_org_id: Option<i64>,
    #[serde(default)]
    pub worksite_id: Option<i64>,
    #[serde(default)]
    pub reporter_age: Option<u8>,
    #[serde(default)]
    pub membership_tags: BTreeSet<String>,
    #[serde(default)]
    pub form_key: Option<String>,
}

impl ReportAttributes {
    /// Bare report for an organisation with no attributes filled in yet.
    pub fn for_organization(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            country_code: None,
            language_code: None,
            risk_category_id: None,
            risk_subcategory_id: None,
            severity_level: None,
            supplier_org_id: None,
            worksite_id: None,
            reporter_age: None,
            membership_tags: BTreeSet::new(),
            form_key: None,
        }
    }
}

/// Organisation-scoped routing rule bundling match conditions with downstream behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: WorkflowId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub report_type: String,
    pub priority: i32,
    pub is_active: bool,
    pub default_department_id: Option<DepartmentId>,
    pub created_at: DateTime<Utc>,
    pub conditions: ConditionSet,
    pub preprocessing: PreprocessingConfig,
    pub status_actions: StatusActionConfig,
    pub deadlines: DeadlineConfig,
}

impl Workflow {
    /// Deterministic evaluation order: priority, then the older workflow first.
    pub fn ordering_key(&self) -> (i32, DateTime<Utc>, WorkflowId) {
        (self.priority, self.created_at, self.workflow_id)
    }
}

/// Preprocessing steps run on a report before organisation staff see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessingConfig {
    pub enable_ai_spam_filter: bool,
    pub enable_auto_translate: bool,
    pub enable_ai_out_of_scope: bool,
    pub enable_ai_risk_analysis: bool,
    pub enable_human_translator: bool,
}

impl PreprocessingConfig {
    /// Safety default when no workflow matched: only spam filtering stays on.
    pub const fn conservative() -> Self {
        Self {
            enable_ai_spam_filter: true,
            enable_auto_translate: false,
            enable_ai_out_of_scope: false,
            enable_ai_risk_analysis: false,
            enable_human_translator: false,
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            enable_ai_spam_filter: true,
            enable_auto_translate: false,
            enable_ai_out_of_scope: true,
            enable_ai_risk_analysis: true,
            enable_human_translator: false,
        }
    }
}

/// Outcome an organisation user may record when filtering a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterResult {
    Admitted,
    OutOfScope,
    Unfounded,
    Spam,
}

impl FilterResult {
    pub const ALL: [FilterResult; 4] = [
        FilterResult::Admitted,
        FilterResult::OutOfScope,
        FilterResult::Unfounded,
        FilterResult::Spam,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FilterResult::Admitted => "admitted",
            FilterResult::OutOfScope => "out_of_scope",
            FilterResult::Unfounded => "unfounded",
            FilterResult::Spam => "spam",
        }
    }
}

/// Status codes offered by the builder when a workflow does not narrow them.
pub const DEFAULT_STATUS_CODES: [&str; 6] = [
    "pre_evaluation",
    "waiting_admitted",
    "open_in_progress",
    "investigation",
    "remediation",
    "archived",
];

/// What an organisation user may do to a report once the workflow is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusActionConfig {
    pub allow_select_result: bool,
    pub allowed_filter_results: BTreeSet<FilterResult>,
    pub allow_comment: bool,
    pub allow_manage_actions: bool,
    pub allow_change_status: bool,
    pub allowed_status_codes: BTreeSet<String>,
    pub require_reporter_update_on_status_change: bool,
}

impl Default for StatusActionConfig {
    fn default() -> Self {
        Self {
            allow_select_result: true,
            allowed_filter_results: FilterResult::ALL.into_iter().collect(),
            allow_comment: true,
            allow_manage_actions: true,
            allow_change_status: true,
            allowed_status_codes: DEFAULT_STATUS_CODES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            require_reporter_update_on_status_change: false,
        }
    }
}

/// Concrete deadline values; `None` means no deadline is enforced for that phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeadlineValues {
    #[serde(default)]
    pub first_response_hours: Option<u32>,
    #[serde(default)]
    pub investigation_days: Option<u32>,
    #[serde(default)]
    pub remediation_days: Option<u32>,
}

/// Workflow deadline override; organisation defaults apply unless enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeadlineConfig {
    pub use_workflow_deadlines: bool,
    #[serde(default)]
    pub first_response_hours: Option<u32>,
    #[serde(default)]
    pub investigation_days: Option<u32>,
    #[serde(default)]
    pub remediation_days: Option<u32>,
}

/// Organisation-wide fallbacks owned by the backend, used when a workflow defers to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationDefaults {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub default_department_id: Option<DepartmentId>,
    #[serde(default)]
    pub status_actions: StatusActionConfig,
    #[serde(default)]
    pub deadlines: DeadlineValues,
}

impl OrganisationDefaults {
    pub fn new(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            default_department_id: None,
            status_actions: StatusActionConfig::default(),
            deadlines: DeadlineValues::default(),
        }
    }
}

/// Routing state persisted on a report.
///
/// `NeverEvaluated` and `Unmatched` both leave the report without a workflow but
/// are kept apart so operators can tell an untouched report from a routed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssignmentState {
    #[default]
    NeverEvaluated,
    Unmatched,
    Assigned {
        workflow_id: WorkflowId,
    },
}

impl AssignmentState {
    pub const fn workflow_id(self) -> Option<WorkflowId> {
        match self {
            AssignmentState::Assigned { workflow_id } => Some(workflow_id),
            AssignmentState::NeverEvaluated | AssignmentState::Unmatched => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AssignmentState::NeverEvaluated => "never_evaluated",
            AssignmentState::Unmatched => "unassigned",
            AssignmentState::Assigned { .. } => "assigned",
        }
    }
}
