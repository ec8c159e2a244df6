use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::triage::assignment::AssignmentResult;
use crate::workflows::triage::builder::ValidatedWorkflow;
use crate::workflows::triage::conditions::{ConditionRecord, ConditionSet};
use crate::workflows::triage::config::TriageConfig;
use crate::workflows::triage::domain::{
    DeadlineConfig, DeadlineValues, DepartmentId, OrganisationDefaults, OrganizationId,
    PreprocessingConfig, ReportAttributes, ReportId, StatusActionConfig, Workflow, WorkflowId,
};
use crate::workflows::triage::memory::{InMemoryReportRepository, InMemoryWorkflowRepository};
use crate::workflows::triage::repository::{
    ReportRecord, ReportRepository, RepositoryError, WorkflowRepository, WorkflowSnapshot,
};
use crate::workflows::triage::service::TriageService;

pub(super) const ORG: OrganizationId = OrganizationId(1);
pub(super) const OTHER_ORG: OrganizationId = OrganizationId(2);

pub(super) fn created_at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
        + Duration::minutes(minutes)
}

pub(super) fn conditions(value: Value) -> ConditionSet {
    let record: ConditionRecord = serde_json::from_value(value).expect("condition record");
    ConditionSet::from(record)
}

pub(super) fn workflow(id: i64, priority: i32, conditions: ConditionSet) -> Workflow {
    Workflow {
        workflow_id: WorkflowId(id),
        organization_id: ORG,
        name: format!("workflow-{id}"),
        description: None,
        report_type: "default".to_string(),
        priority,
        is_active: true,
        default_department_id: Some(DepartmentId(100 + id)),
        created_at: created_at(id),
        conditions,
        preprocessing: PreprocessingConfig::default(),
        status_actions: StatusActionConfig::default(),
        deadlines: DeadlineConfig::default(),
    }
}

pub(super) fn report() -> ReportAttributes {
    ReportAttributes {
        organization_id: ORG,
        country_code: Some("DE".to_string()),
        language_code: Some("de".to_string()),
        risk_category_id: Some(12),
        risk_subcategory_id: Some(121),
        severity_level: Some(3),
        supplier_org_id: Some(40),
        worksite_id: Some(7),
        reporter_age: Some(34),
        membership_tags: ["union_member".to_string()].into_iter().collect(),
        form_key: Some("factory_floor".to_string()),
    }
}

pub(super) fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|tag| tag.to_string()).collect()
}

pub(super) fn defaults() -> OrganisationDefaults {
    OrganisationDefaults {
        organization_id: ORG,
        default_department_id: Some(DepartmentId(9)),
        status_actions: StatusActionConfig {
            allow_manage_actions: false,
            ..StatusActionConfig::default()
        },
        deadlines: DeadlineValues {
            first_response_hours: Some(72),
            investigation_days: Some(30),
            remediation_days: Some(90),
        },
    }
}

pub(super) type MemoryWorkflows = InMemoryWorkflowRepository;

pub(super) fn memory_workflows(workflows: Vec<Workflow>) -> MemoryWorkflows {
    let repository = InMemoryWorkflowRepository::with_workflows(workflows);
    repository
        .set_defaults(defaults())
        .expect("defaults stored");
    repository
}

/// Shared in-memory reports plus injectable save failures and a save counter.
#[derive(Default)]
pub(super) struct MemoryReports {
    inner: InMemoryReportRepository,
    failing: Mutex<BTreeSet<ReportId>>,
    saves: AtomicUsize,
}

impl MemoryReports {
    pub(super) fn insert(&self, record: ReportRecord) {
        self.inner.file(record).expect("report filed");
    }

    pub(super) fn get(&self, report_id: ReportId) -> ReportRecord {
        self.inner
            .fetch(report_id)
            .expect("report store readable")
            .expect("report exists")
    }

    /// Every report regardless of organisation.
    pub(super) fn all(&self) -> Vec<ReportRecord> {
        self.inner.records().expect("report store readable")
    }

    pub(super) fn fail_saves_for(&self, report_id: ReportId) {
        self.failing
            .lock()
            .expect("failing mutex poisoned")
            .insert(report_id);
    }

    pub(super) fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl ReportRepository for MemoryReports {
    fn fetch(&self, report_id: ReportId) -> Result<Option<ReportRecord>, RepositoryError> {
        self.inner.fetch(report_id)
    }

    fn page(
        &self,
        organization_id: OrganizationId,
        after: Option<ReportId>,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError> {
        self.inner.page(organization_id, after, limit)
    }

    fn save_assignment(
        &self,
        report_id: ReportId,
        assignment: &AssignmentResult,
    ) -> Result<(), RepositoryError> {
        if self
            .failing
            .lock()
            .expect("failing mutex poisoned")
            .contains(&report_id)
        {
            return Err(RepositoryError::Unavailable("write rejected".to_string()));
        }
        self.inner.save_assignment(report_id, assignment)?;
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

pub(super) struct UnavailableWorkflows;

impl WorkflowRepository for UnavailableWorkflows {
    fn snapshot(
        &self,
        _organization_id: OrganizationId,
    ) -> Result<WorkflowSnapshot, RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }

    fn list(&self, _organization_id: OrganizationId) -> Result<Vec<Workflow>, RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }

    fn insert(
        &self,
        _organization_id: OrganizationId,
        _workflow: ValidatedWorkflow,
    ) -> Result<Workflow, RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }

    fn update(
        &self,
        _organization_id: OrganizationId,
        _workflow_id: WorkflowId,
        _workflow: ValidatedWorkflow,
    ) -> Result<Workflow, RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }

    fn delete(
        &self,
        _organization_id: OrganizationId,
        _workflow_id: WorkflowId,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("backend offline".to_string()))
    }
}

pub(super) fn build_service(
    workflows: Vec<Workflow>,
    batch_size: usize,
) -> (
    TriageService<MemoryWorkflows, MemoryReports>,
    Arc<MemoryWorkflows>,
    Arc<MemoryReports>,
) {
    let workflow_repository = Arc::new(memory_workflows(workflows));
    let reports = Arc::new(MemoryReports::default());
    let service = TriageService::new(
        workflow_repository.clone(),
        reports.clone(),
        TriageConfig {
            reassign_batch_size: batch_size,
        },
    );
    (service, workflow_repository, reports)
}

/// W1: German high-severity reports; W2: catch-all.
pub(super) fn routing_workflows() -> Vec<Workflow> {
    vec![
        workflow(
            1,
            10,
            conditions(serde_json::json!({
                "country_codes": ["DE"],
                "severity_levels": [4, 5],
            })),
        ),
        workflow(2, 100, ConditionSet::catch_all()),
    ]
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
