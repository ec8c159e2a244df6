//! Process-local repositories backing the demo, single-node deployments and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::assignment::AssignmentResult;
use super::builder::ValidatedWorkflow;
use super::domain::{OrganisationDefaults, OrganizationId, ReportId, Workflow, WorkflowId};
use super::repository::{
    ReportRecord, ReportRepository, RepositoryError, WorkflowRepository, WorkflowSnapshot,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Mutex<Vec<Workflow>>,
    defaults: Mutex<HashMap<OrganizationId, OrganisationDefaults>>,
    next_id: AtomicI64,
}

impl InMemoryWorkflowRepository {
    /// Seed with existing workflows; new ids continue after the highest one.
    pub fn with_workflows(workflows: Vec<Workflow>) -> Self {
        let next_id = workflows
            .iter()
            .map(|workflow| workflow.workflow_id.0)
            .max()
            .unwrap_or(0);
        Self {
            workflows: Mutex::new(workflows),
            defaults: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(next_id),
        }
    }

    pub fn set_defaults(&self, defaults: OrganisationDefaults) -> Result<(), RepositoryError> {
        lock(&self.defaults)?.insert(defaults.organization_id, defaults);
        Ok(())
    }

    /// Store a fully built workflow as-is, keeping its id and creation time.
    pub fn push(&self, workflow: Workflow) -> Result<(), RepositoryError> {
        self.next_id.fetch_max(workflow.workflow_id.0, Ordering::Relaxed);
        lock(&self.workflows)?.push(workflow);
        Ok(())
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn snapshot(&self, organization_id: OrganizationId) -> Result<WorkflowSnapshot, RepositoryError> {
        let workflows = lock(&self.workflows)?
            .iter()
            .filter(|workflow| workflow.organization_id == organization_id && workflow.is_active)
            .cloned()
            .collect();
        let defaults = lock(&self.defaults)?
            .get(&organization_id)
            .cloned()
            .unwrap_or_else(|| OrganisationDefaults::new(organization_id));

        Ok(WorkflowSnapshot {
            defaults,
            workflows,
        })
    }

    fn list(&self, organization_id: OrganizationId) -> Result<Vec<Workflow>, RepositoryError> {
        Ok(lock(&self.workflows)?
            .iter()
            .filter(|workflow| workflow.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn insert(
        &self,
        organization_id: OrganizationId,
        workflow: ValidatedWorkflow,
    ) -> Result<Workflow, RepositoryError> {
        let mut guard = lock(&self.workflows)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = workflow.into_workflow(WorkflowId(id), organization_id, Utc::now());
        guard.push(stored.clone());
        Ok(stored)
    }

    fn update(
        &self,
        organization_id: OrganizationId,
        workflow_id: WorkflowId,
        workflow: ValidatedWorkflow,
    ) -> Result<Workflow, RepositoryError> {
        let mut guard = lock(&self.workflows)?;
        let existing = guard
            .iter_mut()
            .find(|existing| {
                existing.workflow_id == workflow_id && existing.organization_id == organization_id
            })
            .ok_or(RepositoryError::NotFound)?;
        let updated = workflow.apply_to(existing);
        *existing = updated.clone();
        Ok(updated)
    }

    fn delete(
        &self,
        organization_id: OrganizationId,
        workflow_id: WorkflowId,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.workflows)?;
        let before = guard.len();
        guard.retain(|workflow| {
            !(workflow.workflow_id == workflow_id && workflow.organization_id == organization_id)
        });
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }
}

/// Reports keyed by id, so pages come back in ascending id order.
#[derive(Default)]
pub struct InMemoryReportRepository {
    records: Mutex<BTreeMap<ReportId, ReportRecord>>,
}

impl InMemoryReportRepository {
    pub fn file(&self, record: ReportRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.report_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.report_id, record);
        Ok(())
    }

    /// Every stored report across all organisations.
    pub fn records(&self) -> Result<Vec<ReportRecord>, RepositoryError> {
        Ok(lock(&self.records)?.values().cloned().collect())
    }
}

impl ReportRepository for InMemoryReportRepository {
    fn fetch(&self, report_id: ReportId) -> Result<Option<ReportRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(&report_id).cloned())
    }

    fn page(
        &self,
        organization_id: OrganizationId,
        after: Option<ReportId>,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|record| record.attributes.organization_id == organization_id)
            .filter(|record| after.map_or(true, |after| record.report_id > after))
            .take(limit)
            .cloned()
            .collect())
    }

    fn save_assignment(
        &self,
        report_id: ReportId,
        assignment: &AssignmentResult,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let record = guard.get_mut(&report_id).ok_or(RepositoryError::NotFound)?;
        record.assignment_state = assignment.state;
        record.assignment = Some(assignment.clone());
        Ok(())
    }
}
