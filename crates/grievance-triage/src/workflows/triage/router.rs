use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::error::AppError;

use super::builder::WorkflowDraft;
use super::domain::{OrganizationId, ReportAttributes, ReportId, WorkflowId};
use super::repository::{ReportRepository, WorkflowRepository};
use super::service::{ReassignmentMode, ReassignmentRequest, TriageService, TriageServiceError};

/// Body accepted by the bulk reassignment endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReassignBody {
    pub only_unassigned: bool,
    #[serde(default)]
    pub resume_after: Option<ReportId>,
}

/// Body accepted by the preview endpoint. The organisation always comes from the path;
/// an `organization_id` in the body is accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewBody {
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
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

impl PreviewBody {
    pub fn into_attributes(self, organization_id: OrganizationId) -> ReportAttributes {
        ReportAttributes {
            organization_id,
            country_code: self.country_code,
            language_code: self.language_code,
            risk_category_id: self.risk_category_id,
            risk_subcategory_id: self.risk_subcategory_id,
            severity_level: self.severity_level,
            supplier_org_id: self.supplier_org_id,
            worksite_id: self.worksite_id,
            reporter_age: self.reporter_age,
            membership_tags: self.membership_tags,
            form_key: self.form_key,
        }
    }
}

/// Router builder exposing workflow management and routing endpoints.
pub fn triage_router<W, R>(service: Arc<TriageService<W, R>>) -> Router
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/triage/organisations/:organization_id/workflows",
            get(list_workflows_handler::<W, R>).post(create_workflow_handler::<W, R>),
        )
        .route(
            "/api/v1/triage/organisations/:organization_id/workflows/:workflow_id",
            put(update_workflow_handler::<W, R>).delete(delete_workflow_handler::<W, R>),
        )
        .route(
            "/api/v1/triage/organisations/:organization_id/preview",
            post(preview_handler::<W, R>),
        )
        .route(
            "/api/v1/triage/organisations/:organization_id/reassign",
            post(reassign_handler::<W, R>),
        )
        .route(
            "/api/v1/triage/reports/:report_id/assign",
            post(assign_handler::<W, R>),
        )
        .with_state(service)
}

pub(crate) async fn list_workflows_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path(organization_id): Path<i64>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    match service.list_workflows(OrganizationId(organization_id)) {
        Ok(workflows) => (StatusCode::OK, axum::Json(workflows)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_workflow_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path(organization_id): Path<i64>,
    axum::Json(draft): axum::Json<WorkflowDraft>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    match service.save_workflow(OrganizationId(organization_id), None, draft) {
        Ok(workflow) => (StatusCode::CREATED, axum::Json(workflow)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_workflow_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path((organization_id, workflow_id)): Path<(i64, i64)>,
    axum::Json(draft): axum::Json<WorkflowDraft>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    match service.save_workflow(
        OrganizationId(organization_id),
        Some(WorkflowId(workflow_id)),
        draft,
    ) {
        Ok(workflow) => (StatusCode::OK, axum::Json(workflow)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_workflow_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path((organization_id, workflow_id)): Path<(i64, i64)>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    match service.delete_workflow(OrganizationId(organization_id), WorkflowId(workflow_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn preview_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path(organization_id): Path<i64>,
    axum::Json(body): axum::Json<PreviewBody>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    let attributes = body.into_attributes(OrganizationId(organization_id));
    match service.preview(&attributes) {
        Ok(preview) => (StatusCode::OK, axum::Json(preview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn assign_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path(report_id): Path<i64>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    match service.assign_report(ReportId(report_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reassign_handler<W, R>(
    State(service): State<Arc<TriageService<W, R>>>,
    Path(organization_id): Path<i64>,
    axum::Json(body): axum::Json<ReassignBody>,
) -> Response
where
    W: WorkflowRepository + 'static,
    R: ReportRepository + 'static,
{
    let request = ReassignmentRequest {
        organization_id: OrganizationId(organization_id),
        mode: ReassignmentMode::from_only_unassigned(body.only_unassigned),
        resume_after: body.resume_after,
    };

    // Pages through every report of the organisation with blocking repository calls.
    let outcome =
        tokio::task::spawn_blocking(move || service.reassign_organisation(request)).await;
    match outcome {
        Ok(Ok(summary)) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(join_error) => AppError::from(join_error).into_response(),
    }
}

fn error_response(error: TriageServiceError) -> Response {
    AppError::from(error).into_response()
}
