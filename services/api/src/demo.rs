use clap::Args;
use grievance_triage::error::AppError;
use grievance_triage::workflows::triage::{
    AssignmentResult, DeadlineConfig, DeadlineValues, DepartmentId, InMemoryReportRepository,
    InMemoryWorkflowRepository, OrganisationDefaults, OrganizationId, ReassignmentMode,
    ReassignmentRequest, ReportAttributes, ReportId, ReportRecord, TriageConfig, TriageService,
    TriageServiceError, WorkflowDraft,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_ORGANIZATION: OrganizationId = OrganizationId(1);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON file with reports to route instead of the built-in samples.
    #[arg(long)]
    pub(crate) reports: Option<PathBuf>,
    /// Only re-route reports without a workflow during the reassignment step.
    #[arg(long)]
    pub(crate) only_unassigned: bool,
    /// Reports fetched per page during reassignment.
    #[arg(long, default_value_t = 2)]
    pub(crate) batch_size: usize,
}

/// One entry of a `--reports` file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedReport {
    report_id: ReportId,
    attributes: ReportAttributes,
}

type DemoService = TriageService<InMemoryWorkflowRepository, InMemoryReportRepository>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let workflows = Arc::new(InMemoryWorkflowRepository::default());
    let reports = Arc::new(InMemoryReportRepository::default());
    workflows
        .set_defaults(demo_defaults())
        .map_err(TriageServiceError::from)?;

    let service = TriageService::new(
        workflows,
        reports.clone(),
        TriageConfig {
            reassign_batch_size: args.batch_size,
        },
    );

    println!("Grievance triage demo (organisation {})", DEMO_ORGANIZATION.0);
    seed_workflows(&service)?;

    let seeds = match args.reports {
        Some(path) => load_seed_reports(path)?,
        None => sample_reports(),
    };
    for seed in seeds {
        reports
            .file(ReportRecord::new(seed.report_id, seed.attributes))
            .map_err(TriageServiceError::from)?;
    }

    println!("\nRouting decisions:");
    let records = reports.records().map_err(TriageServiceError::from)?;
    for record in &records {
        let outcome = service.assign_report(record.report_id)?;
        print_assignment(record.report_id, &outcome.assignment);
    }

    println!("\nAdding a catch-all workflow for everything the rules above miss");
    let mut catch_all = WorkflowDraft::named("General intake");
    catch_all.priority = 500;
    catch_all.default_department_id = Some(DepartmentId(20));
    service.save_workflow(DEMO_ORGANIZATION, None, catch_all)?;

    let summary = service.reassign_organisation(ReassignmentRequest {
        organization_id: DEMO_ORGANIZATION,
        mode: ReassignmentMode::from_only_unassigned(args.only_unassigned),
        resume_after: None,
    })?;

    println!("\nReassignment summary:");
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("  Summary unavailable: {err}"),
    }

    println!("\nFinal assignments:");
    for record in reports.records().map_err(TriageServiceError::from)? {
        if let Some(assignment) = &record.assignment {
            print_assignment(record.report_id, assignment);
        }
    }

    Ok(())
}

fn demo_defaults() -> OrganisationDefaults {
    let mut defaults = OrganisationDefaults::new(DEMO_ORGANIZATION);
    defaults.default_department_id = Some(DepartmentId(1));
    defaults.deadlines = DeadlineValues {
        first_response_hours: Some(72),
        investigation_days: Some(30),
        remediation_days: Some(90),
    };
    defaults
}

fn seed_workflows(service: &DemoService) -> Result<(), AppError> {
    let mut german_escalations = WorkflowDraft::named("German high severity");
    german_escalations.priority = 10;
    german_escalations.default_department_id = Some(DepartmentId(11));
    german_escalations.conditions.country_codes = json!(["DE"]);
    german_escalations.conditions.severity_levels = json!([4, 5]);
    german_escalations.deadlines = DeadlineConfig {
        use_workflow_deadlines: true,
        first_response_hours: Some(24),
        investigation_days: Some(7),
        remediation_days: None,
    };

    let mut young_reporters = WorkflowDraft::named("Young reporters");
    young_reporters.priority = 20;
    young_reporters.default_department_id = Some(DepartmentId(12));
    young_reporters.conditions.reporter_max_age = json!(17);

    for draft in [german_escalations, young_reporters] {
        let workflow = service.save_workflow(DEMO_ORGANIZATION, None, draft)?;
        println!(
            "  workflow #{} '{}' (priority {})",
            workflow.workflow_id.0, workflow.name, workflow.priority
        );
    }
    Ok(())
}

fn sample_reports() -> Vec<SeedReport> {
    let report = |id: i64, country: &str, severity: u8, age: Option<u8>| {
        let mut attributes = ReportAttributes::for_organization(DEMO_ORGANIZATION);
        attributes.country_code = Some(country.to_string());
        attributes.severity_level = Some(severity);
        attributes.reporter_age = age;
        SeedReport {
            report_id: ReportId(id),
            attributes,
        }
    };

    vec![
        report(1, "DE", 5, Some(41)),
        report(2, "BD", 2, Some(16)),
        report(3, "DE", 2, None),
        report(4, "VN", 3, Some(29)),
    ]
}

fn load_seed_reports(path: PathBuf) -> Result<Vec<SeedReport>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let seeds = serde_json::from_str(&raw).map_err(std::io::Error::from)?;
    Ok(seeds)
}

fn print_assignment(report_id: ReportId, assignment: &AssignmentResult) {
    let department = assignment
        .department_id
        .map(|department| department.0.to_string())
        .unwrap_or_else(|| "none".to_string());
    let workflow = assignment
        .state
        .workflow_id()
        .map(|workflow| format!("workflow #{}", workflow.0))
        .unwrap_or_else(|| assignment.state.label().to_string());
    println!(
        "  report #{} -> {} (department {}, first response {}h)",
        report_id.0,
        workflow,
        department,
        assignment
            .deadlines
            .values
            .first_response_hours
            .map(|hours| hours.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
}
