use serde_json::json;

use crate::workflows::triage::builder::{
    split_tags, WorkflowDraft, WorkflowValidationError, DEFAULT_PRIORITY, DEFAULT_REPORT_TYPE,
};
use crate::workflows::triage::conditions::{ConditionDimension, Constraint};
use crate::workflows::triage::domain::{
    DeadlineConfig, OrganizationId, PreprocessingConfig, WorkflowId,
};

use super::common::created_at;

fn draft(value: serde_json::Value) -> WorkflowDraft {
    serde_json::from_value(value).expect("workflow draft")
}

#[test]
fn minimal_draft_gets_builder_defaults() {
    let validated = draft(json!({ "name": "  Supplier escalations " }))
        .validate()
        .expect("valid draft");

    assert_eq!(validated.name, "Supplier escalations");
    assert_eq!(validated.report_type, DEFAULT_REPORT_TYPE);
    assert_eq!(validated.priority, DEFAULT_PRIORITY);
    assert!(validated.is_active);
    assert!(validated.conditions.is_catch_all());
    assert_eq!(validated.preprocessing, PreprocessingConfig::default());
    assert!(!validated.deadlines.use_workflow_deadlines);
}

#[test]
fn blank_name_is_rejected() {
    let error = WorkflowDraft::named("   ").validate().unwrap_err();
    assert_eq!(error, WorkflowValidationError::MissingName);
}

#[test]
fn blank_description_and_report_type_are_normalised() {
    let mut input = WorkflowDraft::named("Hotline");
    input.description = Some("   ".to_string());
    input.report_type = String::new();

    let validated = input.validate().expect("valid draft");

    assert_eq!(validated.description, None);
    assert_eq!(validated.report_type, DEFAULT_REPORT_TYPE);
}

#[test]
fn numeric_string_ids_are_accepted() {
    let validated = draft(json!({
        "name": "Categories",
        "conditions": { "risk_category_ids": ["12", 14] },
    }))
    .validate()
    .expect("valid draft");

    assert_eq!(
        validated.conditions.risk_categories,
        Constraint::OneOf([12, 14].into_iter().collect())
    );
}

#[test]
fn malformed_condition_names_the_dimension() {
    let error = draft(json!({
        "name": "Broken",
        "conditions": { "supplier_org_ids": ["acme"] },
    }))
    .validate()
    .unwrap_err();

    match error {
        WorkflowValidationError::MalformedCondition { dimension, .. } => {
            assert_eq!(dimension, ConditionDimension::Supplier);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn inverted_age_range_is_rejected() {
    let error = draft(json!({
        "name": "Youth",
        "conditions": { "reporter_min_age": 30, "reporter_max_age": 18 },
    }))
    .validate()
    .unwrap_err();

    assert_eq!(
        error,
        WorkflowValidationError::InvertedAgeRange { min: 30, max: 18 }
    );
}

#[test]
fn zero_deadline_is_rejected() {
    let mut input = WorkflowDraft::named("Deadlines");
    input.deadlines = DeadlineConfig {
        use_workflow_deadlines: true,
        first_response_hours: Some(24),
        investigation_days: Some(0),
        remediation_days: None,
    };

    assert_eq!(
        input.validate().unwrap_err(),
        WorkflowValidationError::NonPositiveDeadline {
            field: "investigation_days"
        }
    );
}

#[test]
fn status_changes_need_at_least_one_status_code() {
    let mut input = WorkflowDraft::named("Statuses");
    input.status_actions.allowed_status_codes.clear();
    assert_eq!(
        input.clone().validate().unwrap_err(),
        WorkflowValidationError::EmptyStatusCodes
    );

    input.status_actions.allow_change_status = false;
    assert!(input.validate().is_ok());
}

#[test]
fn unknown_draft_fields_are_rejected() {
    let result = serde_json::from_value::<WorkflowDraft>(json!({
        "name": "Typo",
        "priorty": 3,
    }));
    assert!(result.is_err());
}

#[test]
fn edits_keep_identity_and_creation_time() {
    let original = WorkflowDraft::named("Original")
        .validate()
        .expect("valid draft")
        .into_workflow(WorkflowId(4), OrganizationId(1), created_at(4));

    let mut edit = WorkflowDraft::named("Renamed");
    edit.priority = 5;
    let updated = edit.validate().expect("valid draft").apply_to(&original);

    assert_eq!(updated.workflow_id, WorkflowId(4));
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.priority, 5);
}

#[test]
fn comma_separated_tags_become_a_set() {
    let parsed = split_tags(" union_member, contractor,,union_member , ");
    assert_eq!(parsed, super::common::tags(&["contractor", "union_member"]));
    assert!(split_tags("  ").is_empty());
}
