use super::common::*;
use serde_json::json;

use crate::workflows::triage::conditions::{
    matches, ConditionCheck, ConditionDimension, ConditionSet, RejectReason,
};
use crate::workflows::triage::domain::{OrganizationId, ReportAttributes};

fn rejected(dimension: ConditionDimension, reason: RejectReason) -> ConditionCheck {
    ConditionCheck::Rejected { dimension, reason }
}

#[test]
fn catch_all_matches_any_report() {
    let catch_all = ConditionSet::catch_all();
    assert!(catch_all.is_catch_all());

    assert!(matches(&catch_all, &report()));
    assert!(matches(
        &catch_all,
        &ReportAttributes::for_organization(ORG)
    ));
    assert!(matches(
        &catch_all,
        &ReportAttributes::for_organization(OrganizationId(77))
    ));
}

#[test]
fn listed_values_match_and_unlisted_values_do_not() {
    let condition = conditions(json!({
        "country_codes": ["DE", "AT"],
        "language_codes": ["de"],
        "risk_category_ids": [12],
        "worksite_ids": [7, 8],
    }));
    assert!(matches(&condition, &report()));

    let mut french = report();
    french.country_code = Some("FR".to_string());
    assert_eq!(
        condition.check(&french),
        rejected(ConditionDimension::Country, RejectReason::NotListed)
    );

    let mut other_site = report();
    other_site.worksite_id = Some(99);
    assert_eq!(
        condition.check(&other_site),
        rejected(ConditionDimension::Worksite, RejectReason::NotListed)
    );
}

#[test]
fn missing_attribute_fails_a_restricted_dimension() {
    let condition = conditions(json!({ "risk_category_ids": [12] }));
    let mut uncategorised = report();
    uncategorised.risk_category_id = None;

    assert_eq!(
        condition.check(&uncategorised),
        rejected(
            ConditionDimension::RiskCategory,
            RejectReason::MissingAttribute
        )
    );
}

#[test]
fn missing_attribute_is_fine_when_dimension_is_unrestricted() {
    let condition = conditions(json!({ "country_codes": ["DE"] }));
    let mut sparse = ReportAttributes::for_organization(ORG);
    sparse.country_code = Some("DE".to_string());

    assert!(matches(&condition, &sparse));
}

#[test]
fn unknown_age_never_matches_a_minimum_age() {
    let condition = conditions(json!({ "reporter_min_age": 18 }));
    let mut anonymous = report();
    anonymous.reporter_age = None;

    assert_eq!(
        condition.check(&anonymous),
        rejected(ConditionDimension::ReporterAge, RejectReason::MissingAttribute)
    );
}

#[test]
fn age_bounds_are_inclusive_and_open_ended() {
    let adults = conditions(json!({ "reporter_min_age": 18, "reporter_max_age": 25 }));
    let minors = conditions(json!({ "reporter_max_age": 17 }));
    let mut reporter = report();

    for (age, adult, minor) in [(17, false, true), (18, true, false), (25, true, false), (26, false, false)] {
        reporter.reporter_age = Some(age);
        assert_eq!(matches(&adults, &reporter), adult, "age {age} vs 18-25");
        assert_eq!(matches(&minors, &reporter), minor, "age {age} vs <=17");
    }
}

#[test]
fn membership_tags_need_one_tag_in_common() {
    let condition = conditions(json!({ "membership_tags": ["union_member"] }));
    let mut reporter = report();

    reporter.membership_tags = tags(&["union_member", "contractor"]);
    assert!(matches(&condition, &reporter));

    reporter.membership_tags = tags(&["contractor"]);
    assert_eq!(
        condition.check(&reporter),
        rejected(ConditionDimension::MembershipTags, RejectReason::NoSharedTag)
    );

    reporter.membership_tags = tags(&[]);
    assert_eq!(
        condition.check(&reporter),
        rejected(
            ConditionDimension::MembershipTags,
            RejectReason::MissingAttribute
        )
    );
}

#[test]
fn form_key_must_match_exactly() {
    let condition = conditions(json!({ "form_key": "factory_floor" }));
    let mut reporter = report();
    assert!(matches(&condition, &reporter));

    reporter.form_key = Some("Factory_Floor".to_string());
    assert!(!matches(&condition, &reporter));

    reporter.form_key = None;
    assert_eq!(
        condition.check(&reporter),
        rejected(ConditionDimension::FormKey, RejectReason::MissingAttribute)
    );
}

#[test]
fn severity_and_supplier_sets_restrict_independently() {
    let condition = conditions(json!({
        "severity_levels": [4, 5],
        "supplier_org_ids": [40],
    }));
    let mut reporter = report();
    assert_eq!(
        condition.check(&reporter),
        rejected(ConditionDimension::Severity, RejectReason::NotListed)
    );

    reporter.severity_level = Some(5);
    assert!(matches(&condition, &reporter));

    reporter.supplier_org_id = Some(41);
    assert_eq!(
        condition.check(&reporter),
        rejected(ConditionDimension::Supplier, RejectReason::NotListed)
    );
}

#[test]
fn malformed_dimension_is_unmatchable_without_panicking() {
    let condition = conditions(json!({
        "risk_subcategory_ids": ["not-a-number"],
    }));
    let check = condition.check(&report());

    assert!(check.is_malformed());
    assert_eq!(
        check,
        rejected(
            ConditionDimension::RiskSubcategory,
            RejectReason::MalformedCondition
        )
    );
}

#[test]
fn first_failing_dimension_is_reported() {
    let condition = conditions(json!({
        "country_codes": ["FR"],
        "severity_levels": [5],
    }));

    assert_eq!(
        condition.check(&report()),
        rejected(ConditionDimension::Country, RejectReason::NotListed)
    );
}
