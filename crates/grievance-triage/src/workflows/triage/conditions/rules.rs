use std::collections::BTreeSet;

use super::super::domain::ReportAttributes;
use super::{AgeBound, ConditionDimension, ConditionSet, Constraint, FormKeyRule, RejectReason};

type Rejection = (ConditionDimension, RejectReason);

/// Dimensions are checked in a fixed order so the reported rejection is stable.
pub(crate) fn first_rejection(
    condition: &ConditionSet,
    report: &ReportAttributes,
) -> Option<Rejection> {
    let checks: [(ConditionDimension, Option<RejectReason>); 10] = [
        (
            ConditionDimension::Country,
            check_member(&condition.countries, report.country_code.as_ref()),
        ),
        (
            ConditionDimension::Language,
            check_member(&condition.languages, report.language_code.as_ref()),
        ),
        (
            ConditionDimension::RiskCategory,
            check_member(&condition.risk_categories, report.risk_category_id.as_ref()),
        ),
        (
            ConditionDimension::RiskSubcategory,
            check_member(
                &condition.risk_subcategories,
                report.risk_subcategory_id.as_ref(),
            ),
        ),
        (
            ConditionDimension::Supplier,
            check_member(&condition.suppliers, report.supplier_org_id.as_ref()),
        ),
        (
            ConditionDimension::Worksite,
            check_member(&condition.worksites, report.worksite_id.as_ref()),
        ),
        (
            ConditionDimension::Severity,
            check_member(&condition.severities, report.severity_level.as_ref()),
        ),
        (
            ConditionDimension::ReporterAge,
            check_age(
                &condition.reporter_min_age,
                &condition.reporter_max_age,
                report.reporter_age,
            ),
        ),
        (
            ConditionDimension::MembershipTags,
            check_tags(&condition.membership_tags, &report.membership_tags),
        ),
        (
            ConditionDimension::FormKey,
            check_form_key(&condition.form_key, report.form_key.as_deref()),
        ),
    ];

    checks
        .into_iter()
        .find_map(|(dimension, rejection)| rejection.map(|reason| (dimension, reason)))
}

fn check_member<T: Ord>(constraint: &Constraint<T>, value: Option<&T>) -> Option<RejectReason> {
    match (constraint, value) {
        (Constraint::Any, _) => None,
        (Constraint::Malformed(_), _) => Some(RejectReason::MalformedCondition),
        (Constraint::OneOf(_), None) => Some(RejectReason::MissingAttribute),
        (Constraint::OneOf(allowed), Some(value)) if allowed.contains(value) => None,
        (Constraint::OneOf(_), Some(_)) => Some(RejectReason::NotListed),
    }
}

fn check_age(min: &AgeBound, max: &AgeBound, age: Option<u8>) -> Option<RejectReason> {
    if matches!(min, AgeBound::Malformed(_)) || matches!(max, AgeBound::Malformed(_)) {
        return Some(RejectReason::MalformedCondition);
    }
    if *min == AgeBound::Open && *max == AgeBound::Open {
        return None;
    }

    let Some(age) = age else {
        return Some(RejectReason::MissingAttribute);
    };

    let above_min = match min {
        AgeBound::At(min) => age >= *min,
        _ => true,
    };
    let below_max = match max {
        AgeBound::At(max) => age <= *max,
        _ => true,
    };

    if above_min && below_max {
        None
    } else {
        Some(RejectReason::OutOfRange)
    }
}

fn check_tags(constraint: &Constraint<String>, tags: &BTreeSet<String>) -> Option<RejectReason> {
    match constraint {
        Constraint::Any => None,
        Constraint::Malformed(_) => Some(RejectReason::MalformedCondition),
        Constraint::OneOf(_) if tags.is_empty() => Some(RejectReason::MissingAttribute),
        Constraint::OneOf(required) => {
            if required.intersection(tags).next().is_some() {
                None
            } else {
                Some(RejectReason::NoSharedTag)
            }
        }
    }
}

fn check_form_key(rule: &FormKeyRule, form_key: Option<&str>) -> Option<RejectReason> {
    match (rule, form_key) {
        (FormKeyRule::Any, _) => None,
        (FormKeyRule::Malformed(_), _) => Some(RejectReason::MalformedCondition),
        (FormKeyRule::Exactly(_), None) => Some(RejectReason::MissingAttribute),
        (FormKeyRule::Exactly(expected), Some(actual)) if expected == actual => None,
        (FormKeyRule::Exactly(_), Some(_)) => Some(RejectReason::NotListed),
    }
}
