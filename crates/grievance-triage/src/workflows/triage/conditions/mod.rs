//! Match criteria attached to a workflow and the pure matcher that evaluates them.
//!
//! Condition rows arrive loosely typed from the backend. [`ConditionRecord`] keeps
//! that shape at the boundary, while [`ConditionSet`] is the validated form the
//! matcher works on. A dimension that fails to decode is kept as
//! [`Constraint::Malformed`] instead of failing the whole workflow load, and it
//! never matches.

mod record;
mod rules;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::ReportAttributes;

pub use record::ConditionRecord;

/// Condition data that could not be decoded, preserved verbatim for round trips.
#[derive(Debug, Clone, PartialEq)]
pub struct Malformed {
    pub raw: Value,
    pub reason: String,
}

impl Malformed {
    pub(crate) fn new(raw: Value, reason: impl Into<String>) -> Self {
        Self {
            raw,
            reason: reason.into(),
        }
    }
}

/// Set-valued restriction on one report attribute. An empty set is a wildcard.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint<T> {
    Any,
    OneOf(BTreeSet<T>),
    Malformed(Malformed),
}

impl<T: Ord> Constraint<T> {
    pub fn one_of(values: impl IntoIterator<Item = T>) -> Self {
        let values: BTreeSet<T> = values.into_iter().collect();
        if values.is_empty() {
            Constraint::Any
        } else {
            Constraint::OneOf(values)
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Constraint::Any)
    }
}

impl<T> Default for Constraint<T> {
    fn default() -> Self {
        Constraint::Any
    }
}

/// One side of the inclusive reporter age range.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AgeBound {
    #[default]
    Open,
    At(u8),
    Malformed(Malformed),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FormKeyRule {
    #[default]
    Any,
    Exactly(String),
    Malformed(Malformed),
}

/// Validated match criteria for one workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionRecord", into = "ConditionRecord")]
pub struct ConditionSet {
    pub countries: Constraint<String>,
    pub languages: Constraint<String>,
    pub risk_categories: Constraint<i64>,
    pub risk_subcategories: Constraint<i64>,
    pub suppliers: Constraint<i64>,
    pub worksites: Constraint<i64>,
    pub severities: Constraint<u8>,
    pub reporter_min_age: AgeBound,
    pub reporter_max_age: AgeBound,
    pub membership_tags: Constraint<String>,
    pub form_key: FormKeyRule,
}

impl ConditionSet {
    /// Condition set with every dimension unrestricted.
    pub fn catch_all() -> Self {
        Self::default()
    }

    pub fn is_catch_all(&self) -> bool {
        self.countries.is_unrestricted()
            && self.languages.is_unrestricted()
            && self.risk_categories.is_unrestricted()
            && self.risk_subcategories.is_unrestricted()
            && self.suppliers.is_unrestricted()
            && self.worksites.is_unrestricted()
            && self.severities.is_unrestricted()
            && self.reporter_min_age == AgeBound::Open
            && self.reporter_max_age == AgeBound::Open
            && self.membership_tags.is_unrestricted()
            && self.form_key == FormKeyRule::Any
    }

    /// Every dimension whose stored data could not be decoded.
    pub fn malformed_dimensions(&self) -> Vec<(ConditionDimension, &Malformed)> {
        let mut found = Vec::new();
        let constraints: [(ConditionDimension, Option<&Malformed>); 8] = [
            (ConditionDimension::Country, malformed_of(&self.countries)),
            (ConditionDimension::Language, malformed_of(&self.languages)),
            (
                ConditionDimension::RiskCategory,
                malformed_of(&self.risk_categories),
            ),
            (
                ConditionDimension::RiskSubcategory,
                malformed_of(&self.risk_subcategories),
            ),
            (ConditionDimension::Supplier, malformed_of(&self.suppliers)),
            (ConditionDimension::Worksite, malformed_of(&self.worksites)),
            (ConditionDimension::Severity, malformed_of(&self.severities)),
            (
                ConditionDimension::MembershipTags,
                malformed_of(&self.membership_tags),
            ),
        ];
        for (dimension, malformed) in constraints {
            if let Some(malformed) = malformed {
                found.push((dimension, malformed));
            }
        }
        for bound in [&self.reporter_min_age, &self.reporter_max_age] {
            if let AgeBound::Malformed(malformed) = bound {
                found.push((ConditionDimension::ReporterAge, malformed));
            }
        }
        if let FormKeyRule::Malformed(malformed) = &self.form_key {
            found.push((ConditionDimension::FormKey, malformed));
        }
        found
    }

    /// Walk every dimension and report the first one that rejects the report.
    pub fn check(&self, report: &ReportAttributes) -> ConditionCheck {
        match rules::first_rejection(self, report) {
            None => ConditionCheck::Matched,
            Some((dimension, reason)) => ConditionCheck::Rejected { dimension, reason },
        }
    }
}

fn malformed_of<T>(constraint: &Constraint<T>) -> Option<&Malformed> {
    match constraint {
        Constraint::Malformed(malformed) => Some(malformed),
        Constraint::Any | Constraint::OneOf(_) => None,
    }
}

/// Returns true when every restricted dimension of `condition` admits the report.
pub fn matches(condition: &ConditionSet, report: &ReportAttributes) -> bool {
    condition.check(report).is_match()
}

/// Report attribute a condition can restrict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionDimension {
    Country,
    Language,
    RiskCategory,
    RiskSubcategory,
    Supplier,
    Worksite,
    Severity,
    ReporterAge,
    MembershipTags,
    FormKey,
}

impl ConditionDimension {
    pub const fn field(self) -> &'static str {
        match self {
            ConditionDimension::Country => "country_codes",
            ConditionDimension::Language => "language_codes",
            ConditionDimension::RiskCategory => "risk_category_ids",
            ConditionDimension::RiskSubcategory => "risk_subcategory_ids",
            ConditionDimension::Supplier => "supplier_org_ids",
            ConditionDimension::Worksite => "worksite_ids",
            ConditionDimension::Severity => "severity_levels",
            ConditionDimension::ReporterAge => "reporter_age",
            ConditionDimension::MembershipTags => "membership_tags",
            ConditionDimension::FormKey => "form_key",
        }
    }
}

impl fmt::Display for ConditionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The report does not carry the attribute this dimension restricts.
    MissingAttribute,
    NotListed,
    OutOfRange,
    NoSharedTag,
    /// The stored condition data could not be decoded.
    MalformedCondition,
}

/// Explanation of a single condition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConditionCheck {
    Matched,
    Rejected {
        dimension: ConditionDimension,
        reason: RejectReason,
    },
}

impl ConditionCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, ConditionCheck::Matched)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ConditionCheck::Rejected {
                reason: RejectReason::MalformedCondition,
                ..
            }
        )
    }
}
