//! Mutation policies
//!
//! A policy looks at one document snapshot and decides which store write,
//! if any, it needs. Policies are pure and idempotent: once the decided
//! write has been applied, deciding again on the updated document yields
//! [`Decision::NoOp`]. That property is what makes re-running a partially
//! failed job safe.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::store::{Document, FieldMap, Operation, Value};

static CALENDAR_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Outcome of evaluating a policy against one document
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Mutate(Operation),
    NoOp,
}

impl Decision {
    pub fn into_operation(self) -> Option<Operation> {
        match self {
            Decision::Mutate(op) => Some(op),
            Decision::NoOp => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Decision::NoOp)
    }
}

/// Per-document decision function
pub trait MutationPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, doc: &Document) -> Decision;

    /// Whether every mutation removes the document from the collection.
    ///
    /// Only such policies can scan by re-querying the first page.
    fn removes_documents(&self) -> bool {
        false
    }
}

/// Apply a policy to a page in order, dropping no-ops
pub fn decide_page(policy: &dyn MutationPolicy, docs: &[Document]) -> Vec<Operation> {
    docs.iter()
        .filter_map(|doc| policy.decide(doc).into_operation())
        .collect()
}

/// Deletes every scanned document
#[derive(Debug, Clone, Default)]
pub struct DeleteAll;

impl MutationPolicy for DeleteAll {
    fn name(&self) -> &str {
        "delete-all"
    }

    fn decide(&self, doc: &Document) -> Decision {
        Decision::Mutate(Operation::Delete(doc.reference.clone()))
    }

    fn removes_documents(&self) -> bool {
        true
    }
}

/// Rewrites `YYYY-MM-DD` string fields as UTC midnight timestamps
#[derive(Debug, Clone)]
pub struct NormalizeDates {
    fields: Vec<String>,
}

impl NormalizeDates {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl Default for NormalizeDates {
    fn default() -> Self {
        Self::new(default_date_fields())
    }
}

/// Parse a strict calendar date string into its canonical timestamp
pub fn parse_calendar_date(raw: &str) -> Option<Value> {
    if !CALENDAR_DATE.is_match(raw) {
        return None;
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Value::Timestamp(midnight.and_utc()))
}

impl MutationPolicy for NormalizeDates {
    fn name(&self) -> &str {
        "normalize-dates"
    }

    fn decide(&self, doc: &Document) -> Decision {
        let mut staged = FieldMap::new();

        for field in &self.fields {
            let Some(raw) = doc.get(field).and_then(Value::as_str) else {
                continue;
            };
            match parse_calendar_date(raw) {
                Some(ts) => {
                    staged.insert(field.clone(), ts);
                }
                None => trace!("{}: leaving malformed {} = {:?}", doc.reference, field, raw),
            }
        }

        if staged.is_empty() {
            Decision::NoOp
        } else {
            Decision::Mutate(Operation::Update {
                target: doc.reference.clone(),
                fields: staged,
            })
        }
    }
}

/// Sets a field to a sentinel value when it is missing or falsy
#[derive(Debug, Clone)]
pub struct BackfillDefault {
    field: String,
    value: Value,
}

impl BackfillDefault {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl MutationPolicy for BackfillDefault {
    fn name(&self) -> &str {
        "backfill-default"
    }

    fn decide(&self, doc: &Document) -> Decision {
        let needs_default = doc.get(&self.field).map_or(true, Value::is_falsy);
        if !needs_default {
            return Decision::NoOp;
        }

        let mut fields = FieldMap::new();
        fields.insert(self.field.clone(), self.value.clone());
        Decision::Mutate(Operation::Update {
            target: doc.reference.clone(),
            fields,
        })
    }
}

/// Policy selection as it appears in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySpec {
    DeleteAll,
    NormalizeDates {
        #[serde(default = "default_date_fields")]
        fields: Vec<String>,
    },
    BackfillDefault {
        #[serde(default = "default_backfill_field")]
        field: String,
        #[serde(default = "default_backfill_value")]
        value: String,
    },
}

impl PolicySpec {
    pub fn build(&self) -> Box<dyn MutationPolicy> {
        match self {
            PolicySpec::DeleteAll => Box::new(DeleteAll),
            PolicySpec::NormalizeDates { fields } => Box::new(NormalizeDates::new(fields.clone())),
            PolicySpec::BackfillDefault { field, value } => {
                Box::new(BackfillDefault::new(field.clone(), value.as_str()))
            }
        }
    }

    pub fn removes_documents(&self) -> bool {
        matches!(self, PolicySpec::DeleteAll)
    }
}

fn default_date_fields() -> Vec<String> {
    vec![
        "startDate".to_string(),
        "endDate".to_string(),
        "agreementDate".to_string(),
    ]
}

fn default_backfill_field() -> String {
    "company".to_string()
}

fn default_backfill_value() -> String {
    "N/A".to_string()
}
