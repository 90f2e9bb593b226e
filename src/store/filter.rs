use serde_json::Value;

use crate::error::{invalid_argument, SyncResult};

use super::document::Document;

/// Maximum number of values a single membership (`field in [..]`) clause
/// may carry. Larger id sets must be chunked by the caller (see
/// `sync::batcher`).
pub const FAN_OUT_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOp {
    /// Field equals the value.
    Eq(Value),
    /// Field is a member of the value set (at most [`FAN_OUT_LIMIT`] entries).
    In(Vec<Value>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: String,
    op: FilterOp,
}

impl FieldFilter {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> &FilterOp {
        &self.op
    }

    fn is_satisfied_by(&self, document: &Document) -> bool {
        let value = document.get(&self.field);
        match &self.op {
            FilterOp::Eq(expected) => value == Some(expected),
            FilterOp::In(candidates) => match value {
                Some(value) => candidates.iter().any(|candidate| candidate == value),
                None => false,
            },
        }
    }
}

/// Conjunction of field clauses; the only shapes the store accepts are
/// equality and bounded membership.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FieldFilter>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(FieldFilter {
            field: field.into(),
            op: FilterOp::Eq(value.into()),
        });
        self
    }

    pub fn with_in(
        mut self,
        field: impl Into<String>,
        values: Vec<Value>,
    ) -> SyncResult<Self> {
        if values.is_empty() {
            return Err(invalid_argument(
                "membership filter requires at least one value",
            ));
        }
        if values.len() > FAN_OUT_LIMIT {
            return Err(invalid_argument(format!(
                "membership filter accepts at most {FAN_OUT_LIMIT} values, got {}",
                values.len()
            )));
        }
        self.clauses.push(FieldFilter {
            field: field.into(),
            op: FilterOp::In(values),
        });
        Ok(self)
    }

    pub fn clauses(&self) -> &[FieldFilter] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates every clause against the document.
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.is_satisfied_by(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorCode;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn doc(fields: &[(&str, Value)]) -> Document {
        let fields: BTreeMap<String, Value> = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Document::new("doc-1", fields)
    }

    #[test]
    fn equality_clause_matches() {
        let filter = Filter::new().with_eq("ownerId", "owner-7");
        let matching = doc(&[("ownerId", json!("owner-7"))]);
        let other = doc(&[("ownerId", json!("owner-8"))]);

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&other));
    }

    #[test]
    fn membership_clause_matches() {
        let filter = Filter::new()
            .with_in("carwashId", vec![json!("cw-1"), json!("cw-2")])
            .unwrap();

        assert!(filter.matches(&doc(&[("carwashId", json!("cw-2"))])));
        assert!(!filter.matches(&doc(&[("carwashId", json!("cw-3"))])));
        assert!(!filter.matches(&doc(&[("status", json!("pending"))])));
    }

    #[test]
    fn conjunction_requires_all_clauses() {
        let filter = Filter::new()
            .with_eq("clientId", "user-1")
            .with_eq("status", "pending");

        assert!(filter.matches(&doc(&[
            ("clientId", json!("user-1")),
            ("status", json!("pending")),
        ])));
        assert!(!filter.matches(&doc(&[
            ("clientId", json!("user-1")),
            ("status", json!("confirmed")),
        ])));
    }

    #[test]
    fn membership_clause_enforces_fan_out_limit() {
        let values: Vec<Value> = (0..FAN_OUT_LIMIT + 1)
            .map(|i| json!(format!("cw-{i}")))
            .collect();
        let err = Filter::new().with_in("carwashId", values).unwrap_err();
        assert_eq!(err.code, SyncErrorCode::InvalidArgument);
    }

    #[test]
    fn empty_membership_set_is_rejected() {
        let err = Filter::new().with_in("carwashId", Vec::new()).unwrap_err();
        assert_eq!(err.code, SyncErrorCode::InvalidArgument);
    }
}
