//! Structured query conditions and value formatting

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use super::fields::format_field;
use crate::{Error, Result};

/// Comparison operator accepted by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Membership in a list
    In,
    /// Substring match
    Contains,
    /// Negated substring match
    NotContains,
    /// Field has no value
    IsNull,
    /// Field has a value
    IsNotNull,
}

impl Operator {
    /// Wire spelling
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
        }
    }

    /// Whether the operator is a null check with no value
    #[must_use]
    pub fn is_null_check(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "contains" => Ok(Self::Contains),
            "not contains" => Ok(Self::NotContains),
            "is null" => Ok(Self::IsNull),
            "is not null" => Ok(Self::IsNotNull),
            _ => Err(Error::Validation(format!(
                "Unknown operator '{s}'. Valid operators: eq, ne, gt, gte, lt, lte, in, contains, not contains, is null, is not null"
            ))),
        }
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum WhereValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal; still sent quoted
    Number(serde_json::Number),
    /// Text literal
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// List for `in`
    List(Vec<WhereValue>),
}

impl WhereValue {
    /// Convert an arbitrary JSON value
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl From<&str> for WhereValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for WhereValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for WhereValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for WhereValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for WhereValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for WhereValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or_else(|| Self::Text(n.to_string()), Self::Number)
    }
}

impl From<NaiveDate> for WhereValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<DateTime<Utc>> for WhereValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d.date_naive())
    }
}

impl<T: Into<WhereValue>> From<Vec<T>> for WhereValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<WhereValue>> From<Option<T>> for WhereValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Render a value the way the remote API expects literals.
///
/// Everything that is not null, boolean, date or list is sent as a
/// single-quoted string, numbers included.
#[must_use]
pub fn format_where_value(value: &WhereValue) -> String {
    match value {
        WhereValue::Null => "null".to_string(),
        WhereValue::Bool(b) => b.to_string(),
        WhereValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        WhereValue::List(items) => {
            let inner: Vec<String> = items.iter().map(format_where_value).collect();
            format!("[{}]", inner.join(","))
        }
        WhereValue::Number(n) => quote_text(&n.to_string()),
        WhereValue::Text(s) => quote_text(s),
    }
}

/// Strip surrounding quote characters, double embedded single quotes, wrap
pub(crate) fn quote_text(raw: &str) -> String {
    let stripped = raw.trim_matches(|c| c == '\'' || c == '"');
    let mut escaped = stripped.replace('\'', "''");
    // An odd trailing backslash run would escape the closing quote
    let trailing = escaped.len() - escaped.trim_end_matches('\\').len();
    if trailing % 2 == 1 {
        escaped.push('\\');
    }
    format!("'{escaped}'")
}

/// A single `field operator value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    /// Field path, e.g. `EntityState.Name` or `CustomField.Risk`
    pub field: String,
    /// Operator
    pub operator: Operator,
    /// Value; ignored for null checks
    pub value: WhereValue,
}

impl QueryCondition {
    /// Create a condition
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<WhereValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Null-check condition
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, WhereValue::Null)
    }

    /// Not-null-check condition
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNotNull, WhereValue::Null)
    }

    /// Render as a where-clause fragment
    pub fn to_clause(&self) -> Result<String> {
        let field = format_field(&self.field);
        if field.is_empty() {
            return Err(Error::Validation("Condition field must not be empty".to_string()));
        }
        if self.operator.is_null_check() {
            return Ok(format!("{field} {}", self.operator));
        }
        Ok(format!(
            "{field} {} {}",
            self.operator,
            format_where_value(&self.value)
        ))
    }
}

/// Join several conditions with `and`
pub fn conditions_to_clause(conditions: &[QueryCondition]) -> Result<Option<String>> {
    if conditions.is_empty() {
        return Ok(None);
    }
    let parts = conditions
        .iter()
        .map(QueryCondition::to_clause)
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(parts.join(" and ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_doubling() {
        assert_eq!(format_where_value(&"O'Brien".into()), "'O''Brien'");
    }

    #[test]
    fn test_existing_quotes_are_stripped() {
        assert_eq!(format_where_value(&"'Open'".into()), "'Open'");
        assert_eq!(format_where_value(&"\"Open\"".into()), "'Open'");
    }

    #[test]
    fn test_scalars() {
        assert_eq!(format_where_value(&WhereValue::Null), "null");
        assert_eq!(format_where_value(&true.into()), "true");
        assert_eq!(format_where_value(&false.into()), "false");
        assert_eq!(format_where_value(&42i64.into()), "'42'");
        assert_eq!(format_where_value(&2.5f64.into()), "'2.5'");
    }

    #[test]
    fn test_date_is_iso_calendar_date() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_where_value(&d.into()), "'2024-03-09'");

        let dt = DateTime::parse_from_rfc3339("2024-03-09T17:45:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_where_value(&dt.into()), "'2024-03-09'");
    }

    #[test]
    fn test_lists_recurse() {
        let value: WhereValue = vec!["Open", "In'Progress"].into();
        assert_eq!(format_where_value(&value), "['Open','In''Progress']");

        let nested = WhereValue::List(vec![WhereValue::Null, true.into(), 7i64.into()]);
        assert_eq!(format_where_value(&nested), "[null,true,'7']");
    }

    #[test]
    fn test_from_json() {
        let value = WhereValue::from_json(&serde_json::json!([1, "a", null, false]));
        assert_eq!(format_where_value(&value), "['1','a',null,false]");
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("GTE".parse::<Operator>().unwrap(), Operator::Gte);
        assert_eq!("not   contains".parse::<Operator>().unwrap(), Operator::NotContains);
        assert_eq!("Is Not Null".parse::<Operator>().unwrap(), Operator::IsNotNull);
        assert!("like".parse::<Operator>().is_err());
    }

    #[test]
    fn test_condition_to_clause() {
        let cond = QueryCondition::new("CustomField.Risk Level", Operator::Eq, "High");
        assert_eq!(cond.to_clause().unwrap(), "cf_RiskLevel eq 'High'");

        let cond = QueryCondition::is_not_null("Owner");
        assert_eq!(cond.to_clause().unwrap(), "Owner is not null");

        let cond = QueryCondition::new("Id", Operator::In, vec![1i64, 2]);
        assert_eq!(cond.to_clause().unwrap(), "Id in ['1','2']");
    }

    #[test]
    fn test_conditions_join() {
        let clause = conditions_to_clause(&[
            QueryCondition::new("EntityState.Name", Operator::Ne, "Done"),
            QueryCondition::is_null("Release"),
        ])
        .unwrap();
        assert_eq!(
            clause.as_deref(),
            Some("EntityState.Name ne 'Done' and Release is null")
        );
        assert_eq!(conditions_to_clause(&[]).unwrap(), None);
    }

    #[test]
    fn test_empty_field_rejected() {
        let cond = QueryCondition::new("  ", Operator::Eq, "x");
        assert!(cond.to_clause().is_err());
    }
}
