//! Where-clause validation and normalization
//!
//! Only top-level `and` is decomposed. `or` and parenthesized groups are
//! not recognized; whatever follows the operator of a condition becomes its
//! value.

use super::condition::{Operator, quote_text};
use super::fields::format_field;
use super::tokenizer::{Token, split_list, split_on_and, tokenize};
use crate::{Error, Result};

/// Validate a where clause and return it normalized and safely escaped
pub fn validate_where_clause(raw: &str) -> Result<String> {
    let source = raw.trim();
    if source.is_empty() {
        return Err(Error::Validation(
            "Where clause must not be empty".to_string(),
        ));
    }

    let tokens = tokenize(source)?;
    let mut conditions = Vec::new();
    for segment in split_on_and(&tokens) {
        if segment.is_empty() {
            return Err(Error::Validation(format!(
                "Dangling 'and' in where clause: {source}"
            )));
        }
        conditions.push(format_segment(source, segment)?);
    }

    Ok(conditions.join(" and "))
}

fn format_segment(source: &str, segment: &[Token<'_>]) -> Result<String> {
    let text = &source[segment[0].start..segment[segment.len() - 1].end];
    let invalid = || {
        Error::Validation(format!(
            "Invalid condition '{text}'. Expected '<field> <operator> <value>' with operator \
             one of eq, ne, gt, gte, lt, lte, in, contains, not contains, \
             or '<field> is null' / '<field> is not null'"
        ))
    };

    let (field, rest) = segment.split_first().ok_or_else(invalid)?;
    if field.quoted {
        return Err(invalid());
    }
    let field = format_field(field.text);

    let keywords: Vec<Option<String>> = rest.iter().map(Token::keyword).collect();
    let kw = |i: usize| keywords.get(i).and_then(Option::as_deref);

    // Null checks take no value
    match (rest.len(), kw(0), kw(1), kw(2)) {
        (2, Some("is"), Some("null"), _) => return Ok(format!("{field} is null")),
        (3, Some("is"), Some("not"), Some("null")) => return Ok(format!("{field} is not null")),
        _ => {}
    }

    let (operator, value_tokens) = match (kw(0), kw(1)) {
        (Some("not"), Some("contains")) => (Operator::NotContains, &rest[2..]),
        (Some(word), _) => {
            let op = word.parse::<Operator>().map_err(|_| invalid())?;
            if op.is_null_check() || op == Operator::NotContains {
                return Err(invalid());
            }
            (op, &rest[1..])
        }
        (None, _) => return Err(invalid()),
    };

    let (Some(first), Some(last)) = (value_tokens.first(), value_tokens.last()) else {
        return Err(invalid());
    };
    let value = &source[first.start..last.end];

    let formatted = if operator == Operator::In {
        format_in_value(value)?
    } else {
        format_literal(value)
    };

    Ok(format!("{field} {operator} {formatted}"))
}

/// Quote a literal from the textual DSL. A fully quoted literal is
/// unescaped first so already-normalized input passes through unchanged.
fn format_literal(value: &str) -> String {
    let unescaped = if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1]
            .replace("''", "'")
            .replace("\\'", "'")
    } else if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].replace("\\\"", "\"")
    } else {
        value.to_string()
    };
    quote_text(&unescaped)
}

/// `in` takes a list written as `(a, b)` or `[a, b]`, or a single value
fn format_in_value(value: &str) -> Result<String> {
    let body = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .or_else(|| value.strip_prefix('[').and_then(|v| v.strip_suffix(']')));

    let Some(body) = body else {
        return Ok(format_literal(value));
    };
    let items: Vec<String> = split_list(body)?
        .into_iter()
        .map(format_literal)
        .collect();
    Ok(format!("[{}]", items.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_condition_unchanged() {
        assert_eq!(
            validate_where_clause("Priority.Name eq 'Critical'").unwrap(),
            "Priority.Name eq 'Critical'"
        );
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(validate_where_clause("Field is null").unwrap(), "Field is null");
        assert_eq!(
            validate_where_clause("Field is not null").unwrap(),
            "Field is not null"
        );
        assert_eq!(
            validate_where_clause("Release IS NOT NULL").unwrap(),
            "Release is not null"
        );
    }

    #[test]
    fn test_values_are_always_quoted() {
        assert_eq!(validate_where_clause("Id gt 100").unwrap(), "Id gt '100'");
        assert_eq!(
            validate_where_clause("Name contains \"login\"").unwrap(),
            "Name contains 'login'"
        );
    }

    #[test]
    fn test_operator_is_lowercased() {
        assert_eq!(
            validate_where_clause("EntityState.Name NE 'Done'").unwrap(),
            "EntityState.Name ne 'Done'"
        );
    }

    #[test]
    fn test_and_splitting_is_quote_aware() {
        assert_eq!(
            validate_where_clause("Name eq 'Salt and Pepper' and Id gt 3").unwrap(),
            "Name eq 'Salt and Pepper' and Id gt '3'"
        );
        assert_eq!(
            validate_where_clause("Team.Name eq 'Core' AND Release is null").unwrap(),
            "Team.Name eq 'Core' and Release is null"
        );
    }

    #[test]
    fn test_embedded_quote_is_escaped() {
        assert_eq!(
            validate_where_clause("Owner.LastName eq O'Brien").unwrap_err().kind(),
            crate::error::ErrorKind::Validation
        );
        assert_eq!(
            validate_where_clause(r"Owner.LastName eq 'O\'Brien'").unwrap(),
            "Owner.LastName eq 'O''Brien'"
        );
        assert_eq!(
            validate_where_clause("Owner.LastName eq 'O''Brien'").unwrap(),
            "Owner.LastName eq 'O''Brien'"
        );
    }

    #[test]
    fn test_not_contains() {
        assert_eq!(
            validate_where_clause("Name not contains 'draft'").unwrap(),
            "Name not contains 'draft'"
        );
        assert_eq!(
            validate_where_clause("Name NOT   CONTAINS draft").unwrap(),
            "Name not contains 'draft'"
        );
    }

    #[test]
    fn test_custom_field_rewrite() {
        assert_eq!(
            validate_where_clause("CustomField.Risk eq 'High'").unwrap(),
            "cf_Risk eq 'High'"
        );
    }

    #[test]
    fn test_in_lists() {
        assert_eq!(
            validate_where_clause("EntityState.Name in ('Open', 'In Progress')").unwrap(),
            "EntityState.Name in ['Open','In Progress']"
        );
        assert_eq!(
            validate_where_clause("Id in [1,2,3]").unwrap(),
            "Id in ['1','2','3']"
        );
    }

    #[test]
    fn test_idempotent_on_own_output() {
        for raw in [
            "Priority.Name eq 'Critical'",
            "Id gte 5",
            "Name eq 'O''Brien'",
            "Name contains 'a and b'",
            "EntityState.Name in ('Open','Done')",
            "Project.Id eq 12 and Owner is not null",
            "Path eq C:\\",
            "Path eq 'C:\\Temp\\\\'",
        ] {
            let once = validate_where_clause(raw).unwrap();
            let twice = validate_where_clause(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_trailing_backslash_does_not_escape_closing_quote() {
        assert_eq!(validate_where_clause("Path eq C:\\").unwrap(), "Path eq 'C:\\\\'");
        assert_eq!(
            validate_where_clause("Path eq 'C:\\\\' and Id eq 3").unwrap(),
            "Path eq 'C:\\\\' and Id eq '3'"
        );
    }

    #[test]
    fn test_rejections() {
        for raw in [
            "",
            "   ",
            "Name",
            "Name eq",
            "Name like 'x'",
            "Name is",
            "'Name' eq 'x'",
            "and Name eq 'x'",
            "Name eq 'x' and",
            "Name eq 'unterminated",
        ] {
            let err = validate_where_clause(raw).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_or_stays_inside_one_value() {
        assert_eq!(
            validate_where_clause("A eq 1 or B eq 2").unwrap(),
            "A eq '1 or B eq 2'"
        );
    }

    #[test]
    fn test_error_names_segment() {
        let err = validate_where_clause("Id eq 1 and Name like 'x'").unwrap_err();
        assert!(err.to_string().contains("Name like 'x'"));
    }
}
