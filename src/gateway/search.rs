//! Search requests and their translation into query parameters

use crate::query::{
    QueryCondition, conditions_to_clause, format_include, format_order_by, validate_where_clause,
};
use crate::{Error, Result};

/// Default page size when `take` is not given
pub const DEFAULT_TAKE: u32 = 25;
/// Largest page the remote API accepts
pub const MAX_TAKE: u32 = 1000;

/// A search against one entity collection
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Entity type to search
    pub entity_type: String,
    /// Raw where-clause in the filter DSL
    pub where_clause: Option<String>,
    /// Structured conditions, ANDed with `where_clause`
    pub conditions: Vec<QueryCondition>,
    /// Related entities to include
    pub include: Vec<String>,
    /// Page size (1..=1000)
    pub take: Option<u32>,
    /// Items to skip
    pub skip: Option<u32>,
    /// Sort fields; any trailing direction is discarded
    pub order_by: Vec<String>,
}

impl SearchRequest {
    /// Search every entity of a type
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            ..Self::default()
        }
    }

    /// Filter with a where-clause
    #[must_use]
    pub fn filter(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    /// Add a structured condition
    #[must_use]
    pub fn condition(mut self, condition: QueryCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Include related entities
    #[must_use]
    pub fn include<I, S>(mut self, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(include.into_iter().map(Into::into));
        self
    }

    /// Set the page size
    #[must_use]
    pub fn take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    /// Set the offset
    #[must_use]
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sort by fields
    #[must_use]
    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Validate and format everything except the entity type
    pub(crate) fn query_params(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = Vec::new();

        let mut clauses = Vec::new();
        if let Some(raw) = self.where_clause.as_deref().filter(|w| !w.trim().is_empty()) {
            clauses.push(validate_where_clause(raw)?);
        }
        if let Some(structured) = conditions_to_clause(&self.conditions)? {
            clauses.push(structured);
        }
        if !clauses.is_empty() {
            params.push(("where", clauses.join(" and ")));
        }

        if let Some(include) = format_include(&self.include)? {
            params.push(("include", include));
        }

        let take = self.take.unwrap_or(DEFAULT_TAKE);
        if !(1..=MAX_TAKE).contains(&take) {
            return Err(Error::Validation(format!(
                "take must be between 1 and {MAX_TAKE}, got {take}"
            )));
        }
        params.push(("take", take.to_string()));

        if let Some(skip) = self.skip.filter(|s| *s > 0) {
            params.push(("skip", skip.to_string()));
        }

        if let Some(order_by) = format_order_by(&self.order_by)? {
            params.push(("orderBy", order_by));
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Operator;
    use pretty_assertions::assert_eq;

    fn params(request: &SearchRequest) -> Vec<(&'static str, String)> {
        request.query_params().unwrap()
    }

    #[test]
    fn test_defaults_only_take() {
        assert_eq!(params(&SearchRequest::new("Bug")), vec![("take", "25".to_string())]);
    }

    #[test]
    fn test_full_request() {
        let request = SearchRequest::new("UserStory")
            .filter("EntityState.Name eq 'Open'")
            .condition(QueryCondition::new("Effort", Operator::Gt, 3_i64))
            .include(["Project", "AssignedUser"])
            .take(50)
            .skip(100)
            .order_by(["CreateDate desc"]);

        assert_eq!(
            params(&request),
            vec![
                ("where", "EntityState.Name eq 'Open' and Effort gt '3'".to_string()),
                ("include", "[Project,AssignedUser]".to_string()),
                ("take", "50".to_string()),
                ("skip", "100".to_string()),
                ("orderBy", "CreateDate".to_string()),
            ]
        );
    }

    #[test]
    fn test_take_bounds() {
        assert!(SearchRequest::new("Bug").take(1000).query_params().is_ok());
        for take in [0, 1001] {
            assert!(matches!(
                SearchRequest::new("Bug").take(take).query_params(),
                Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn test_invalid_parts_are_rejected() {
        assert!(SearchRequest::new("Bug").filter("Name").query_params().is_err());
        assert!(SearchRequest::new("Bug").include(["Project;drop"]).query_params().is_err());
        assert!(SearchRequest::new("Bug").order_by(["  "]).query_params().is_err());
    }
}
