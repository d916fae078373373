//! Filter-expression DSL: where clauses, includes and ordering
//!
//! Everything here is pure. Inputs are validated and re-escaped into the
//! literal syntax the remote API accepts:
//!
//! ```text
//! "Name EQ 'O''Brien' and CustomField.Risk gt 3"
//!         │
//!         ▼ tokenizer (quote-aware) ─▶ segments split on top-level `and`
//!         │
//!         ▼ grammar: <field> <op> <value> | <field> is [not] null
//!         │
//!         ▼
//! "Name eq 'O''Brien' and cf_Risk gt '3'"
//! ```

mod clause;
mod condition;
mod fields;
mod tokenizer;

pub use clause::validate_where_clause;
pub use condition::{
    Operator, QueryCondition, WhereValue, conditions_to_clause, format_where_value,
};
pub use fields::{format_field, format_include, format_order_by};
