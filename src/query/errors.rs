#![forbid(unsafe_code)]

use std::fmt;

use thiserror::Error;

use crate::query::schema::DataType;

/// Result alias used throughout the query engine.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Structured errors emitted while building relations or evaluating a query.
///
/// Every error is scoped to the single query (or relation construction) that
/// produced it. Shared relations are never mutated, so no error leaves them in
/// a partially updated state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A tuple does not conform to the schema of the relation it belongs to.
    #[error("schema violation in '{relation}': {detail}")]
    SchemaViolation {
        /// Relation being constructed (or `<derived>` for join output).
        relation: String,
        /// Human-readable description of the violation.
        detail: String,
    },
    /// A USING list, predicate, or select list names a column that does not exist.
    #[error("unknown column '{column}' referenced in {context}")]
    MissingColumn {
        /// Column reference as written by the caller.
        column: String,
        /// Clause that contained the reference.
        context: &'static str,
    },
    /// A column reference matches more than one column of the input schema.
    #[error("column reference '{column}' is ambiguous in {context}")]
    AmbiguousColumn {
        /// Column reference as written by the caller.
        column: String,
        /// Clause that contained the reference.
        context: &'static str,
    },
    /// Two operands from incompatible domains were compared.
    #[error("cannot compare {left} with {right} in {context}")]
    TypeMismatch {
        /// Declared type of the left operand.
        left: DataType,
        /// Declared type of the right operand.
        right: DataType,
        /// Clause that contained the comparison.
        context: &'static str,
    },
    /// NATURAL join without shared columns under the `Reject` fallback policy.
    #[error("natural join between {left} and {right} shares no column names")]
    AmbiguousJoin {
        /// Display form of the left input.
        left: String,
        /// Display form of the right input.
        right: String,
    },
    /// The plan references a relation the provider does not know.
    #[error("unknown relation '{name}'")]
    UnknownRelation {
        /// Relation name from the plan.
        name: String,
    },
    /// The caller raised the cancellation flag while the query was running.
    #[error("query cancelled")]
    Cancelled,
    /// The plan itself is malformed (for example, a builder with no FROM).
    #[error("invalid plan: {0}")]
    InvalidPlan(&'static str),
    /// The result grew beyond the configured row ceiling.
    #[error("query produced more than {max} rows")]
    RowLimitExceeded {
        /// Configured ceiling.
        max: usize,
    },
}

impl QueryError {
    /// Builds a [`QueryError::SchemaViolation`] for the named relation.
    pub fn schema_violation(relation: impl Into<String>, detail: impl Into<String>) -> Self {
        QueryError::SchemaViolation {
            relation: relation.into(),
            detail: detail.into(),
        }
    }

    /// Builds a [`QueryError::MissingColumn`] for a specific context.
    pub fn missing_column(column: impl Into<String>, context: &'static str) -> Self {
        QueryError::MissingColumn {
            column: column.into(),
            context,
        }
    }

    /// Builds a [`QueryError::AmbiguousColumn`] for a specific context.
    pub fn ambiguous_column(column: impl Into<String>, context: &'static str) -> Self {
        QueryError::AmbiguousColumn {
            column: column.into(),
            context,
        }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::SchemaViolation { .. } => "SchemaViolation",
            QueryError::MissingColumn { .. } => "MissingColumn",
            QueryError::AmbiguousColumn { .. } => "AmbiguousColumn",
            QueryError::TypeMismatch { .. } => "TypeMismatch",
            QueryError::AmbiguousJoin { .. } => "AmbiguousJoin",
            QueryError::UnknownRelation { .. } => "UnknownRelation",
            QueryError::InvalidPlan(_) => "InvalidPlan",
            QueryError::Cancelled => "Cancelled",
            QueryError::RowLimitExceeded { .. } => "RowLimitExceeded",
        }
    }
}

/// Convenience wrapper that formats query errors with their codes.
pub struct QueryErrorWithCode<'a>(pub &'a QueryError);

impl fmt::Display for QueryErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
