#![forbid(unsafe_code)]

//! Relational join evaluation engine.
//!
//! This module provides the value and relation model, the join evaluator, the
//! selection/projection pipeline, and the executor that runs logical plans
//! against a relation catalog.

/// Logical plan: scans, join trees, predicates, select lists.
pub mod ast;

/// Fluent builder for logical plans.
pub mod builder;

/// Relation providers and the in-memory catalog.
pub mod catalog;

/// Structured errors and their machine-readable codes.
pub mod errors;

/// Executes logical plans and streams result rows back to callers.
pub mod executor;

/// Natural, USING, ON, and cross joins of every outer kind.
pub mod join;

/// WHERE, ORDER BY, and select-list stages.
pub mod pipeline;

/// Predicate binding and three-valued evaluation.
pub mod predicate;

/// Performance profiling for query operators.
///
/// Collects timing and count statistics per operator kind.
pub mod profile;

/// Immutable relations.
pub mod relation;

/// Columns, schemas, and column-name resolution.
pub mod schema;

mod stream;

/// Three-valued truth.
pub mod truth;

/// Nullable scalar values.
pub mod value;

pub use ast::{
    CmpOp, ColumnRef, JoinCondition, JoinKind, JoinSpec, Operand, OrderKey, PlanNode, Predicate,
    Query, SelectItem,
};
pub use builder::QueryBuilder;
pub use catalog::{Catalog, RelationProvider};
pub use errors::{QueryError, Result};
pub use executor::{Executor, QueryResult, ResultStream};
pub use join::{JoinAlgorithm, JoinPlan};
pub use relation::{Relation, Tuple};
pub use schema::{Column, DataType, Schema};
pub use truth::Truth;
pub use value::{parse_date, Value};
