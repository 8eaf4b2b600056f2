//! Fluent query builder.
//!
//! Joins are appended left-deep: each `*join*` call makes the current FROM
//! tree the left input. Use [`QueryBuilder::join_node`] for a parenthesized
//! right input.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::query::ast::{
    ColumnRef, JoinKind, JoinSpec, OrderKey, PlanNode, Predicate, Query, SelectItem,
};
use crate::query::errors::{QueryError, Result};
use crate::query::executor::{Executor, QueryResult};

/// Fluent builder producing a [`Query`].
#[derive(Debug, Default)]
pub struct QueryBuilder {
    from: Option<PlanNode>,
    filter: Option<Predicate>,
    select: Vec<SelectItem>,
    order_by: Vec<OrderKey>,
    error: Option<QueryError>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the FROM tree with a scan of `relation`.
    pub fn scan(relation: impl Into<String>) -> Self {
        Self::new().from_node(PlanNode::scan(relation))
    }

    /// Starts the FROM tree with a scan of `relation` under `alias`.
    pub fn scan_as(relation: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new().from_node(PlanNode::scan_as(relation, alias))
    }

    /// Replaces the FROM tree.
    pub fn from_node(mut self, node: PlanNode) -> Self {
        self.from = Some(node);
        self
    }

    /// Joins the current FROM tree with an arbitrary right input.
    pub fn join_node(mut self, right: PlanNode, spec: JoinSpec) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.from.take() {
            Some(left) => self.from = Some(left.join(right, spec)),
            None => self.error = Some(QueryError::InvalidPlan("join requires a FROM relation")),
        }
        self
    }

    /// Joins with a scan of `relation`.
    pub fn join(self, relation: impl Into<String>, spec: JoinSpec) -> Self {
        self.join_node(PlanNode::scan(relation), spec)
    }

    /// Joins with a scan of `relation` under `alias`.
    pub fn join_as(
        self,
        relation: impl Into<String>,
        alias: impl Into<String>,
        spec: JoinSpec,
    ) -> Self {
        self.join_node(PlanNode::scan_as(relation, alias), spec)
    }

    /// `NATURAL [kind] JOIN relation`.
    pub fn natural_join(self, relation: impl Into<String>, kind: JoinKind) -> Self {
        self.join(relation, JoinSpec::natural(kind))
    }

    /// `[kind] JOIN relation USING (columns)`.
    pub fn join_using<I, S>(self, relation: impl Into<String>, kind: JoinKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join(relation, JoinSpec::using(kind, columns))
    }

    /// `[kind] JOIN relation ON predicate`.
    pub fn join_on(self, relation: impl Into<String>, kind: JoinKind, predicate: Predicate) -> Self {
        self.join(relation, JoinSpec::on(kind, predicate))
    }

    /// `, relation` in a FROM list.
    pub fn cross_join(self, relation: impl Into<String>) -> Self {
        self.join(relation, JoinSpec::cross())
    }

    /// Adds a WHERE conjunct.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Appends columns to the select list. Each entry may be qualified.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select
            .extend(columns.into_iter().map(|c| SelectItem::Column {
                column: ColumnRef::parse(c.as_ref()),
                alias: None,
            }));
        self
    }

    /// Appends one renamed column to the select list.
    pub fn select_as(mut self, column: &str, alias: impl Into<String>) -> Self {
        self.select.push(SelectItem::Column {
            column: ColumnRef::parse(column),
            alias: Some(alias.into()),
        });
        self
    }

    /// Appends `*` to the select list.
    pub fn select_all(mut self) -> Self {
        self.select.push(SelectItem::Wildcard);
        self
    }

    /// Ascending ORDER BY key.
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(OrderKey {
            column: ColumnRef::parse(column),
            descending: false,
        });
        self
    }

    /// Descending ORDER BY key.
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push(OrderKey {
            column: ColumnRef::parse(column),
            descending: true,
        });
        self
    }

    /// Finalizes the query.
    pub fn build(self) -> Result<Query> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let from = self
            .from
            .ok_or(QueryError::InvalidPlan("query has no FROM relation"))?;
        Ok(Query {
            from,
            filter: self.filter,
            select: self.select,
            order_by: self.order_by,
        })
    }

    /// Builds the query and runs it on `executor`.
    pub fn execute(self, executor: &Executor, cancel: Option<Arc<AtomicBool>>) -> Result<QueryResult> {
        let query = self.build()?;
        executor.execute(&query, cancel)
    }
}
