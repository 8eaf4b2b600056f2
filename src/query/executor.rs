//! Query executor.
//!
//! A [`Query`] runs in two phases. Compilation fetches every relation snapshot
//! from the [`RelationProvider`], resolves every join, and binds the WHERE
//! predicate, ORDER BY keys, and select list, so that name and type errors are
//! reported before any tuple is read. The compiled tree is then opened as a
//! chain of pull-based streams.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::query::ast::{ColumnRef, PlanNode, Query};
use crate::query::catalog::RelationProvider;
use crate::query::errors::{QueryError, Result};
use crate::query::join::{JoinPlan, JoinStream};
use crate::query::pipeline::{Projection, SortKeys};
use crate::query::predicate::{bind, BoundPredicate};
use crate::query::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use crate::query::relation::{Relation, Tuple};
use crate::query::schema::Schema;
use crate::query::stream::{BoxTupleStream, CancelToken, ScanStream, TupleStream};
use crate::query::value::Value;

/// Materialised result returned by `execute`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    /// Output schema, after projection.
    pub schema: Schema,
    /// The rows returned by the query.
    pub rows: Vec<Tuple>,
}

impl QueryResult {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the query returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one output column, top to bottom. `column` may be qualified.
    pub fn column(&self, column: &str) -> Result<Vec<&Value>> {
        let idx = self.schema.resolve(&ColumnRef::parse(column), "result column")?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Converts the result into an unnamed relation.
    pub fn into_relation(self) -> Relation {
        Relation::derived(self.schema, self.rows)
    }
}

/// Streaming handle over query rows.
pub struct ResultStream {
    tuples: BoxTupleStream,
    projection: Projection,
    cancel: CancelToken,
    max_rows: Option<usize>,
    produced: usize,
    done: bool,
}

impl ResultStream {
    /// Output schema of every row the stream yields.
    pub fn schema(&self) -> &Schema {
        self.projection.schema()
    }

    fn next_row(&mut self) -> Result<Option<Tuple>> {
        self.cancel.check()?;
        let Some(tuple) = self.tuples.try_next()? else {
            return Ok(None);
        };
        if let Some(max) = self.max_rows {
            if self.produced >= max {
                return Err(QueryError::RowLimitExceeded { max });
            }
        }
        self.produced += 1;
        let timer = profile_timer();
        let row = self.projection.apply(&tuple);
        record_profile_timer(QueryProfileKind::Project, timer);
        Ok(Some(row))
    }
}

impl Iterator for ResultStream {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Query executor running logical plans against a relation provider.
pub struct Executor {
    provider: Arc<dyn RelationProvider>,
    config: EngineConfig,
}

impl Executor {
    /// Creates a new executor over `provider`.
    pub fn new(provider: Arc<dyn RelationProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    /// Engine options in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes a query and materializes all results into memory.
    pub fn execute(&self, query: &Query, cancel: Option<Arc<AtomicBool>>) -> Result<QueryResult> {
        let started = Instant::now();
        let mut stream = self.stream(query, cancel)?;
        let iter_timer = profile_timer();
        let rows: Vec<Tuple> = stream.by_ref().collect::<Result<_>>()?;
        record_profile_timer(QueryProfileKind::StreamIter, iter_timer);
        info!(
            plan = %query.from,
            rows = rows.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "query.finish"
        );
        Ok(QueryResult {
            schema: stream.schema().clone(),
            rows,
        })
    }

    /// Compiles a query and returns a streaming iterator over its rows.
    ///
    /// Every error that depends only on names and types is returned here,
    /// before the first row is pulled.
    pub fn stream(&self, query: &Query, cancel: Option<Arc<AtomicBool>>) -> Result<ResultStream> {
        let cancel = CancelToken::new(cancel);
        cancel.check()?;
        let root = self.compile(&query.from)?;
        let schema = root.schema();
        let filter = query
            .filter
            .as_ref()
            .map(|predicate| bind(predicate, schema, "WHERE clause"))
            .transpose()?;
        let sort = SortKeys::bind(schema, &query.order_by)?;
        let projection = Projection::bind(schema, &query.select)?;
        debug!(
            plan = %query.from,
            filtered = filter.is_some(),
            sorted = !sort.is_empty(),
            columns = projection.schema().len(),
            "query.compiled"
        );

        let mut tuples = root.open(&cancel)?;
        if let Some(predicate) = filter {
            tuples = Box::new(FilterStream { input: tuples, predicate });
        }
        if !sort.is_empty() {
            tuples = Box::new(SortStream {
                input: Some(tuples),
                keys: sort,
                sorted: Vec::new().into_iter(),
                cancel: cancel.clone(),
            });
        }
        Ok(ResultStream {
            tuples,
            projection,
            cancel,
            max_rows: self.config.max_rows,
            produced: 0,
            done: false,
        })
    }

    /// Output schema of a FROM tree, without reading any tuple.
    pub fn describe(&self, node: &PlanNode) -> Result<Schema> {
        Ok(self.compile(node)?.schema().clone())
    }

    fn compile(&self, node: &PlanNode) -> Result<Compiled> {
        match node {
            PlanNode::Scan { relation, alias } => {
                let snapshot = self.provider.relation(relation)?;
                let schema = match alias {
                    Some(alias) => snapshot.schema().clone().qualified(alias),
                    None => snapshot.schema().clone(),
                };
                Ok(Compiled::Scan {
                    relation: snapshot,
                    schema,
                    label: alias.clone().unwrap_or_else(|| relation.clone()),
                })
            }
            PlanNode::Join { left, right, spec } => {
                let left = self.compile(left)?;
                let right = self.compile(right)?;
                let plan = JoinPlan::new(
                    left.schema(),
                    right.schema(),
                    spec,
                    &self.config,
                    &left.label(),
                    &right.label(),
                )?;
                Ok(Compiled::Join {
                    plan,
                    left: Box::new(left),
                    right: Box::new(right),
                    label: node.to_string(),
                })
            }
        }
    }
}

/// Plan node with its inputs fetched and its join resolved.
enum Compiled {
    Scan {
        relation: Arc<Relation>,
        schema: Schema,
        label: String,
    },
    Join {
        plan: JoinPlan,
        left: Box<Compiled>,
        right: Box<Compiled>,
        label: String,
    },
}

impl Compiled {
    fn schema(&self) -> &Schema {
        match self {
            Compiled::Scan { schema, .. } => schema,
            Compiled::Join { plan, .. } => plan.schema(),
        }
    }

    fn label(&self) -> String {
        match self {
            Compiled::Scan { label, .. } | Compiled::Join { label, .. } => label.clone(),
        }
    }

    fn open(self, cancel: &CancelToken) -> Result<BoxTupleStream> {
        match self {
            Compiled::Scan { relation, .. } => Ok(Box::new(ScanStream::new(relation))),
            Compiled::Join {
                plan, left, right, ..
            } => {
                let left = left.open(cancel)?;
                let right = right.open(cancel)?;
                Ok(Box::new(JoinStream::new(plan, left, right, cancel.clone())?))
            }
        }
    }
}

struct FilterStream {
    input: BoxTupleStream,
    predicate: BoundPredicate,
}

impl TupleStream for FilterStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        let filter_timer = profile_timer();
        let result = self.try_next_inner();
        record_profile_timer(QueryProfileKind::Filter, filter_timer);
        result
    }
}

impl FilterStream {
    fn try_next_inner(&mut self) -> Result<Option<Tuple>> {
        loop {
            let Some(tuple) = self.input.try_next()? else {
                return Ok(None);
            };
            if self.predicate.evaluate_tuple(&tuple)?.is_true() {
                return Ok(Some(tuple));
            }
        }
    }
}

/// Drains its input on the first pull, then yields the sorted tuples.
struct SortStream {
    input: Option<BoxTupleStream>,
    keys: SortKeys,
    sorted: std::vec::IntoIter<Tuple>,
    cancel: CancelToken,
}

impl TupleStream for SortStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        if let Some(mut input) = self.input.take() {
            let mut tuples = Vec::new();
            while let Some(tuple) = input.try_next()? {
                self.cancel.check()?;
                tuples.push(tuple);
            }
            let timer = profile_timer();
            self.keys.sort(&mut tuples);
            record_profile_timer(QueryProfileKind::Sort, timer);
            self.sorted = tuples.into_iter();
        }
        Ok(self.sorted.next())
    }
}
