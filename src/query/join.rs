//! Join evaluation.
//!
//! [`JoinPlan::new`] resolves a [`JoinSpec`] against the two input schemas:
//! it computes the match columns, the output schema, and the algorithm, and it
//! surfaces every name-resolution or typing error before a tuple is read.
//! Enumeration then pulls the driving (outer) input once and matches each of
//! its tuples against an [`InnerBuffer`] holding the other input.
//!
//! Left, inner, and full joins are driven by the left input. Right joins are
//! driven by the right input so that their output follows right-input order.
//! The hash algorithm keeps inner order within each bucket, which makes its
//! output identical, row for row, to the nested-loop enumeration.

use std::borrow::Cow;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::{EngineConfig, JoinStrategy, NaturalFallback};
use crate::query::ast::{JoinCondition, JoinKind, JoinSpec};
use crate::query::errors::{QueryError, Result};
use crate::query::predicate::{bind, BoundPredicate, PairView};
use crate::query::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use crate::query::relation::{Relation, Tuple};
use crate::query::schema::{Column, DataType, Schema};
use crate::query::stream::{collect_tuples, BoxTupleStream, CancelToken, TupleStream};
use crate::query::value::{KeyValue, Value};

const DERIVED: &str = "<derived>";

type JoinKey = SmallVec<[KeyValue; 2]>;

/// Algorithm selected for one join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinAlgorithm {
    /// Every outer tuple is compared with every inner tuple.
    NestedLoop,
    /// The inner input is bucketed by its equality key.
    Hash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Source of one output column.
#[derive(Clone, Copy, Debug)]
enum Slot {
    Left(usize),
    Right(usize),
    /// Match column: the left value when a left tuple is present, else the right.
    Coalesce { left: usize, right: usize },
}

#[derive(Clone, Debug)]
enum Matcher {
    Always,
    /// `(left_idx, right_idx)` pairs that must compare equal.
    Keys(Vec<(usize, usize)>),
    /// Bound against the concatenated left and right schemas.
    Predicate(BoundPredicate),
}

/// A join resolved against concrete input schemas.
#[derive(Clone, Debug)]
pub struct JoinPlan {
    kind: JoinKind,
    schema: Schema,
    slots: Vec<Slot>,
    matcher: Matcher,
    algorithm: JoinAlgorithm,
    hash_keys: Vec<(usize, usize)>,
    driver: Side,
}

impl JoinPlan {
    /// Resolves `spec` for inputs with the given schemas. The names are used
    /// only for logging and error messages.
    pub fn new(
        left: &Schema,
        right: &Schema,
        spec: &JoinSpec,
        config: &EngineConfig,
        left_name: &str,
        right_name: &str,
    ) -> Result<Self> {
        debug!(
            left = left_name,
            right = right_name,
            kind = %spec.kind,
            "join.start"
        );
        let (matcher, schema, slots) = match &spec.condition {
            JoinCondition::Natural => {
                let names = shared_names(left, right);
                if names.is_empty() {
                    match config.natural_fallback {
                        NaturalFallback::CrossProduct => {
                            debug!(left = left_name, right = right_name, "join.natural.disjoint");
                            let (schema, slots) = concatenated(left, right);
                            (Matcher::Always, schema, slots)
                        }
                        NaturalFallback::Reject => {
                            return Err(QueryError::AmbiguousJoin {
                                left: left_name.to_owned(),
                                right: right_name.to_owned(),
                            })
                        }
                    }
                } else {
                    coalesced(left, right, &names, "NATURAL join")?
                }
            }
            JoinCondition::Using(columns) => {
                ensure_distinct(columns)?;
                coalesced(left, right, columns, "USING clause")?
            }
            JoinCondition::On(predicate) => {
                let (schema, slots) = concatenated(left, right);
                let bound = bind(predicate, &schema, "ON clause")?;
                (Matcher::Predicate(bound), schema, slots)
            }
            JoinCondition::Cross => {
                let (schema, slots) = concatenated(left, right);
                (Matcher::Always, schema, slots)
            }
        };

        let equi = match &matcher {
            Matcher::Always => None,
            Matcher::Keys(pairs) => Some(pairs.clone()),
            Matcher::Predicate(predicate) => predicate.equi_pairs(left.len()),
        };
        let (algorithm, hash_keys) = match (config.join_strategy, equi) {
            (JoinStrategy::NestedLoop, _) | (_, None) => (JoinAlgorithm::NestedLoop, Vec::new()),
            (JoinStrategy::Auto | JoinStrategy::Hash, Some(keys)) => (JoinAlgorithm::Hash, keys),
        };
        let driver = if spec.kind == JoinKind::RightOuter {
            Side::Right
        } else {
            Side::Left
        };
        debug!(
            algorithm = ?algorithm,
            keys = hash_keys.len(),
            driver = ?driver,
            columns = schema.len(),
            "join.strategy"
        );
        Ok(Self {
            kind: spec.kind,
            schema,
            slots,
            matcher,
            algorithm,
            hash_keys,
            driver,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Join kind.
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Algorithm chosen for enumeration.
    pub fn algorithm(&self) -> JoinAlgorithm {
        self.algorithm
    }

    /// Splits `(left, right)` into `(outer, inner)`.
    fn orient<T>(&self, left: T, right: T) -> (T, T) {
        match self.driver {
            Side::Left => (left, right),
            Side::Right => (right, left),
        }
    }

    /// Maps an `(outer, inner)` pair back to `(left, right)`.
    fn sides<'t>(&self, outer: &'t [Value], inner: &'t [Value]) -> (&'t [Value], &'t [Value]) {
        self.orient(outer, inner)
    }

    fn outer_key(&self, tuple: &[Value]) -> Option<JoinKey> {
        self.hash_keys
            .iter()
            .map(|&(l, r)| self.orient(l, r).0)
            .map(|idx| tuple[idx].key())
            .collect()
    }

    fn inner_key(&self, tuple: &[Value]) -> Option<JoinKey> {
        self.hash_keys
            .iter()
            .map(|&(l, r)| self.orient(l, r).1)
            .map(|idx| tuple[idx].key())
            .collect()
    }

    fn outer_preserved(&self) -> bool {
        match self.driver {
            Side::Left => self.kind.preserves_left(),
            Side::Right => self.kind.preserves_right(),
        }
    }

    fn inner_preserved(&self) -> bool {
        match self.driver {
            Side::Left => self.kind.preserves_right(),
            Side::Right => self.kind.preserves_left(),
        }
    }

    fn matches(&self, left: &[Value], right: &[Value]) -> Result<bool> {
        match &self.matcher {
            Matcher::Always => Ok(true),
            Matcher::Keys(pairs) => {
                for &(l, r) in pairs {
                    if !left[l].sql_eq(&right[r], "join condition")?.is_true() {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Matcher::Predicate(predicate) => {
                Ok(predicate.evaluate(&PairView { left, right })?.is_true())
            }
        }
    }

    fn combine(&self, left: Option<&[Value]>, right: Option<&[Value]>) -> Tuple {
        self.slots
            .iter()
            .zip(self.schema.columns())
            .map(|(slot, column)| {
                let value = match *slot {
                    Slot::Left(idx) => left.map(|t| &t[idx]),
                    Slot::Right(idx) => right.map(|t| &t[idx]),
                    Slot::Coalesce { left: l, right: r } => {
                        left.map(|t| &t[l]).or_else(|| right.map(|t| &t[r]))
                    }
                };
                widen(value.cloned().unwrap_or(Value::Null), column.data_type)
            })
            .collect()
    }

    fn pad_outer(&self, outer: &[Value]) -> Tuple {
        match self.driver {
            Side::Left => self.combine(Some(outer), None),
            Side::Right => self.combine(None, Some(outer)),
        }
    }

    fn pad_inner(&self, inner: &[Value]) -> Tuple {
        match self.driver {
            Side::Left => self.combine(None, Some(inner)),
            Side::Right => self.combine(Some(inner), None),
        }
    }

    /// Appends every output tuple produced by one outer tuple to `out`.
    pub(crate) fn probe(
        &self,
        outer: &[Value],
        inner: &mut InnerBuffer<'_>,
        out: &mut Vec<Tuple>,
    ) -> Result<()> {
        let timer = profile_timer();
        let emitted = out.len();
        let InnerBuffer {
            tuples,
            buckets,
            matched,
        } = inner;
        match buckets {
            Some(buckets) => {
                let buckets = &*buckets;
                let candidates = self
                    .outer_key(outer)
                    .and_then(|key| buckets.get(&key))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for &idx in candidates {
                    let (left, right) = self.sides(outer, &tuples[idx]);
                    out.push(self.combine(Some(left), Some(right)));
                    if let Some(flag) = matched.get_mut(idx) {
                        *flag = true;
                    }
                }
            }
            None => {
                for (idx, candidate) in tuples.iter().enumerate() {
                    let (left, right) = self.sides(outer, candidate);
                    if !self.matches(left, right)? {
                        continue;
                    }
                    out.push(self.combine(Some(left), Some(right)));
                    if let Some(flag) = matched.get_mut(idx) {
                        *flag = true;
                    }
                }
            }
        }
        if out.len() == emitted && self.outer_preserved() {
            out.push(self.pad_outer(outer));
        }
        record_profile_timer(QueryProfileKind::JoinProbe, timer);
        Ok(())
    }

    /// Appends the preserved inner tuples that never matched, in inner order.
    pub(crate) fn finish(&self, inner: &InnerBuffer<'_>, out: &mut Vec<Tuple>) {
        let before = out.len();
        for (idx, matched) in inner.matched.iter().enumerate() {
            if !matched {
                out.push(self.pad_inner(&inner.tuples[idx]));
            }
        }
        if out.len() > before {
            trace!(rows = out.len() - before, "join.unmatched_inner");
        }
    }

    fn into_schema(self) -> Schema {
        self.schema
    }
}

/// Re-iterable inner input, bucketed by join key under the hash algorithm.
pub(crate) struct InnerBuffer<'a> {
    tuples: Cow<'a, [Tuple]>,
    buckets: Option<FxHashMap<JoinKey, Vec<usize>>>,
    /// One flag per tuple when unmatched inner tuples must be emitted.
    matched: Vec<bool>,
}

impl<'a> InnerBuffer<'a> {
    pub(crate) fn new(plan: &JoinPlan, tuples: Cow<'a, [Tuple]>) -> Self {
        let timer = profile_timer();
        let buckets = (plan.algorithm == JoinAlgorithm::Hash).then(|| {
            let mut buckets: FxHashMap<JoinKey, Vec<usize>> = FxHashMap::default();
            for (idx, tuple) in tuples.iter().enumerate() {
                if let Some(key) = plan.inner_key(tuple) {
                    buckets.entry(key).or_default().push(idx);
                }
            }
            buckets
        });
        let matched = if plan.inner_preserved() {
            vec![false; tuples.len()]
        } else {
            Vec::new()
        };
        trace!(
            rows = tuples.len(),
            buckets = buckets.as_ref().map_or(0, |b| b.len()),
            "join.inner.buffered"
        );
        record_profile_timer(QueryProfileKind::HashBuild, timer);
        Self {
            tuples,
            buckets,
            matched,
        }
    }
}

/// Joins two materialized relations.
pub fn evaluate(
    left: &Relation,
    right: &Relation,
    spec: &JoinSpec,
    config: &EngineConfig,
) -> Result<Relation> {
    let plan = JoinPlan::new(
        left.schema(),
        right.schema(),
        spec,
        config,
        left.display_name(),
        right.display_name(),
    )?;
    let (outer, inner) = plan.orient(left.tuples(), right.tuples());
    let mut buffer = InnerBuffer::new(&plan, Cow::Borrowed(inner));
    let mut out = Vec::new();
    for tuple in outer {
        plan.probe(tuple, &mut buffer, &mut out)?;
    }
    plan.finish(&buffer, &mut out);
    Ok(Relation::derived(plan.into_schema(), out))
}

/// Streaming join: buffers the inner input on construction, then pulls the
/// outer input one tuple at a time.
pub(crate) struct JoinStream {
    plan: JoinPlan,
    outer: BoxTupleStream,
    inner: InnerBuffer<'static>,
    pending: Vec<Tuple>,
    pending_idx: usize,
    outer_done: bool,
    cancel: CancelToken,
}

impl JoinStream {
    pub(crate) fn new(
        plan: JoinPlan,
        left: BoxTupleStream,
        right: BoxTupleStream,
        cancel: CancelToken,
    ) -> Result<Self> {
        let (outer, mut inner_input) = plan.orient(left, right);
        let tuples = collect_tuples(inner_input.as_mut())?;
        let inner = InnerBuffer::new(&plan, Cow::Owned(tuples));
        Ok(Self {
            plan,
            outer,
            inner,
            pending: Vec::new(),
            pending_idx: 0,
            outer_done: false,
            cancel,
        })
    }
}

impl TupleStream for JoinStream {
    fn try_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.pending_idx < self.pending.len() {
                let tuple = std::mem::take(&mut self.pending[self.pending_idx]);
                self.pending_idx += 1;
                return Ok(Some(tuple));
            }
            self.pending.clear();
            self.pending_idx = 0;
            if self.outer_done {
                return Ok(None);
            }

            self.cancel.check()?;
            match self.outer.try_next()? {
                Some(outer) => self.plan.probe(&outer, &mut self.inner, &mut self.pending)?,
                None => {
                    self.outer_done = true;
                    self.plan.finish(&self.inner, &mut self.pending);
                }
            }
        }
    }
}

/// Column names present on both sides, in left-schema order.
fn shared_names(left: &Schema, right: &Schema) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for column in left.columns() {
        let seen = names.iter().any(|n| column.has_name(n));
        if !seen && right.positions_of(&column.name).next().is_some() {
            names.push(column.name.clone());
        }
    }
    names
}

fn ensure_distinct(columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(QueryError::schema_violation(DERIVED, "USING list is empty"));
    }
    for (idx, name) in columns.iter().enumerate() {
        if columns[..idx].iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Err(QueryError::schema_violation(
                DERIVED,
                format!("column '{name}' listed more than once in USING"),
            ));
        }
    }
    Ok(())
}

fn unique_position(schema: &Schema, name: &str, context: &'static str) -> Result<usize> {
    let mut positions = schema.positions_of(name);
    let first = positions
        .next()
        .ok_or_else(|| QueryError::missing_column(name, context))?;
    if positions.next().is_some() {
        return Err(QueryError::ambiguous_column(name, context));
    }
    Ok(first)
}

/// Match columns once, then the remaining left columns, then the remaining
/// right columns.
fn coalesced(
    left: &Schema,
    right: &Schema,
    names: &[String],
    context: &'static str,
) -> Result<(Matcher, Schema, Vec<Slot>)> {
    let mut pairs = Vec::with_capacity(names.len());
    for name in names {
        let l = unique_position(left, name, context)?;
        let r = unique_position(right, name, context)?;
        let (lt, rt) = (left.column(l).data_type, right.column(r).data_type);
        if !lt.comparable_with(rt) {
            return Err(QueryError::TypeMismatch {
                left: lt,
                right: rt,
                context,
            });
        }
        pairs.push((l, r));
    }

    let width = left.len() + right.len() - pairs.len();
    let mut columns: Vec<Column> = Vec::with_capacity(width);
    let mut slots = Vec::with_capacity(width);
    for &(l, r) in &pairs {
        let mut column = left.column(l).clone();
        column.absorb_qualifiers(right.column(r));
        column.data_type = column.data_type.unify(right.column(r).data_type);
        columns.push(column);
        slots.push(Slot::Coalesce { left: l, right: r });
    }
    for (idx, column) in left.columns().iter().enumerate() {
        if !pairs.iter().any(|&(l, _)| l == idx) {
            columns.push(column.clone());
            slots.push(Slot::Left(idx));
        }
    }
    for (idx, column) in right.columns().iter().enumerate() {
        if !pairs.iter().any(|&(_, r)| r == idx) {
            columns.push(column.clone());
            slots.push(Slot::Right(idx));
        }
    }
    Ok((Matcher::Keys(pairs), Schema::new(columns), slots))
}

/// Every left column, then every right column.
fn concatenated(left: &Schema, right: &Schema) -> (Schema, Vec<Slot>) {
    let columns = left
        .columns()
        .iter()
        .chain(right.columns())
        .cloned()
        .collect();
    let slots = (0..left.len())
        .map(Slot::Left)
        .chain((0..right.len()).map(Slot::Right))
        .collect();
    (Schema::new(columns), slots)
}

fn widen(value: Value, ty: DataType) -> Value {
    match (value, ty) {
        (Value::Int(v), DataType::Decimal) => Value::Decimal(Decimal::from(v)),
        (value, _) => value,
    }
}
