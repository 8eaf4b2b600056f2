//! Selection, ordering, and projection over a joined relation.
//!
//! The stages always run in the same order: WHERE, then ORDER BY, then the
//! select list. ORDER BY therefore sees every joined column, including those
//! the select list drops.

use std::cmp::Ordering;

use crate::query::ast::{OrderKey, Predicate, SelectItem};
use crate::query::errors::Result;
use crate::query::predicate::{bind, BoundPredicate};
use crate::query::relation::{Relation, Tuple};
use crate::query::schema::Schema;
use crate::query::value::Value;

/// ORDER BY keys resolved to positions.
#[derive(Clone, Debug, Default)]
pub struct SortKeys {
    keys: Vec<(usize, bool)>,
}

impl SortKeys {
    /// Resolves `keys` against `schema`.
    pub fn bind(schema: &Schema, keys: &[OrderKey]) -> Result<Self> {
        let keys = keys
            .iter()
            .map(|key| -> Result<(usize, bool)> {
                Ok((schema.resolve(&key.column, "ORDER BY")?, key.descending))
            })
            .collect::<Result<_>>()?;
        Ok(Self { keys })
    }

    /// Returns `true` when there is nothing to sort on.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Stable sort; NULLs go last in both directions.
    pub fn sort(&self, tuples: &mut [Tuple]) {
        if self.keys.is_empty() {
            return;
        }
        tuples.sort_by(|a, b| {
            self.keys
                .iter()
                .map(|&(idx, descending)| compare(&a[idx], &b[idx], descending))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
}

fn compare(a: &Value, b: &Value, descending: bool) -> Ordering {
    if descending && !a.is_null() && !b.is_null() {
        b.order_cmp(a)
    } else {
        a.order_cmp(b)
    }
}

/// Select list resolved to positions, with its output schema.
#[derive(Clone, Debug)]
pub struct Projection {
    schema: Schema,
    positions: Vec<usize>,
}

impl Projection {
    /// Resolves `select` against `schema`. An empty list behaves like `*`.
    pub fn bind(schema: &Schema, select: &[SelectItem]) -> Result<Self> {
        let mut columns = Vec::new();
        let mut positions = Vec::new();
        let all = [SelectItem::Wildcard];
        let items = if select.is_empty() { &all[..] } else { select };
        for item in items {
            match item {
                SelectItem::Wildcard => {
                    columns.extend(schema.columns().iter().cloned());
                    positions.extend(0..schema.len());
                }
                SelectItem::Column { column, alias } => {
                    let idx = schema.resolve(column, "select list")?;
                    let mut out = schema.column(idx).clone();
                    if let Some(alias) = alias {
                        out.name = alias.clone();
                        out.qualifiers.clear();
                    }
                    columns.push(out);
                    positions.push(idx);
                }
            }
        }
        Ok(Self {
            schema: Schema::new(columns),
            positions,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Builds the output tuple.
    pub fn apply(&self, tuple: &[Value]) -> Tuple {
        self.positions.iter().map(|&idx| tuple[idx].clone()).collect()
    }
}

/// Keeps the tuples for which `predicate` is TRUE.
pub fn filter(relation: &Relation, predicate: &Predicate) -> Result<Relation> {
    let bound = bind(predicate, relation.schema(), "WHERE clause")?;
    let tuples = filter_tuples(&bound, relation.tuples())?;
    Ok(Relation::derived(relation.schema().clone(), tuples))
}

fn filter_tuples(bound: &BoundPredicate, tuples: &[Tuple]) -> Result<Vec<Tuple>> {
    let mut kept = Vec::new();
    for tuple in tuples {
        if bound.evaluate_tuple(tuple)?.is_true() {
            kept.push(tuple.clone());
        }
    }
    Ok(kept)
}

/// Stable sort on `keys`.
pub fn order_by(relation: &Relation, keys: &[OrderKey]) -> Result<Relation> {
    let sort = SortKeys::bind(relation.schema(), keys)?;
    let mut tuples = relation.tuples().to_vec();
    sort.sort(&mut tuples);
    Ok(Relation::derived(relation.schema().clone(), tuples))
}

/// Applies the select list.
pub fn project(relation: &Relation, select: &[SelectItem]) -> Result<Relation> {
    let projection = Projection::bind(relation.schema(), select)?;
    let tuples = relation
        .tuples()
        .iter()
        .map(|t| projection.apply(t))
        .collect();
    Ok(Relation::derived(projection.schema, tuples))
}

/// WHERE, then ORDER BY, then the select list. Every reference is resolved
/// before the first tuple is evaluated.
pub fn apply(
    relation: &Relation,
    predicate: Option<&Predicate>,
    keys: &[OrderKey],
    select: &[SelectItem],
) -> Result<Relation> {
    let schema = relation.schema();
    let bound = predicate
        .map(|p| bind(p, schema, "WHERE clause"))
        .transpose()?;
    let sort = SortKeys::bind(schema, keys)?;
    let projection = Projection::bind(schema, select)?;

    let mut tuples = match &bound {
        Some(bound) => filter_tuples(bound, relation.tuples())?,
        None => relation.tuples().to_vec(),
    };
    sort.sort(&mut tuples);
    let tuples = tuples.iter().map(|t| projection.apply(t)).collect();
    Ok(Relation::derived(projection.schema, tuples))
}
