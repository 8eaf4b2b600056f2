//! Immutable relations: a schema plus an ordered sequence of tuples.

use std::collections::BTreeMap;
use std::fmt;

use crate::query::ast::ColumnRef;
use crate::query::errors::{QueryError, Result};
use crate::query::schema::Schema;
use crate::query::value::Value;

/// One row, positionally aligned with its relation's schema.
pub type Tuple = Vec<Value>;

const DERIVED: &str = "<derived>";

/// Named, schema-typed, ordered sequence of tuples.
///
/// A relation is never mutated after construction; operators always produce a
/// fresh relation, and concurrent readers share one through `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    name: Option<String>,
    schema: Schema,
    tuples: Vec<Tuple>,
}

impl Relation {
    /// Builds a base relation from positional tuples.
    ///
    /// Column names must be unique, every tuple must have one value per column,
    /// and every non-null value must belong to its column's domain (integers are
    /// widened into decimal columns). Unqualified columns are qualified by the
    /// relation name.
    pub fn new(name: impl Into<String>, schema: Schema, tuples: Vec<Tuple>) -> Result<Self> {
        let name = name.into();
        schema.ensure_unique_names(&name)?;
        let schema = qualify_unqualified(schema, &name);
        let mut checked = Vec::with_capacity(tuples.len());
        for (row, tuple) in tuples.into_iter().enumerate() {
            if tuple.len() != schema.len() {
                return Err(QueryError::schema_violation(
                    &name,
                    format!(
                        "row {row} has {} values but the schema declares {} columns",
                        tuple.len(),
                        schema.len()
                    ),
                ));
            }
            let mut conformed = Vec::with_capacity(tuple.len());
            for (idx, value) in tuple.into_iter().enumerate() {
                conformed.push(conform(&name, &schema, row, idx, value)?);
            }
            checked.push(conformed);
        }
        Ok(Self {
            name: Some(name),
            schema,
            tuples: checked,
        })
    }

    /// Builds a base relation from name→value records.
    ///
    /// A key that names no column is a [`QueryError::SchemaViolation`]; a
    /// declared column the record omits is NULL.
    pub fn from_records<I, R, K>(name: impl Into<String>, schema: Schema, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let name = name.into();
        let mut tuples = Vec::new();
        for (row, record) in records.into_iter().enumerate() {
            let mut tuple = vec![Value::Null; schema.len()];
            for (key, value) in record {
                let key = key.as_ref();
                let idx = schema.positions_of(key).next().ok_or_else(|| {
                    QueryError::schema_violation(
                        &name,
                        format!("row {row} sets '{key}', which is not a declared column"),
                    )
                })?;
                tuple[idx] = value;
            }
            tuples.push(tuple);
        }
        Self::new(name, schema, tuples)
    }

    /// Wraps operator output without re-validating it.
    pub(crate) fn derived(schema: Schema, tuples: Vec<Tuple>) -> Self {
        Self {
            name: None,
            schema,
            tuples,
        }
    }

    /// Same tuples under a new name; every column is requalified by `name`.
    pub(crate) fn renamed(&self, name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            schema: self.schema.clone().qualified(name),
            tuples: self.tuples.clone(),
        }
    }

    /// Relation name; `None` for operator output.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display name used in logs and errors.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DERIVED)
    }

    /// Schema shared by every tuple.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Tuples in order.
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Consumes the relation and returns its tuples.
    pub fn into_tuples(self) -> Vec<Tuple> {
        self.tuples
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Returns `true` when the relation holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, column: &ColumnRef) -> Result<Vec<&Value>> {
        let idx = self.schema.resolve(column, "column lookup")?;
        Ok(self.tuples.iter().map(|t| &t[idx]).collect())
    }

    /// Tuple `row` as a name→value record. Later duplicates of a name win.
    pub fn record(&self, row: usize) -> Option<BTreeMap<String, Value>> {
        let tuple = self.tuples.get(row)?;
        Some(
            self.schema
                .names()
                .map(str::to_owned)
                .zip(tuple.iter().cloned())
                .collect(),
        )
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} [{} rows]",
            self.display_name(),
            self.schema,
            self.tuples.len()
        )
    }
}

fn qualify_unqualified(schema: Schema, name: &str) -> Schema {
    let columns = schema
        .columns()
        .iter()
        .cloned()
        .map(|mut column| {
            if column.qualifiers.is_empty() {
                column.qualifiers.push(name.to_owned());
            }
            column
        })
        .collect();
    Schema::new(columns)
}

fn conform(relation: &str, schema: &Schema, row: usize, idx: usize, value: Value) -> Result<Value> {
    let column = schema.column(idx);
    let found = value.data_type();
    value.conform_to(column.data_type).ok_or_else(|| {
        QueryError::schema_violation(
            relation,
            format!(
                "row {row} column '{}' expects {} but got {}",
                column.name,
                column.data_type,
                found.map_or_else(|| "null".to_owned(), |ty| ty.to_string())
            ),
        )
    })
}
