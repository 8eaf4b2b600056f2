//! Column and schema descriptions, plus name resolution against them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::query::ast::ColumnRef;
use crate::query::errors::{QueryError, Result};

/// Declared domain of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 64-bit integers.
    Integer,
    /// Exact decimals.
    Decimal,
    /// UTF-8 strings.
    Text,
    /// Calendar dates.
    Date,
}

impl DataType {
    /// Returns `true` when values of the two domains may be compared.
    ///
    /// Integer and decimal widen into one numeric domain; every other pair must
    /// match exactly.
    pub fn comparable_with(self, other: DataType) -> bool {
        (self.is_numeric() && other.is_numeric()) || self == other
    }

    fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }

    /// Type of a column that coalesces values of `self` and `other`.
    pub(crate) fn unify(self, other: DataType) -> DataType {
        if self == other {
            self
        } else {
            DataType::Decimal
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Text => "text",
            DataType::Date => "date",
        })
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "bigint" => Ok(DataType::Integer),
            "decimal" | "numeric" => Ok(DataType::Decimal),
            "text" | "string" | "varchar" => Ok(DataType::Text),
            "date" => Ok(DataType::Date),
            other => Err(format!("unknown column type '{other}'")),
        }
    }
}

/// Column of a schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as declared.
    pub name: String,
    /// Declared domain.
    pub data_type: DataType,
    /// Relation names or aliases that may qualify a reference to this column.
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

impl Column {
    /// Creates an unqualified column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            qualifiers: Vec::new(),
        }
    }

    /// Returns `true` when the column answers to `name` (ASCII case-insensitive).
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn answers_to(&self, qualifier: &str) -> bool {
        self.qualifiers
            .iter()
            .any(|q| q.eq_ignore_ascii_case(qualifier))
    }

    fn matches(&self, reference: &ColumnRef) -> bool {
        self.has_name(&reference.name)
            && reference
                .qualifier
                .as_deref()
                .map_or(true, |q| self.answers_to(q))
    }

    /// Merges the qualifiers of `other` into this column, skipping duplicates.
    pub(crate) fn absorb_qualifiers(&mut self, other: &Column) {
        for q in &other.qualifiers {
            if !self.answers_to(q) {
                self.qualifiers.push(q.clone());
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.qualifiers.first() {
            Some(q) => write!(f, "{q}.{}:{}", self.name, self.data_type),
            None => write!(f, "{}:{}", self.name, self.data_type),
        }
    }
}

/// Ordered list of columns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema from the supplied columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, DataType)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, ty)| Column::new(name, ty))
                .collect(),
        )
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column at `idx`.
    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Replaces every column's qualifiers with `qualifier`.
    pub fn qualified(mut self, qualifier: &str) -> Self {
        for column in &mut self.columns {
            column.qualifiers = vec![qualifier.to_owned()];
        }
        self
    }

    /// Rejects schemas that declare the same column name twice.
    pub fn ensure_unique_names(&self, relation: &str) -> Result<()> {
        for (idx, column) in self.columns.iter().enumerate() {
            if self.columns[..idx].iter().any(|c| c.has_name(&column.name)) {
                return Err(QueryError::schema_violation(
                    relation,
                    format!("column '{}' declared more than once", column.name),
                ));
            }
        }
        Ok(())
    }

    /// Resolves a possibly-qualified column reference to its position.
    pub fn resolve(&self, reference: &ColumnRef, context: &'static str) -> Result<usize> {
        let mut found = None;
        for (idx, column) in self.columns.iter().enumerate() {
            if !column.matches(reference) {
                continue;
            }
            if found.is_some() {
                return Err(QueryError::ambiguous_column(reference.to_string(), context));
            }
            found = Some(idx);
        }
        found.ok_or_else(|| QueryError::missing_column(reference.to_string(), context))
    }

    /// Positions of every column named `name`, ignoring qualifiers.
    pub fn positions_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.has_name(name))
            .map(|(idx, _)| idx)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(")")
    }
}
