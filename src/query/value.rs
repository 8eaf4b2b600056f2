//! Canonical nullable scalar shared by relations, predicates, and the join
//! evaluator.
//!
//! Comparison follows SQL three-valued semantics: any comparison that involves
//! `NULL` is [`Truth::Unknown`]. Integers and decimals form one numeric domain;
//! every other pairing of distinct domains is a [`QueryError::TypeMismatch`].

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::query::errors::{QueryError, Result};
use crate::query::schema::DataType;
use crate::query::truth::Truth;

/// Typed value tagged with explicit type information so plan files and JSON
/// output stay unambiguous.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Signed 64-bit integer.
    Int(i64),
    /// Exact decimal number.
    Decimal(Decimal),
    /// UTF-8 string.
    String(String),
    /// Calendar date, serialized as `YYYY-MM-DD`.
    #[serde(with = "serde_date")]
    Date(Date),
}

mod serde_date {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = super::format_date(date).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = Date;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a date string formatted as YYYY-MM-DD")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                super::parse_date(value)
                    .ok_or_else(|| E::custom(format!("invalid date literal '{value}'")))
            }
        }

        deserializer.deserialize_str(DateVisitor)
    }
}

/// Parses a `YYYY-MM-DD` date literal.
pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]")).ok()
}

fn format_date(date: &Date) -> std::result::Result<String, time::error::Format> {
    date.format(format_description!("[year]-[month]-[day]"))
}

/// Hashable projection of a non-null value used as a hash-join key.
///
/// Numeric values are normalized to a single decimal representation so that
/// `Int(1)` and `Decimal(1.0)` land in the same bucket, mirroring [`Value::sql_eq`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyValue {
    /// Integer or decimal, normalized.
    Number(Decimal),
    /// String value.
    Text(String),
    /// Date value.
    Date(Date),
}

impl Value {
    /// Returns the domain of the value, or `None` for `NULL`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(DataType::Integer),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::String(_) => Some(DataType::Text),
            Value::Date(_) => Some(DataType::Date),
        }
    }

    /// Returns `true` when the value is `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value into the representation stored in a column of type
    /// `ty`, widening integers for decimal columns. Returns `None` when the value
    /// does not belong to the column's domain.
    pub fn conform_to(self, ty: DataType) -> Option<Value> {
        match (self, ty) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Int(v), DataType::Integer) => Some(Value::Int(v)),
            (Value::Int(v), DataType::Decimal) => Some(Value::Decimal(Decimal::from(v))),
            (Value::Decimal(v), DataType::Decimal) => Some(Value::Decimal(v)),
            (Value::String(v), DataType::Text) => Some(Value::String(v)),
            (Value::Date(v), DataType::Date) => Some(Value::Date(v)),
            _ => None,
        }
    }

    /// Compares two values under SQL semantics.
    ///
    /// Returns `Ok(None)` when either side is `NULL` (the comparison is unknown)
    /// and [`QueryError::TypeMismatch`] when the domains are incompatible.
    pub fn sql_cmp(&self, other: &Value, context: &'static str) -> Result<Option<Ordering>> {
        let ordering = match (self, other) {
            (Value::Null, _) | (_, Value::Null) => return Ok(None),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Decimal(b)) => Decimal::from(*a).cmp(b),
            (Value::Decimal(a), Value::Int(b)) => a.cmp(&Decimal::from(*b)),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (left, right) => {
                return Err(QueryError::TypeMismatch {
                    left: left.data_type().unwrap_or(DataType::Text),
                    right: right.data_type().unwrap_or(DataType::Text),
                    context,
                })
            }
        };
        Ok(Some(ordering))
    }

    /// SQL equality: `Unknown` when either side is `NULL`.
    pub fn sql_eq(&self, other: &Value, context: &'static str) -> Result<Truth> {
        Ok(match self.sql_cmp(other, context)? {
            None => Truth::Unknown,
            Some(ordering) => Truth::from(ordering == Ordering::Equal),
        })
    }

    /// Total order used by ORDER BY: domain order within a type, numeric across
    /// integer/decimal, and `NULL` after every non-null value.
    pub fn order_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            _ => match self.sql_cmp(other, "ORDER BY") {
                Ok(Some(ordering)) => ordering,
                _ => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Int(_) | Value::Decimal(_) => 0,
            Value::String(_) => 1,
            Value::Date(_) => 2,
            Value::Null => 3,
        }
    }

    /// Returns the hash-join key for the value, or `None` for `NULL`.
    pub fn key(&self) -> Option<KeyValue> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(KeyValue::Number(Decimal::from(*v).normalize())),
            Value::Decimal(v) => Some(KeyValue::Number(v.normalize())),
            Value::String(v) => Some(KeyValue::Text(v.clone())),
            Value::Date(v) => Some(KeyValue::Date(*v)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Date(v) => match format_date(v) {
                Ok(text) => f.write_str(&text),
                Err(_) => write!(f, "{v}"),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
