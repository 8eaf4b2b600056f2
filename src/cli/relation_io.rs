//! Typed relations stored as CSV.
//!
//! The header row declares each column as `name:type`, where `type` is one of
//! `integer`, `decimal`, `text`, or `date` (default `text`). An empty field is
//! NULL; every other field must parse as its column's type.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rust_decimal::Decimal;
use tracing::debug;

use crate::cli::CliError;
use crate::query::{parse_date, DataType, Query, Relation, Schema, Tuple, Value};
use crate::query::schema::Column;

/// Loads the CSV file at `path` as relation `name`.
pub fn load_relation(name: &str, path: &Path) -> Result<Relation, CliError> {
    let file = fs::File::open(path).map_err(|err| {
        CliError::Message(format!("failed to open {}: {err}", path.display()))
    })?;
    let relation = read_relation(name, file)?;
    debug!(
        relation = name,
        path = %path.display(),
        rows = relation.len(),
        "csv.load"
    );
    Ok(relation)
}

/// Reads a relation from CSV text.
pub fn read_relation<R: io::Read>(name: &str, input: R) -> Result<Relation, CliError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.clone();
    let schema = parse_header(&headers)?;
    let mut tuples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != schema.len() {
            return Err(CliError::Message(format!(
                "{name}: row {} has {} fields but the header declares {}",
                row + 1,
                record.len(),
                schema.len()
            )));
        }
        let tuple = record
            .iter()
            .zip(schema.columns())
            .map(|(raw, column)| parse_field(raw, column.data_type).map_err(|detail| {
                CliError::Message(format!(
                    "{name}: row {} column '{}': {detail}",
                    row + 1,
                    column.name
                ))
            }))
            .collect::<Result<Tuple, CliError>>()?;
        tuples.push(tuple);
    }
    Ok(Relation::new(name, schema, tuples)?)
}

fn parse_header(headers: &StringRecord) -> Result<Schema, CliError> {
    let columns = headers
        .iter()
        .map(|cell| -> Result<Column, String> {
            let (name, ty) = match cell.split_once(':') {
                Some((name, ty)) => (name.trim(), DataType::from_str(ty)?),
                None => (cell.trim(), DataType::Text),
            };
            if name.is_empty() {
                return Err("empty column name in header".to_string());
            }
            Ok(Column::new(name, ty))
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Schema::new(columns))
}

fn parse_field(raw: &str, ty: DataType) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    match ty {
        DataType::Text => Ok(Value::String(raw.to_string())),
        DataType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|err| format!("invalid integer '{raw}': {err}")),
        DataType::Decimal => Decimal::from_str(raw.trim())
            .map(Value::Decimal)
            .map_err(|err| format!("invalid decimal '{raw}': {err}")),
        DataType::Date => parse_date(raw)
            .map(Value::Date)
            .ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD")),
    }
}

/// Writes `tuples` as CSV with a `name:type` header.
pub fn write_relation<W: io::Write>(
    schema: &Schema,
    tuples: &[Tuple],
    output: W,
) -> Result<(), CliError> {
    let mut writer = WriterBuilder::new().from_writer(output);
    let header: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.data_type))
        .collect();
    writer.write_record(&header)?;
    for tuple in tuples {
        writer.write_record(tuple.iter().map(|v| match v {
            Value::Null => String::new(),
            other => other.to_string(),
        }))?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses a `name=path` table argument.
pub fn parse_table_arg(arg: &str) -> Result<(String, PathBuf), CliError> {
    match arg.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(CliError::Message(format!(
            "invalid table '{arg}', expected name=path.csv"
        ))),
    }
}

/// Reads a plan file; `.toml` files are parsed as TOML, everything else as JSON.
pub fn load_plan(path: &Path) -> Result<Query, CliError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        CliError::Message(format!("failed to read plan {}: {err}", path.display()))
    })?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}
