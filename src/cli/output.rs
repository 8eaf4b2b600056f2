use serde_json::{json, Value as Json};

use crate::query::{Schema, Tuple, Value};

/// Column headings: the bare name, or `qualifier.name` when the bare name is
/// shared by another output column.
fn headings(schema: &Schema) -> Vec<String> {
    schema
        .columns()
        .iter()
        .map(|column| {
            let shared = schema.positions_of(&column.name).nth(1).is_some();
            match column.qualifiers.first() {
                Some(q) if shared => format!("{q}.{}", column.name),
                _ => column.name.clone(),
            }
        })
        .collect()
}

/// Renders rows as an aligned text table followed by a row count.
pub fn render_text(schema: &Schema, rows: &[Tuple]) -> String {
    let headings = headings(schema);
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();
    let widths: Vec<usize> = headings
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            cells
                .iter()
                .map(|row| row[idx].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let line = |values: &[String], out: &mut String| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect();
        out.push_str(padded.join(" | ").trim_end());
        out.push('\n');
    };
    line(&headings, &mut out);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &cells {
        line(row, &mut out);
    }
    let noun = if rows.len() == 1 { "row" } else { "rows" };
    out.push_str(&format!("({} {noun})\n", rows.len()));
    out
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Int(v) => json!(v),
        Value::Decimal(v) => Json::String(v.to_string()),
        Value::String(v) => Json::String(v.clone()),
        Value::Date(_) => Json::String(value.to_string()),
    }
}

/// Renders rows as `{"columns": [...], "rows": [[...], ...]}`.
///
/// Decimals and dates are emitted as strings so no precision is lost.
pub fn render_json(schema: &Schema, rows: &[Tuple]) -> Json {
    let columns: Vec<Json> = headings(schema)
        .into_iter()
        .zip(schema.columns())
        .map(|(name, column)| json!({ "name": name, "type": column.data_type }))
        .collect();
    let rows: Vec<Json> = rows
        .iter()
        .map(|row| Json::Array(row.iter().map(to_json).collect()))
        .collect();
    json!({ "columns": columns, "rows": rows })
}

/// One line per column: `name type [qualifiers]`.
pub fn render_schema(name: &str, schema: &Schema, rows: usize) -> String {
    let mut out = format!("{name} ({rows} rows)\n");
    for column in schema.columns() {
        out.push_str(&format!(
            "  {:<16} {:<8} [{}]\n",
            column.name,
            column.data_type.to_string(),
            column.qualifiers.join(", ")
        ));
    }
    out
}
