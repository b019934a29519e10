use std::collections::HashMap;
use std::io::Write;

use crate::error::ReconError;
use crate::model::{Column, Schema, Table, Value, ValueType};

/// Parse a box-office style number:
/// - Strip `$`, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if anything else remains after stripping
pub fn parse_gross(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if is_negative { -value } else { value })
}

/// Load a CSV document (header row required) into a table.
///
/// Column types come from `types` when listed there; otherwise a column is
/// `Number` when every non-empty cell parses with [`parse_gross`], and
/// `Text` when not. Empty cells become null.
pub fn load_csv_table(csv_data: &str, types: &HashMap<String, ValueType>) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    for name in types.keys() {
        if !headers.contains(name) {
            return Err(ReconError::schema(name, "typed column not in CSV header"));
        }
    }

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        cells.push(record.iter().map(|c| c.to_string()).collect());
    }

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let ty = types.get(name).copied().unwrap_or_else(|| {
                let numeric = cells
                    .iter()
                    .map(|row| row[i].as_str())
                    .filter(|c| !c.trim().is_empty())
                    .all(|c| parse_gross(c).is_some());
                let any_value = cells.iter().any(|row| !row[i].trim().is_empty());
                if numeric && any_value {
                    ValueType::Number
                } else {
                    ValueType::Text
                }
            });
            Column::new(name.clone(), ty)
        })
        .collect();

    let mut rows = Vec::with_capacity(cells.len());
    for (row_idx, row) in cells.into_iter().enumerate() {
        let values = row
            .into_iter()
            .zip(&columns)
            .map(|(cell, col)| parse_cell(cell, col, row_idx))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }

    Table::new(Schema::new(columns)?, rows)
}

fn parse_cell(cell: String, column: &Column, row: usize) -> Result<Value, ReconError> {
    if cell.trim().is_empty() {
        return Ok(Value::Null);
    }
    match column.ty {
        ValueType::Text => Ok(Value::Text(cell)),
        ValueType::Number => parse_gross(&cell)
            .map(Value::number)
            .ok_or_else(|| ReconError::ValueParse {
                column: column.name.clone(),
                row,
                value: cell,
            }),
    }
}

/// Write `table` as CSV with a header row; nulls become empty cells.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<(), ReconError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.schema().columns().iter().map(|c| c.name.as_str()))?;
    for row in table.rows() {
        out.write_record(row.values().iter().map(|v| v.to_string()))?;
    }
    out.flush().map_err(|e| ReconError::Io(e.to_string()))?;
    Ok(())
}
