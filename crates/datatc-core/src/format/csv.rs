//! Delimited text (CSV/TSV) codec.
//!
//! Quoting follows RFC 4180: fields containing the delimiter, a quote or a
//! line break are wrapped in double quotes, and embedded quotes are doubled.

use std::fs;
use std::path::Path;

use crate::data::{Data, Table};
use crate::error::DataError;
use crate::kwargs::Kwargs;

use super::registry::Codec;

#[derive(Debug, Clone, Copy)]
pub struct CsvCodec {
    default_delimiter: char,
}

impl CsvCodec {
    pub fn new(default_delimiter: char) -> Self {
        Self { default_delimiter }
    }

    fn delimiter(&self, kwargs: &Kwargs) -> Result<char, DataError> {
        let Some(raw) = kwargs.get_str("delimiter") else {
            return Ok(self.default_delimiter);
        };
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '"' && c != '\n' && c != '\r' => Ok(c),
            _ => Err(DataError::InvalidArgument {
                key: "delimiter".into(),
                reason: format!("expected a single character, got '{raw}'"),
            }),
        }
    }
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self::new(',')
    }
}

impl Codec for CsvCodec {
    fn save(&self, data: &Data, path: &Path, kwargs: &Kwargs) -> Result<(), DataError> {
        let table = data.as_table().ok_or_else(|| {
            DataError::Codec(format!("csv codec cannot store {} payloads", data.kind()))
        })?;
        let delimiter = self.delimiter(kwargs)?;
        let header = kwargs.get_or("header", true)?;
        fs::write(path, write_table(table, delimiter, header))?;
        Ok(())
    }

    fn load(&self, path: &Path, kwargs: &Kwargs) -> Result<Data, DataError> {
        let delimiter = self.delimiter(kwargs)?;
        let header = kwargs.get_or("header", true)?;
        let content = fs::read_to_string(path)?;
        let records = parse_records(&content, delimiter)?;
        Ok(Data::Table(into_table(records, header)))
    }
}

fn into_table(mut records: Vec<Vec<String>>, header: bool) -> Table {
    if header && !records.is_empty() {
        let columns = records.remove(0);
        return Table::new(columns).with_rows(records);
    }
    let width = records.iter().map(Vec::len).max().unwrap_or(0);
    Table::new((0..width).map(|i| i.to_string()).collect()).with_rows(records)
}

/// Split delimited text into records of fields.
pub fn parse_records(content: &str, delimiter: char) -> Result<Vec<Vec<String>>, DataError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DataError::Codec("unterminated quoted field".into()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

fn write_table(table: &Table, delimiter: char, header: bool) -> String {
    let mut out = String::new();
    if header {
        write_record(&mut out, &table.columns, delimiter);
    }
    for row in &table.rows {
        write_record(&mut out, row, delimiter);
    }
    out
}

fn write_record(out: &mut String, fields: &[String], delimiter: char) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        let needs_quotes = field.contains(delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r');
        if needs_quotes {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}
