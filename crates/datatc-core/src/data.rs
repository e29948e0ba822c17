use serde::{Deserialize, Serialize};

/// The payload carried by a file or a self-aware artifact.
///
/// Codecs decide which variant they produce; transforms are free to change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Data {
    Text(String),
    Json(serde_json::Value),
    Table(Table),
    Bytes(Vec<u8>),
}

impl Data {
    /// Short name of the variant, used in listings and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Table(_) => "table",
            Self::Bytes(_) => "bytes",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Data {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<Table> for Data {
    fn from(t: Table) -> Self {
        Self::Table(t)
    }
}

impl From<Vec<u8>> for Data {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// A header plus string rows, as read from delimited text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom. Short rows yield "".
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Rewrite every cell of a column. Returns false if the column does not exist.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(&str) -> String,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = f(cell);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec!["col_1".into(), "col_2".into()]).with_rows(vec![
            vec!["1".into(), "2".into()],
            vec!["3".into(), "4".into()],
        ])
    }

    #[test]
    fn test_column_access() {
        let t = sample();
        assert_eq!(t.column("col_2"), Some(vec!["2", "4"]));
        assert_eq!(t.column("missing"), None);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_map_column() {
        let mut t = sample();
        assert!(t.map_column("col_1", |v| format!("{v}0")));
        assert_eq!(t.column("col_1"), Some(vec!["10", "30"]));
        assert!(!t.map_column("nope", |v| v.to_string()));
    }

    #[test]
    fn test_data_serde_tagging() {
        let d = Data::Text("hello".into());
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"kind":"text","value":"hello"}"#);
        let back: Data = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert_eq!(Data::from(sample()).kind(), "table");
    }
}
