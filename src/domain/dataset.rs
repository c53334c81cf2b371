// Dataset domain model - immutable, schema-checked tables
use super::error::ReportError;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Logical name of a dataset, resolved to `<group>/<name>.<ext>` by the loader
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetKey {
    pub group: Option<String>,
    pub name: String,
}

impl DatasetKey {
    pub fn new(group: Option<String>, name: String) -> Self {
        Self { group, name }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}/{}", group, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used for grouping, legends and region joins
    pub fn label(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Float(_) => serializer.serialize_unit(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    key: DatasetKey,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset from raw string records, inferring a kind per column.
    ///
    /// A column is `Integer` when every non-empty cell parses as `i64`, `Float`
    /// when every non-empty cell parses as `f64`, and `Text` otherwise. Empty
    /// cells become `Value::Null`.
    pub fn from_records(
        key: DatasetKey,
        headers: Vec<String>,
        records: Vec<Vec<String>>,
    ) -> Result<Self, ReportError> {
        let mut seen = HashSet::new();
        for header in &headers {
            if header.trim().is_empty() {
                return Err(ReportError::SchemaMismatch {
                    key: key.to_string(),
                    detail: "header contains an empty column name".to_string(),
                });
            }
            if !seen.insert(header.as_str()) {
                return Err(ReportError::SchemaMismatch {
                    key: key.to_string(),
                    detail: format!("duplicate column {}", header),
                });
            }
        }

        for (line, record) in records.iter().enumerate() {
            if record.len() != headers.len() {
                return Err(ReportError::SchemaMismatch {
                    key: key.to_string(),
                    detail: format!(
                        "row {} has {} fields, header has {}",
                        line + 1,
                        record.len(),
                        headers.len()
                    ),
                });
            }
        }

        let kinds: Vec<ColumnKind> = (0..headers.len())
            .map(|idx| infer_kind(records.iter().map(|r| r[idx].as_str())))
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| parse_cell(cell, *kind))
                    .collect()
            })
            .collect();

        let columns = headers
            .into_iter()
            .zip(kinds)
            .map(|(name, kind)| Column { name, kind })
            .collect();

        Ok(Self { key, columns, rows })
    }

    pub fn key(&self) -> &DatasetKey {
        &self.key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ReportError> {
        self.column_index(name).ok_or_else(|| ReportError::ColumnMissing {
            key: self.key.to_string(),
            column: name.to_string(),
        })
    }

    /// Like `require_column`, but the column must also hold numbers
    pub fn require_numeric(&self, name: &str) -> Result<usize, ReportError> {
        let idx = self.require_column(name)?;
        if self.columns[idx].kind.is_numeric() || self.column_is_empty(idx) {
            Ok(idx)
        } else {
            Err(ReportError::SchemaMismatch {
                key: self.key.to_string(),
                detail: format!("column {} is not numeric", name),
            })
        }
    }

    pub fn kind_of(&self, idx: usize) -> ColumnKind {
        self.columns[idx].kind
    }

    /// Same schema, different rows
    pub fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            key: self.key.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    fn column_is_empty(&self, idx: usize) -> bool {
        self.rows.iter().all(|r| r[idx].is_null())
    }
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && cell.parse::<f64>().is_err() {
            return ColumnKind::Text;
        }
    }
    kind
}

fn parse_cell(cell: &str, kind: ColumnKind) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => trimmed.parse().map(Value::Int).unwrap_or(Value::Null),
        ColumnKind::Float => trimmed.parse().map(Value::Float).unwrap_or(Value::Null),
        ColumnKind::Text => Value::Text(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> DatasetKey {
        DatasetKey::new(None, "c1_q1".to_string())
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key().to_string(), "c1_q1");
        let grouped = DatasetKey::new(Some("case1".to_string()), "q1".to_string());
        assert_eq!(grouped.to_string(), "case1/q1");
    }

    #[test]
    fn test_kind_inference() {
        let dataset = Dataset::from_records(
            key(),
            strings(&["State", "Year", "Amount", "Sparse"]),
            vec![
                strings(&["Goa", "2020", "10.5", ""]),
                strings(&["Assam", "2021", "7", "3"]),
            ],
        )
        .unwrap();

        let kinds: Vec<ColumnKind> = dataset.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Text, ColumnKind::Integer, ColumnKind::Float, ColumnKind::Integer]
        );
        assert_eq!(dataset.rows()[0][3], Value::Null);
        assert_eq!(dataset.rows()[1][2], Value::Float(7.0));
    }

    #[test]
    fn test_ragged_rows_are_schema_mismatch() {
        let err = Dataset::from_records(
            key(),
            strings(&["State", "Amount"]),
            vec![strings(&["Goa"])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
    }

    #[test]
    fn test_duplicate_header_is_schema_mismatch() {
        let err = Dataset::from_records(key(), strings(&["State", "State"]), vec![]).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
    }

    #[test]
    fn test_require_column() {
        let dataset = Dataset::from_records(
            key(),
            strings(&["State", "Amount"]),
            vec![strings(&["Goa", "1"])],
        )
        .unwrap();

        assert_eq!(dataset.require_column("Amount").unwrap(), 1);
        let err = dataset.require_column("Year").unwrap_err();
        assert_eq!(
            err,
            ReportError::ColumnMissing {
                key: "c1_q1".to_string(),
                column: "Year".to_string()
            }
        );
        assert_eq!(dataset.require_numeric("State").unwrap_err().kind(), "SchemaMismatch");
    }

    #[test]
    fn test_value_serialization() {
        let values = vec![
            Value::Null,
            Value::Int(3),
            Value::Float(f64::NAN),
            Value::Text("Goa".to_string()),
        ];
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[null,3,null,"Goa"]"#);
    }
}
