//! Table identity, the configured field list, and the positional-to-named
//! row reshape.
//!
//! Tabular query APIs return each row as an ordered array of cells with no
//! field names attached. The names come from [`FieldList`], matched by
//! position; a row whose cell count differs from the field list is rejected
//! rather than mis-labelled.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Fully-qualified `project.dataset.table` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// `project.dataset.table`, without quoting.
    pub fn qualified(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Renders the identifier quoted for GoogleSQL: `` `project.dataset.table` ``.
impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.qualified())
    }
}

/// Ordered field names bound to result positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList(Vec<String>);

/// The four fields of the people table.
pub const DEFAULT_FIELDS: [&str; 4] = ["unique_id", "firstname", "lastname", "email"];

impl Default for FieldList {
    fn default() -> Self {
        Self(DEFAULT_FIELDS.iter().map(|f| (*f).to_owned()).collect())
    }
}

impl FieldList {
    /// Build a field list; `None` when no non-blank names are given.
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_owned())
            .filter(|n| !n.is_empty())
            .collect();
        (!names.is_empty()).then_some(Self(names))
    }

    /// Parse a comma-separated list such as `"unique_id, firstname"`.
    pub fn parse(list: &str) -> Option<Self> {
        Self::new(list.split(','))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names joined with `", "`, as used in a select list.
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

/// One positional row as returned by the query API: `{"f": [{"v": ...}, ...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

/// A result row: field names paired with their values, in field-list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Value of `field`, if the row has it.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// `(field, value)` pairs in field-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Values in field-list order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// Serialized as a JSON object whose keys keep field-list order.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// Read back from the same object form; keys are kept in the order given.
impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of field names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Row, A::Error> {
                let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    cells.push((name, value));
                }
                Ok(Row { cells })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Map every positional row onto `fields`: position 0 gets the first name,
/// position 1 the second, and so on.
pub fn reshape(rows: &[TableRow], fields: &FieldList) -> Result<Vec<Row>> {
    rows.iter().map(|row| reshape_row(row, fields)).collect()
}

fn reshape_row(row: &TableRow, fields: &FieldList) -> Result<Row> {
    if row.f.len() != fields.len() {
        return Err(RelayError::SchemaMismatch {
            expected: fields.len(),
            actual: row.f.len(),
        });
    }
    let cells = fields
        .names()
        .iter()
        .zip(&row.f)
        .map(|(name, cell)| (name.clone(), cell_text(&cell.v)))
        .collect();
    Ok(Row { cells })
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn table_rows(v: Value) -> Vec<TableRow> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn reshape_maps_positions_to_default_fields() {
        let rows = table_rows(json!([
            { "f": [{ "v": "42" }, { "v": "Jane" }, { "v": "Doe" }, { "v": "jane@x.com" }] }
        ]));
        let out = reshape(&rows, &FieldList::default()).unwrap();

        assert_eq!(out.len(), 1);
        let row = &out[0];
        assert_eq!(row.get("unique_id"), Some("42"));
        assert_eq!(row.get("firstname"), Some("Jane"));
        assert_eq!(row.get("lastname"), Some("Doe"));
        assert_eq!(row.get("email"), Some("jane@x.com"));
    }

    #[test]
    fn reshape_keeps_field_order_when_serialized() {
        let rows = table_rows(json!([
            { "f": [{ "v": "42" }, { "v": "Jane" }, { "v": "Doe" }, { "v": "jane@x.com" }] }
        ]));
        let out = reshape(&rows, &FieldList::default()).unwrap();
        assert_eq!(
            serde_json::to_string(&out[0]).unwrap(),
            r#"{"unique_id":"42","firstname":"Jane","lastname":"Doe","email":"jane@x.com"}"#
        );
    }

    #[test]
    fn row_read_back_from_json_keeps_field_order() {
        let fields = FieldList::parse("zeta, alpha").unwrap();
        let rows = table_rows(json!([{ "f": [{ "v": "z" }, { "v": "a" }] }]));
        let out = reshape(&rows, &fields).unwrap();

        let text = serde_json::to_string(&out[0]).unwrap();
        let back: Row = serde_json::from_str(&text).unwrap();
        assert_eq!(back, out[0]);
        assert_eq!(back.iter().map(|(n, _)| n).collect::<Vec<_>>(), ["zeta", "alpha"]);
    }

    #[test]
    fn reshape_rejects_arity_mismatch() {
        let rows = table_rows(json!([{ "f": [{ "v": "42" }, { "v": "Jane" }] }]));
        let err = reshape(&rows, &FieldList::default()).unwrap_err();
        assert!(matches!(
            err,
            RelayError::SchemaMismatch { expected: 4, actual: 2 }
        ));
    }

    #[test]
    fn reshape_stringifies_null_and_numbers() {
        let fields = FieldList::parse("id, score, note").unwrap();
        let rows = table_rows(json!([{ "f": [{ "v": 7 }, { "v": 1.5 }, { "v": null }] }]));
        let out = reshape(&rows, &fields).unwrap();
        assert_eq!(out[0].values().collect::<Vec<_>>(), vec!["7", "1.5", ""]);
    }

    #[test]
    fn reshape_of_no_rows_is_empty() {
        assert!(reshape(&[], &FieldList::default()).unwrap().is_empty());
    }

    #[test]
    fn field_list_parse_trims_and_rejects_blank() {
        let fields = FieldList::parse(" a ,b,, c ").unwrap();
        assert_eq!(fields.names(), &["a", "b", "c"]);
        assert_eq!(fields.joined(), "a, b, c");
        assert!(FieldList::parse(" , ").is_none());
    }

    #[test]
    fn table_ref_display_is_backtick_quoted() {
        let table = TableRef::new("proj", "crm", "people");
        assert_eq!(table.qualified(), "proj.crm.people");
        assert_eq!(table.to_string(), "`proj.crm.people`");
    }
}
