use std::{borrow::Cow, fmt};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    ser::SerializeMap,
};
use itertools::Itertools;
use serde_json::{Map, Number, Value as JsonValue};

/// Cell value of an ingested record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Arrays, objects and integers outside `i64`, kept verbatim for export.
    Json(JsonValue),
    Absent,
}

impl Value {
    /// Text form used for filtering, grouping and searching. `None` for absent values.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Integer(i) => Some(Cow::Owned(i.to_string())),
            Value::Float(f) => Some(Cow::Owned(format_float(*f))),
            Value::Boolean(b) => Some(Cow::Owned(b.to_string())),
            Value::Json(value) => Some(Cow::Owned(value.to_string())),
            Value::Absent => None,
        }
    }

    /// Absent values and empty strings carry nothing worth displaying.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Absent => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Absent,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None if n.is_u64() => Value::Json(JsonValue::Number(n)),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Absent),
            },
            JsonValue::String(s) => Value::Text(s),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => Value::Json(other),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Integer(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Json(value) => value.clone(),
            Value::Absent => JsonValue::Null,
        }
    }

    /// CSV cells carry no type; empty cells are absent.
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            Value::Absent
        } else {
            Value::Text(cell.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// One source row: column names in declaration order, each with a scalar value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut record = RawRecord::new();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    pub fn from_json_object(object: Map<String, JsonValue>) -> Self {
        Self {
            fields: object
                .into_iter()
                .map(|(name, value)| (name, Value::from_json(value)))
                .collect(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            object.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Stringified value of `column`; `None` when the column is missing or absent.
    pub fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).and_then(Value::as_text)
    }

    /// Like [`RawRecord::text`] but also treats empty strings as missing.
    pub fn display_text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column)
            .filter(|value| !value.is_blank())
            .and_then(Value::as_text)
    }

    /// Replaces the value of an existing column in place, or appends a new column.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for RawRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let object = Map::<String, JsonValue>::deserialize(deserializer)?;
        Ok(RawRecord::from_json_object(object))
    }
}

/// The working record collection of one load. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    records: Vec<RawRecord>,
}

impl Dataset {
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&RawRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns of the first record. Datasets are assumed column-homogeneous.
    pub fn columns(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|record| record.columns().collect())
            .unwrap_or_default()
    }

}

/// Union of the records' columns in first-seen order.
pub fn column_union<'a, I>(records: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    records
        .into_iter()
        .flat_map(RawRecord::columns)
        .unique()
        .collect()
}
