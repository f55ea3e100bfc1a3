//! Payload classification and normalization.
//!
//! A payload is either a flat sequence of records, or a set of named record
//! sequences (one per sheet, category or input file). Normalization flattens
//! groups and injects the synthetic device-type column; anything else passes
//! through untouched and is rejected when a [`Dataset`] is built from it.

use log::debug;
use serde_json::Value as JsonValue;

use crate::{
    config::EngineConfig,
    error::{EngineError, EngineResult},
    record::{Dataset, RawRecord, Value},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Records(Vec<RawRecord>),
    Groups(Vec<(String, Vec<RawRecord>)>),
    Unrecognized(JsonValue),
}

impl Payload {
    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|err| EngineError::malformed(format!("JSON parse error: {err}")))?;
        Ok(Self::from_json(value))
    }

    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Array(items) => match records_from_items(items) {
                Ok(records) => Payload::Records(records),
                Err(items) => Payload::Unrecognized(JsonValue::Array(items)),
            },
            JsonValue::Object(map) if map.values().any(JsonValue::is_array) => {
                if !map.values().filter_map(JsonValue::as_array).all(|items| {
                    items.iter().all(JsonValue::is_object)
                }) {
                    return Payload::Unrecognized(JsonValue::Object(map));
                }
                let mut groups = Vec::new();
                for (name, value) in map {
                    // Non-array members of a group object are ignored.
                    if let JsonValue::Array(items) = value
                        && let Ok(records) = records_from_items(items)
                    {
                        groups.push((name, records));
                    }
                }
                Payload::Groups(groups)
            }
            other => Payload::Unrecognized(other),
        }
    }

    pub fn record_count(&self) -> Option<usize> {
        match self {
            Payload::Records(records) => Some(records.len()),
            Payload::Groups(groups) => Some(groups.iter().map(|(_, r)| r.len()).sum()),
            Payload::Unrecognized(_) => None,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Payload::Records(_) => "records",
            Payload::Groups(_) => "groups",
            Payload::Unrecognized(_) => "unrecognized",
        }
    }
}

fn records_from_items(items: Vec<JsonValue>) -> Result<Vec<RawRecord>, Vec<JsonValue>> {
    if !items.iter().all(JsonValue::is_object) {
        return Err(items);
    }
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            JsonValue::Object(map) => Some(RawRecord::from_json_object(map)),
            _ => None,
        })
        .collect())
}

/// Flattens groups and fills the synthetic device-type column.
/// Running it again on its own output changes nothing.
pub fn normalize(payload: Payload, config: &EngineConfig) -> Payload {
    let topic = config.plan_topic_column.as_str();
    let target = config.device_type_column.as_str();
    match payload {
        Payload::Records(mut records) => {
            let every_record_has_topic = !records.is_empty()
                && records
                    .iter()
                    .all(|record| record.display_text(topic).is_some());
            if every_record_has_topic {
                debug!("Copying '{topic}' into synthetic column '{target}'");
                for record in &mut records {
                    if let Some(value) = record.get(topic).cloned() {
                        record.set(target, value);
                    }
                }
            }
            Payload::Records(records)
        }
        Payload::Groups(groups) => {
            let mut flattened = Vec::with_capacity(groups.iter().map(|(_, r)| r.len()).sum());
            for (group, records) in groups {
                debug!("Flattening group '{group}' ({} record(s))", records.len());
                for mut record in records {
                    let value = match record.get(topic) {
                        Some(value) if !value.is_blank() => value.clone(),
                        _ => Value::Text(group.clone()),
                    };
                    record.set(target, value);
                    flattened.push(record);
                }
            }
            Payload::Records(flattened)
        }
        unrecognized @ Payload::Unrecognized(_) => unrecognized,
    }
}

/// Normalizes `payload` and builds a dataset, rejecting shapes that are not record sequences.
pub fn build_dataset(payload: Payload, config: &EngineConfig) -> EngineResult<Dataset> {
    match normalize(payload, config) {
        Payload::Records(records) => Ok(Dataset::from_records(records)),
        Payload::Unrecognized(value) => Err(EngineError::malformed(format!(
            "expected an array of records or an object of record arrays, found {}",
            describe_json(&value)
        ))),
        Payload::Groups(_) => Err(EngineError::malformed("grouped payload was not flattened")),
    }
}

fn describe_json(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array containing non-object elements",
        JsonValue::Object(_) => "an object without record arrays",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn flat_records_copy_plan_topic_when_every_record_has_it() {
        let payload = Payload::from_json(json!([
            {"具体巡检计划主题": "消防栓", "楼宇": "1号楼"},
            {"具体巡检计划主题": "风机", "楼宇": "2号楼"}
        ]));
        let dataset = build_dataset(payload, &config()).unwrap();
        let types: Vec<_> = dataset
            .records()
            .iter()
            .map(|r| r.text("设备类型").unwrap().into_owned())
            .collect();
        assert_eq!(types, ["消防栓", "风机"]);
    }

    #[test]
    fn flat_records_missing_topic_are_left_alone() {
        let payload = Payload::from_json(json!([
            {"具体巡检计划主题": "消防栓"},
            {"楼宇": "2号楼"}
        ]));
        let dataset = build_dataset(payload, &config()).unwrap();
        assert!(dataset.records().iter().all(|r| r.get("设备类型").is_none()));
    }

    #[test]
    fn groups_flatten_with_group_name_fallback() {
        let payload = Payload::from_json(json!({
            "烟感": [{"楼宇": "1号楼"}, {"楼宇": "2号楼", "具体巡检计划主题": "温感"}],
            "note": "ignored",
            "风机": [{"楼宇": "3号楼"}]
        }));
        let dataset = build_dataset(payload, &config()).unwrap();
        let types: Vec<_> = dataset
            .records()
            .iter()
            .map(|r| r.text("设备类型").unwrap().into_owned())
            .collect();
        assert_eq!(types, ["烟感", "温感", "风机"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let payload = Payload::from_json(json!({
            "烟感": [{"楼宇": "1号楼"}],
        }));
        let once = normalize(payload, &config());
        let twice = normalize(once.clone(), &config());
        assert_eq!(once, twice);
    }

    #[test]
    fn scalar_and_mixed_payloads_are_malformed() {
        for value in [json!(42), json!("text"), json!([1, 2]), json!({"a": 1})] {
            let payload = Payload::from_json(value);
            assert!(matches!(payload, Payload::Unrecognized(_)));
            assert!(matches!(
                build_dataset(payload, &config()),
                Err(EngineError::MalformedInput { .. })
            ));
        }
    }

    #[test]
    fn invalid_json_text_is_malformed() {
        assert!(matches!(
            Payload::from_json_str("{not json"),
            Err(EngineError::MalformedInput { .. })
        ));
    }
}
