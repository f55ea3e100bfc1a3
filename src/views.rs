//! Presentation shapes derived from a filtered view: device-type groups, the
//! building/floor tree, flat table rows and single-record details.
//!
//! Every shape renders missing field values with a configured placeholder,
//! never as blank text.

use std::{borrow::Cow, collections::HashMap, ops::Range};

use serde::Serialize;

use crate::{
    config::{EngineConfig, Placeholders},
    filter::FilteredView,
    mapping::{CanonicalField, FieldMapping},
    record::RawRecord,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTypeGroup<'a> {
    pub name: String,
    pub members: Vec<&'a RawRecord>,
}

impl<'a> DeviceTypeGroup<'a> {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn preview(&self, limit: usize) -> &[&'a RawRecord] {
        &self.members[..self.members.len().min(limit)]
    }

    pub fn hidden_count(&self, limit: usize) -> usize {
        self.members.len().saturating_sub(limit)
    }

    /// `"+N more"` when the preview hides members.
    pub fn more_indicator(&self, limit: usize) -> Option<String> {
        match self.hidden_count(limit) {
            0 => None,
            hidden => Some(format!("+{hidden} more")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTypeView<'a> {
    pub groups: Vec<DeviceTypeGroup<'a>>,
    pub preview_limit: usize,
}

impl DeviceTypeView<'_> {
    pub fn total(&self) -> usize {
        self.groups.iter().map(DeviceTypeGroup::count).sum()
    }
}

/// One previewed member of a device-type group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    pub label: String,
    pub building: String,
    pub floor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloorNode<'a> {
    pub name: String,
    pub members: Vec<&'a RawRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingNode<'a> {
    pub name: String,
    pub floors: Vec<FloorNode<'a>>,
}

impl BuildingNode<'_> {
    pub fn device_count(&self) -> usize {
        self.floors.iter().map(|floor| floor.members.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationTree<'a> {
    pub buildings: Vec<BuildingNode<'a>>,
}

/// One device listed under a floor of the location tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationEntry {
    pub device_type: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// 1-based position within the filtered view.
    pub index: usize,
    pub device_type: String,
    pub building: String,
    pub floor: String,
    pub location: String,
    pub device_id: String,
}

impl TableRow {
    pub const HEADERS: [&'static str; 6] =
        ["#", "device_type", "building", "floor", "location", "device_id"];

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.device_type.clone(),
            self.building.clone(),
            self.floor.clone(),
            self.location.clone(),
            self.device_id.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDetails {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

/// Groups `items` by key, keeping keys and members in first-seen order.
fn group_in_order<T, I>(items: I) -> Vec<(String, Vec<T>)>
where
    I: IntoIterator<Item = (String, T)>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for (key, item) in items {
        match positions.get(&key) {
            Some(&position) => groups[position].1.push(item),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }
    groups
}

pub struct ViewBuilder<'a> {
    mapping: &'a FieldMapping,
    placeholders: &'a Placeholders,
    preview_limit: usize,
}

impl<'a> ViewBuilder<'a> {
    pub fn new(mapping: &'a FieldMapping, config: &'a EngineConfig) -> Self {
        Self {
            mapping,
            placeholders: &config.placeholders,
            preview_limit: config.group_preview_limit,
        }
    }

    /// Non-blank value of `field` in `record`, if the field is mapped.
    pub fn value<'r>(&self, record: &'r RawRecord, field: CanonicalField) -> Option<Cow<'r, str>> {
        self.mapping
            .get(field)
            .and_then(|column| record.display_text(column))
    }

    fn value_or(&self, record: &RawRecord, field: CanonicalField, placeholder: &str) -> String {
        self.value(record, field)
            .map(Cow::into_owned)
            .unwrap_or_else(|| placeholder.to_string())
    }

    pub fn device_type_view<'v>(&self, view: &FilteredView<'v>) -> DeviceTypeView<'v> {
        let keyed = view.records().map(|record| {
            let key = self.value_or(record, CanonicalField::DeviceType, &self.placeholders.unclassified);
            (key, record)
        });
        let groups = group_in_order(keyed)
            .into_iter()
            .map(|(name, members)| DeviceTypeGroup { name, members })
            .collect();
        DeviceTypeView {
            groups,
            preview_limit: self.preview_limit,
        }
    }

    /// Preview entries of a group, capped at `limit` members.
    pub fn device_entries(&self, group: &DeviceTypeGroup<'_>, limit: usize) -> Vec<DeviceEntry> {
        group
            .preview(limit)
            .iter()
            .enumerate()
            .map(|(position, record)| DeviceEntry {
                label: self
                    .value(record, CanonicalField::DeviceId)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|| format!("Device {}", position + 1)),
                building: self.value_or(
                    record,
                    CanonicalField::Building,
                    &self.placeholders.unknown_building,
                ),
                floor: self.value_or(record, CanonicalField::Floor, &self.placeholders.unknown_floor),
            })
            .collect()
    }

    pub fn location_tree<'v>(&self, view: &FilteredView<'v>) -> LocationTree<'v> {
        let by_building = view.records().map(|record| {
            let building = self.value_or(
                record,
                CanonicalField::Building,
                &self.placeholders.unknown_building,
            );
            (building, record)
        });
        let buildings = group_in_order(by_building)
            .into_iter()
            .map(|(name, records)| {
                let by_floor = records.into_iter().map(|record| {
                    let floor =
                        self.value_or(record, CanonicalField::Floor, &self.placeholders.unknown_floor);
                    (floor, record)
                });
                let floors = group_in_order(by_floor)
                    .into_iter()
                    .map(|(name, members)| FloorNode { name, members })
                    .collect();
                BuildingNode { name, floors }
            })
            .collect();
        LocationTree { buildings }
    }

    pub fn location_entry(&self, record: &RawRecord) -> LocationEntry {
        let location = match (
            self.value(record, CanonicalField::Location),
            self.value(record, CanonicalField::DeviceId),
        ) {
            (Some(location), _) => location.into_owned(),
            (None, Some(id)) => format!("ID: {id}"),
            (None, None) => self.placeholders.no_location.clone(),
        };
        LocationEntry {
            device_type: self.value_or(
                record,
                CanonicalField::DeviceType,
                &self.placeholders.unknown_type,
            ),
            location,
        }
    }

    /// Rows for the `range` of view positions, numbered from 1 across the whole view.
    pub fn table_rows(&self, view: &FilteredView<'_>, range: Range<usize>) -> Vec<TableRow> {
        let unknown = self.placeholders.unknown.as_str();
        range
            .filter_map(|position| view.get(position).map(|record| (position, record)))
            .map(|(position, record)| TableRow {
                index: position + 1,
                device_type: self.value_or(record, CanonicalField::DeviceType, unknown),
                building: self.value_or(record, CanonicalField::Building, unknown),
                floor: self.value_or(record, CanonicalField::Floor, unknown),
                location: self.value_or(record, CanonicalField::Location, unknown),
                device_id: self.value_or(record, CanonicalField::DeviceId, unknown),
            })
            .collect()
    }

    pub fn record_details(&self, record: &RawRecord) -> RecordDetails {
        let title = match self.value(record, CanonicalField::DeviceType) {
            Some(device_type) => format!("{device_type} details"),
            None => "Device details".to_string(),
        };
        let rows = record
            .iter()
            .filter(|(name, _)| !name.starts_with('_') && *name != "index")
            .map(|(name, value)| {
                let text = if value.is_blank() {
                    self.placeholders.not_provided.clone()
                } else {
                    value.to_string()
                };
                (name.to_string(), text)
            })
            .collect();
        RecordDetails { title, rows }
    }
}
