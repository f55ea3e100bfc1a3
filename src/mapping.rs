//! Canonical fields and the column resolver.
//!
//! Each canonical field is resolved against the columns of the dataset's
//! first record by trying strategies in order: exact alias, case-insensitive
//! alias substring, and (for device type, building and floor only) a
//! distinct-value statistic over the whole dataset. Name-based strategies run
//! for every field before the statistical fallback runs for any field.

use std::{
    cell::OnceCell,
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    str::FromStr,
};

use anyhow::{Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{config::AliasTable, record::Dataset};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Building,
    Floor,
    DeviceType,
    DeviceId,
    Location,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::Building,
        CanonicalField::Floor,
        CanonicalField::DeviceType,
        CanonicalField::DeviceId,
        CanonicalField::Location,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Building => "building",
            CanonicalField::Floor => "floor",
            CanonicalField::DeviceType => "device_type",
            CanonicalField::DeviceId => "device_id",
            CanonicalField::Location => "location",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "building" => Ok(CanonicalField::Building),
            "floor" => Ok(CanonicalField::Floor),
            "device_type" | "devicetype" | "type" => Ok(CanonicalField::DeviceType),
            "device_id" | "deviceid" | "id" => Ok(CanonicalField::DeviceId),
            "location" => Ok(CanonicalField::Location),
            _ => Err(anyhow!(
                "Unknown field '{value}' (expected building, floor, device_type, device_id or location)"
            )),
        }
    }
}

/// How a mapping entry was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Exact,
    Substring,
    Statistical,
    Override,
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MappingSource::Exact => "exact alias",
            MappingSource::Substring => "alias substring",
            MappingSource::Statistical => "distinct-value statistics",
            MappingSource::Override => "override",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub column: String,
    pub source: MappingSource,
}

/// Canonical field -> source column. Unset entries mean no column supplies the field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMapping {
    entries: [Option<MappingEntry>; 5],
}

impl FieldMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.entries[field.index()]
            .as_ref()
            .map(|entry| entry.column.as_str())
    }

    pub fn entry(&self, field: CanonicalField) -> Option<&MappingEntry> {
        self.entries[field.index()].as_ref()
    }

    pub fn set(&mut self, field: CanonicalField, column: Option<String>, source: MappingSource) {
        self.entries[field.index()] = column.map(|column| MappingEntry { column, source });
    }

    pub fn is_assigned(&self, column: &str) -> bool {
        self.entries
            .iter()
            .flatten()
            .any(|entry| entry.column == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<&MappingEntry>)> {
        CanonicalField::ALL
            .into_iter()
            .map(|field| (field, self.entry(field)))
    }

    /// Replaces the entries named by `overrides`; the rest stay as they are.
    pub fn apply_override(&mut self, overrides: &MappingOverride) {
        for (field, column) in &overrides.entries {
            self.set(*field, column.clone(), MappingSource::Override);
        }
    }
}

/// A partial mapping supplied by the user. `None` clears an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingOverride {
    entries: BTreeMap<CanonicalField, Option<String>>,
}

impl MappingOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(mut self, field: CanonicalField, column: impl Into<String>) -> Self {
        self.entries.insert(field, Some(column.into()));
        self
    }

    pub fn clear(mut self, field: CanonicalField) -> Self {
        self.entries.insert(field, None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Parses `field=column` assignments; an empty column clears the field.
pub fn parse_overrides(specs: &[String]) -> Result<MappingOverride> {
    let mut overrides = MappingOverride::new();
    for spec in specs {
        let (field, column) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Mapping override '{spec}' must look like field=column"))?;
        let field: CanonicalField = field.parse()?;
        let column = column.trim();
        overrides = if column.is_empty() {
            overrides.clear(field)
        } else {
            overrides.assign(field, column)
        };
    }
    Ok(overrides)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchStrategy {
    Exact,
    Substring,
    Statistical,
}

const NAME_STRATEGIES: [MatchStrategy; 2] = [MatchStrategy::Exact, MatchStrategy::Substring];
const STATISTICAL_FIELDS: [CanonicalField; 3] = [
    CanonicalField::DeviceType,
    CanonicalField::Building,
    CanonicalField::Floor,
];

struct ResolveContext<'a> {
    dataset: &'a Dataset,
    columns: Vec<&'a str>,
    aliases: &'a AliasTable,
    distinct: OnceCell<HashMap<&'a str, usize>>,
}

impl<'a> ResolveContext<'a> {
    fn distinct_count(&self, column: &str) -> usize {
        let counts = self.distinct.get_or_init(|| {
            self.columns
                .iter()
                .map(|&column| (column, count_distinct(self.dataset, column)))
                .collect()
        });
        counts.get(column).copied().unwrap_or_default()
    }
}

fn count_distinct(dataset: &Dataset, column: &str) -> usize {
    dataset
        .records()
        .iter()
        .map(|record| record.text(column).map(|text| text.into_owned()))
        .collect::<HashSet<Option<String>>>()
        .len()
}

impl MatchStrategy {
    fn source(self) -> MappingSource {
        match self {
            MatchStrategy::Exact => MappingSource::Exact,
            MatchStrategy::Substring => MappingSource::Substring,
            MatchStrategy::Statistical => MappingSource::Statistical,
        }
    }

    fn select<'a>(
        self,
        field: CanonicalField,
        ctx: &ResolveContext<'a>,
        mapping: &FieldMapping,
    ) -> Option<&'a str> {
        let aliases = ctx.aliases.for_field(field);
        match self {
            MatchStrategy::Exact => aliases
                .iter()
                .find_map(|alias| ctx.columns.iter().copied().find(|c| *c == alias.as_str())),
            MatchStrategy::Substring => {
                let lowered = aliases
                    .iter()
                    .map(|alias| alias.to_lowercase())
                    .collect::<Vec<_>>();
                ctx.columns.iter().copied().find(|column| {
                    let column = column.to_lowercase();
                    lowered.iter().any(|alias| column.contains(alias.as_str()))
                })
            }
            MatchStrategy::Statistical => {
                let records = ctx.dataset.len();
                // distinct * divisor < records, i.e. distinct < records / divisor
                let divisor = match field {
                    CanonicalField::DeviceType => 3,
                    CanonicalField::Building | CanonicalField::Floor => 2,
                    CanonicalField::DeviceId | CanonicalField::Location => return None,
                };
                let mut candidates = ctx
                    .columns
                    .iter()
                    .copied()
                    .filter(|column| !mapping.is_assigned(column))
                    .map(|column| (column, ctx.distinct_count(column)))
                    .filter(|(_, distinct)| *distinct > 1 && distinct * divisor < records);
                if field == CanonicalField::DeviceType {
                    candidates
                        .min_by_key(|(_, distinct)| *distinct)
                        .map(|(column, _)| column)
                } else {
                    candidates.next().map(|(column, _)| column)
                }
            }
        }
    }
}

/// Infers a mapping for `dataset` without any user guidance.
pub fn infer_mapping(dataset: &Dataset, aliases: &AliasTable) -> FieldMapping {
    let ctx = ResolveContext {
        dataset,
        columns: dataset.columns(),
        aliases,
        distinct: OnceCell::new(),
    };
    let mut mapping = FieldMapping::default();
    if ctx.columns.is_empty() {
        debug!("Dataset has no columns; mapping left unset");
        return mapping;
    }

    for field in CanonicalField::ALL {
        for strategy in NAME_STRATEGIES {
            if let Some(column) = strategy.select(field, &ctx, &mapping) {
                debug!("{field} -> '{column}' ({})", strategy.source());
                mapping.set(field, Some(column.to_string()), strategy.source());
                break;
            }
        }
    }

    for field in STATISTICAL_FIELDS {
        if mapping.get(field).is_some() {
            continue;
        }
        let strategy = MatchStrategy::Statistical;
        match strategy.select(field, &ctx, &mapping) {
            Some(column) => {
                debug!("{field} -> '{column}' ({})", strategy.source());
                mapping.set(field, Some(column.to_string()), strategy.source());
            }
            None => debug!("{field} left unset: no column qualifies"),
        }
    }

    mapping
}
