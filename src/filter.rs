use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use itertools::Itertools;
use regex::Regex;

use crate::{
    mapping::{CanonicalField, FieldMapping},
    record::{Dataset, RawRecord},
};

static FLOOR_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("floor number pattern is valid"));

/// Per-field selected values plus an optional free-text term.
/// An empty selection puts no restriction on its field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selections: BTreeMap<CanonicalField, BTreeSet<String>>,
    search: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection of `field`. An empty iterator lifts the restriction.
    pub fn select<I, S>(&mut self, field: CanonicalField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        if values.is_empty() {
            self.selections.remove(&field);
        } else {
            self.selections.insert(field, values);
        }
    }

    pub fn selection(&self, field: CanonicalField) -> Option<&BTreeSet<String>> {
        self.selections.get(&field)
    }

    pub fn active_fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.selections.keys().copied()
    }

    /// Sets the search term; blank terms clear it.
    pub fn set_search(&mut self, term: &str) {
        let trimmed = term.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn clear_search(&mut self) {
        self.search = None;
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.selections.is_empty() && self.search.is_none()
    }

    pub fn reset(&mut self) {
        self.selections.clear();
        self.search = None;
    }
}

/// Order-preserving subset of a dataset, held as record positions.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Positions of the matching records within the dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn get(&self, position: usize) -> Option<&'a RawRecord> {
        self.indices
            .get(position)
            .and_then(|&index| self.dataset.get(index))
    }

    pub fn records(&self) -> impl Iterator<Item = &'a RawRecord> + '_ {
        self.indices
            .iter()
            .filter_map(|&index| self.dataset.get(index))
    }

    fn retain<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&RawRecord) -> bool,
    {
        let dataset = self.dataset;
        self.indices
            .retain(|&index| dataset.get(index).is_some_and(&mut keep));
        self
    }
}

pub fn record_matches_fields(
    record: &RawRecord,
    mapping: &FieldMapping,
    state: &FilterState,
) -> bool {
    for (field, selected) in &state.selections {
        let Some(column) = mapping.get(*field) else {
            continue;
        };
        let matched = record
            .text(column)
            .is_some_and(|value| selected.contains(&*value));
        if !matched {
            return false;
        }
    }
    true
}

/// `needle` must already be lower-cased.
pub fn record_matches_search(record: &RawRecord, needle: &str) -> bool {
    record
        .iter()
        .filter_map(|(_, value)| value.as_text())
        .any(|text| text.to_lowercase().contains(needle))
}

pub fn apply_field_filters<'a>(
    dataset: &'a Dataset,
    mapping: &FieldMapping,
    state: &FilterState,
) -> FilteredView<'a> {
    FilteredView::all(dataset).retain(|record| record_matches_fields(record, mapping, state))
}

/// Field filters first, then the search term narrows what they left.
pub fn compute_filtered_view<'a>(
    dataset: &'a Dataset,
    mapping: &FieldMapping,
    state: &FilterState,
) -> FilteredView<'a> {
    let view = apply_field_filters(dataset, mapping, state);
    match state.search_term() {
        Some(term) => {
            let needle = term.to_lowercase();
            view.retain(|record| record_matches_search(record, &needle))
        }
        None => view,
    }
}

/// Distinct non-blank values of `field` across the dataset, ordered for display.
///
/// Buildings sort lexically, floors numeric-first, everything else keeps
/// first-seen order.
pub fn observed_values(
    dataset: &Dataset,
    mapping: &FieldMapping,
    field: CanonicalField,
) -> Vec<String> {
    let Some(column) = mapping.get(field) else {
        return Vec::new();
    };
    let mut values = dataset
        .records()
        .iter()
        .filter_map(|record| record.display_text(column))
        .map(|text| text.into_owned())
        .unique()
        .collect::<Vec<_>>();
    match field {
        CanonicalField::Building => values.sort(),
        CanonicalField::Floor => values.sort_by(|a, b| compare_floors(a, b)),
        _ => {}
    }
    values
}

/// First signed integer inside a floor label: `"B1"` -> 1, `"-1层"` -> -1.
pub fn extract_floor_number(value: &str) -> Option<i64> {
    FLOOR_NUMBER
        .find(value)
        .and_then(|found| found.as_str().parse().ok())
}

fn compare_floors(a: &str, b: &str) -> Ordering {
    match (extract_floor_number(a), extract_floor_number(b)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
