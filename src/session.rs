//! Session context owning the working dataset, its field mapping and the
//! filter state.
//!
//! All state changes are whole-value replacements: a load swaps dataset,
//! mapping and filters together, or leaves all three untouched when it fails.
//! Hosts that read files asynchronously take a [`LoadTicket`] when a read
//! starts and hand it back with the payload; only the most recently started
//! load is applied.

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    config::EngineConfig,
    error::EngineResult,
    export::{self, ExportFormat},
    filter::{self, FilterState, FilteredView},
    ingest::{self, Payload},
    io_utils::DEFAULT_CSV_DELIMITER,
    mapping::{self, CanonicalField, FieldMapping, MappingOverride},
    pagination::{PageWindow, Paginator},
    record::Dataset,
    views::{DeviceTypeView, LocationTree, RecordDetails, TableRow, ViewBuilder},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { records: usize },
    /// A newer load started after this one; its result was discarded.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub window: PageWindow,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub buildings: usize,
    pub device_types: usize,
    pub displayed_records: usize,
}

#[derive(Debug, Default)]
pub struct Session {
    config: EngineConfig,
    dataset: Dataset,
    mapping: FieldMapping,
    filter: FilterState,
    latest_ticket: u64,
}

impl Session {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    /// Marks the start of a load. Any ticket handed out earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        LoadTicket(self.latest_ticket)
    }

    /// Applies `payload` if `ticket` belongs to the most recently started load.
    ///
    /// On success the dataset, its inferred mapping and an empty filter state
    /// replace the previous ones. On error nothing changes.
    pub fn complete_load(&mut self, ticket: LoadTicket, payload: Payload) -> EngineResult<LoadOutcome> {
        if ticket.0 != self.latest_ticket {
            warn!(
                "Discarding load #{} superseded by load #{}",
                ticket.0, self.latest_ticket
            );
            return Ok(LoadOutcome::Stale);
        }
        let shape = payload.shape();
        let dataset = ingest::build_dataset(payload, &self.config)?;
        let mapping = self.infer_mapping(&dataset);
        info!(
            "Loaded {} record(s) from {shape} payload",
            dataset.len()
        );
        for (field, entry) in mapping.iter() {
            match entry {
                Some(entry) => info!("{field} -> '{}' ({})", entry.column, entry.source),
                None => info!("{field} -> unmapped"),
            }
        }
        let records = dataset.len();
        self.dataset = dataset;
        self.mapping = mapping;
        self.filter = FilterState::new();
        Ok(LoadOutcome::Applied { records })
    }

    /// Normalizes and installs `payload` as the working dataset.
    pub fn load(&mut self, payload: Payload) -> EngineResult<&Dataset> {
        let ticket = self.begin_load();
        self.complete_load(ticket, payload)?;
        Ok(&self.dataset)
    }

    pub fn load_json_str(&mut self, text: &str) -> EngineResult<&Dataset> {
        let ticket = self.begin_load();
        let payload = Payload::from_json_str(text)?;
        self.complete_load(ticket, payload)?;
        Ok(&self.dataset)
    }

    pub fn infer_mapping(&self, dataset: &Dataset) -> FieldMapping {
        mapping::infer_mapping(dataset, &self.config.aliases)
    }

    /// Merges `overrides` into the current mapping until the next load.
    pub fn set_mapping_override(&mut self, overrides: &MappingOverride) {
        if !overrides.is_empty() {
            debug!("Applying {} mapping override(s)", overrides.len());
        }
        self.mapping.apply_override(overrides);
    }

    /// Replaces the selection of `field`; an empty selection lifts the restriction.
    ///
    /// Unless configured otherwise, this also drops the active search term.
    pub fn set_filter<I, S>(&mut self, field: CanonicalField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.select(field, values);
        if !self.config.keep_search_on_filter_change && self.filter.search_term().is_some() {
            debug!("Field filter changed; clearing search term");
            self.filter.clear_search();
        }
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.filter.set_search(term);
    }

    pub fn reset_filters(&mut self) {
        self.filter.reset();
    }

    pub fn compute_filtered_view(&self) -> FilteredView<'_> {
        let view = filter::compute_filtered_view(&self.dataset, &self.mapping, &self.filter);
        debug!(
            "Filtered view: {} of {} record(s), filters on {:?}",
            view.len(),
            self.dataset.len(),
            self.filter.active_fields().collect::<Vec<_>>()
        );
        view
    }

    pub fn view_builder(&self) -> ViewBuilder<'_> {
        ViewBuilder::new(&self.mapping, &self.config)
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.config.page_size, self.config.page_window)
    }

    pub fn build_device_type_view(&self) -> DeviceTypeView<'_> {
        self.view_builder()
            .device_type_view(&self.compute_filtered_view())
    }

    pub fn build_location_tree_view(&self) -> LocationTree<'_> {
        self.view_builder()
            .location_tree(&self.compute_filtered_view())
    }

    pub fn build_table_view(&self, page: usize) -> TableView {
        let view = self.compute_filtered_view();
        let window = self.paginator().paginate(view.len(), page);
        let rows = self
            .view_builder()
            .table_rows(&view, window.rows.clone());
        TableView { window, rows }
    }

    /// Details of the record at 1-based `row` of the filtered view.
    pub fn record_details(&self, row: usize) -> Option<RecordDetails> {
        let view = self.compute_filtered_view();
        let record = view.get(row.checked_sub(1)?)?;
        Some(self.view_builder().record_details(record))
    }

    pub fn observed_values(&self, field: CanonicalField) -> Vec<String> {
        filter::observed_values(&self.dataset, &self.mapping, field)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            total_records: self.dataset.len(),
            buildings: self.observed_values(CanonicalField::Building).len(),
            device_types: self.observed_values(CanonicalField::DeviceType).len(),
            displayed_records: self.compute_filtered_view().len(),
        }
    }

    /// JSON text of the filtered records, `None` when nothing matches.
    pub fn export_filtered(&self) -> Result<Option<String>> {
        self.export_filtered_as(ExportFormat::Json, DEFAULT_CSV_DELIMITER)
    }

    pub fn export_filtered_as(&self, format: ExportFormat, delimiter: u8) -> Result<Option<String>> {
        let view = self.compute_filtered_view();
        let rendered = export::render(&view, format, delimiter)?;
        if rendered.is_some() {
            info!("Exported {} record(s) as {format:?}", view.len());
        }
        Ok(rendered)
    }
}
