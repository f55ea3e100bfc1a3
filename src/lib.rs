pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod ingest;
pub mod io_utils;
pub mod mapping;
pub mod pagination;
pub mod record;
pub mod session;
pub mod table;
pub mod views;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, QueryArgs, SourceArgs},
    config::EngineConfig,
    export::ExportFormat,
    mapping::{CanonicalField, parse_overrides},
    session::Session,
    views::TableRow,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("inspection_view", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Mapping(args) => handle_mapping(&args),
        Commands::Summary(args) => {
            let session = open_session(&args.source, &args.query)?;
            handle_summary(&session)
        }
        Commands::Values(args) => handle_values(&args),
        Commands::Devices(args) => {
            let session = open_session(&args.view.source, &args.view.query)?;
            handle_devices(&session, args.all)
        }
        Commands::Locations(args) => {
            let session = open_session(&args.source, &args.query)?;
            handle_locations(&session)
        }
        Commands::Table(args) => {
            let session = open_session(&args.view.source, &args.view.query)?;
            handle_table(&session, args.page)
        }
        Commands::Show(args) => {
            let session = open_session(&args.view.source, &args.view.query)?;
            handle_show(&session, args.row)
        }
        Commands::Export(args) => {
            let session = open_session(&args.view.source, &args.view.query)?;
            handle_export(&session, &args)
        }
        Commands::Config(args) => {
            let config = load_config(args.config.as_deref())?;
            print!("{}", config.to_yaml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

/// Loads the inputs, applies mapping overrides, then the filters and search term.
fn open_session(source: &SourceArgs, query: &QueryArgs) -> Result<Session> {
    let config = load_config(source.config.as_deref())?;
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    let mut session = Session::new(config)?;
    let payload = io_utils::read_inputs(&source.inputs, source.delimiter, encoding)?;
    session
        .load(payload)
        .with_context(|| format!("Loading {:?}", source.inputs))?;

    let overrides = parse_overrides(&source.mappings)?;
    session.set_mapping_override(&overrides);

    for (field, values) in [
        (CanonicalField::Building, &query.buildings),
        (CanonicalField::Floor, &query.floors),
        (CanonicalField::DeviceType, &query.device_types),
        (CanonicalField::DeviceId, &query.device_ids),
        (CanonicalField::Location, &query.locations),
    ] {
        if values.is_empty() {
            continue;
        }
        if session.mapping().get(field).is_none() {
            warn!("No column is mapped to {field}; its filter has no effect");
        }
        debug!("Filter {field}: {values:?}");
        session.set_filter(field, values.iter().cloned());
    }
    if let Some(term) = query.search.as_deref() {
        session.set_search_term(term);
    }
    Ok(session)
}

fn handle_mapping(source: &SourceArgs) -> Result<()> {
    let session = open_session(source, &QueryArgs::default())?;
    let headers = ["field", "column", "resolved by"].map(String::from).to_vec();
    let rows = session
        .mapping()
        .iter()
        .map(|(field, entry)| match entry {
            Some(entry) => vec![
                field.to_string(),
                entry.column.clone(),
                entry.source.to_string(),
            ],
            None => vec![field.to_string(), "-".to_string(), "unmapped".to_string()],
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_summary(session: &Session) -> Result<()> {
    let summary = session.summary();
    let headers = ["metric", "value"].map(String::from).to_vec();
    let rows = [
        ("total records", summary.total_records),
        ("buildings", summary.buildings),
        ("device types", summary.device_types),
        ("displayed records", summary.displayed_records),
    ]
    .into_iter()
    .map(|(label, value)| vec![label.to_string(), value.to_string()])
    .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_values(source: &SourceArgs) -> Result<()> {
    let session = open_session(source, &QueryArgs::default())?;
    for field in CanonicalField::ALL {
        let values = session.observed_values(field);
        match session.mapping().get(field) {
            Some(column) => println!("{field} ({column}): {} value(s)", values.len()),
            None => println!("{field}: unmapped"),
        }
        for value in values {
            println!("  {value}");
        }
    }
    Ok(())
}

fn handle_devices(session: &Session, show_all: bool) -> Result<()> {
    let view = session.build_device_type_view();
    if view.groups.is_empty() {
        println!("No matching records");
        return Ok(());
    }
    let builder = session.view_builder();
    let limit = if show_all { usize::MAX } else { view.preview_limit };
    for group in &view.groups {
        println!("{} [{}]", group.name, group.count());
        for entry in builder.device_entries(group, limit) {
            println!("  {} ({} {})", entry.label, entry.building, entry.floor);
        }
        if let Some(more) = group.more_indicator(limit) {
            println!("  {more}");
        }
    }
    Ok(())
}

fn handle_locations(session: &Session) -> Result<()> {
    let tree = session.build_location_tree_view();
    if tree.buildings.is_empty() {
        println!("No matching records");
        return Ok(());
    }
    let builder = session.view_builder();
    for building in &tree.buildings {
        println!("{} [{} device(s)]", building.name, building.device_count());
        for floor in &building.floors {
            println!("  {} [{} device(s)]", floor.name, floor.members.len());
            for record in &floor.members {
                let entry = builder.location_entry(record);
                println!("    {}: {}", entry.device_type, entry.location);
            }
        }
    }
    Ok(())
}

fn handle_table(session: &Session, page: usize) -> Result<()> {
    let table_view = session.build_table_view(page);
    if table_view.window.is_empty() {
        println!("No matching records");
        return Ok(());
    }
    let headers = TableRow::HEADERS.map(String::from).to_vec();
    let rows = table_view.rows.iter().map(TableRow::cells).collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    let window = &table_view.window;
    let controls = window
        .controls
        .iter()
        .map(|number| {
            if *number == window.page {
                format!("[{number}]")
            } else {
                number.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "page {}/{}  {}{}{}",
        window.page,
        window.total_pages,
        if window.prev_enabled { "« " } else { "" },
        controls,
        if window.next_enabled { " »" } else { "" }
    );
    Ok(())
}

fn handle_show(session: &Session, row: usize) -> Result<()> {
    let details = session
        .record_details(row)
        .ok_or_else(|| anyhow!("Row {row} is outside the matching records"))?;
    println!("{}", details.title);
    let headers = ["column", "value"].map(String::from).to_vec();
    let rows = details
        .rows
        .into_iter()
        .map(|(column, value)| vec![column, value])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_export(session: &Session, args: &cli::ExportArgs) -> Result<()> {
    let format = args.format.unwrap_or_else(|| {
        match args
            .output
            .as_deref()
            .and_then(|path| path.extension())
            .and_then(|ext| ext.to_str())
        {
            Some(ext) if ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv") => {
                ExportFormat::Csv
            }
            _ => ExportFormat::Json,
        }
    });
    let delimiter = match (args.output_delimiter, args.output.as_deref()) {
        (Some(delimiter), _) => delimiter,
        (None, Some(path)) => io_utils::resolve_input_delimiter(path, None),
        (None, None) => io_utils::DEFAULT_CSV_DELIMITER,
    };
    if let Some(text) = session.export_filtered_as(format, delimiter)? {
        io_utils::write_text(args.output.as_deref(), &text)?;
        if let Some(path) = &args.output {
            info!("Export written to {path:?}");
        }
    }
    Ok(())
}
