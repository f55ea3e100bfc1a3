use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::export::ExportFormat;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Explore inspection and equipment record exports with inferred column mappings",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show which source column supplies each canonical field
    Mapping(SourceArgs),
    /// Print dataset totals for the current filters
    Summary(ViewArgs),
    /// List the observed values available for filtering
    Values(SourceArgs),
    /// Group matching records by device type
    Devices(DevicesArgs),
    /// Group matching records by building, then floor
    Locations(ViewArgs),
    /// Show one page of matching records as a table
    Table(TableArgs),
    /// Show every column of a single matching record
    Show(ShowArgs),
    /// Write the matching records to a file or stdout
    Export(ExportArgs),
    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Input JSON or CSV file; repeat to load several files as named groups ('-' reads JSON from stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// YAML configuration file (aliases, page size, placeholders)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Override a column mapping as `field=column`; an empty column clears the field
    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub mappings: Vec<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct QueryArgs {
    /// Keep records in this building (repeatable)
    #[arg(long = "building", action = clap::ArgAction::Append)]
    pub buildings: Vec<String>,
    /// Keep records on this floor (repeatable)
    #[arg(long = "floor", action = clap::ArgAction::Append)]
    pub floors: Vec<String>,
    /// Keep records of this device type (repeatable)
    #[arg(long = "device-type", action = clap::ArgAction::Append)]
    pub device_types: Vec<String>,
    /// Keep records with this device id (repeatable)
    #[arg(long = "device-id", action = clap::ArgAction::Append)]
    pub device_ids: Vec<String>,
    /// Keep records at this location (repeatable)
    #[arg(long = "location", action = clap::ArgAction::Append)]
    pub locations: Vec<String>,
    /// Case-insensitive text that any column of a record must contain
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// List every member of each group instead of the first few
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct TableArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// 1-based page number (clamped to the available pages)
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// 1-based row number within the matching records
    #[arg(short, long)]
    pub row: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format; defaults to the output file extension, else JSON
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
    /// Delimiter for CSV output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// YAML configuration file to merge over the defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
