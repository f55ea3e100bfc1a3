//! File reading, decoding and CSV plumbing.
//!
//! - **Inputs**: `.csv`/`.tsv` files become flat records, anything else is
//!   parsed as JSON; `-` reads JSON from stdin.
//! - **Groups**: several input files form one grouped payload keyed by file stem.
//! - **Encoding**: input bytes are decoded via `encoding_rs`, defaulting to UTF-8.
//! - **Output**: CSV output uses `QuoteStyle::Always`.

use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::EngineError,
    ingest::Payload,
    record::{RawRecord, Value},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match extension(path).as_deref() {
        Some("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_tabular(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("csv" | "tsv"))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    // Strips a UTF-8 BOM, common in spreadsheet exports.
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
    } else {
        bytes
    };
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn csv_writer<W>(writer: W, delimiter: u8) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    builder.from_writer(writer)
}

/// Reads CSV rows as records keyed by header; empty cells are absent values.
pub fn read_csv_records<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<RawRecord>>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let headers = decode_record(&reader.byte_headers()?.clone(), encoding)?;
    let mut records = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        let pairs = headers.iter().enumerate().map(|(idx, header)| {
            let value = decoded
                .get(idx)
                .map(|cell| Value::from_cell(cell))
                .unwrap_or(Value::Absent);
            (header.clone(), value)
        });
        records.push(RawRecord::from_pairs(pairs));
    }
    Ok(records)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading stdin")?;
    } else {
        BufReader::new(File::open(path).with_context(|| format!("Opening input file {path:?}"))?)
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(bytes)
}

/// Reads one input file into a payload.
pub fn read_payload(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Payload> {
    if is_tabular(path) {
        let delimiter = resolve_input_delimiter(path, delimiter);
        let bytes = read_bytes(path)?;
        let records = read_csv_records(bytes.as_slice(), delimiter, encoding)
            .with_context(|| format!("Parsing CSV input {path:?}"))?;
        debug!("Read {} CSV record(s) from {path:?}", records.len());
        return Ok(Payload::Records(records));
    }
    let text = decode_bytes(&read_bytes(path)?, encoding)?;
    let payload =
        Payload::from_json_str(&text).with_context(|| format!("Parsing JSON input {path:?}"))?;
    debug!(
        "Read {} payload with {} record(s) from {path:?}",
        payload.shape(),
        payload.record_count().unwrap_or_default()
    );
    Ok(payload)
}

/// Reads all inputs. Several files form one group per file, named by file stem.
pub fn read_inputs(
    paths: &[impl AsRef<Path>],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Payload> {
    match paths {
        [] => Err(anyhow!("At least one input is required")),
        [single] => read_payload(single.as_ref(), delimiter, encoding),
        many => {
            let mut groups = Vec::with_capacity(many.len());
            for path in many {
                let path = path.as_ref();
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                match read_payload(path, delimiter, encoding)? {
                    Payload::Records(records) => groups.push((name, records)),
                    Payload::Groups(inner) => groups.extend(inner),
                    Payload::Unrecognized(_) => {
                        return Err(EngineError::malformed(format!(
                            "{path:?} does not contain records"
                        ))
                        .into());
                    }
                }
            }
            Ok(Payload::Groups(groups))
        }
    }
}

pub fn write_text(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(p) if !is_dash(p) => {
            fs::write(p, text).with_context(|| format!("Writing output file {p:?}"))
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes()).context("Writing stdout")?;
            stdout.flush().context("Flushing stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_become_records_with_absent_cells() {
        let input = "楼宇,楼层,备注\n1号楼,3,\n2号楼,,ok\n";
        let records = read_csv_records(input.as_bytes(), b',', UTF_8).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("楼层").as_deref(), Some("3"));
        assert_eq!(records[0].get("备注"), Some(&Value::Absent));
        assert_eq!(records[1].get("楼层"), Some(&Value::Absent));
    }

    #[test]
    fn bom_is_stripped_from_utf8_input() {
        let decoded = decode_bytes(b"\xEF\xBB\xBF[1]", UTF_8).unwrap();
        assert_eq!(decoded, "[1]");
    }

    #[test]
    fn gbk_input_decodes() {
        let encoding = resolve_encoding(Some("gbk")).unwrap();
        let (bytes, _, _) = encoding.encode("楼层");
        assert_eq!(decode_bytes(&bytes, encoding).unwrap(), "楼层");
    }

    #[test]
    fn tsv_extension_selects_tab() {
        assert_eq!(resolve_input_delimiter(Path::new("a.TSV"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.json"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }
}
