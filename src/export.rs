use anyhow::{Context, Result};
use clap::ValueEnum;
use log::warn;

use crate::{filter::FilteredView, io_utils, record::column_union};

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// Serializes the view, or returns `None` when there is nothing to export.
pub fn render(view: &FilteredView<'_>, format: ExportFormat, delimiter: u8) -> Result<Option<String>> {
    if view.is_empty() {
        warn!("No records match the current filters; nothing to export");
        return Ok(None);
    }
    let text = match format {
        ExportFormat::Json => to_json(view)?,
        ExportFormat::Csv => to_csv(view, delimiter)?,
    };
    Ok(Some(text))
}

/// Pretty-printed JSON array in the same record shape as the loaded input.
pub fn to_json(view: &FilteredView<'_>) -> Result<String> {
    let records = view.records().collect::<Vec<_>>();
    serde_json::to_string_pretty(&records).context("Serializing filtered records to JSON")
}

/// CSV with the union of record columns as header; absent values become empty cells.
pub fn to_csv(view: &FilteredView<'_>, delimiter: u8) -> Result<String> {
    let columns = column_union(view.records());

    let mut writer = io_utils::csv_writer(Vec::new(), delimiter);
    writer
        .write_record(&columns)
        .context("Writing CSV header")?;
    for (position, record) in view.records().enumerate() {
        let row = columns
            .iter()
            .map(|column| {
                record
                    .text(column)
                    .map(|text| text.into_owned())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        writer
            .write_record(&row)
            .with_context(|| format!("Writing CSV row {}", position + 1))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Flushing CSV output: {err}"))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Dataset, RawRecord, Value};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            RawRecord::from_pairs([
                ("楼宇", Value::Text("1号楼".into())),
                ("楼层", Value::Integer(2)),
            ]),
            RawRecord::from_pairs([
                ("楼宇", Value::Text("2号楼".into())),
                ("备注", Value::Text("a,b".into())),
            ]),
        ])
    }

    #[test]
    fn json_export_keeps_record_shape() {
        let dataset = dataset();
        let text = to_json(&FilteredView::all(&dataset)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                {"楼宇": "1号楼", "楼层": 2},
                {"楼宇": "2号楼", "备注": "a,b"}
            ])
        );
    }

    #[test]
    fn csv_export_unions_columns() {
        let dataset = dataset();
        let text = to_csv(&FilteredView::all(&dataset), b',').unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#""楼宇","楼层","备注""#);
        assert_eq!(lines[1], r#""1号楼","2","""#);
        assert_eq!(lines[2], r#""2号楼","","a,b""#);
    }

    #[test]
    fn empty_view_exports_nothing() {
        let dataset = Dataset::default();
        let rendered = render(&FilteredView::all(&dataset), ExportFormat::Json, b',').unwrap();
        assert!(rendered.is_none());
    }
}
