mod common;

use inspection_view::{
    config::EngineConfig,
    error::EngineError,
    export::ExportFormat,
    ingest::Payload,
    mapping::{CanonicalField, MappingSource},
    session::{LoadOutcome, Session},
};
use serde_json::{Value, json};

use common::{inspection_records, loaded_session};

#[test]
fn grouped_payload_is_flattened_with_group_names_as_device_types() {
    let mut session = Session::default();
    session
        .load_json_str(
            r#"{
                "消防巡检": [
                    {"楼宇": "A座", "楼层": "1F", "具体巡检计划主题": "烟感巡检"},
                    {"楼宇": "A座", "楼层": "2F"}
                ],
                "暖通巡检": [
                    {"楼宇": "B座", "楼层": "1F", "具体巡检计划主题": ""}
                ],
                "meta": "ignored"
            }"#,
        )
        .expect("grouped payload loads");

    assert_eq!(session.dataset().len(), 3);
    let device_type = session
        .mapping()
        .entry(CanonicalField::DeviceType)
        .expect("device type mapped");
    assert_eq!(device_type.column, "设备类型");
    assert_eq!(device_type.source, MappingSource::Exact);
    assert_eq!(
        session.observed_values(CanonicalField::DeviceType),
        vec!["烟感巡检", "消防巡检", "暖通巡检"]
    );
}

#[test]
fn flat_payload_copies_plan_topic_only_when_every_record_has_one() {
    let complete = loaded_session(json!([
        {"楼宇": "A座", "具体巡检计划主题": "消防"},
        {"楼宇": "B座", "具体巡检计划主题": "暖通"}
    ]));
    assert_eq!(
        complete.dataset().records()[1].text("设备类型").as_deref(),
        Some("暖通")
    );

    let partial = loaded_session(json!([
        {"楼宇": "A座", "具体巡检计划主题": "消防"},
        {"楼宇": "B座"}
    ]));
    assert!(partial.dataset().records()[0].get("设备类型").is_none());
}

#[test]
fn malformed_payloads_leave_the_previous_dataset_active() {
    let mut session = loaded_session(inspection_records());
    for text in ["not json", "\"text\"", "[1, 2]", "{\"a\": 1}", "null"] {
        let err = session.load_json_str(text).unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput { .. }), "{text}");
        assert_eq!(session.dataset().len(), 8);
        assert_eq!(session.mapping().get(CanonicalField::Building), Some("楼宇"));
    }
}

#[test]
fn last_started_load_wins() {
    let mut session = Session::default();
    let slow = session.begin_load();
    let fast = session.begin_load();

    let applied = session
        .complete_load(fast, Payload::from_json(inspection_records()))
        .expect("newer load applies");
    assert_eq!(applied, LoadOutcome::Applied { records: 8 });

    let stale = session
        .complete_load(slow, Payload::from_json(json!([{"楼宇": "旧楼"}])))
        .expect("stale load is not an error");
    assert_eq!(stale, LoadOutcome::Stale);
    assert_eq!(session.observed_values(CanonicalField::Building), vec!["A座", "B座"]);
}

#[test]
fn repeated_queries_are_idempotent() {
    let mut session = loaded_session(inspection_records());
    session.set_filter(CanonicalField::DeviceType, ["烟感"]);
    let first = session.compute_filtered_view().indices().to_vec();
    session.set_filter(CanonicalField::DeviceType, ["烟感"]);
    let second = session.compute_filtered_view().indices().to_vec();
    assert_eq!(first, second);
    assert_eq!(first, vec![0, 1, 4, 7]);
}

#[test]
fn search_survives_filter_changes_when_configured() {
    let config = EngineConfig {
        keep_search_on_filter_change: true,
        ..EngineConfig::default()
    };
    let mut session = Session::new(config).expect("valid config");
    session
        .load(Payload::from_json(inspection_records()))
        .expect("load records");
    session.set_search_term("near");
    session.set_filter(CanonicalField::DeviceType, ["烟感"]);
    assert_eq!(session.compute_filtered_view().indices(), &[4]);
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig {
        page_size: 0,
        ..EngineConfig::default()
    };
    assert!(matches!(
        Session::new(config),
        Err(EngineError::Config { .. })
    ));
}

#[test]
fn json_export_round_trips_the_filtered_records() {
    let mut session = loaded_session(inspection_records());
    session.set_filter(CanonicalField::Floor, ["3F"]);
    let text = session
        .export_filtered()
        .expect("export succeeds")
        .expect("records to export");
    let exported: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(
        exported,
        json!([
            {"楼宇": "B座", "楼层": "3F", "设备类型": "风机", "设备编号": "B-301", "位置": "屋面"},
            {"楼宇": "B座", "楼层": "3F", "设备类型": "消火栓", "设备编号": "B-302", "位置": ""}
        ])
    );
}

#[test]
fn json_export_keeps_nested_values_and_wide_integers() {
    let input = json!([{
        "楼宇": "A",
        "tags": ["x", "y"],
        "meta": {"k": 1},
        "big": 18446744073709551615u64
    }]);
    let mut session = loaded_session(input.clone());
    session.set_search_term("\"k\":1");
    let text = session
        .export_filtered()
        .expect("export succeeds")
        .expect("records to export");
    let exported: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(exported, input);
}

#[test]
fn csv_export_quotes_every_cell() {
    let mut session = loaded_session(inspection_records());
    session.set_search_term("B-1001");
    let text = session
        .export_filtered_as(ExportFormat::Csv, b',')
        .expect("export succeeds")
        .expect("records to export");
    assert_eq!(
        text,
        "\"楼宇\",\"楼层\",\"设备类型\",\"设备编号\"\n\"B座\",\"10F\",\"烟感\",\"B-1001\"\n"
    );
}

#[test]
fn empty_view_exports_nothing() {
    let mut session = loaded_session(inspection_records());
    session.set_search_term("no such device");
    assert_eq!(session.export_filtered().expect("no error"), None);
}
