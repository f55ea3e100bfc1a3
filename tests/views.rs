mod common;

use inspection_view::{
    mapping::{CanonicalField, MappingOverride},
    record::RawRecord,
};
use proptest::prelude::*;
use serde_json::{Value, json};

use common::{inspection_records, loaded_session};

fn fire_and_hvac() -> Value {
    let records = (0..12)
        .map(|n| {
            let kind = if n % 2 == 0 && n < 10 { "Fire" } else { "HVAC" };
            json!({"设备类型": kind, "楼宇": "HQ", "楼层": format!("{}F", n % 4 + 1)})
        })
        .collect::<Vec<_>>();
    Value::Array(records)
}

#[test]
fn device_groups_preview_their_first_members() {
    let session = loaded_session(fire_and_hvac());
    let view = session.build_device_type_view();

    let sizes = view
        .groups
        .iter()
        .map(|group| (group.name.as_str(), group.count()))
        .collect::<Vec<_>>();
    assert_eq!(sizes, vec![("Fire", 5), ("HVAC", 7)]);
    assert_eq!(view.total(), 12);

    let builder = session.view_builder();
    let fire = &view.groups[0];
    let hvac = &view.groups[1];
    assert_eq!(builder.device_entries(fire, view.preview_limit).len(), 5);
    assert_eq!(fire.more_indicator(view.preview_limit), None);
    assert_eq!(builder.device_entries(hvac, view.preview_limit).len(), 5);
    assert_eq!(
        hvac.more_indicator(view.preview_limit).as_deref(),
        Some("+2 more")
    );
}

#[test]
fn device_entries_fall_back_to_positional_labels() {
    let session = loaded_session(fire_and_hvac());
    let view = session.build_device_type_view();
    let entries = session.view_builder().device_entries(&view.groups[1], 3);
    let labels = entries
        .iter()
        .map(|entry| entry.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["Device 1", "Device 2", "Device 3"]);
    assert!(entries.iter().all(|entry| entry.building == "HQ"));
}

#[test]
fn unmapped_device_type_groups_everything_as_unclassified() {
    let mut session = loaded_session(inspection_records());
    session.set_mapping_override(&MappingOverride::new().clear(CanonicalField::DeviceType));
    let view = session.build_device_type_view();
    assert_eq!(view.groups.len(), 1);
    assert_eq!(view.groups[0].name, "Unclassified");
    assert_eq!(view.groups[0].count(), 8);
}

#[test]
fn location_tree_keeps_first_seen_order() {
    let session = loaded_session(inspection_records());
    let tree = session.build_location_tree_view();

    let outline = tree
        .buildings
        .iter()
        .map(|building| {
            let floors = building
                .floors
                .iter()
                .map(|floor| format!("{}:{}", floor.name, floor.members.len()))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}[{}] {floors}", building.name, building.device_count())
        })
        .collect::<Vec<_>>();
    assert_eq!(
        outline,
        vec!["A座[4] 1F:1,2F:2,B1:1", "B座[4] 1F:1,3F:2,10F:1"]
    );
}

#[test]
fn location_entries_fall_back_to_device_id() {
    let session = loaded_session(inspection_records());
    let tree = session.build_location_tree_view();
    let builder = session.view_builder();
    let b_floors = &tree.buildings[1].floors;

    let third = builder.location_entry(b_floors[1].members[1]);
    assert_eq!(third.device_type, "消火栓");
    assert_eq!(third.location, "ID: B-302");

    let tenth = builder.location_entry(b_floors[2].members[0]);
    assert_eq!(tenth.location, "ID: B-1001");

    let bare = RawRecord::from_pairs([("楼宇", inspection_view::record::Value::Absent)]);
    let entry = builder.location_entry(&bare);
    assert_eq!(entry.device_type, "UnknownType");
    assert_eq!(entry.location, "NoLocation");
}

#[test]
fn table_rows_use_placeholders_for_blank_cells() {
    let session = loaded_session(inspection_records());
    let table = session.build_table_view(1);
    assert_eq!(table.rows.len(), 8);
    assert_eq!(table.rows[0].index, 1);
    assert_eq!(
        table.rows[6].cells(),
        vec!["7", "消火栓", "B座", "3F", "Unknown", "B-302"]
    );
    assert_eq!(table.rows[7].location, "Unknown");
}

#[test]
fn record_details_hide_internal_columns() {
    let session = loaded_session(json!([
        {"设备类型": "风机", "_row": 4, "index": 0, "备注": "", "编号": "F-1"}
    ]));
    let details = session.record_details(1).expect("row exists");
    assert_eq!(details.title, "风机 details");
    assert_eq!(
        details.rows,
        vec![
            ("设备类型".to_string(), "风机".to_string()),
            ("备注".to_string(), "NotProvided".to_string()),
            ("编号".to_string(), "F-1".to_string()),
        ]
    );
}

proptest! {
    #[test]
    fn every_record_lands_in_exactly_one_group(
        kinds in proptest::collection::vec(prop_oneof![Just("烟感"), Just("风机"), Just(""), Just("水泵")], 0..40)
    ) {
        let records = kinds
            .iter()
            .map(|kind| json!({"设备类型": kind, "楼宇": "HQ"}))
            .collect::<Vec<_>>();
        let session = loaded_session(Value::Array(records));
        let filtered = session.compute_filtered_view();
        let view = session.build_device_type_view();

        prop_assert_eq!(view.total(), filtered.len());
        let mut seen = view
            .groups
            .iter()
            .flat_map(|group| group.members.iter().map(|record| *record as *const RawRecord))
            .collect::<Vec<_>>();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), filtered.len());
    }
}
