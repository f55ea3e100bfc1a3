#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use inspection_view::{ingest::Payload, session::Session};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Serializes `value` as pretty JSON into `name`.
    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let text = serde_json::to_string_pretty(value).expect("serialize json");
        self.write(name, &text)
    }
}

/// Eight inspection records across two buildings using Chinese column names.
pub fn inspection_records() -> Value {
    json!([
        {"楼宇": "A座", "楼层": "1F", "设备类型": "烟感", "设备编号": "A-101", "位置": "大堂"},
        {"楼宇": "A座", "楼层": "2F", "设备类型": "烟感", "设备编号": "A-201", "位置": "走廊"},
        {"楼宇": "A座", "楼层": "2F", "设备类型": "消火栓", "设备编号": "A-202", "位置": "楼梯间"},
        {"楼宇": "A座", "楼层": "B1", "设备类型": "风机", "设备编号": "A-B01", "位置": "机房"},
        {"楼宇": "B座", "楼层": "1F", "设备类型": "烟感", "设备编号": "B-101", "位置": "near A-101"},
        {"楼宇": "B座", "楼层": "3F", "设备类型": "风机", "设备编号": "B-301", "位置": "屋面"},
        {"楼宇": "B座", "楼层": "3F", "设备类型": "消火栓", "设备编号": "B-302", "位置": ""},
        {"楼宇": "B座", "楼层": "10F", "设备类型": "烟感", "设备编号": "B-1001"}
    ])
}

pub fn loaded_session(records: Value) -> Session {
    let mut session = Session::default();
    session
        .load(Payload::from_json(records))
        .expect("load records");
    session
}
