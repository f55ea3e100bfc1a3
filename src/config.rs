//! Engine configuration: alias lists, synthetic column names, paging and
//! placeholder text.
//!
//! Every field has a default, so a YAML file only needs to name what it
//! changes:
//!
//! ```yaml
//! page_size: 20
//! aliases:
//!   building: [楼宇名称, 楼宇, building]
//! placeholders:
//!   unclassified: 未分类
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::{EngineError, EngineResult},
    mapping::CanonicalField,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_PAGE_WINDOW: usize = 5;
pub const DEFAULT_GROUP_PREVIEW_LIMIT: usize = 5;
pub const DEFAULT_PLAN_TOPIC_COLUMN: &str = "具体巡检计划主题";
pub const DEFAULT_DEVICE_TYPE_COLUMN: &str = "设备类型";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aliases: AliasTable,
    /// Column whose value seeds the synthetic device-type column during normalization.
    pub plan_topic_column: String,
    /// Name of the synthetic device-type column injected during normalization.
    pub device_type_column: String,
    pub page_size: usize,
    pub page_window: usize,
    pub group_preview_limit: usize,
    pub placeholders: Placeholders,
    /// When false, applying a field filter drops the active search term.
    pub keep_search_on_filter_change: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aliases: AliasTable::default(),
            plan_topic_column: DEFAULT_PLAN_TOPIC_COLUMN.to_string(),
            device_type_column: DEFAULT_DEVICE_TYPE_COLUMN.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page_window: DEFAULT_PAGE_WINDOW,
            group_preview_limit: DEFAULT_GROUP_PREVIEW_LIMIT,
            placeholders: Placeholders::default(),
            keep_search_on_filter_change: false,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: EngineConfig =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML string")
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.page_size == 0 {
            return Err(EngineError::config("page_size must be at least 1"));
        }
        if self.page_window == 0 {
            return Err(EngineError::config("page_window must be at least 1"));
        }
        if self.device_type_column.trim().is_empty() {
            return Err(EngineError::config("device_type_column cannot be empty"));
        }
        for field in CanonicalField::ALL {
            if self.aliases.for_field(field).iter().any(|a| a.is_empty()) {
                return Err(EngineError::config(format!(
                    "alias list for {field} contains an empty alias"
                )));
            }
        }
        Ok(())
    }
}

/// Known column-name spellings per canonical field, highest priority first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTable {
    pub building: Vec<String>,
    pub floor: Vec<String>,
    pub device_type: Vec<String>,
    pub device_id: Vec<String>,
    pub location: Vec<String>,
}

impl AliasTable {
    pub fn for_field(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Building => &self.building,
            CanonicalField::Floor => &self.floor,
            CanonicalField::DeviceType => &self.device_type,
            CanonicalField::DeviceId => &self.device_id,
            CanonicalField::Location => &self.location,
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            building: owned(&[
                "楼宇", "建筑", "建筑物", "building", "buildings", "buildingName", "楼宇名称",
                "楼宇名",
            ]),
            floor: owned(&[
                "楼层", "层", "层数", "floor", "floors", "floorNumber", "楼层号", "层号",
            ]),
            device_type: owned(&[
                "设备类型",
                "类型",
                "设备种类",
                "deviceType",
                "device_type",
                "type",
                "equipment",
                "equipmentType",
                "巡检设备",
                "设备",
                "具体巡检计划主题",
            ]),
            device_id: owned(&[
                "设备编号",
                "编号",
                "设备号",
                "deviceId",
                "device_id",
                "id",
                "equipmentId",
                "equipment_id",
                "code",
                "序号",
            ]),
            location: owned(&[
                "位置",
                "位置描述",
                "安装位置",
                "location",
                "position",
                "address",
                "installLocation",
                "巡检点位",
                "点位",
                "所在区域",
                "region",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    pub unclassified: String,
    pub unknown_building: String,
    pub unknown_floor: String,
    pub unknown_type: String,
    pub unknown: String,
    pub no_location: String,
    pub not_provided: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            unclassified: "Unclassified".to_string(),
            unknown_building: "UnknownBuilding".to_string(),
            unknown_floor: "UnknownFloor".to_string(),
            unknown_type: "UnknownType".to_string(),
            unknown: "Unknown".to_string(),
            no_location: "NoLocation".to_string(),
            not_provided: "NotProvided".to_string(),
        }
    }
}
