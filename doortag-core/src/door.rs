use serde::{Deserialize, Serialize};

use crate::geometry::{Basis, Point3};

pub const BASIC_WALL_FAMILY: &str = "Basic Wall";
pub const CURTAIN_WALL_FAMILY: &str = "Curtain Wall";

const DOUBLE_DOOR_SEGMENT: &str = "Double";
const UNEQUAL_DOOR_SEGMENT: &str = "Unequal";

/// 宿主墙的族分类，决定读取哪一组参数名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostFamilyKind {
    BasicWall,
    CurtainWall,
    Other,
}

/// 各宿主族对应的参数名与读取规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostParameterTable {
    /// 总宽度是否取自实例参数（幕墙门的宽度随嵌板变化）。
    pub width_from_instance: bool,
    pub frame_depth: &'static str,
    pub fixed_frame_flag: &'static str,
    /// 是否读取宿主墙类型的 "Width"。
    pub reads_host_width: bool,
}

const CURTAIN_TABLE: HostParameterTable = HostParameterTable {
    width_from_instance: true,
    frame_depth: "Frame Depth",
    fixed_frame_flag: "Show Door Frame Insert",
    reads_host_width: false,
};

const BASIC_TABLE: HostParameterTable = HostParameterTable {
    width_from_instance: false,
    frame_depth: "Fixed Frame Depth",
    fixed_frame_flag: "Fixed Frame",
    reads_host_width: true,
};

const OTHER_TABLE: HostParameterTable = HostParameterTable {
    reads_host_width: false,
    ..BASIC_TABLE
};

impl HostFamilyKind {
    pub fn from_family_name(name: &str) -> Self {
        match name {
            BASIC_WALL_FAMILY => HostFamilyKind::BasicWall,
            CURTAIN_WALL_FAMILY => HostFamilyKind::CurtainWall,
            _ => HostFamilyKind::Other,
        }
    }

    #[inline]
    pub fn is_curtain(self) -> bool {
        self == HostFamilyKind::CurtainWall
    }

    pub fn parameters(self) -> &'static HostParameterTable {
        match self {
            HostFamilyKind::CurtainWall => &CURTAIN_TABLE,
            HostFamilyKind::BasicWall => &BASIC_TABLE,
            HostFamilyKind::Other => &OTHER_TABLE,
        }
    }
}

/// 幕墙门嵌板宽度的输入参数。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CurtainPanelInputs {
    pub instance_width: f64,
    /// 门框嵌件厚度，仅当嵌件可见时为 `Some`。
    pub frame_insert: Option<f64>,
    /// 不等宽双开门中 B 扇的宽度。
    pub sibling_panel_width: f64,
}

/// 幕墙门的有效门扇宽度。
///
/// 族名按 `-` 切分：少于三段时直接返回实例宽度；第三段为 `Double` 且末段不是
/// `Unequal` 时减半；末段为 `Unequal` 时扣除 B 扇宽度并补回一个嵌件厚度。
pub fn curtain_panel_width(family_name: &str, inputs: CurtainPanelInputs) -> f64 {
    let segments: Vec<&str> = family_name.split('-').collect();
    let mut width = inputs.instance_width;
    if segments.len() < 3 {
        return width;
    }

    if let Some(insert) = inputs.frame_insert {
        width -= insert * 2.0;
    }

    let unequal = segments.last() == Some(&UNEQUAL_DOOR_SEGMENT);
    if segments[2] == DOUBLE_DOOR_SEGMENT && !unequal {
        width /= 2.0;
    }

    if unequal {
        width -= inputs.sibling_panel_width;
        if let Some(insert) = inputs.frame_insert {
            width += insert;
        }
    }

    width
}

/// 每次同步时从当前模型重新推导的门几何记录，不做跨轮缓存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorGeometry {
    pub total_width: f64,
    pub panel_width: f64,
    pub thickness: f64,
    pub frame_depth: f64,
    pub pivot_offset: f64,
    /// 非 Basic Wall 宿主恒为 0。
    pub host_wall_width: f64,
    pub mirrored: bool,
    pub has_fixed_frame: bool,
    pub panel_location: Point3,
    pub family_name: String,
    pub basis: Basis,
}

impl DoorGeometry {
    /// 检查 `panel_width <= total_width` 且 `thickness > 0`。
    pub fn is_consistent(&self) -> bool {
        self.panel_width <= self.total_width + f64::EPSILON && self.thickness > 0.0
    }

    #[inline]
    pub fn family_ends_with(&self, suffix: &str) -> bool {
        self.family_name.ends_with(suffix)
    }
}
