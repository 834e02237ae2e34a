//! 宿主模型边界：查询接口与标注读写接口。
//!
//! 引擎只通过这里的 trait 访问模型，所有返回值都是按值拷贝的快照，
//! 便于在同一扇门的处理过程中先读取、后写入。

use std::collections::BTreeMap;
use std::fmt;

use doortag_core::geometry::{Basis, Point3};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 提供原始数值，便于序列化或日志输出。
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

/// 按名称索引的参数集合。缺失参数按 0 / false 处理。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParameterValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_number(self, name: impl Into<String>, value: f64) -> Self {
        self.with(name, ParameterValue::Number(value))
    }

    pub fn with_flag(self, name: impl Into<String>, value: bool) -> Self {
        self.with(name, ParameterValue::Flag(value))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.0.insert(name.into(), value);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    pub fn double(&self, name: &str) -> f64 {
        match self.0.get(name) {
            Some(ParameterValue::Number(value)) => *value,
            _ => 0.0,
        }
    }

    /// 是/否参数在宿主中以整数 1/0 存储，这里同时接受布尔值。
    pub fn flag(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(ParameterValue::Flag(value)) => *value,
            Some(ParameterValue::Number(value)) => (*value - 1.0).abs() < f64::EPSILON,
            _ => false,
        }
    }
}

/// 门实例的只读快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorElement {
    pub id: ElementId,
    pub family_name: String,
    #[serde(default)]
    pub type_parameters: ParameterSet,
    #[serde(default)]
    pub instance_parameters: ParameterSet,
    #[serde(default)]
    pub basis: Basis,
    #[serde(default)]
    pub mirrored: bool,
    #[serde(default)]
    pub location: Option<Point3>,
    #[serde(default)]
    pub host: Option<ElementId>,
    /// "Plan Swing" 参数所引用嵌套类型的族名。
    #[serde(default)]
    pub plan_swing: Option<String>,
    /// 嵌套子构件（门扇等）。
    #[serde(default)]
    pub sub_components: Vec<ElementId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub start: Point3,
    pub end: Point3,
}

impl Edge {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }
}

/// 幕墙网格单元，`panel` 为填充该单元的嵌板（或门）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurtainCell {
    pub panel: ElementId,
    pub boundary: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallElement {
    pub id: ElementId,
    pub family_name: String,
    #[serde(default)]
    pub type_parameters: ParameterSet,
    #[serde(default)]
    pub curtain_cells: Vec<CurtainCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    FloorPlan,
    Section,
    Elevation,
    Sheet,
    Other,
}

impl ViewKind {
    /// 图纸上可展开并逐一标注的视图类型。
    #[inline]
    pub fn is_taggable(self) -> bool {
        matches!(self, ViewKind::FloorPlan | ViewKind::Section | ViewKind::Elevation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub id: ElementId,
    pub name: String,
    pub kind: ViewKind,
    pub scale: u32,
}

/// 门标记类型，基准尺寸为 1:1 时的模型长度。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagType {
    pub id: ElementId,
    pub name: String,
    pub base_width: f64,
    pub base_height: f64,
}

/// 视图中已有标记及其引用的元素。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: ElementId,
    pub tagged: Vec<ElementId>,
}

/// 标注子系统持有的可变状态，跨轮次保留身份。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagState {
    pub head_position: Point3,
    /// 相对未旋转放置的角度（弧度）。
    pub rotation_angle: f64,
}

/// 模型查询接口。
pub trait ModelQuery {
    fn view(&self, id: ElementId) -> Option<ViewInfo>;
    /// 图纸上放置的视图，未经类型过滤。
    fn views_on_sheet(&self, sheet: ElementId) -> Vec<ElementId>;
    fn doors_in_view(&self, view: ElementId) -> Vec<ElementId>;
    fn door(&self, id: ElementId) -> Option<DoorElement>;
    fn wall(&self, id: ElementId) -> Option<WallElement>;
    fn contains_element(&self, id: ElementId) -> bool;
    fn component_location(&self, id: ElementId) -> Option<Point3>;
    fn door_tag_types(&self) -> Vec<TagType>;
    /// 元素绕竖直轴的平面旋转角（度），派生规则由宿主决定。
    fn planar_rotation(&self, element: ElementId) -> f64;
}

/// 标注创建与修改接口。
pub trait AnnotationStore {
    fn tags_in_view(&self, view: ElementId) -> Vec<TagRecord>;
    fn tag_state(&self, tag: ElementId) -> Option<TagState>;
    fn create_tag(
        &mut self,
        view: ElementId,
        tag_type: ElementId,
        door: ElementId,
        head: Point3,
    ) -> Result<ElementId, EngineError>;
    fn set_tag_head(&mut self, tag: ElementId, head: Point3) -> Result<(), EngineError>;
    /// 绕经过 `pivot` 的竖直轴旋转标记（弧度）。
    fn rotate_tag(&mut self, tag: ElementId, pivot: Point3, radians: f64)
        -> Result<(), EngineError>;
}

/// 同时具备查询与标注能力的宿主。
pub trait HostModel: ModelQuery + AnnotationStore {}

impl<T: ModelQuery + AnnotationStore + ?Sized> HostModel for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_set_defaults_missing_values() {
        let params = ParameterSet::new()
            .with_number("Thickness", 0.15)
            .with_number("Fixed Frame", 1.0)
            .with_flag("Show Door Frame Insert", true)
            .with("Mark", ParameterValue::Text("D01".to_string()));

        assert!((params.double("Thickness") - 0.15).abs() < f64::EPSILON);
        assert_eq!(params.double("Pivot Offset"), 0.0);
        assert_eq!(params.double("Mark"), 0.0);
        assert!(params.flag("Fixed Frame"));
        assert!(params.flag("Show Door Frame Insert"));
        assert!(!params.flag("Missing"));
        assert!(!params.flag("Thickness"));
    }

    #[test]
    fn only_plan_section_elevation_are_taggable() {
        assert!(ViewKind::FloorPlan.is_taggable());
        assert!(ViewKind::Section.is_taggable());
        assert!(ViewKind::Elevation.is_taggable());
        assert!(!ViewKind::Sheet.is_taggable());
        assert!(!ViewKind::Other.is_taggable());
    }
}
