//! 标记尺寸、铰点与锚点计算。
//!
//! 所有函数均为纯函数：相同的 (`DoorGeometry`, `TagDimensions`, 视图比例) 永远得到相同结果。

use serde::{Deserialize, Serialize};

use crate::door::DoorGeometry;
use crate::geometry::{Point3, mm_to_model_units};
use crate::swing::{SwingDescriptor, SwingKind};

/// 放置常量。默认值即生产使用的取值，可由配置覆盖。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementSettings {
    /// 平开门路径下标记与门扇之间的图纸间隙（毫米）。
    pub buffer_mm: f64,
    /// 小于该比例时间隙按比例线性缩小。
    pub buffer_reference_scale: u32,
    /// 标记宽度超过门扇宽度该比例时需要回退。
    pub tag_width_ratio: f64,
    pub tag_height_multiplier: f64,
    /// 推拉门/内藏门额外的纵向偏移（毫米）。
    pub sliding_height_adjustment_mm: f64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            buffer_mm: 40.0,
            buffer_reference_scale: 50,
            tag_width_ratio: 0.9,
            tag_height_multiplier: 0.5,
            sliding_height_adjustment_mm: 100.0,
        }
    }
}

impl PlacementSettings {
    /// 随比例变化的间隙，已换算为模型单位。
    pub fn dynamic_buffer(&self, view_scale: u32) -> f64 {
        let buffer_mm = if view_scale < self.buffer_reference_scale {
            self.buffer_mm * (f64::from(view_scale) / f64::from(self.buffer_reference_scale))
        } else {
            self.buffer_mm
        };
        mm_to_model_units(buffer_mm)
    }
}

/// 已按视图比例缩放的标记尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagDimensions {
    pub width: f64,
    pub height: f64,
}

impl TagDimensions {
    /// 由标记类型的基准尺寸与视图比例得到图面尺寸。非正比例属于调用方错误，此处不处理。
    #[inline]
    pub fn from_base(base_width: f64, base_height: f64, view_scale: u32) -> Self {
        let scale = f64::from(view_scale);
        Self {
            width: base_width * scale,
            height: base_height * scale,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// 放置结果：旋转前的锚点、铰点以及开启方式副本。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagPlacement {
    pub anchor_position: Point3,
    pub hinge_point: Point3,
    pub swing: SwingDescriptor,
}

/// 铰点 = 门扇位置 + X·(扇宽/2 − 转轴偏移) ± Y·(厚度/2)，镜像时 Y 项取反。
pub fn hinge_point(geometry: &DoorGeometry, panel_location: Point3) -> Point3 {
    let x_offset = geometry.basis.x * (geometry.panel_width / 2.0 - geometry.pivot_offset);
    let y_offset = geometry.basis.y * (geometry.thickness / 2.0);
    let y_offset = if geometry.mirrored { -y_offset } else { y_offset };
    panel_location + x_offset + y_offset
}

/// 平开门锚点在 Y 方向上的标量偏移。
pub fn hinged_y_value(
    geometry: &DoorGeometry,
    tag: &TagDimensions,
    settings: &PlacementSettings,
) -> f64 {
    let mut y_value = tag.width / 2.0 - geometry.pivot_offset;

    if tag.width > geometry.panel_width * settings.tag_width_ratio {
        let difference = geometry.panel_width - tag.width;
        let adjustment = if difference < 0.0 {
            difference.abs() * 2.0
        } else {
            difference
        };
        y_value -= adjustment;
    }

    y_value
}

/// 平开/地弹门：从铰点沿 −X 让出门厚、间隙与半个标记高度，再沿 Y 偏移。
pub fn hinged_anchor(
    geometry: &DoorGeometry,
    tag: &TagDimensions,
    kind: SwingKind,
    hinge: Point3,
    view_scale: u32,
    settings: &PlacementSettings,
) -> Point3 {
    let thickness_offset = if kind == SwingKind::Pivot {
        geometry.thickness / 2.0
    } else {
        geometry.thickness
    };
    let buffer = settings.dynamic_buffer(view_scale);

    let x_offset = -(geometry.basis.x * (thickness_offset + buffer + tag.height / 2.0));
    let y_offset = geometry.basis.y * hinged_y_value(geometry, tag, settings);
    let y_offset = if geometry.mirrored { -y_offset } else { y_offset };

    hinge + x_offset + y_offset
}

/// 折叠、推拉及未知类型：以门位置为基准沿 Y 偏移。
///
/// 与平开路径相反，这里在 **未镜像** 时对 Y 偏移取反。
pub fn non_hinge_anchor(
    geometry: &DoorGeometry,
    tag: &TagDimensions,
    view_scale: u32,
    settings: &PlacementSettings,
) -> Point3 {
    let height_adjustment_mm =
        if geometry.family_ends_with("Sliding") || geometry.family_ends_with("Pocket") {
            settings.sliding_height_adjustment_mm
        } else {
            0.0
        };
    let dynamic_scale = settings.tag_height_multiplier * (f64::from(view_scale) / 100.0);

    let y_offset = geometry.basis.y
        * (tag.height * dynamic_scale + mm_to_model_units(height_adjustment_mm));
    let y_offset = if geometry.mirrored { y_offset } else { -y_offset };

    geometry.panel_location + y_offset
}

/// 按开启方式分派到两种锚点算法。
pub fn calculate_placement(
    geometry: &DoorGeometry,
    panel_location: Point3,
    swing: SwingDescriptor,
    tag: &TagDimensions,
    view_scale: u32,
    settings: &PlacementSettings,
) -> TagPlacement {
    let hinge = hinge_point(geometry, panel_location);
    let anchor_position = if swing.kind.is_hinge_like() {
        hinged_anchor(geometry, tag, swing.kind, hinge, view_scale, settings)
    } else {
        non_hinge_anchor(geometry, tag, view_scale, settings)
    };

    TagPlacement {
        anchor_position,
        hinge_point: hinge,
        swing,
    }
}
