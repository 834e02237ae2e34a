//! 标记旋转序列的组合与纯预览。
//!
//! 序列总是从“零旋转基线”出发构造：宿主墙平面角 → 平开门的 90° 初始转角 →
//! 绕铰点的开启角修正。前两步以标记自身为轴心，只改朝向；第三步轴心为铰点，会移动标记。

use serde::{Deserialize, Serialize};

use crate::geometry::Point3;
use crate::placement::TagPlacement;

/// 平开/地弹门在宿主角之上追加的初始转角（度）。
pub const INITIAL_HINGE_ROTATION_DEGREES: f64 = 90.0;

/// 小于该值（度）的开启角修正视为无需旋转。
const SWING_DELTA_EPSILON: f64 = 0.001;

/// 单步旋转：绕经过 `pivot` 的竖直轴转 `degrees` 度（逆时针为正）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationStep {
    pub pivot: Point3,
    pub degrees: f64,
}

impl RotationStep {
    #[inline]
    pub fn new(pivot: Point3, degrees: f64) -> Self {
        Self { pivot, degrees }
    }

    #[inline]
    pub fn apply_to(&self, point: Point3) -> Point3 {
        point.rotate_about_vertical(self.pivot, self.degrees)
    }

    #[inline]
    pub fn radians(&self) -> f64 {
        self.degrees.to_radians()
    }
}

/// 开启角对应的修正角，镜像时取反。
pub fn swing_delta(angle: i32, mirrored: bool) -> f64 {
    let delta = match angle {
        45 => 45.0,
        135 => -45.0,
        180 => -90.0,
        _ => return 0.0,
    };
    if mirrored { -delta } else { delta }
}

/// 完整旋转方案：有序步骤，以及据此推得的最终位置与角度。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPlan {
    pub anchor_position: Point3,
    pub steps: Vec<RotationStep>,
    pub final_position: Point3,
    pub final_rotation_degrees: f64,
}

impl RotationPlan {
    /// 由放置结果、宿主平面角（度）与镜像标志组合旋转序列。
    pub fn compose(placement: &TagPlacement, host_rotation_degrees: f64, mirrored: bool) -> Self {
        let anchor = placement.anchor_position;
        let mut steps = vec![RotationStep::new(anchor, host_rotation_degrees)];

        if placement.swing.kind.is_hinge_like() {
            steps.push(RotationStep::new(anchor, INITIAL_HINGE_ROTATION_DEGREES));

            let delta = swing_delta(placement.swing.angle, mirrored);
            if delta.abs() > SWING_DELTA_EPSILON {
                steps.push(RotationStep::new(placement.hinge_point, delta));
            }
        }

        let (final_position, final_rotation_degrees) = preview(anchor, &steps);
        Self {
            anchor_position: anchor,
            steps,
            final_position,
            final_rotation_degrees,
        }
    }

    #[inline]
    pub fn final_rotation_radians(&self) -> f64 {
        self.final_rotation_degrees.to_radians()
    }

    /// 是否包含会移动标记位置的绕铰点步骤。
    pub fn moves_head(&self) -> bool {
        self.steps.iter().any(|step| step.pivot != self.anchor_position)
    }
}

/// 不修改任何状态地推演步骤序列，返回 (最终位置, 累计角度)。
pub fn preview(start: Point3, steps: &[RotationStep]) -> (Point3, f64) {
    steps.iter().fold((start, 0.0), |(position, degrees), step| {
        (step.apply_to(position), degrees + step.degrees)
    })
}
