//! 门标记（door tag）放置的纯几何内核。
//!
//! 本 crate 不做任何 I/O：给定门的几何记录、标记尺寸与视图比例，
//! 计算标记锚点、铰点以及旋转序列。宿主模型的读写由 `doortag-engine` 负责。

pub mod door;
pub mod placement;
pub mod rotation;
pub mod swing;

pub mod geometry {
    use std::f64::consts::{PI, TAU};
    use std::ops::{Add, Mul, Neg, Sub};

    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 模型内部长度单位（英尺）对应的毫米数。
    pub const MM_PER_MODEL_UNIT: f64 = 304.8;

    /// 将图纸毫米换算为模型长度单位。
    #[inline]
    pub fn mm_to_model_units(mm: f64) -> f64 {
        mm / MM_PER_MODEL_UNIT
    }

    /// 将角度差折算到 (-π, π] 区间。
    pub fn wrap_angle(radians: f64) -> f64 {
        let wrapped = (radians + PI).rem_euclid(TAU) - PI;
        if wrapped <= -PI { wrapped + TAU } else { wrapped }
    }

    /// 三维点，内部以 `glam::DVec3` 表示，与宿主模型的双精度坐标一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn origin() -> Self {
            Self(DVec3::ZERO)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point3) -> Vector3 {
            Vector3(other.0 - self.0)
        }

        #[inline]
        pub fn distance_to(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        /// 绕经过 `pivot` 的竖直轴（+Z）逆时针旋转 `degrees` 度，Z 坐标保持不变。
        pub fn rotate_about_vertical(self, pivot: Point3, degrees: f64) -> Self {
            let (sin, cos) = degrees.to_radians().sin_cos();
            let dx = self.0.x - pivot.0.x;
            let dy = self.0.y - pivot.0.y;
            Self(DVec3::new(
                pivot.0.x + dx * cos - dy * sin,
                pivot.0.y + dx * sin + dy * cos,
                self.0.z,
            ))
        }

        /// 点集平均值，空集返回 `None`。
        pub fn centroid(points: impl IntoIterator<Item = Point3>) -> Option<Self> {
            let mut sum = DVec3::ZERO;
            let mut count = 0usize;
            for point in points {
                sum += point.0;
                count += 1;
            }
            if count == 0 {
                None
            } else {
                Some(Self(sum / count as f64))
            }
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl Add<Vector3> for Point3 {
        type Output = Point3;

        fn add(self, rhs: Vector3) -> Self::Output {
            self.translate(rhs)
        }
    }

    impl Sub for Point3 {
        type Output = Vector3;

        fn sub(self, rhs: Point3) -> Self::Output {
            rhs.vector_to(self)
        }
    }

    /// 三维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn zero() -> Self {
            Self(DVec3::ZERO)
        }

        #[inline]
        pub fn unit_x() -> Self {
            Self(DVec3::X)
        }

        #[inline]
        pub fn unit_y() -> Self {
            Self(DVec3::Y)
        }

        #[inline]
        pub fn unit_z() -> Self {
            Self(DVec3::Z)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn abs(self) -> Self {
            Self(self.0.abs())
        }

        #[inline]
        pub fn is_almost_equal(self, other: Vector3, tolerance: f64) -> bool {
            self.0.abs_diff_eq(other.0, tolerance)
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl Add for Vector3 {
        type Output = Vector3;

        fn add(self, rhs: Vector3) -> Self::Output {
            Self(self.0 + rhs.0)
        }
    }

    impl Mul<f64> for Vector3 {
        type Output = Vector3;

        fn mul(self, rhs: f64) -> Self::Output {
            Self(self.0 * rhs)
        }
    }

    impl Neg for Vector3 {
        type Output = Vector3;

        fn neg(self) -> Self::Output {
            Self(-self.0)
        }
    }

    /// 族实例的局部正交基，只保留平面放置所需的 X/Y 轴。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Basis {
        pub x: Vector3,
        pub y: Vector3,
    }

    impl Basis {
        #[inline]
        pub fn new(x: Vector3, y: Vector3) -> Self {
            Self { x, y }
        }

        #[inline]
        pub fn identity() -> Self {
            Self {
                x: Vector3::unit_x(),
                y: Vector3::unit_y(),
            }
        }

        /// 以平面旋转角（度）构造基，常用于测试与示例模型。
        pub fn from_rotation_degrees(degrees: f64) -> Self {
            let (sin, cos) = degrees.to_radians().sin_cos();
            Self {
                x: Vector3::new(cos, sin, 0.0),
                y: Vector3::new(-sin, cos, 0.0),
            }
        }
    }

    impl Default for Basis {
        fn default() -> Self {
            Self::identity()
        }
    }

}
