//! 数学基础类型
//!
//! 基于 nalgebra 的二维点/向量别名，以及空间索引使用的轴对齐包围盒。

use serde::{Deserialize, Serialize};

/// 绘图平面上的点
pub type Point2 = nalgebra::Point2<f64>;

/// 绘图平面上的向量
pub type Vector2 = nalgebra::Vector2<f64>;

/// 通用浮点比较容差（仅用于测试和非捕捉逻辑）
pub const EPSILON: f64 = 1e-10;

/// 线段求交时判定平行的行列式阈值
pub const PARALLEL_EPSILON: f64 = 1e-10;

/// 两点间的欧氏距离
#[inline]
pub fn distance(a: &Point2, b: &Point2) -> f64 {
    (b - a).norm()
}

/// 轴对齐包围盒
///
/// 以左下角 `(x, y)` 和尺寸 `(width, height)` 表示。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Aabb {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 以中心点和总尺寸构造：`[center - extents/2, center + extents/2]`
    pub fn from_center_extents(center: Point2, extents: Vector2) -> Self {
        Self::new(
            center.x - extents.x / 2.0,
            center.y - extents.y / 2.0,
            extents.x,
            extents.y,
        )
    }

    /// 以点为中心、边长为 `2 * radius` 的正方形查询区域
    pub fn around(center: Point2, radius: f64) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            radius * 2.0,
            radius * 2.0,
        )
    }

    pub fn min(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn max(&self) -> Point2 {
        Point2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 是否完全包含另一个包围盒（边界重合也算包含）
    pub fn contains(&self, other: &Aabb) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// 是否与另一个包围盒相交（边界接触也算相交）
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }

    /// 均分为四个象限
    ///
    /// 顺序：左下、右下、左上、右上
    pub fn quadrants(&self) -> [Aabb; 4] {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [
            Aabb::new(self.x, self.y, hw, hh),
            Aabb::new(self.x + hw, self.y, hw, hh),
            Aabb::new(self.x, self.y + hh, hw, hh),
            Aabb::new(self.x + hw, self.y + hh, hw, hh),
        ]
    }

    /// 尺寸是否有效（有限且为正）
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_touching_edges() {
        let outer = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&Aabb::new(0.0, 0.0, 10.0, 10.0)));
        assert!(outer.contains(&Aabb::new(2.0, 2.0, 3.0, 3.0)));
        assert!(!outer.contains(&Aabb::new(8.0, 8.0, 3.0, 1.0)));
        assert!(!outer.contains(&Aabb::new(-0.1, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_intersects() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        // 仅边界接触
        assert!(a.intersects(&Aabb::new(10.0, 0.0, 5.0, 5.0)));
        assert!(a.intersects(&Aabb::new(5.0, 5.0, 1.0, 1.0)));
        assert!(!a.intersects(&Aabb::new(10.5, 0.0, 5.0, 5.0)));
        assert!(!a.intersects(&Aabb::new(0.0, -3.0, 5.0, 2.0)));
    }

    #[test]
    fn test_quadrants() {
        let q = Aabb::new(0.0, 0.0, 8.0, 4.0).quadrants();
        assert_eq!(q[0], Aabb::new(0.0, 0.0, 4.0, 2.0));
        assert_eq!(q[1], Aabb::new(4.0, 0.0, 4.0, 2.0));
        assert_eq!(q[2], Aabb::new(0.0, 2.0, 4.0, 2.0));
        assert_eq!(q[3], Aabb::new(4.0, 2.0, 4.0, 2.0));
    }

    #[test]
    fn test_from_center_extents() {
        let b = Aabb::from_center_extents(Point2::new(5.0, 5.0), Vector2::new(2.0, 4.0));
        assert_eq!(b.min(), Point2::new(4.0, 3.0));
        assert_eq!(b.max(), Point2::new(6.0, 7.0));
        assert_eq!(b.center(), Point2::new(5.0, 5.0));
    }
}
