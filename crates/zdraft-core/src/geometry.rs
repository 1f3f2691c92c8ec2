//! 捕捉几何图元
//!
//! - 捕捉节点 (SnapNode)：可捕捉的点，例如墙体端点
//! - 参考线段 (Segment2D)：例如已有墙体的中心线
//!
//! 以及捕捉计算用到的几何辅助函数。

use crate::math::{Point2, PARALLEL_EPSILON};
use serde::{Deserialize, Serialize};

/// 捕捉节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapNode {
    pub position: Point2,
    pub id: String,
}

impl SnapNode {
    pub fn new(position: Point2, id: impl Into<String>) -> Self {
        Self {
            position,
            id: id.into(),
        }
    }
}

/// 参考线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment2D {
    pub start: Point2,
    pub end: Point2,
    pub id: String,
}

impl Segment2D {
    pub fn new(start: Point2, end: Point2, id: impl Into<String>) -> Self {
        Self {
            start,
            end,
            id: id.into(),
        }
    }

    /// 参数 `t` 处的点（`t = 0` 为起点，`t = 1` 为终点）
    pub fn point_at(&self, t: f64) -> Point2 {
        self.start + (self.end - self.start) * t
    }
}

/// 线段-线段交点
///
/// 求解 `a.start + t * da = b.start + u * db`。行列式绝对值小于
/// [`PARALLEL_EPSILON`] 时视为平行，返回 `None`；只接受 `t`、`u` 都在
/// `[0, 1]` 内的真实线段交点。
pub fn segment_intersection(a: &Segment2D, b: &Segment2D) -> Option<Point2> {
    let d1 = a.end - a.start;
    let d2 = b.end - b.start;

    let cross = d1.x * d2.y - d1.y * d2.x;

    // 平行或近似平行
    if cross.abs() < PARALLEL_EPSILON {
        return None;
    }

    let d = b.start - a.start;
    let t = (d.x * d2.y - d.y * d2.x) / cross;
    let u = (d.x * d1.y - d.y * d1.x) / cross;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a.point_at(t))
    } else {
        None
    }
}

/// 最近的网格点（分量各自四舍五入到 `spacing` 的整数倍）
pub fn nearest_grid_point(point: &Point2, spacing: f64) -> Point2 {
    Point2::new(
        (point.x / spacing).round() * spacing,
        (point.y / spacing).round() * spacing,
    )
}

/// 45° 方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    /// 沿 (1, 1) 方向
    Rising,
    /// 沿 (1, -1) 方向
    Falling,
}

/// 将 `point` 投影到经过 `origin` 的 45° 射线上
pub fn project_to_diagonal(origin: &Point2, point: &Point2, diagonal: Diagonal) -> Point2 {
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    match diagonal {
        Diagonal::Rising => {
            let avg = (dx + dy) / 2.0;
            Point2::new(origin.x + avg, origin.y + avg)
        }
        Diagonal::Falling => {
            let avg = (dx - dy) / 2.0;
            Point2::new(origin.x + avg, origin.y - avg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment2D {
        Segment2D::new(Point2::new(x1, y1), Point2::new(x2, y2), "s")
    }

    #[test]
    fn test_segment_intersection() {
        let p = segment_intersection(&seg(0.0, 0.0, 10.0, 10.0), &seg(0.0, 10.0, 10.0, 0.0)).unwrap();
        assert!((p.x - 5.0).abs() < EPSILON);
        assert!((p.y - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_segment_intersection_at_endpoint() {
        // T 形连接：交点恰好在一条线段的端点上
        let p = segment_intersection(&seg(0.0, 0.0, 10.0, 0.0), &seg(5.0, 0.0, 5.0, 5.0)).unwrap();
        assert!((p.x - 5.0).abs() < EPSILON);
        assert!(p.y.abs() < EPSILON);
    }

    #[test]
    fn test_segment_intersection_outside_segments() {
        // 所在直线相交，但交点不在线段上
        assert!(segment_intersection(&seg(0.0, 0.0, 1.0, 0.0), &seg(5.0, -1.0, 5.0, 1.0)).is_none());
    }

    #[test]
    fn test_parallel_segments_rejected() {
        assert!(segment_intersection(&seg(0.0, 0.0, 10.0, 0.0), &seg(0.0, 1.0, 10.0, 1.0)).is_none());
        // 共线重叠同样视为平行
        assert!(segment_intersection(&seg(0.0, 0.0, 10.0, 0.0), &seg(5.0, 0.0, 15.0, 0.0)).is_none());
        // 退化线段（长度为零）
        assert!(segment_intersection(&seg(1.0, 1.0, 1.0, 1.0), &seg(0.0, 0.0, 2.0, 2.0)).is_none());
    }

    #[test]
    fn test_nearest_grid_point() {
        let p = nearest_grid_point(&Point2::new(1.23, 2.78), 0.1);
        assert!((p.x - 1.2).abs() < EPSILON);
        assert!((p.y - 2.8).abs() < EPSILON);

        let p = nearest_grid_point(&Point2::new(-3.4, 7.6), 2.0);
        assert!((p.x + 4.0).abs() < EPSILON);
        assert!((p.y - 8.0).abs() < EPSILON);
    }

    #[test]
    fn test_project_to_diagonal() {
        let origin = Point2::new(1.0, 1.0);
        let p = project_to_diagonal(&origin, &Point2::new(4.0, 6.0), Diagonal::Rising);
        assert!((p.x - 5.0).abs() < EPSILON);
        assert!((p.y - 5.0).abs() < EPSILON);

        let p = project_to_diagonal(&origin, &Point2::new(4.0, -2.0), Diagonal::Falling);
        assert!((p.x - 4.0).abs() < EPSILON);
        assert!((p.y + 2.0).abs() < EPSILON);
    }
}
