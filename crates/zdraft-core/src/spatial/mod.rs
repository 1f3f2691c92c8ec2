//! 空间索引
//!
//! 两种可互换的实现满足同一套接口（[`SpatialIndex`]）：
//! - [`UniformGridIndex`]：固定尺寸的均匀网格，增量更新代价低，适合频繁移动的对象
//! - [`HierarchicalIndex`]：四叉树递归划分，适合分布不均的静态数据
//!
//! 两者都支持：
//! - 插入 / 删除 / 移动
//! - 半径范围查询（精确距离过滤）

mod grid;
mod quadtree;

pub use grid::UniformGridIndex;
pub use quadtree::HierarchicalIndex;

use crate::math::{Aabb, Point2, Vector2};
use std::hash::Hash;
use thiserror::Error;

/// 索引构造错误
///
/// 只在构造时出现（编程错误），运行期的增删改查不会返回错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Invalid cell size: {0} (must be positive and finite)")]
    InvalidCellSize(f64),

    #[error("Invalid max objects per node: must be at least 1")]
    InvalidMaxObjects,

    #[error("Invalid max depth: must be at least 1")]
    InvalidMaxDepth,

    #[error("Invalid bounds: {width}x{height} at ({x}, {y})")]
    InvalidBounds {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// 被索引的对象：ID + 中心位置 + 尺寸
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedObject<K> {
    pub id: K,
    pub position: Point2,
    pub extents: Vector2,
}

impl<K> IndexedObject<K> {
    pub fn new(id: K, position: Point2, extents: Vector2) -> Self {
        Self {
            id,
            position,
            extents,
        }
    }

    /// 对象的包围盒 `[position - extents/2, position + extents/2]`
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_extents(self.position, self.extents)
    }
}

/// 位置和尺寸是否都是有限值
///
/// 两种实现都拒绝非有限的位置或尺寸（记录警告并忽略该次操作）。
pub(crate) fn is_finite_placement(position: &Point2, extents: &Vector2) -> bool {
    position.x.is_finite()
        && position.y.is_finite()
        && extents.x.is_finite()
        && extents.y.is_finite()
}

/// 空间索引的公共接口
///
/// 未知 ID 的删除和移动都是空操作，非有限的位置或尺寸同样被忽略。
pub trait SpatialIndex<K: Clone + Eq + Hash> {
    /// 添加对象；同一 ID 已存在时替换旧对象
    fn add(&mut self, id: K, position: Point2, extents: Vector2);

    /// 删除对象
    fn remove(&mut self, id: &K);

    /// 移动对象到新位置（尺寸不变）
    fn update(&mut self, id: &K, position: Point2);

    /// 查找中心到 `point` 的距离不超过 `radius` 的所有对象，每个对象只出现一次
    fn get_nearby(&self, point: &Point2, radius: f64) -> Vec<&IndexedObject<K>>;

    /// 清空索引
    fn clear(&mut self);

    /// 对象数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按 ID 获取对象
    fn get(&self, id: &K) -> Option<&IndexedObject<K>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 两种实现对同一组操作给出相同的查询结果
    fn exercise(index: &mut dyn SpatialIndex<u32>) -> Vec<u32> {
        for i in 0..40u32 {
            let x = f64::from(i % 8) * 12.5;
            let y = f64::from(i / 8) * 20.0;
            index.add(i, Point2::new(x, y), Vector2::new(3.0, 3.0));
        }
        index.remove(&3);
        index.remove(&999);
        index.update(&4, Point2::new(51.0, 41.0));
        index.update(&1000, Point2::new(0.0, 0.0));

        let mut ids: Vec<u32> = index
            .get_nearby(&Point2::new(50.0, 40.0), 15.0)
            .into_iter()
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn brute_force() -> Vec<u32> {
        let center = Point2::new(50.0, 40.0);
        let mut ids: Vec<u32> = (0..40u32)
            .filter(|&i| i != 3)
            .filter(|&i| {
                let p = if i == 4 {
                    Point2::new(51.0, 41.0)
                } else {
                    Point2::new(f64::from(i % 8) * 12.5, f64::from(i / 8) * 20.0)
                };
                (p - center).norm() <= 15.0
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_strategies_agree() {
        let mut grid = UniformGridIndex::new(10.0).unwrap();
        let mut tree =
            HierarchicalIndex::new(Aabb::new(-10.0, -10.0, 120.0, 120.0), 4, 6).unwrap();

        let expected = brute_force();
        assert!(!expected.is_empty());
        assert_eq!(exercise(&mut grid), expected);
        assert_eq!(exercise(&mut tree), expected);
        assert_eq!(grid.len(), 39);
        assert_eq!(SpatialIndex::len(&tree), 39);
    }

    fn both_strategies() -> Vec<Box<dyn SpatialIndex<u32>>> {
        let grid = UniformGridIndex::<u32>::new(10.0).unwrap();
        let tree =
            HierarchicalIndex::<u32>::new(Aabb::new(0.0, 0.0, 100.0, 100.0), 2, 4).unwrap();
        let grid: Box<dyn SpatialIndex<u32>> = Box::new(grid);
        let tree: Box<dyn SpatialIndex<u32>> = Box::new(tree);
        vec![grid, tree]
    }

    #[test]
    fn test_infinite_radius_returns_everything() {
        for mut index in both_strategies() {
            for i in 0..12u32 {
                let p = f64::from(i) * 8.0 + 1.0;
                index.add(i, Point2::new(p, p), Vector2::new(1.0, 1.0));
            }
            // 跨越中心分割线，留在根节点
            index.add(100, Point2::new(50.0, 50.0), Vector2::new(4.0, 4.0));

            let mut ids: Vec<u32> = index
                .get_nearby(&Point2::new(30.0, 30.0), f64::INFINITY)
                .into_iter()
                .map(|o| o.id)
                .collect();
            ids.sort_unstable();
            assert_eq!(ids.len(), 13);
            assert_eq!(ids.last(), Some(&100));

            assert!(index.get_nearby(&Point2::new(30.0, 30.0), f64::NAN).is_empty());
        }
    }

    #[test]
    fn test_non_finite_placement_ignored() {
        for mut index in both_strategies() {
            index.add(1, Point2::new(0.0, 0.0), Vector2::new(f64::INFINITY, 1.0));
            index.add(2, Point2::new(f64::NAN, 5.0), Vector2::new(1.0, 1.0));
            index.add(3, Point2::new(5.0, 5.0), Vector2::new(1.0, 1.0));
            assert_eq!(index.len(), 1);

            // 非有限的新位置不移动对象
            index.update(&3, Point2::new(f64::NEG_INFINITY, 5.0));
            assert_eq!(index.get(&3).map(|o| o.position), Some(Point2::new(5.0, 5.0)));

            // 已有对象不会被非有限的重新添加替换掉
            index.add(3, Point2::new(5.0, f64::NAN), Vector2::new(1.0, 1.0));
            assert_eq!(index.len(), 1);
            assert_eq!(index.get_nearby(&Point2::new(5.0, 5.0), 0.5).len(), 1);
        }
    }

    #[test]
    fn test_indexed_object_bounds() {
        let obj = IndexedObject::new(1u32, Point2::new(2.0, 3.0), Vector2::new(4.0, 2.0));
        assert_eq!(obj.bounds(), Aabb::new(0.0, 2.0, 4.0, 2.0));
    }
}
