//! 均匀网格索引
//!
//! 平面被划分为边长 `cell_size` 的正方形网格，网格坐标为整数 `(cx, cy)`，
//! 没有边界。对象登记在其包围盒覆盖的每一个网格单元中。

use super::{is_finite_placement, IndexError, IndexedObject, SpatialIndex};
use crate::math::{distance, Aabb, Point2, Vector2};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, warn};

/// 单个对象最多登记的网格单元数，超过时改为登记在 `oversized` 中
const MAX_OBJECT_CELLS: u128 = 4096;

/// 均匀网格索引
#[derive(Debug, Clone)]
pub struct UniformGridIndex<K = String> {
    /// 网格单元大小
    cell_size: f64,

    /// 网格映射：网格坐标 -> 对象ID列表
    cells: HashMap<(i64, i64), Vec<K>>,

    /// 对象表
    objects: HashMap<K, IndexedObject<K>>,

    /// 覆盖网格单元过多的对象，每次查询都作为候选
    oversized: HashSet<K>,
}

impl<K: Clone + Eq + Hash> UniformGridIndex<K> {
    /// 创建新的网格索引
    ///
    /// `cell_size` 必须为正的有限值。
    pub fn new(cell_size: f64) -> Result<Self, IndexError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(IndexError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            objects: HashMap::new(),
            oversized: HashSet::new(),
        })
    }

    /// 非空网格单元的数量
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// 将世界坐标转换为网格坐标
    fn to_cell_coord(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// 包围盒覆盖的网格坐标范围（闭区间）
    fn cell_range(&self, bounds: &Aabb) -> ((i64, i64), (i64, i64)) {
        let min = bounds.min();
        let max = bounds.max();
        (
            self.to_cell_coord(min.x, min.y),
            self.to_cell_coord(max.x, max.y),
        )
    }

    /// 获取包围盒覆盖的所有网格单元
    fn cells_for_bounds(&self, bounds: &Aabb) -> Vec<(i64, i64)> {
        let ((min_cx, min_cy), (max_cx, max_cy)) = self.cell_range(bounds);

        let mut cells = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                cells.push((cx, cy));
            }
        }
        cells
    }

    /// 包围盒覆盖的网格单元数量（不分配）
    fn cell_span(&self, bounds: &Aabb) -> u128 {
        let ((min_cx, min_cy), (max_cx, max_cy)) = self.cell_range(bounds);
        let w = u128::from(max_cx.abs_diff(min_cx)) + 1;
        let h = u128::from(max_cy.abs_diff(min_cy)) + 1;
        w * h
    }

    /// 登记到对象包围盒覆盖的网格单元
    fn register(&mut self, object: &IndexedObject<K>) {
        let bounds = object.bounds();
        let span = self.cell_span(&bounds);
        if span > MAX_OBJECT_CELLS {
            debug!(cells = %span, "object too large for grid cells, kept as oversized");
            self.oversized.insert(object.id.clone());
            return;
        }

        for cell in self.cells_for_bounds(&bounds) {
            let bucket = self.cells.entry(cell).or_default();
            if !bucket.contains(&object.id) {
                bucket.push(object.id.clone());
            }
        }
    }

    /// 从对象包围盒覆盖的网格单元中注销，空单元一并删除
    fn deregister(&mut self, object: &IndexedObject<K>) {
        if self.oversized.remove(&object.id) {
            return;
        }

        for cell in self.cells_for_bounds(&object.bounds()) {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|id| id != &object.id);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// 区域查询：包围盒与 `rect` 相交的所有对象，每个对象只出现一次
    pub fn query_rect(&self, rect: &Aabb) -> Vec<&IndexedObject<K>> {
        self.candidates(rect)
            .into_iter()
            .filter(|obj| obj.bounds().intersects(rect))
            .collect()
    }

    /// 收集 `region` 覆盖的网格单元中登记的对象（去重，未做精确过滤）
    fn candidates(&self, region: &Aabb) -> Vec<&IndexedObject<K>> {
        // 查询范围远大于对象数量时直接遍历对象表
        if self.cell_span(region) > self.objects.len() as u128 {
            return self.objects.values().collect();
        }

        let mut result = Vec::new();
        let mut seen = HashSet::new();

        for cell in self.cells_for_bounds(region) {
            if let Some(ids) = self.cells.get(&cell) {
                for id in ids {
                    if seen.insert(id) {
                        if let Some(obj) = self.objects.get(id) {
                            result.push(obj);
                        }
                    }
                }
            }
        }

        result.extend(self.oversized.iter().filter_map(|id| self.objects.get(id)));
        result
    }
}

impl<K: Clone + Eq + Hash> SpatialIndex<K> for UniformGridIndex<K> {
    fn add(&mut self, id: K, position: Point2, extents: Vector2) {
        if !is_finite_placement(&position, &extents) {
            warn!(
                x = position.x,
                y = position.y,
                width = extents.x,
                height = extents.y,
                "ignoring non-finite object in grid index"
            );
            return;
        }

        // 先移除旧的（如果存在），避免残留在旧网格单元中
        self.remove(&id);

        let object = IndexedObject::new(id.clone(), position, extents);
        self.register(&object);
        self.objects.insert(id, object);
    }

    fn remove(&mut self, id: &K) {
        if let Some(object) = self.objects.remove(id) {
            self.deregister(&object);
        }
    }

    fn update(&mut self, id: &K, position: Point2) {
        if !(position.x.is_finite() && position.y.is_finite()) {
            warn!(x = position.x, y = position.y, "ignoring non-finite grid index update");
            return;
        }
        let Some(mut object) = self.objects.remove(id) else {
            return;
        };
        self.deregister(&object);
        object.position = position;
        self.register(&object);
        self.objects.insert(id.clone(), object);
    }

    fn get_nearby(&self, point: &Point2, radius: f64) -> Vec<&IndexedObject<K>> {
        if radius.is_nan() {
            return Vec::new();
        }
        if radius == f64::INFINITY {
            return self.objects.values().collect();
        }

        self.candidates(&Aabb::around(*point, radius))
            .into_iter()
            .filter(|obj| distance(point, &obj.position) <= radius)
            .collect()
    }

    fn clear(&mut self) {
        debug!(objects = self.objects.len(), "clearing grid index");
        self.cells.clear();
        self.objects.clear();
        self.oversized.clear();
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn get(&self, id: &K) -> Option<&IndexedObject<K>> {
        self.objects.get(id)
    }
}
