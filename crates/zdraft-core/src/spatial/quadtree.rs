//! 四叉树索引
//!
//! 有界区域的递归四分。对象存放在能完整容纳其包围盒的最深节点上，
//! 跨越分割线的对象留在公共祖先节点，不拆分也不复制。
//!
//! 节点存放在一个数组（arena）中，以下标互相引用，清空时只需截断数组。

use super::{is_finite_placement, IndexError, IndexedObject, SpatialIndex};
use crate::math::{distance, Aabb, Point2, Vector2};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

/// 节点句柄（arena 下标）
type NodeId = usize;

const ROOT: NodeId = 0;

/// 四叉树节点
#[derive(Debug, Clone)]
struct QuadNode<K> {
    bounds: Aabb,
    depth: usize,
    /// 直接存放在本节点的对象
    items: Vec<K>,
    /// 四个子节点：左下、右下、左上、右上
    children: Option<[NodeId; 4]>,
}

impl<K> QuadNode<K> {
    fn new(bounds: Aabb, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }
}

/// 四叉树空间索引
#[derive(Debug, Clone)]
pub struct HierarchicalIndex<K = String> {
    nodes: Vec<QuadNode<K>>,

    /// 对象表
    objects: HashMap<K, IndexedObject<K>>,

    /// 对象所在节点
    locations: HashMap<K, NodeId>,

    /// 节点在分裂前最多容纳的对象数
    max_objects: usize,

    /// 最大深度（根节点深度为 0）
    max_depth: usize,
}

impl<K: Clone + Eq + Hash> HierarchicalIndex<K> {
    /// 创建新的四叉树
    ///
    /// `bounds` 必须有正的有限尺寸，`max_objects` 和 `max_depth` 至少为 1。
    pub fn new(bounds: Aabb, max_objects: usize, max_depth: usize) -> Result<Self, IndexError> {
        if !bounds.is_valid() {
            return Err(IndexError::InvalidBounds {
                x: bounds.x,
                y: bounds.y,
                width: bounds.width,
                height: bounds.height,
            });
        }
        if max_objects == 0 {
            return Err(IndexError::InvalidMaxObjects);
        }
        if max_depth == 0 {
            return Err(IndexError::InvalidMaxDepth);
        }

        Ok(Self {
            nodes: vec![QuadNode::new(bounds, 0)],
            objects: HashMap::new(),
            locations: HashMap::new(),
            max_objects,
            max_depth,
        })
    }

    /// 根节点范围
    pub fn bounds(&self) -> Aabb {
        self.nodes[ROOT].bounds
    }

    /// 节点总数
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 所有节点上存放的对象总数
    pub fn stored_objects(&self) -> usize {
        self.nodes.iter().map(|node| node.items.len()).sum()
    }

    /// 对象的包围盒是否完全落在根节点范围内
    pub fn contains(&self, object: &IndexedObject<K>) -> bool {
        self.bounds().contains(&object.bounds())
    }

    /// 插入对象；同一 ID 已存在时先移除旧对象
    ///
    /// 超出根节点范围的对象不会被拒绝，而是留在根节点。
    pub fn insert(&mut self, object: IndexedObject<K>) {
        self.detach(&object.id);

        let id = object.id.clone();
        let bounds = object.bounds();
        self.objects.insert(id.clone(), object);
        self.place(ROOT, id, &bounds);
    }

    /// 从 `start` 开始向下寻找能完整容纳 `bounds` 的最深节点
    fn place(&mut self, start: NodeId, id: K, bounds: &Aabb) {
        let mut current = start;
        loop {
            if let Some(children) = self.nodes[current].children {
                let fit = children
                    .into_iter()
                    .find(|&child| self.nodes[child].bounds.contains(bounds));
                match fit {
                    Some(child) => current = child,
                    None => {
                        self.store(current, id);
                        return;
                    }
                }
                continue;
            }

            self.store(current, id);

            let node = &self.nodes[current];
            if node.items.len() > self.max_objects && node.depth < self.max_depth {
                self.subdivide(current);
            }
            return;
        }
    }

    fn store(&mut self, node: NodeId, id: K) {
        self.nodes[node].items.push(id.clone());
        self.locations.insert(id, node);
    }

    /// 分裂为四个等大的子节点，并重新分配本节点的对象
    fn subdivide(&mut self, node: NodeId) {
        let quadrants = self.nodes[node].bounds.quadrants();
        let depth = self.nodes[node].depth + 1;

        let first = self.nodes.len();
        self.nodes
            .extend(quadrants.into_iter().map(|q| QuadNode::new(q, depth)));
        self.nodes[node].children = Some([first, first + 1, first + 2, first + 3]);

        let items = std::mem::take(&mut self.nodes[node].items);
        debug!(node, depth, objects = items.len(), "subdividing quadtree node");

        for id in items {
            let Some(bounds) = self.objects.get(&id).map(IndexedObject::bounds) else {
                continue;
            };
            self.place(node, id, &bounds);
        }
    }

    /// 从所在节点移除对象
    fn detach(&mut self, id: &K) -> Option<IndexedObject<K>> {
        if let Some(node) = self.locations.remove(id) {
            self.nodes[node].items.retain(|item| item != id);
        }
        self.objects.remove(id)
    }

    /// 收集可能与 `search` 相交的对象
    ///
    /// 节点上直接存放的对象无条件加入结果，只有子节点按范围剪枝，
    /// 调用方需要自行做精确过滤。
    pub fn retrieve(&self, search: &Aabb) -> Vec<&IndexedObject<K>> {
        let mut result = Vec::new();
        self.retrieve_into(search, &mut result);
        result
    }

    /// 同 [`retrieve`](Self::retrieve)，结果追加到 `result`
    pub fn retrieve_into<'a>(&'a self, search: &Aabb, result: &mut Vec<&'a IndexedObject<K>>) {
        let mut stack = vec![ROOT];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            result.extend(node.items.iter().filter_map(|id| self.objects.get(id)));

            if let Some(children) = node.children {
                for child in children.into_iter().rev() {
                    if self.nodes[child].bounds.intersects(search) {
                        stack.push(child);
                    }
                }
            }
        }
    }

    /// 以 `point` 为中心、边长 `2 * radius` 的正方形范围调用 [`retrieve`](Self::retrieve)
    ///
    /// 半径为正无穷时返回全部对象，为 NaN 时返回空。
    pub fn retrieve_near(&self, point: &Point2, radius: f64) -> Vec<&IndexedObject<K>> {
        if radius.is_nan() {
            return Vec::new();
        }
        if radius == f64::INFINITY {
            return self.objects.values().collect();
        }
        self.retrieve(&Aabb::around(*point, radius))
    }
}

impl<K: Clone + Eq + Hash> SpatialIndex<K> for HierarchicalIndex<K> {
    fn add(&mut self, id: K, position: Point2, extents: Vector2) {
        if !is_finite_placement(&position, &extents) {
            warn!(
                x = position.x,
                y = position.y,
                width = extents.x,
                height = extents.y,
                "ignoring non-finite object in quadtree"
            );
            return;
        }
        self.insert(IndexedObject::new(id, position, extents));
    }

    fn remove(&mut self, id: &K) {
        self.detach(id);
    }

    fn update(&mut self, id: &K, position: Point2) {
        if !(position.x.is_finite() && position.y.is_finite()) {
            warn!(x = position.x, y = position.y, "ignoring non-finite quadtree update");
            return;
        }
        if let Some(mut object) = self.detach(id) {
            object.position = position;
            self.insert(object);
        }
    }

    fn get_nearby(&self, point: &Point2, radius: f64) -> Vec<&IndexedObject<K>> {
        self.retrieve_near(point, radius)
            .into_iter()
            .filter(|obj| distance(point, &obj.position) <= radius)
            .collect()
    }

    fn clear(&mut self) {
        debug!(
            nodes = self.nodes.len(),
            objects = self.objects.len(),
            "clearing quadtree"
        );
        self.nodes.truncate(1);
        let root = &mut self.nodes[ROOT];
        root.items.clear();
        root.children = None;
        self.objects.clear();
        self.locations.clear();
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn get(&self, id: &K) -> Option<&IndexedObject<K>> {
        self.objects.get(id)
    }
}
