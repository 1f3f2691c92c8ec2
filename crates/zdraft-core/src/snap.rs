//! 精确捕捉系统
//!
//! 绘制墙体时，每一帧把原始光标位置解析为捕捉后的位置。
//!
//! 支持的捕捉模式（按固定顺序求值）：
//! 1. 节点 (Node)：已登记的点，例如墙体端点
//! 2. 交点 (Intersection)：已登记线段两两之间的交点
//! 3. 网格 (Grid)：规则网格点
//! 4. 正交 (Orthogonal)：与参考点水平/垂直对齐
//! 5. 45° 斜向 (Diagonal45)：与参考点成 ±45° 对齐
//!
//! 前三种模式只接受严格更近的候选，并收紧最小距离；正交和斜向模式
//! 与进入这两步之前的最小距离比较，接受后不再收紧，因此斜向结果可以
//! 覆盖更近的正交结果。

use crate::geometry::{
    nearest_grid_point, project_to_diagonal, segment_intersection, Diagonal, Segment2D, SnapNode,
};
use crate::math::{distance, Point2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// 捕捉模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    /// 节点捕捉
    Node,
    /// 交点捕捉
    Intersection,
    /// 网格捕捉
    Grid,
    /// 正交捕捉
    Orthogonal,
    /// 45° 斜向捕捉
    Diagonal45,
}

impl SnapMode {
    /// 按求值顺序排列的全部模式
    pub const ALL: [SnapMode; 5] = [
        SnapMode::Node,
        SnapMode::Intersection,
        SnapMode::Grid,
        SnapMode::Orthogonal,
        SnapMode::Diagonal45,
    ];

    /// 获取捕捉模式的名称
    pub fn name(&self) -> &'static str {
        match self {
            SnapMode::Node => "节点",
            SnapMode::Intersection => "交点",
            SnapMode::Grid => "网格",
            SnapMode::Orthogonal => "正交",
            SnapMode::Diagonal45 => "45°",
        }
    }

    /// 配置与接口中使用的标识
    pub fn key(&self) -> &'static str {
        match self {
            SnapMode::Node => "node",
            SnapMode::Intersection => "intersection",
            SnapMode::Grid => "grid",
            SnapMode::Orthogonal => "orthogonal",
            SnapMode::Diagonal45 => "diagonal45",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            SnapMode::Node => SnapModes::NODE,
            SnapMode::Intersection => SnapModes::INTERSECTION,
            SnapMode::Grid => SnapModes::GRID,
            SnapMode::Orthogonal => SnapModes::ORTHOGONAL,
            SnapMode::Diagonal45 => SnapModes::DIAGONAL45,
        }
    }
}

impl fmt::Display for SnapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 未知的捕捉模式名称
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown snap mode: {0}")]
pub struct UnknownSnapMode(pub String);

impl FromStr for SnapMode {
    type Err = UnknownSnapMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SnapMode::ALL
            .into_iter()
            .find(|mode| mode.key() == s)
            .ok_or_else(|| UnknownSnapMode(s.to_string()))
    }
}

/// 捕捉模式掩码（位域，用于快速启用/禁用捕捉模式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapModes {
    bits: u8,
}

impl SnapModes {
    pub const NODE: u8 = 1 << 0;
    pub const INTERSECTION: u8 = 1 << 1;
    pub const GRID: u8 = 1 << 2;
    pub const ORTHOGONAL: u8 = 1 << 3;
    pub const DIAGONAL45: u8 = 1 << 4;

    pub const NONE: SnapModes = SnapModes { bits: 0 };
    pub const ALL: SnapModes = SnapModes {
        bits: Self::NODE | Self::INTERSECTION | Self::GRID | Self::ORTHOGONAL | Self::DIAGONAL45,
    };

    pub fn new(bits: u8) -> Self {
        Self {
            bits: bits & Self::ALL.bits,
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_enabled(&self, mode: SnapMode) -> bool {
        self.bits & mode.bit() != 0
    }

    pub fn set(&mut self, mode: SnapMode, enabled: bool) {
        if enabled {
            self.bits |= mode.bit();
        } else {
            self.bits &= !mode.bit();
        }
    }

    pub fn toggle(&mut self, mode: SnapMode) {
        let enabled = self.is_enabled(mode);
        self.set(mode, !enabled);
    }

    /// 只启用给定模式
    pub fn only(mode: SnapMode) -> Self {
        Self { bits: mode.bit() }
    }
}

impl Default for SnapModes {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<SnapMode> for SnapModes {
    fn from_iter<I: IntoIterator<Item = SnapMode>>(iter: I) -> Self {
        let mut modes = SnapModes::NONE;
        for mode in iter {
            modes.set(mode, true);
        }
        modes
    }
}

/// 配置校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid tolerance: {0} (must be finite and non-negative)")]
    InvalidTolerance(f64),

    #[error("Invalid grid size: {0} (must be positive and finite)")]
    InvalidGridSize(f64),
}

/// 捕捉配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfiguration {
    /// 捕捉容差（绘图平面单位），即初始的最小距离
    pub tolerance: f64,
    /// 网格间距
    pub grid_size: f64,
    /// 启用的捕捉模式
    pub enabled_modes: SnapModes,
    /// 总开关
    pub enabled: bool,
}

impl SnapConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_tolerance(self.tolerance) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if !is_valid_grid_size(self.grid_size) {
            return Err(ConfigError::InvalidGridSize(self.grid_size));
        }
        Ok(())
    }
}

impl Default for SnapConfiguration {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            grid_size: 0.5,
            enabled_modes: SnapModes::default(),
            enabled: true,
        }
    }
}

fn is_valid_tolerance(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn is_valid_grid_size(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// 捕捉结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    /// 捕捉后的位置
    pub position: Point2,
    /// 生效的捕捉模式，`None` 表示未捕捉
    pub mode: Option<SnapMode>,
    /// 来源节点的ID（仅节点捕捉）
    pub source_id: Option<String>,
}

impl SnapResult {
    /// 未捕捉：原样返回输入点
    pub fn unsnapped(position: Point2) -> Self {
        Self {
            position,
            mode: None,
            source_id: None,
        }
    }

    fn snapped(position: Point2, mode: SnapMode, source_id: Option<String>) -> Self {
        Self {
            position,
            mode: Some(mode),
            source_id,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.mode.is_some()
    }
}

/// 捕捉解析器
///
/// 持有捕捉节点和参考线段的登记表以及捕捉配置，每个绘图会话一个实例。
/// 所有操作都不会失败：未知ID和未知模式名称直接忽略。
#[derive(Debug, Clone, Default)]
pub struct SnapResolver {
    config: SnapConfiguration,
    nodes: Vec<SnapNode>,
    lines: Vec<Segment2D>,
    /// 最近一次 resolve 的结果
    last_snap: Option<SnapResult>,
}

impl SnapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定配置创建，配置无效时返回错误
    pub fn with_config(config: SnapConfiguration) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// 获取配置
    pub fn config(&self) -> &SnapConfiguration {
        &self.config
    }

    pub fn nodes(&self) -> &[SnapNode] {
        &self.nodes
    }

    pub fn lines(&self) -> &[Segment2D] {
        &self.lines
    }

    pub fn node(&self, id: &str) -> Option<&SnapNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn line(&self, id: &str) -> Option<&Segment2D> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// 登记捕捉节点，返回其ID
    ///
    /// 未提供ID时生成一个；ID已存在时原位替换。
    pub fn add_node(&mut self, position: Point2, id: Option<&str>) -> String {
        let id = id.map_or_else(generate_id, str::to_string);
        let node = SnapNode::new(position, id.clone());

        match self.nodes.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
        debug!(%id, x = position.x, y = position.y, "snap node registered");
        id
    }

    /// 移除捕捉节点，返回是否存在
    pub fn remove_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != id);
        before != self.nodes.len()
    }

    /// 登记参考线段，返回其ID
    ///
    /// 未提供ID时生成一个；ID已存在时原位替换。
    pub fn add_line(&mut self, start: Point2, end: Point2, id: Option<&str>) -> String {
        let id = id.map_or_else(generate_id, str::to_string);
        let line = Segment2D::new(start, end, id.clone());

        match self.lines.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
        debug!(%id, "snap line registered");
        id
    }

    /// 移除参考线段，返回是否存在
    pub fn remove_line(&mut self, id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.id != id);
        before != self.lines.len()
    }

    pub fn set_mode(&mut self, mode: SnapMode, enabled: bool) {
        self.config.enabled_modes.set(mode, enabled);
    }

    /// 按名称设置捕捉模式，未知名称忽略
    pub fn set_mode_by_name(&mut self, name: &str, enabled: bool) {
        match name.parse::<SnapMode>() {
            Ok(mode) => self.set_mode(mode, enabled),
            Err(err) => debug!("ignoring set_mode: {}", err),
        }
    }

    pub fn is_mode_enabled(&self, mode: SnapMode) -> bool {
        self.config.enabled_modes.is_enabled(mode)
    }

    /// 设置捕捉容差，无效值（负数、NaN、无穷）忽略
    pub fn set_tolerance(&mut self, tolerance: f64) {
        if is_valid_tolerance(tolerance) {
            self.config.tolerance = tolerance;
        } else {
            warn!(tolerance, "ignoring invalid snap tolerance");
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    /// 设置网格间距，无效值（非正数、NaN、无穷）忽略
    pub fn set_grid_size(&mut self, grid_size: f64) {
        if is_valid_grid_size(grid_size) {
            self.config.grid_size = grid_size;
        } else {
            warn!(grid_size, "ignoring invalid grid size");
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// 最近一次 [`resolve`](Self::resolve) 的结果
    pub fn last_snap_info(&self) -> Option<&SnapResult> {
        self.last_snap.as_ref()
    }

    /// 清空所有节点和线段，并重置最近一次捕捉信息（配置保留）
    pub fn clear(&mut self) {
        debug!(
            nodes = self.nodes.len(),
            lines = self.lines.len(),
            "clearing snap registries"
        );
        self.nodes.clear();
        self.lines.clear();
        self.last_snap = None;
    }

    /// 解析捕捉位置，并记录为最近一次捕捉信息
    ///
    /// `reference_points` 为正在绘制的实体上的点（例如墙体起点），只用于
    /// 正交和斜向模式；为空时这两种模式不参与。
    pub fn resolve(&mut self, point: Point2, reference_points: &[Point2]) -> SnapResult {
        let result = self.evaluate(&point, reference_points);
        trace!(
            x = result.position.x,
            y = result.position.y,
            mode = ?result.mode,
            "snap resolved"
        );
        self.last_snap = Some(result.clone());
        result
    }

    /// 计算捕捉结果，不修改解析器状态
    pub fn evaluate(&self, point: &Point2, reference_points: &[Point2]) -> SnapResult {
        let mut best = SnapResult::unsnapped(*point);
        if !self.config.enabled {
            return best;
        }

        let modes = self.config.enabled_modes;
        let mut min_distance = self.config.tolerance;

        if modes.is_enabled(SnapMode::Node) {
            self.snap_to_nodes(point, &mut best, &mut min_distance);
        }
        if modes.is_enabled(SnapMode::Intersection) {
            self.snap_to_intersections(point, &mut best, &mut min_distance);
        }
        if modes.is_enabled(SnapMode::Grid) {
            self.snap_to_grid(point, &mut best, &mut min_distance);
        }

        // 以下两步只读取 min_distance，不再收紧
        if modes.is_enabled(SnapMode::Orthogonal) {
            snap_orthogonal(point, reference_points, &mut best, min_distance);
        }
        if modes.is_enabled(SnapMode::Diagonal45) {
            snap_diagonal(reference_points, &mut best, min_distance);
        }

        best
    }

    fn snap_to_nodes(&self, point: &Point2, best: &mut SnapResult, min_distance: &mut f64) {
        let mut nearest: Option<&SnapNode> = None;
        for node in &self.nodes {
            let dist = distance(point, &node.position);
            if dist < *min_distance {
                *min_distance = dist;
                nearest = Some(node);
            }
        }

        if let Some(node) = nearest {
            *best = SnapResult::snapped(node.position, SnapMode::Node, Some(node.id.clone()));
        }
    }

    fn snap_to_intersections(&self, point: &Point2, best: &mut SnapResult, min_distance: &mut f64) {
        // 双重循环检查所有线段对
        for (i, a) in self.lines.iter().enumerate() {
            for b in &self.lines[i + 1..] {
                let Some(intersection) = segment_intersection(a, b) else {
                    continue;
                };

                let dist = distance(point, &intersection);
                if dist < *min_distance {
                    *min_distance = dist;
                    // 交点涉及两条线段，不记录来源
                    *best = SnapResult::snapped(intersection, SnapMode::Intersection, None);
                }
            }
        }
    }

    fn snap_to_grid(&self, point: &Point2, best: &mut SnapResult, min_distance: &mut f64) {
        let grid_point = nearest_grid_point(point, self.config.grid_size);
        let dist = distance(point, &grid_point);
        if dist < *min_distance {
            *min_distance = dist;
            *best = SnapResult::snapped(grid_point, SnapMode::Grid, None);
        }
    }
}

/// 正交捕捉：对每个参考点，取水平/垂直两个候选中离输入点更近的一个
fn snap_orthogonal(
    point: &Point2,
    reference_points: &[Point2],
    best: &mut SnapResult,
    min_distance: f64,
) {
    for reference in reference_points {
        let horizontal = Point2::new(reference.x, best.position.y);
        let vertical = Point2::new(best.position.x, reference.y);

        let dist_h = distance(point, &horizontal);
        let dist_v = distance(point, &vertical);
        let (candidate, dist) = if dist_h <= dist_v {
            (horizontal, dist_h)
        } else {
            (vertical, dist_v)
        };

        if dist < min_distance {
            *best = SnapResult::snapped(candidate, SnapMode::Orthogonal, None);
        }
    }
}

/// 45° 斜向捕捉：对每个参考点，取偏差较小的一条斜线（+45° 优先），
/// 偏差 `|dx - dy|` 或 `|dx + dy|` 小于最小距离时投影到该斜线上
fn snap_diagonal(reference_points: &[Point2], best: &mut SnapResult, min_distance: f64) {
    for reference in reference_points {
        let dx = best.position.x - reference.x;
        let dy = best.position.y - reference.y;

        let rising = (dx - dy).abs();
        let falling = (dx + dy).abs();
        let (diagonal, offset) = if rising <= falling {
            (Diagonal::Rising, rising)
        } else {
            (Diagonal::Falling, falling)
        };

        if offset < min_distance {
            let candidate = project_to_diagonal(reference, &best.position, diagonal);
            *best = SnapResult::snapped(candidate, SnapMode::Diagonal45, None);
        }
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
