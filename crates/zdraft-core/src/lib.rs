//! ZDraft 核心：空间索引与精确捕捉引擎
//!
//! 绘制墙体时，光标每移动一次都需要：
//! - 把原始光标位置解析为对齐到已有几何（端点、交点、网格、正交/45° 约束）的位置
//! - 快速回答“这个点附近有哪些已有几何”
//!
//! # 架构设计
//!
//! - `math` / `geometry`: 点、线段、包围盒等基础图元
//! - `spatial`: 两种可互换的空间索引（均匀网格、四叉树）
//! - `snap`: 捕捉解析器，按固定顺序求值五种捕捉模式
//! - `session`: 跨线程共享解析器时的读写锁封装
//!
//! # 示例
//!
//! ```rust
//! use zdraft_core::prelude::*;
//!
//! let mut resolver = SnapResolver::new();
//! resolver.add_node(Point2::new(5.0, 5.0), Some("wall-1:start"));
//!
//! let result = resolver.resolve(Point2::new(5.1, 4.9), &[]);
//! assert_eq!(result.mode, Some(SnapMode::Node));
//! assert_eq!(result.position, Point2::new(5.0, 5.0));
//! ```

pub mod geometry;
pub mod math;
pub mod session;
pub mod snap;
pub mod spatial;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::geometry::{segment_intersection, Segment2D, SnapNode};
    pub use crate::math::{Aabb, Point2, Vector2};
    pub use crate::session::SharedSnapResolver;
    pub use crate::snap::{
        ConfigError, SnapConfiguration, SnapMode, SnapModes, SnapResolver, SnapResult,
    };
    pub use crate::spatial::{
        HierarchicalIndex, IndexError, IndexedObject, SpatialIndex, UniformGridIndex,
    };
}
