//! 共享捕捉会话
//!
//! 当登记表的修改（例如后台重建）和 resolve 发生在不同线程时使用。
//! 所有访问经过同一把读写锁：一批修改在一次写锁内完成，resolve 看到的
//! 要么是修改前的状态，要么是修改后的状态，不会看到中间状态。

use crate::math::Point2;
use crate::snap::{SnapResolver, SnapResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// 可在线程间共享的捕捉解析器句柄
#[derive(Debug, Clone, Default)]
pub struct SharedSnapResolver {
    inner: Arc<RwLock<SnapResolver>>,
}

impl SharedSnapResolver {
    pub fn new(resolver: SnapResolver) -> Self {
        Self {
            inner: Arc::new(RwLock::new(resolver)),
        }
    }

    /// 在一次写锁内执行一组修改
    pub fn batch<R>(&self, f: impl FnOnce(&mut SnapResolver) -> R) -> R {
        let mut resolver = self.inner.write();
        f(&mut resolver)
    }

    /// 解析捕捉位置并记录最近一次捕捉信息（独占访问）
    pub fn resolve(&self, point: Point2, reference_points: &[Point2]) -> SnapResult {
        self.inner.write().resolve(point, reference_points)
    }

    /// 只计算不记录，多个线程可以同时调用
    pub fn evaluate(&self, point: &Point2, reference_points: &[Point2]) -> SnapResult {
        self.inner.read().evaluate(point, reference_points)
    }

    pub fn last_snap_info(&self) -> Option<SnapResult> {
        self.inner.read().last_snap_info().cloned()
    }

    /// 当前状态的完整副本
    pub fn snapshot(&self) -> SnapResolver {
        self.inner.read().clone()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl From<SnapResolver> for SharedSnapResolver {
    fn from(resolver: SnapResolver) -> Self {
        Self::new(resolver)
    }
}
