//! ZDraft 演示程序入口
//! 模拟一次墙体绘制：登记已有墙体，沿脚本路径移动光标，输出每一帧的捕捉结果

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use zdraft_core::math::{Aabb, Point2, Vector2};
use zdraft_core::snap::{SnapConfiguration, SnapResolver, SnapResult};
use zdraft_core::spatial::{HierarchicalIndex, SpatialIndex, UniformGridIndex};

/// 网格索引的单元大小
const GRID_CELL_SIZE: f64 = 2.0;

/// 四叉树参数
const TREE_BOUNDS: Aabb = Aabb {
    x: -50.0,
    y: -50.0,
    width: 100.0,
    height: 100.0,
};
const TREE_MAX_OBJECTS: usize = 4;
const TREE_MAX_DEPTH: usize = 6;

/// 光标附近墙体的查询半径
const NEARBY_RADIUS: f64 = 3.0;

/// 空间索引类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IndexKind {
    /// 均匀网格
    Grid,
    /// 四叉树
    Tree,
}

/// ZDraft 捕捉演示
///
/// Examples:
///   zdraft                          # 默认配置，网格索引
///   zdraft --index tree             # 使用四叉树索引
///   zdraft --config snap.json -v    # 读取配置文件并输出调试日志
#[derive(Parser, Debug)]
#[clap(
    name = "zdraft",
    version,
    about = "Snap resolution demo for wall drafting"
)]
struct Options {
    /// 捕捉配置文件（JSON）
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 光标附近查询使用的空间索引
    #[arg(long, value_enum, default_value_t = IndexKind::Grid)]
    index: IndexKind,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

/// 读取捕捉配置，未指定文件时使用默认值
fn load_config(path: Option<&PathBuf>) -> Result<SnapConfiguration> {
    let Some(path) = path else {
        return Ok(SnapConfiguration::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SnapConfiguration = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate()?;

    info!("Loaded snap configuration from: {}", path.display());
    Ok(config)
}

/// 一段已有墙体
struct Wall {
    id: String,
    start: Point2,
    end: Point2,
}

/// 演示用绘图会话
struct DemoSession {
    resolver: SnapResolver,
    index: Box<dyn SpatialIndex<String>>,
}

impl DemoSession {
    fn new(config: SnapConfiguration, kind: IndexKind) -> Result<Self> {
        let index: Box<dyn SpatialIndex<String>> = match kind {
            IndexKind::Grid => Box::new(UniformGridIndex::<String>::new(GRID_CELL_SIZE)?),
            IndexKind::Tree => Box::new(HierarchicalIndex::<String>::new(
                TREE_BOUNDS,
                TREE_MAX_OBJECTS,
                TREE_MAX_DEPTH,
            )?),
        };

        Ok(Self {
            resolver: SnapResolver::with_config(config)?,
            index,
        })
    }

    /// 登记墙体：中心线进入线段表，两个端点进入节点表，包围盒进入空间索引
    fn add_wall(&mut self, wall: &Wall) {
        self.resolver
            .add_line(wall.start, wall.end, Some(wall.id.as_str()));
        self.resolver
            .add_node(wall.start, Some(&format!("{}:start", wall.id)));
        self.resolver
            .add_node(wall.end, Some(&format!("{}:end", wall.id)));

        let center = Point2::new(
            (wall.start.x + wall.end.x) / 2.0,
            (wall.start.y + wall.end.y) / 2.0,
        );
        let extents = Vector2::new(
            (wall.end.x - wall.start.x).abs(),
            (wall.end.y - wall.start.y).abs(),
        );
        self.index.add(wall.id.clone(), center, extents);
    }

    fn create_demo_content(&mut self) {
        // 一个 10 x 6 的房间加一道隔墙
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 6.0),
            Point2::new(0.0, 6.0),
        ];
        let mut walls: Vec<Wall> = (0..corners.len())
            .map(|i| Wall {
                id: format!("wall-{}", i + 1),
                start: corners[i],
                end: corners[(i + 1) % corners.len()],
            })
            .collect();
        walls.push(Wall {
            id: "wall-5".to_string(),
            start: Point2::new(4.0, -1.0),
            end: Point2::new(4.0, 7.0),
        });

        for wall in &walls {
            self.add_wall(wall);
        }

        info!(
            "Created {} demo walls ({} snap nodes, {} indexed)",
            walls.len(),
            self.resolver.nodes().len(),
            self.index.len()
        );
    }

    /// 从 `start` 开始拖动光标经过 `path`，返回每一帧的捕捉结果
    fn drag(&mut self, start: Point2, path: &[Point2]) -> Vec<SnapResult> {
        let reference = [start];
        path.iter()
            .map(|&cursor| {
                let nearby = self.index.get_nearby(&cursor, NEARBY_RADIUS);
                debug!(
                    "cursor ({:.2}, {:.2}): {} walls nearby",
                    cursor.x,
                    cursor.y,
                    nearby.len()
                );

                let result = self.resolver.resolve(cursor, &reference);
                info!(
                    "cursor ({:.2}, {:.2}) -> ({:.3}, {:.3}) [{}]{}",
                    cursor.x,
                    cursor.y,
                    result.position.x,
                    result.position.y,
                    result.mode.map_or("none", |m| m.key()),
                    result
                        .source_id
                        .as_deref()
                        .map(|id| format!(" from {}", id))
                        .unwrap_or_default()
                );
                result
            })
            .collect()
    }
}

fn main() -> Result<()> {
    let options = Options::parse();

    // 初始化日志
    let level = if options.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(level).finish())?;

    info!("Starting ZDraft snap demo ({:?} index)...", options.index);

    let config = load_config(options.config.as_ref())?;
    let mut session = DemoSession::new(config, options.index)?;
    session.create_demo_content();

    // 从房间角点出发绘制一道新墙
    let start = Point2::new(0.0, 0.0);
    let path = [
        Point2::new(1.3, 0.2),
        Point2::new(2.2, 2.4),
        Point2::new(3.9, 0.1),
        Point2::new(4.1, 3.0),
        Point2::new(6.2, 5.9),
        Point2::new(9.8, 6.3),
    ];
    let results = session.drag(start, &path);

    let snapped = results.iter().filter(|r| r.is_snapped()).count();
    info!("Snapped {} of {} cursor positions", snapped, results.len());

    if let Some(last) = session.resolver.last_snap_info() {
        info!(
            "Final wall end: ({:.3}, {:.3})",
            last.position.x, last.position.y
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zdraft_core::snap::SnapMode;

    #[test]
    fn test_parse_options() {
        let options =
            Options::try_parse_from(["zdraft", "--index", "tree", "-v", "--config", "snap.json"])
                .unwrap();
        assert_eq!(options.index, IndexKind::Tree);
        assert!(options.verbose);
        assert_eq!(options.config, Some(PathBuf::from("snap.json")));

        let defaults = Options::try_parse_from(["zdraft"]).unwrap();
        assert_eq!(defaults.index, IndexKind::Grid);
        assert!(!defaults.verbose);
        assert!(defaults.config.is_none());

        assert!(Options::try_parse_from(["zdraft", "--index", "rtree"]).is_err());
        assert!(Options::try_parse_from(["zdraft", "--config"]).is_err());
        assert!(Options::try_parse_from(["zdraft", "--bogus"]).is_err());
    }

    #[test]
    fn test_demo_session_snaps_to_walls() {
        for kind in [IndexKind::Grid, IndexKind::Tree] {
            let mut session = DemoSession::new(SnapConfiguration::default(), kind).unwrap();
            session.create_demo_content();
            assert_eq!(session.index.len(), 5);
            assert_eq!(session.resolver.nodes().len(), 10);

            // 隔墙与底墙的交点 (4, 0)
            let results = session.drag(Point2::new(0.0, 0.0), &[Point2::new(3.9, 0.1)]);
            assert_eq!(results[0].mode, Some(SnapMode::Intersection));
            assert_eq!(results[0].position, Point2::new(4.0, 0.0));

            let nearby = session.index.get_nearby(&Point2::new(4.0, 3.0), 1.0);
            assert_eq!(nearby.len(), 1);
            assert_eq!(nearby[0].id, "wall-5");
        }
    }
}
