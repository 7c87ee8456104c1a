pub mod classify;
pub mod edge_router;
pub mod graph;
pub mod hit_tester;
pub mod layout;
pub mod metrics;
pub mod render_tree;
pub mod style;

pub use classify::{classify, edge_class};
pub use edge_router::{EdgeRouter, LaneRequest, arrow_head, polyline_distance};
pub use graph::{EdgeIndex, FlowEdge, FlowNode, Graph, GraphModel, NodeIndex};
pub use hit_tester::{HitResult, HitTester};
pub use layout::{LayeredLayouter, LayoutConfig, LayoutEdge, LayoutResult, Layouter, TieBreak};
pub use metrics::FontMetrics;
pub use render_tree::{
    BlockMode, BlockModel, Canvas, DetailLevel, DisplayList, DrawCommand, ElementHit, RenderElement,
    RenderOptions, SelectionQuery,
};
pub use style::{Color, EdgeStyle, Theme};
