use crate::edge_router::polyline_distance;
use crate::graph::EdgeIndex;
use crate::layout::LayoutEdge;
use blockview_core::{Address, Rect, Vec2};

/// Result of a hit test at a scene position.
///
/// Priority order: Operand > Instruction > Block > Edge > None
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    None,
    /// Block body outside any instruction row.
    Block(Address),
    Instruction { block: Address, addr: Address },
    Operand { addr: Address, index: usize },
    Edge(EdgeIndex),
}

/// Spatial index of the current scene.
///
/// Rebuilt wholesale after every relayout or in-place row change.
#[derive(Debug, Clone)]
pub struct HitTester {
    blocks: Vec<(Address, Rect)>,
    instructions: Vec<(Address, Address, Rect)>,
    operands: Vec<(Address, usize, Rect)>,
    edges: Vec<(EdgeIndex, Vec<Vec2>)>,
    /// Maximum distance (scene units) from a polyline that still counts as a hit.
    edge_tolerance: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            instructions: Vec::new(),
            operands: Vec::new(),
            edges: Vec::new(),
            edge_tolerance: 4.0,
        }
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            edge_tolerance: tolerance,
            ..Self::new()
        }
    }

    pub fn edge_tolerance(&self) -> f32 {
        self.edge_tolerance
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.instructions.clear();
        self.operands.clear();
        self.edges.clear();
    }

    pub fn add_block(&mut self, addr: Address, rect: Rect) {
        self.blocks.push((addr, rect));
    }

    pub fn add_instruction(&mut self, block: Address, addr: Address, rect: Rect) {
        self.instructions.push((block, addr, rect));
    }

    pub fn add_operand(&mut self, addr: Address, index: usize, rect: Rect) {
        self.operands.push((addr, index, rect));
    }

    pub fn set_edges(&mut self, edges: &[LayoutEdge]) {
        self.edges = edges
            .iter()
            .map(|edge| (edge.index, edge.coordinates.clone()))
            .collect();
    }

    pub fn hit_test(&self, pos: Vec2) -> HitResult {
        if let Some((addr, index)) = self.hit_test_operand(pos) {
            return HitResult::Operand { addr, index };
        }

        if let Some((block, addr)) = self.hit_test_instruction(pos) {
            return HitResult::Instruction { block, addr };
        }

        if let Some(addr) = self.hit_test_block(pos) {
            return HitResult::Block(addr);
        }

        if let Some(edge) = self.hit_test_edge(pos, self.edge_tolerance) {
            return HitResult::Edge(edge);
        }

        HitResult::None
    }

    pub fn hit_test_operand(&self, pos: Vec2) -> Option<(Address, usize)> {
        self.operands
            .iter()
            .find(|(_, _, rect)| rect.contains(pos))
            .map(|&(addr, index, _)| (addr, index))
    }

    pub fn hit_test_instruction(&self, pos: Vec2) -> Option<(Address, Address)> {
        self.instructions
            .iter()
            .find(|(_, _, rect)| rect.contains(pos))
            .map(|&(block, addr, _)| (block, addr))
    }

    pub fn hit_test_block(&self, pos: Vec2) -> Option<Address> {
        self.blocks
            .iter()
            .find(|(_, rect)| rect.contains(pos))
            .map(|&(addr, _)| addr)
    }

    /// Closest edge within `tolerance`, if any.
    pub fn hit_test_edge(&self, pos: Vec2, tolerance: f32) -> Option<EdgeIndex> {
        let mut best_id = None;
        let mut best_dist = tolerance;

        for (edge, points) in &self.edges {
            let dist = polyline_distance(pos, points);
            if dist < best_dist {
                best_dist = dist;
                best_id = Some(*edge);
            }
        }

        best_id
    }
}
