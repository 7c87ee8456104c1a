use blockview_core::{Address, FunctionGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: Address,
    pub target: Address,
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
}

#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: FlowNode) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(node);
        idx
    }

    pub fn add_edge(&mut self, source_idx: NodeIndex, target_idx: NodeIndex, edge: FlowEdge) -> EdgeIndex {
        let idx = EdgeIndex(self.edges.len());
        let mut edge = edge;
        edge.source_idx = source_idx;
        edge.target_idx = target_idx;
        self.edges.push(edge);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    pub fn edge_endpoints(&self, index: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.edges
            .get(index.0)
            .map(|e| (e.source_idx, e.target_idx))
    }
}

impl Index<NodeIndex> for Graph {
    type Output = FlowNode;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl Index<EdgeIndex> for Graph {
    type Output = FlowEdge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}

/// Directed graph of basic blocks keyed by block address.
///
/// Topology is read-only input owned by the analysis engine; the model is
/// rebuilt from scratch on each reload.
#[derive(Debug, Default, Clone)]
pub struct GraphModel {
    pub graph: Graph,
    pub node_map: HashMap<Address, NodeIndex>,
    /// Designated layout root, usually the function entry block.
    pub entry: Option<Address>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_function(function: &FunctionGraph) -> Self {
        let mut model = Self::new();
        for block in &function.blocks {
            model.add_node(block.addr);
        }
        for &(source, target) in &function.edges {
            model.add_edge(source, target);
        }
        model.entry = Some(function.entry);
        model
    }

    pub fn add_node(&mut self, id: Address) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(FlowNode { id });
        self.node_map.insert(id, idx);
        idx
    }

    pub fn add_edge(&mut self, source: Address, target: Address) -> Option<EdgeIndex> {
        match (self.node_map.get(&source), self.node_map.get(&target)) {
            (Some(&src), Some(&dst)) => {
                let edge = FlowEdge {
                    source,
                    target,
                    source_idx: src,
                    target_idx: dst,
                };
                Some(self.graph.add_edge(src, dst, edge))
            }
            _ => {
                if !self.node_map.contains_key(&source) {
                    tracing::warn!(
                        "Dropping edge {} -> {} because source block is missing from graph model",
                        source,
                        target
                    );
                }
                if !self.node_map.contains_key(&target) {
                    tracing::warn!(
                        "Dropping edge {} -> {} because target block is missing from graph model",
                        source,
                        target
                    );
                }
                None
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, id: Address) -> Option<NodeIndex> {
        self.node_map.get(&id).copied()
    }

    /// Outgoing edge indices per node, in insertion order.
    pub fn out_edges(&self) -> Vec<Vec<EdgeIndex>> {
        let mut out = vec![Vec::new(); self.node_count()];
        for edge_idx in self.graph.edge_indices() {
            if let Some((source, _)) = self.graph.edge_endpoints(edge_idx) {
                out[source.0].push(edge_idx);
            }
        }
        out
    }

    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.node_count()];
        for edge_idx in self.graph.edge_indices() {
            if let Some((_, target)) = self.graph.edge_endpoints(edge_idx) {
                degrees[target.0] += 1;
            }
        }
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::{BasicBlock, Terminator};

    #[test]
    fn test_graph_model_from_function() {
        let function = FunctionGraph {
            function: Address(0x10),
            entry: Address(0x10),
            blocks: vec![
                BasicBlock::new(0x10, Vec::new(), Terminator::Jump { target: Address(0x20) }),
                BasicBlock::new(0x20, Vec::new(), Terminator::Return),
            ],
            edges: vec![(Address(0x10), Address(0x20)), (Address(0x20), Address(0x99))],
        };

        let model = GraphModel::from_function(&function);

        assert_eq!(model.node_count(), 2);
        // The dangling edge is dropped.
        assert_eq!(model.edge_count(), 1);
        assert_eq!(model.entry, Some(Address(0x10)));
        assert_eq!(model.in_degrees(), vec![0, 1]);
    }

    #[test]
    fn test_duplicate_nodes_are_merged() {
        let mut model = GraphModel::new();
        let a = model.add_node(Address(1));
        let again = model.add_node(Address(1));
        assert_eq!(a, again);
        assert_eq!(model.node_count(), 1);
    }
}
