use crate::edge_router::{EdgeRouter, LaneRequest};
use crate::graph::{EdgeIndex, GraphModel, NodeIndex};
use blockview_core::{Address, EdgeClass, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Ordering key for blocks that share a layer. Ties fall back to insertion order.
pub type TieBreak<'a> = &'a dyn Fn(Address) -> i64;

pub trait Layouter {
    fn layout(
        &self,
        model: &GraphModel,
        sizes: &HashMap<Address, Vec2>,
        tie_break: Option<TieBreak<'_>>,
    ) -> LayoutResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub index: EdgeIndex,
    pub source: Address,
    pub target: Address,
    /// Polyline from the source's bottom face to the target's top face.
    pub coordinates: Vec<Vec2>,
    pub class: EdgeClass,
}

impl LayoutEdge {
    pub fn start(&self) -> Option<Vec2> {
        self.coordinates.first().copied()
    }

    pub fn end(&self) -> Option<Vec2> {
        self.coordinates.last().copied()
    }

    pub fn is_back_edge(&self) -> bool {
        self.class == EdgeClass::BackEdge
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Top-left corner of every block.
    pub node_coordinates: HashMap<Address, Vec2>,
    /// Sizes the layout was computed with.
    pub node_sizes: HashMap<Address, Vec2>,
    pub ranks: HashMap<Address, usize>,
    pub edges: Vec<LayoutEdge>,
    /// Bounding box of every block and edge route.
    pub bounds: Rect,
}

impl LayoutResult {
    /// Nothing to display. Not an error.
    pub fn is_empty(&self) -> bool {
        self.node_coordinates.is_empty()
    }

    pub fn node_rect(&self, id: Address) -> Option<Rect> {
        let pos = self.node_coordinates.get(&id)?;
        let size = self.node_sizes.get(&id).copied().unwrap_or_default();
        Some(Rect::from_pos_size(*pos, size))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal gap between neighboring blocks in a layer.
    pub node_spacing: f32,
    /// Minimum vertical gap between two layers.
    pub layer_spacing: f32,
    /// Width reserved for a long edge passing through a layer.
    pub virtual_node_width: f32,
    /// Horizontal distance between back-edge detours.
    pub back_edge_spacing: f32,
    /// Upper bound on barycenter sweeps during crossing reduction.
    pub max_ordering_sweeps: usize,
    pub router: EdgeRouter,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            layer_spacing: 40.0,
            virtual_node_width: 10.0,
            back_edge_spacing: 12.0,
            max_ordering_sweeps: 24,
            router: EdgeRouter::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Node,
    Virtual,
}

/// A block or a long-edge waypoint occupying a position in one layer.
#[derive(Debug, Clone, Copy)]
struct Slot {
    kind: SlotKind,
    rank: usize,
    width: f32,
    height: f32,
    seed: (i64, usize, usize),
}

struct LayerGraph {
    slots: Vec<Slot>,
    layers: Vec<Vec<usize>>,
    /// Slot chain per edge, source first. Empty for back-edges.
    chains: Vec<Vec<usize>>,
    up: Vec<Vec<usize>>,
    down: Vec<Vec<usize>>,
}

/// Hierarchical layout for control-flow graphs.
///
/// Back-edges are found by DFS from the entry block, ranks come from the
/// longest path over the remaining DAG, layers are ordered with barycenter
/// sweeps and edges are routed orthogonally through inter-layer lanes.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayouter {
    pub config: LayoutConfig,
}

impl LayeredLayouter {
    const DEFAULT_NODE_WIDTH: f32 = 100.0;
    const DEFAULT_NODE_HEIGHT: f32 = 30.0;

    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    fn default_node_size() -> Vec2 {
        Vec2::new(Self::DEFAULT_NODE_WIDTH, Self::DEFAULT_NODE_HEIGHT)
    }

    fn node_sizes(model: &GraphModel, sizes: &HashMap<Address, Vec2>) -> Vec<Vec2> {
        model
            .graph
            .node_indices()
            .map(|idx| {
                let id = model.graph[idx].id;
                sizes.get(&id).copied().unwrap_or_else(|| {
                    tracing::warn!("No size for block {}, using default", id);
                    Self::default_node_size()
                })
            })
            .collect()
    }

    fn order_keys(model: &GraphModel, tie_break: Option<TieBreak<'_>>) -> Vec<(i64, usize)> {
        model
            .graph
            .node_indices()
            .map(|idx| {
                let key = tie_break.map_or(0, |f| f(model.graph[idx].id));
                (key, idx.0)
            })
            .collect()
    }

    fn pick_root(model: &GraphModel, keys: &[(i64, usize)]) -> NodeIndex {
        match model.entry {
            Some(entry) => {
                if let Some(idx) = model.index_of(entry) {
                    return idx;
                }
                tracing::warn!(
                    "Entry block {} is not part of the graph, falling back to first block",
                    entry
                );
            }
            None => tracing::debug!("No entry block designated, falling back to first block"),
        }
        (0..keys.len())
            .min_by_key(|&i| keys[i])
            .map(NodeIndex)
            .unwrap_or(NodeIndex(0))
    }

    /// Mark edges that close a cycle in a DFS from `root`.
    ///
    /// Blocks unreachable from the root are visited afterwards, sources first.
    fn find_back_edges(
        model: &GraphModel,
        out_edges: &[Vec<EdgeIndex>],
        root: NodeIndex,
        keys: &[(i64, usize)],
    ) -> Vec<bool> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Visit {
            New,
            Active,
            Done,
        }

        let node_count = model.node_count();
        let in_degrees = model.in_degrees();
        let mut starts: Vec<usize> = (0..node_count).filter(|&i| i != root.0).collect();
        starts.sort_by_key(|&i| (in_degrees[i] > 0, keys[i]));

        let mut state = vec![Visit::New; node_count];
        let mut back = vec![false; model.edge_count()];

        for start in std::iter::once(root.0).chain(starts) {
            if state[start] != Visit::New {
                continue;
            }
            state[start] = Visit::Active;
            let mut stack = vec![(start, 0usize)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if let Some(&edge) = out_edges[node].get(frame.1) {
                    frame.1 += 1;
                    let target = model.graph[edge].target_idx.0;
                    match state[target] {
                        Visit::Active => back[edge.0] = true,
                        Visit::New => {
                            state[target] = Visit::Active;
                            stack.push((target, 0));
                        }
                        Visit::Done => {}
                    }
                } else {
                    state[node] = Visit::Done;
                    stack.pop();
                }
            }
        }

        back
    }

    /// Longest path from the sources over non-back edges.
    fn assign_ranks(model: &GraphModel, out_edges: &[Vec<EdgeIndex>], back: &[bool]) -> Vec<usize> {
        let node_count = model.node_count();
        let mut pending = vec![0usize; node_count];
        for edge in model.graph.edge_indices() {
            if !back[edge.0] {
                pending[model.graph[edge].target_idx.0] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| pending[i] == 0).collect();
        let mut ranks = vec![0usize; node_count];
        let mut processed = 0;

        while let Some(node) = queue.pop_front() {
            processed += 1;
            for &edge in &out_edges[node] {
                if back[edge.0] {
                    continue;
                }
                let target = model.graph[edge].target_idx.0;
                ranks[target] = ranks[target].max(ranks[node] + 1);
                pending[target] -= 1;
                if pending[target] == 0 {
                    queue.push_back(target);
                }
            }
        }

        if processed < node_count {
            tracing::warn!(
                "Rank assignment left {} blocks on an unbroken cycle",
                node_count - processed
            );
        }

        ranks
    }

    fn build_layer_graph(
        &self,
        model: &GraphModel,
        ranks: &[usize],
        back: &[bool],
        sizes: &[Vec2],
        keys: &[(i64, usize)],
    ) -> LayerGraph {
        let layer_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
        let mut slots: Vec<Slot> = model
            .graph
            .node_indices()
            .map(|idx| Slot {
                kind: SlotKind::Node,
                rank: ranks[idx.0],
                width: sizes[idx.0].x,
                height: sizes[idx.0].y,
                seed: (keys[idx.0].0, keys[idx.0].1, 0),
            })
            .collect();

        let mut chains = Vec::with_capacity(model.edge_count());
        for edge in model.graph.edge_indices() {
            if back[edge.0] {
                chains.push(Vec::new());
                continue;
            }
            let flow_edge = &model.graph[edge];
            let (source, target) = (flow_edge.source_idx.0, flow_edge.target_idx.0);
            let mut chain = vec![source];
            for rank in (ranks[source] + 1)..ranks[target] {
                chain.push(slots.len());
                slots.push(Slot {
                    kind: SlotKind::Virtual,
                    rank,
                    width: self.config.virtual_node_width,
                    height: 0.0,
                    seed: (keys[source].0, keys[source].1, edge.0 + 1),
                });
            }
            chain.push(target);
            chains.push(chain);
        }

        let mut up = vec![Vec::new(); slots.len()];
        let mut down = vec![Vec::new(); slots.len()];
        for chain in &chains {
            for pair in chain.windows(2) {
                down[pair[0]].push(pair[1]);
                up[pair[1]].push(pair[0]);
            }
        }

        let mut layers = vec![Vec::new(); layer_count];
        for (id, slot) in slots.iter().enumerate() {
            layers[slot.rank].push(id);
        }
        for layer in &mut layers {
            layer.sort_by_key(|&id| slots[id].seed);
        }

        LayerGraph {
            slots,
            layers,
            chains,
            up,
            down,
        }
    }

    fn index_positions(layers: &[Vec<usize>], positions: &mut [usize]) {
        for layer in layers {
            for (pos, &slot) in layer.iter().enumerate() {
                positions[slot] = pos;
            }
        }
    }

    fn order_layer_by_barycenter(layer: &mut Vec<usize>, positions: &[usize], neighbors: &[Vec<usize>]) {
        let mut keyed: Vec<(f32, usize, usize)> = layer
            .iter()
            .enumerate()
            .map(|(pos, &slot)| {
                let adjacent = &neighbors[slot];
                let barycenter = if adjacent.is_empty() {
                    pos as f32
                } else {
                    adjacent.iter().map(|&n| positions[n] as f32).sum::<f32>() / adjacent.len() as f32
                };
                (barycenter, pos, slot)
            })
            .collect();

        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        *layer = keyed.into_iter().map(|(_, _, slot)| slot).collect();
    }

    fn count_crossings(layers: &[Vec<usize>], down: &[Vec<usize>], positions: &[usize]) -> usize {
        let mut total = 0;
        for layer in layers {
            let pairs: Vec<(usize, usize)> = layer
                .iter()
                .flat_map(|&a| down[a].iter().map(move |&b| (positions[a], positions[b])))
                .collect();
            for i in 0..pairs.len() {
                for j in (i + 1)..pairs.len() {
                    let (a1, b1) = pairs[i];
                    let (a2, b2) = pairs[j];
                    if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                        total += 1;
                    }
                }
            }
        }
        total
    }

    /// Alternate down and up barycenter sweeps, keeping the ordering with the
    /// fewest crossings. Stops at a fixed point or after the sweep cap.
    fn order_layers(&self, lg: &mut LayerGraph) {
        let layer_count = lg.layers.len();
        let mut positions = vec![0usize; lg.slots.len()];
        Self::index_positions(&lg.layers, &mut positions);

        let mut best = lg.layers.clone();
        let mut best_crossings = Self::count_crossings(&lg.layers, &lg.down, &positions);

        for _ in 0..self.config.max_ordering_sweeps {
            if best_crossings == 0 {
                break;
            }
            let before = lg.layers.clone();

            for rank in 1..layer_count {
                Self::order_layer_by_barycenter(&mut lg.layers[rank], &positions, &lg.up);
                Self::index_positions(&lg.layers[rank..=rank], &mut positions);
            }
            for rank in (0..layer_count.saturating_sub(1)).rev() {
                Self::order_layer_by_barycenter(&mut lg.layers[rank], &positions, &lg.down);
                Self::index_positions(&lg.layers[rank..=rank], &mut positions);
            }

            let crossings = Self::count_crossings(&lg.layers, &lg.down, &positions);
            if crossings < best_crossings {
                best = lg.layers.clone();
                best_crossings = crossings;
            }
            if lg.layers == before {
                break;
            }
        }

        tracing::trace!("Layer ordering settled with {} crossings", best_crossings);
        lg.layers = best;
    }

    fn slot_spacing(&self, a: &Slot, b: &Slot) -> f32 {
        if a.kind == SlotKind::Virtual && b.kind == SlotKind::Virtual {
            self.config.router.lane_spacing
        } else {
            self.config.node_spacing
        }
    }

    /// Left x of every slot: each layer is packed left to right and centered on x = 0.
    fn assign_x(&self, lg: &LayerGraph) -> Vec<f32> {
        let mut xs = vec![0.0f32; lg.slots.len()];
        for layer in &lg.layers {
            let mut extent = 0.0;
            for (i, &id) in layer.iter().enumerate() {
                if i > 0 {
                    extent += self.slot_spacing(&lg.slots[layer[i - 1]], &lg.slots[id]);
                }
                extent += lg.slots[id].width;
            }

            let mut x = -extent / 2.0;
            for (i, &id) in layer.iter().enumerate() {
                if i > 0 {
                    x += self.slot_spacing(&lg.slots[layer[i - 1]], &lg.slots[id]);
                }
                xs[id] = x.round();
                x += lg.slots[id].width;
            }
        }
        xs
    }

    fn slot_center(lg: &LayerGraph, xs: &[f32], id: usize) -> f32 {
        xs[id] + lg.slots[id].width / 2.0
    }

    /// Spread edge endpoints across the bottom (outgoing) and top (incoming)
    /// faces of each block, ordered by where the edge heads.
    fn assign_ports(model: &GraphModel, lg: &LayerGraph, xs: &[f32], back: &[bool]) -> (Vec<f32>, Vec<f32>) {
        let edge_count = model.edge_count();
        let node_count = model.node_count();
        let mut outgoing: Vec<Vec<(f32, usize)>> = vec![Vec::new(); node_count];
        let mut incoming: Vec<Vec<(f32, usize)>> = vec![Vec::new(); node_count];

        for edge in model.graph.edge_indices() {
            let flow_edge = &model.graph[edge];
            let chain = &lg.chains[edge.0];
            let (toward_target, toward_source) = if back[edge.0] {
                (f32::INFINITY, f32::INFINITY)
            } else {
                (
                    Self::slot_center(lg, xs, chain[1]),
                    Self::slot_center(lg, xs, chain[chain.len() - 2]),
                )
            };
            outgoing[flow_edge.source_idx.0].push((toward_target, edge.0));
            incoming[flow_edge.target_idx.0].push((toward_source, edge.0));
        }

        let spread = |lists: &mut Vec<Vec<(f32, usize)>>, ports: &mut Vec<f32>| {
            for (node, list) in lists.iter_mut().enumerate() {
                list.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                let left = xs[node];
                let width = lg.slots[node].width;
                let count = list.len() as f32;
                for (i, &(_, edge)) in list.iter().enumerate() {
                    ports[edge] = (left + width * (i + 1) as f32 / (count + 1.0)).round();
                }
            }
        };

        let mut out_ports = vec![0.0f32; edge_count];
        let mut in_ports = vec![0.0f32; edge_count];
        spread(&mut outgoing, &mut out_ports);
        spread(&mut incoming, &mut in_ports);
        (out_ports, in_ports)
    }

    /// x of the vertical run of each back-edge, right of every layer it spans.
    /// Nested spans are pushed further out so detours never overlap.
    fn assign_detours(&self, model: &GraphModel, lg: &LayerGraph, xs: &[f32], ranks: &[usize], back: &[bool]) -> Vec<f32> {
        let layer_right: Vec<f32> = lg
            .layers
            .iter()
            .map(|layer| {
                layer
                    .iter()
                    .map(|&id| xs[id] + lg.slots[id].width)
                    .fold(f32::NEG_INFINITY, f32::max)
            })
            .collect();

        let mut spans: Vec<(usize, usize, usize)> = model
            .graph
            .edge_indices()
            .filter(|edge| back[edge.0])
            .map(|edge| {
                let flow_edge = &model.graph[edge];
                let lo = ranks[flow_edge.target_idx.0];
                let hi = ranks[flow_edge.source_idx.0];
                (edge.0, lo.min(hi), lo.max(hi))
            })
            .collect();
        spans.sort_by_key(|&(edge, lo, hi)| (hi - lo, lo, edge));

        let mut detours = vec![f32::NAN; model.edge_count()];
        let mut placed: Vec<(usize, usize, f32)> = Vec::new();
        for (edge, lo, hi) in spans {
            let mut x = layer_right[lo..=hi].iter().copied().fold(f32::NEG_INFINITY, f32::max);
            for &(p_lo, p_hi, p_x) in &placed {
                if p_lo <= hi && lo <= p_hi {
                    x = x.max(p_x);
                }
            }
            x += self.config.back_edge_spacing;
            placed.push((lo, hi, x));
            detours[edge] = x;
        }
        detours
    }

    fn compute_bounds(result: &LayoutResult) -> Rect {
        let corners = result.node_coordinates.iter().flat_map(|(id, pos)| {
            let size = result.node_sizes.get(id).copied().unwrap_or_default();
            [*pos, *pos + size]
        });
        let waypoints = result.edges.iter().flat_map(|e| e.coordinates.iter().copied());
        Rect::bounding(corners.chain(waypoints)).unwrap_or(Rect::NOTHING)
    }
}

/// Lane bookkeeping for one inter-layer gap. Gap `g` lies directly above layer `g`.
#[derive(Default)]
struct Gap {
    requests: Vec<LaneRequest>,
    owners: Vec<(usize, usize)>,
    lanes: Vec<usize>,
    lane_count: usize,
    top: f32,
    height: f32,
}

impl Gap {
    fn request(&mut self, edge: usize, hop: usize, x_from: f32, x_to: f32) {
        self.requests.push(LaneRequest { edge, x_from, x_to });
        self.owners.push((edge, hop));
    }

    /// The run requested for `(edge, hop)` and the y of its lane.
    fn run(&self, edge: usize, hop: usize) -> Option<(LaneRequest, f32)> {
        let idx = self.owners.iter().position(|&owner| owner == (edge, hop))?;
        let y = EdgeRouter::lane_y(self.top, self.height, self.lanes[idx], self.lane_count);
        Some((self.requests[idx], y))
    }
}

impl Layouter for LayeredLayouter {
    fn layout(
        &self,
        model: &GraphModel,
        sizes: &HashMap<Address, Vec2>,
        tie_break: Option<TieBreak<'_>>,
    ) -> LayoutResult {
        if model.node_count() == 0 {
            tracing::debug!("Empty graph, nothing to lay out");
            return LayoutResult::default();
        }

        let router = &self.config.router;
        let node_sizes = Self::node_sizes(model, sizes);
        let keys = Self::order_keys(model, tie_break);
        let out_edges = model.out_edges();
        let root = Self::pick_root(model, &keys);
        let back = Self::find_back_edges(model, &out_edges, root, &keys);
        let ranks = Self::assign_ranks(model, &out_edges, &back);

        let mut lg = self.build_layer_graph(model, &ranks, &back, &node_sizes, &keys);
        self.order_layers(&mut lg);

        let xs = self.assign_x(&lg);
        let (out_ports, in_ports) = Self::assign_ports(model, &lg, &xs, &back);
        let detours = self.assign_detours(model, &lg, &xs, &ranks, &back);

        // Horizontal runs per gap.
        let layer_count = lg.layers.len();
        let mut gaps: Vec<Gap> = (0..=layer_count).map(|_| Gap::default()).collect();
        for edge in model.graph.edge_indices() {
            let e = edge.0;
            let flow_edge = &model.graph[edge];
            if back[e] {
                let (s, t) = (flow_edge.source_idx.0, flow_edge.target_idx.0);
                gaps[ranks[s] + 1].request(e, 0, out_ports[e], detours[e]);
                gaps[ranks[t]].request(e, 1, detours[e], in_ports[e]);
                continue;
            }
            let chain = &lg.chains[e];
            for hop in 0..chain.len() - 1 {
                let x_from = if hop == 0 { out_ports[e] } else { Self::slot_center(&lg, &xs, chain[hop]) };
                let x_to = if hop + 2 == chain.len() {
                    in_ports[e]
                } else {
                    Self::slot_center(&lg, &xs, chain[hop + 1])
                };
                if router.needs_lane(x_from, x_to) {
                    gaps[lg.slots[chain[hop]].rank + 1].request(e, hop, x_from, x_to);
                }
            }
        }

        for (g, gap) in gaps.iter_mut().enumerate() {
            let (lanes, lane_count) = router.assign_lanes(&gap.requests);
            gap.lanes = lanes;
            gap.lane_count = lane_count;
            let outer = g == 0 || g == layer_count;
            gap.height = match (outer, lane_count) {
                (true, 0) => 0.0,
                (true, _) => router.gap_height(lane_count, 0.0),
                (false, _) => router.gap_height(lane_count, self.config.layer_spacing),
            };
        }

        let layer_heights: Vec<f32> = lg
            .layers
            .iter()
            .map(|layer| layer.iter().map(|&id| lg.slots[id].height).fold(0.0, f32::max))
            .collect();
        let mut layer_tops = vec![0.0f32; layer_count];
        gaps[0].top = -gaps[0].height;
        for rank in 0..layer_count {
            if rank > 0 {
                layer_tops[rank] = gaps[rank].top + gaps[rank].height;
            }
            gaps[rank + 1].top = layer_tops[rank] + layer_heights[rank];
        }

        let mut result = LayoutResult::default();
        for idx in model.graph.node_indices() {
            let id = model.graph[idx].id;
            result
                .node_coordinates
                .insert(id, Vec2::new(xs[idx.0], layer_tops[ranks[idx.0]]));
            result.node_sizes.insert(id, node_sizes[idx.0]);
            result.ranks.insert(id, ranks[idx.0]);
        }

        for edge in model.graph.edge_indices() {
            let e = edge.0;
            let flow_edge = &model.graph[edge];
            let (s, t) = (flow_edge.source_idx.0, flow_edge.target_idx.0);
            let start = Vec2::new(out_ports[e], layer_tops[ranks[s]] + node_sizes[s].y);
            let end = Vec2::new(in_ports[e], layer_tops[ranks[t]]);

            let mut points = vec![start];
            if back[e] {
                let below = gaps[ranks[s] + 1].run(e, 0).map_or(start.y, |(_, y)| y);
                let above = gaps[ranks[t]].run(e, 1).map_or(end.y, |(_, y)| y);
                points.extend([
                    Vec2::new(start.x, below),
                    Vec2::new(detours[e], below),
                    Vec2::new(detours[e], above),
                    Vec2::new(end.x, above),
                ]);
            } else {
                let chain = &lg.chains[e];
                for hop in 0..chain.len() - 1 {
                    if let Some((request, lane_y)) = gaps[lg.slots[chain[hop]].rank + 1].run(e, hop) {
                        points.push(Vec2::new(request.x_from, lane_y));
                        points.push(Vec2::new(request.x_to, lane_y));
                    }
                }
            }
            points.push(end);

            result.edges.push(LayoutEdge {
                index: edge,
                source: flow_edge.source,
                target: flow_edge.target,
                coordinates: EdgeRouter::simplify(points),
                class: if back[e] { EdgeClass::BackEdge } else { EdgeClass::Normal },
            });
        }

        result.bounds = Self::compute_bounds(&result);
        tracing::debug!(
            "Laid out {} blocks in {} layers with {} edges",
            model.node_count(),
            layer_count,
            result.edges.len()
        );
        result
    }
}
