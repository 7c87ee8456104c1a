use blockview_core::Vec2;
use serde::{Deserialize, Serialize};

/// Horizontal run an edge needs inside the gap between two layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneRequest {
    pub edge: usize,
    pub x_from: f32,
    pub x_to: f32,
}

impl LaneRequest {
    pub fn min_x(&self) -> f32 {
        self.x_from.min(self.x_to)
    }

    pub fn max_x(&self) -> f32 {
        self.x_from.max(self.x_to)
    }
}

/// Orthogonal router for layered layouts.
///
/// Edges leave a block from its bottom face and enter the target through its
/// top face. Every horizontal run lives in an inter-layer gap on its own lane,
/// so two runs in the same gap never share a y unless their x ranges are
/// disjoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeRouter {
    /// Vertical distance between neighboring lanes.
    pub lane_spacing: f32,
    /// Minimum horizontal clearance between runs sharing a lane.
    pub lane_clearance: f32,
    /// Runs shorter than this are treated as straight verticals.
    pub min_jog: f32,
}

impl Default for EdgeRouter {
    fn default() -> Self {
        Self {
            lane_spacing: 8.0,
            lane_clearance: 6.0,
            min_jog: 0.5,
        }
    }
}

impl EdgeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_lane(&self, x_from: f32, x_to: f32) -> bool {
        (x_from - x_to).abs() >= self.min_jog
    }

    /// Assign a lane to every request in one gap.
    ///
    /// Greedy interval coloring over requests sorted by (min x, max x, edge),
    /// so the result depends only on the input geometry. Returns the lane of
    /// each request (parallel to `requests`) and the lane count.
    pub fn assign_lanes(&self, requests: &[LaneRequest]) -> (Vec<usize>, usize) {
        let mut order: Vec<usize> = (0..requests.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = &requests[a];
            let rb = &requests[b];
            ra.min_x()
                .total_cmp(&rb.min_x())
                .then(ra.max_x().total_cmp(&rb.max_x()))
                .then(ra.edge.cmp(&rb.edge))
        });

        let mut lane_ends: Vec<f32> = Vec::new();
        let mut lanes = vec![0; requests.len()];
        for idx in order {
            let request = &requests[idx];
            let free = lane_ends
                .iter()
                .position(|&end| end + self.lane_clearance < request.min_x());
            let lane = match free {
                Some(lane) => lane,
                None => {
                    lane_ends.push(f32::NEG_INFINITY);
                    lane_ends.len() - 1
                }
            };
            lane_ends[lane] = request.max_x();
            lanes[idx] = lane;
        }
        (lanes, lane_ends.len())
    }

    /// Height a gap needs for `lane_count` lanes, never below `min_gap`.
    pub fn gap_height(&self, lane_count: usize, min_gap: f32) -> f32 {
        let needed = (lane_count + 1) as f32 * self.lane_spacing;
        needed.max(min_gap)
    }

    /// y of `lane` inside a gap spanning `[gap_top, gap_top + gap_height]`.
    pub fn lane_y(gap_top: f32, gap_height: f32, lane: usize, lane_count: usize) -> f32 {
        gap_top + (lane + 1) as f32 * gap_height / (lane_count + 1) as f32
    }

    /// Drop repeated points and interior points on straight runs.
    pub fn simplify(points: Vec<Vec2>) -> Vec<Vec2> {
        const EPS: f32 = 1e-3;
        let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
        for p in points {
            if let Some(last) = out.last()
                && (last.x - p.x).abs() < EPS
                && (last.y - p.y).abs() < EPS
            {
                continue;
            }
            if out.len() >= 2 {
                let a = out[out.len() - 2];
                let b = out[out.len() - 1];
                let vertical = (a.x - b.x).abs() < EPS && (b.x - p.x).abs() < EPS;
                let horizontal = (a.y - b.y).abs() < EPS && (b.y - p.y).abs() < EPS;
                let same_direction = if vertical {
                    (b.y - a.y).signum() == (p.y - b.y).signum()
                } else if horizontal {
                    (b.x - a.x).signum() == (p.x - b.x).signum()
                } else {
                    false
                };
                if same_direction {
                    out.pop();
                }
            }
            out.push(p);
        }
        out
    }
}

/// Distance from `point` to the segment `a`-`b`.
pub fn segment_distance(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let ap = point - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Distance from `point` to the closest segment of `polyline`.
pub fn polyline_distance(point: Vec2, polyline: &[Vec2]) -> f32 {
    match polyline {
        [] => f32::INFINITY,
        [only] => point.distance(*only),
        _ => polyline
            .windows(2)
            .map(|w| segment_distance(point, w[0], w[1]))
            .fold(f32::INFINITY, f32::min),
    }
}

/// Downward-pointing arrowhead whose tip is `end`.
pub fn arrow_head(end: Vec2, size: f32) -> [Vec2; 3] {
    let half = size / 2.0;
    [
        Vec2::new(end.x - half, end.y - size),
        Vec2::new(end.x + half, end.y - size),
        end,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(edge: usize, a: f32, b: f32) -> LaneRequest {
        LaneRequest {
            edge,
            x_from: a,
            x_to: b,
        }
    }

    #[test]
    fn test_overlapping_runs_get_distinct_lanes() {
        let router = EdgeRouter::new();
        let requests = [request(0, 0.0, 100.0), request(1, 50.0, 150.0), request(2, 300.0, 200.0)];
        let (lanes, count) = router.assign_lanes(&requests);

        assert_eq!(count, 2);
        assert_ne!(lanes[0], lanes[1]);
        // Disjoint run reuses the first lane.
        assert_eq!(lanes[2], lanes[0]);
    }

    #[test]
    fn test_simplify_removes_collinear_points() {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 20.0),
            Vec2::new(5.0, 20.0),
        ];
        let simplified = EdgeRouter::simplify(points);
        assert_eq!(
            simplified,
            vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 20.0), Vec2::new(5.0, 20.0)]
        );
    }

    #[test]
    fn test_simplify_keeps_reversals() {
        let points = vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), Vec2::new(0.0, 5.0)];
        assert_eq!(EdgeRouter::simplify(points.clone()), points);
    }

    #[test]
    fn test_polyline_distance() {
        let line = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        assert!((polyline_distance(Vec2::new(5.0, 3.0), &line) - 3.0).abs() < 1e-4);
        assert!((polyline_distance(Vec2::new(12.0, 5.0), &line) - 2.0).abs() < 1e-4);
        assert_eq!(polyline_distance(Vec2::ZERO, &[]), f32::INFINITY);
    }

    proptest! {
        #[test]
        fn prop_lanes_never_share_overlapping_runs(
            runs in proptest::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 1..20)
        ) {
            let router = EdgeRouter::new();
            let requests: Vec<LaneRequest> = runs
                .iter()
                .enumerate()
                .map(|(i, &(a, b))| request(i, a, b))
                .collect();
            let (lanes, count) = router.assign_lanes(&requests);

            prop_assert!(lanes.iter().all(|&lane| lane < count));
            for i in 0..requests.len() {
                for j in (i + 1)..requests.len() {
                    if lanes[i] != lanes[j] {
                        continue;
                    }
                    let (a, b) = (&requests[i], &requests[j]);
                    let overlap = a.min_x() <= b.max_x() && b.min_x() <= a.max_x();
                    prop_assert!(!overlap, "runs {:?} and {:?} share lane {}", a, b, lanes[i]);
                }
            }
        }
    }
}
