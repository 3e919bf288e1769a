//! Fixed precision grid for the polygon overlay.
//!
//! Every boolean operation sees grid-snapped operands, and the finished
//! subdivision is noded so that rings sharing a boundary share its vertices
//! exactly. Without this, neighbouring pieces coming out of separate
//! overlays disagree in the last bits and their boundaries cross.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::EuclideanDistance;
use geo_types::{Coord, Line, LineString, MultiPolygon, Point as GeoPoint, Polygon as GeoPolygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::error::{Result, TerrainError};
use crate::geometry::ring;
use crate::mesh::BOUNDARY_EPSILON;

/// A binary polygon overlay such as `BooleanOps::union`.
pub type Overlay = fn(&MultiPolygon<f64>, &MultiPolygon<f64>) -> MultiPolygon<f64>;

#[derive(Clone, Copy, Debug)]
struct IndexedSegment {
    line: Line<f64>,
    ring: usize,
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl IndexedSegment {
    fn new(line: Line<f64>, ring: usize, index: usize, margin: f64) -> Self {
        let (p, q) = (line.start, line.end);
        let envelope = AABB::from_corners(
            [p.x.min(q.x) - margin, p.y.min(q.y) - margin],
            [p.x.max(q.x) + margin, p.y.max(q.y) + margin],
        );
        Self {
            line,
            ring,
            index,
            envelope,
        }
    }
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

#[derive(Clone, Debug)]
pub struct SnapRounder {
    /// Grid spacing in degrees. A power of two keeps snapping exact and
    /// idempotent; zero disables snapping.
    pub grid_size: f64,
    pub max_iter: usize,
    bounds: Option<Rect<f64>>,
}

impl SnapRounder {
    pub fn new(grid_size: f64) -> Self {
        Self {
            grid_size,
            max_iter: 10,
            bounds: None,
        }
    }

    /// Coordinates this close to a tile side land exactly on it.
    pub fn with_bounds(mut self, bounds: Rect<f64>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn snap(&self, c: Coord<f64>) -> Coord<f64> {
        let grid = self.grid_size;
        if grid == 0.0 {
            return c;
        }
        let side = grid.max(BOUNDARY_EPSILON);
        let round = |v: f64, lo: f64, hi: f64| {
            if (v - lo).abs() <= side {
                lo
            } else if (v - hi).abs() <= side {
                hi
            } else {
                (v / grid).round() * grid
            }
        };
        match self.bounds {
            Some(b) => Coord {
                x: round(c.x, b.min().x, b.max().x),
                y: round(c.y, b.min().y, b.max().y),
            },
            None => Coord {
                x: (c.x / grid).round() * grid,
                y: (c.y / grid).round() * grid,
            },
        }
    }

    /// Snaps a ring; `None` once it has collapsed to less than a triangle.
    fn snap_ring(&self, ls: &LineString<f64>) -> Option<LineString<f64>> {
        let mut coords: Vec<Coord<f64>> = ls.0.iter().map(|&c| self.snap(c)).collect();
        coords.dedup();
        while coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }
        if coords.len() < 3 || ring::signed_area(&coords) == 0.0 {
            return None;
        }
        coords.push(coords[0]);
        Some(LineString::new(coords))
    }

    pub fn snap_multi_polygon(&self, mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let polygons = mp
            .iter()
            .filter_map(|poly| {
                let exterior = self.snap_ring(poly.exterior())?;
                let interiors = poly
                    .interiors()
                    .iter()
                    .filter_map(|hole| self.snap_ring(hole))
                    .collect();
                Some(GeoPolygon::new(exterior, interiors))
            })
            .collect();
        MultiPolygon::new(polygons)
    }

    /// Runs `op` on snapped operands and snaps its result.
    ///
    /// The overlay kernel can still panic on inputs it cannot sweep; that is
    /// reported as an error for the tile.
    pub fn overlay(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>, op: Overlay) -> Result<MultiPolygon<f64>> {
        let (a, b) = (self.snap_multi_polygon(a), self.snap_multi_polygon(b));
        match panic::catch_unwind(AssertUnwindSafe(|| op(&a, &b))) {
            Ok(out) => Ok(self.snap_multi_polygon(&out)),
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "overlay panicked".to_string());
                log::debug!("overlay failed: {msg}");
                Err(TerrainError::Overlay(msg))
            }
        }
    }

    /// Nodes the rings of `shapes` against each other and returns them with
    /// the same structure. Ring vertices lying on another ring's edge are
    /// inserted into that edge, and crossing edges are split at their
    /// snapped intersection.
    pub fn node_all(&self, shapes: Vec<MultiPolygon<f64>>) -> Vec<MultiPolygon<f64>> {
        let mut rings: Vec<Vec<Coord<f64>>> = Vec::new();
        for mp in &shapes {
            for poly in mp {
                rings.push(open_ring(poly.exterior()));
                for hole in poly.interiors() {
                    rings.push(open_ring(hole));
                }
            }
        }
        if self.node(&mut rings) == 0 {
            return shapes;
        }

        let mut next = 0;
        let mut noded = Vec::with_capacity(shapes.len());
        for mp in &shapes {
            let mut polygons = Vec::with_capacity(mp.0.len());
            for poly in mp {
                let exterior = close_ring(&rings[next]);
                next += 1;
                let mut interiors = Vec::with_capacity(poly.interiors().len());
                for _ in poly.interiors() {
                    interiors.push(close_ring(&rings[next]));
                    next += 1;
                }
                polygons.push(GeoPolygon::new(exterior, interiors));
            }
            noded.push(MultiPolygon::new(polygons));
        }
        noded
    }

    /// Nodes open rings in place. Returns how many vertices were inserted.
    pub fn node(&self, rings: &mut [Vec<Coord<f64>>]) -> usize {
        let tolerance = self.grid_size.max(f64::EPSILON);
        let mut inserted = 0;
        for iteration in 0..self.max_iter {
            let splits = self.find_splits(rings, tolerance);
            if splits.is_empty() {
                break;
            }
            log::trace!("noding pass {iteration}: {} edges to split", splits.len());

            for (r, ring) in rings.iter_mut().enumerate() {
                let n = ring.len();
                let mut out = Vec::with_capacity(n);
                for i in 0..n {
                    let (start, end) = (ring[i], ring[(i + 1) % n]);
                    out.push(start);
                    let Some(points) = splits.get(&(r, i)) else {
                        continue;
                    };
                    let mut points = points.clone();
                    let dist = |p: &Coord<f64>| (p.x - start.x).powi(2) + (p.y - start.y).powi(2);
                    points.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
                    points.dedup();
                    for p in points {
                        if p != start && p != end && out.last() != Some(&p) {
                            out.push(p);
                            inserted += 1;
                        }
                    }
                }
                out.dedup();
                while out.len() > 1 && out.first() == out.last() {
                    out.pop();
                }
                *ring = out;
            }
        }
        inserted
    }

    fn find_splits(&self, rings: &[Vec<Coord<f64>>], tolerance: f64) -> HashMap<(usize, usize), Vec<Coord<f64>>> {
        let mut segments = Vec::new();
        for (r, ring) in rings.iter().enumerate() {
            let n = ring.len();
            for i in 0..n {
                let line = Line::new(ring[i], ring[(i + 1) % n]);
                if line.start != line.end {
                    segments.push(IndexedSegment::new(line, r, i, tolerance));
                }
            }
        }
        let tree = RTree::bulk_load(segments);

        let mut splits: HashMap<(usize, usize), Vec<Coord<f64>>> = HashMap::new();
        let mut split = |seg: &IndexedSegment, p: Coord<f64>| {
            if p != seg.line.start && p != seg.line.end {
                splits.entry((seg.ring, seg.index)).or_default().push(p);
            }
        };

        for (s, t) in tree.intersection_candidates_with_other_tree(&tree) {
            if (s.ring, s.index) >= (t.ring, t.index) {
                continue;
            }
            if s.ring == t.ring && adjacent(s.index, t.index, rings[s.ring].len()) {
                continue;
            }

            for (on, from) in [(s, t), (t, s)] {
                for p in [from.line.start, from.line.end] {
                    if GeoPoint::from(p).euclidean_distance(&on.line) <= tolerance {
                        split(on, p);
                    }
                }
            }
            if let Some(LineIntersection::SinglePoint {
                intersection,
                is_proper: true,
            }) = line_intersection(s.line, t.line)
            {
                let p = self.snap(intersection);
                split(s, p);
                split(t, p);
            }
        }
        splits
    }
}

fn adjacent(i: usize, j: usize, n: usize) -> bool {
    (i + 1) % n == j || (j + 1) % n == i
}

fn open_ring(ls: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords = ls.0.clone();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

fn close_ring(coords: &[Coord<f64>]) -> LineString<f64> {
    let mut closed = coords.to_vec();
    if let Some(&first) = coords.first() {
        closed.push(first);
    }
    LineString::new(closed)
}
