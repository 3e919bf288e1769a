//! Tagged triangle mesh of one tile.
//!
//! Vertices are addressed by index and deduplicated by exact position.
//! Constraint edges are kept as vertex index pairs so the mesh can be
//! triangulated again after its vertices were moved or added.

mod triangulator;

pub use triangulator::{seeds_from, ConstrainedTriangulator};

use std::collections::{BTreeSet, HashMap};

use geo_types::{Coord, Rect};

use crate::area::AreaType;
use crate::geometry::CoordKey;

pub type VertexId = usize;

/// Meters per degree of latitude, close enough for shading normals.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Positions closer than this to a tile side count as lying on it.
pub const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: Coord<f64>,
    pub elevation: Option<f64>,
    pub normal: [f64; 3],
    fixed_position: bool,
    fixed_normal: bool,
}

impl Vertex {
    pub fn new(position: Coord<f64>, elevation: Option<f64>) -> Self {
        Self {
            position,
            elevation,
            normal: [0.0, 0.0, 1.0],
            fixed_position: false,
            fixed_normal: false,
        }
    }

    pub fn is_fixed_position(&self) -> bool {
        self.fixed_position
    }

    pub fn is_fixed_normal(&self) -> bool {
        self.fixed_normal
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    /// Counter-clockwise.
    pub vertices: [VertexId; 3],
    pub area: AreaType,
}

/// Interior sample point of a region and the area type it stands for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedPoint {
    pub position: Coord<f64>,
    pub area: AreaType,
}

/// Anything that can report ground elevation, in meters, at a lon/lat.
pub trait ElevationSource {
    fn elevation_at(&self, lon: f64, lat: f64) -> f64;
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> f64,
{
    fn elevation_at(&self, lon: f64, lat: f64) -> f64 {
        self(lon, lat)
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    index: HashMap<CoordKey, VertexId>,
    triangles: Vec<Triangle>,
    constraints: BTreeSet<(VertexId, VertexId)>,
    seeds: Vec<SeedPoint>,
    bounds: Rect<f64>,
    fallback: AreaType,
}

impl Mesh {
    /// Empty mesh holding only the four tile corners.
    pub fn new(bounds: Rect<f64>, fallback: AreaType) -> Self {
        let mut mesh = Self {
            vertices: Vec::new(),
            index: HashMap::new(),
            triangles: Vec::new(),
            constraints: BTreeSet::new(),
            seeds: Vec::new(),
            bounds,
            fallback,
        };
        let (min, max) = (bounds.min(), bounds.max());
        for c in [min, Coord { x: max.x, y: min.y }, max, Coord { x: min.x, y: max.y }] {
            mesh.add_vertex(c, None);
        }
        mesh
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id]
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn seeds(&self) -> &[SeedPoint] {
        &self.seeds
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    pub fn fallback(&self) -> AreaType {
        self.fallback
    }

    /// Constraint edges as vertex index pairs, lower index first.
    pub fn constraints(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.constraints.iter().copied()
    }

    pub fn is_constraint(&self, a: VertexId, b: VertexId) -> bool {
        self.constraints.contains(&(a.min(b), a.max(b)))
    }

    /// Vertex at exactly `position`.
    pub fn find_vertex(&self, position: Coord<f64>) -> Option<VertexId> {
        self.index.get(&CoordKey::from(position)).copied()
    }

    /// Adds a vertex, or returns the one already at `position`. A known
    /// elevation fills in a missing one but never overrides it.
    pub fn add_vertex(&mut self, position: Coord<f64>, elevation: Option<f64>) -> VertexId {
        if let Some(&id) = self.index.get(&CoordKey::from(position)) {
            let v = &mut self.vertices[id];
            if v.elevation.is_none() && !v.fixed_position {
                v.elevation = elevation;
            }
            return id;
        }
        let id = self.vertices.len();
        self.vertices.push(Vertex::new(position, elevation));
        self.index.insert(CoordKey::from(position), id);
        id
    }

    /// Returns false for a degenerate edge.
    pub fn add_constraint(&mut self, a: VertexId, b: VertexId) -> bool {
        if a == b || self.vertices[a].position == self.vertices[b].position {
            return false;
        }
        self.constraints.insert((a.min(b), a.max(b)))
    }

    /// Moves a vertex unless its position is fixed.
    pub fn move_vertex(&mut self, id: VertexId, to: Coord<f64>) -> bool {
        if self.vertices[id].fixed_position {
            return false;
        }
        let key = CoordKey::from(to);
        if self.index.get(&key).map_or(false, |&other| other != id) {
            log::warn!("vertex {id} not moved onto occupied position ({}, {})", to.x, to.y);
            return false;
        }
        self.index.remove(&CoordKey::from(self.vertices[id].position));
        self.index.insert(key, id);
        self.vertices[id].position = to;
        true
    }

    /// Sets the elevation unless the vertex position is fixed.
    pub fn set_elevation(&mut self, id: VertexId, elevation: f64) -> bool {
        let v = &mut self.vertices[id];
        if v.fixed_position {
            return false;
        }
        v.elevation = Some(elevation);
        true
    }

    /// Pins a vertex for good.
    pub fn fix_position(&mut self, id: VertexId) {
        self.vertices[id].fixed_position = true;
    }

    pub fn fix_normal(&mut self, id: VertexId) {
        self.vertices[id].fixed_normal = true;
    }

    pub fn set_normal(&mut self, id: VertexId, normal: [f64; 3]) -> bool {
        let v = &mut self.vertices[id];
        if v.fixed_normal {
            return false;
        }
        v.normal = normal;
        true
    }

    pub fn triangle_coords(&self, t: &Triangle) -> [Coord<f64>; 3] {
        t.vertices.map(|v| self.vertices[v].position)
    }

    pub fn triangle_centroid(&self, t: &Triangle) -> Coord<f64> {
        let [a, b, c] = self.triangle_coords(t);
        Coord {
            x: (a.x + b.x + c.x) / 3.0,
            y: (a.y + b.y + c.y) / 3.0,
        }
    }

    /// Planar area of all triangles tagged `area`.
    pub fn area_of(&self, area: AreaType) -> f64 {
        self.triangles
            .iter()
            .filter(|t| t.area == area)
            .map(|t| {
                let [a, b, c] = self.triangle_coords(t);
                ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() * 0.5
            })
            .sum()
    }

    pub fn is_on_boundary(&self, position: Coord<f64>) -> bool {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        (position.x - min.x).abs() <= BOUNDARY_EPSILON
            || (position.x - max.x).abs() <= BOUNDARY_EPSILON
            || (position.y - min.y).abs() <= BOUNDARY_EPSILON
            || (position.y - max.y).abs() <= BOUNDARY_EPSILON
    }

    /// Replaces the constraints that run along a tile side with a chain
    /// through every vertex now lying on that side.
    pub fn chain_boundary(&mut self) {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        let sides: [(fn(Coord<f64>) -> f64, fn(Coord<f64>) -> f64, f64); 4] = [
            (|c| c.y, |c| c.x, min.y),
            (|c| c.y, |c| c.x, max.y),
            (|c| c.x, |c| c.y, min.x),
            (|c| c.x, |c| c.y, max.x),
        ];

        for (fixed, along, value) in sides {
            let on_side = |id: &VertexId| (fixed(self.vertices[*id].position) - value).abs() <= BOUNDARY_EPSILON;
            let mut ids: Vec<VertexId> = (0..self.vertices.len()).filter(|id| on_side(id)).collect();
            let stale: Vec<(VertexId, VertexId)> = self
                .constraints
                .iter()
                .copied()
                .filter(|(a, b)| on_side(a) && on_side(b))
                .collect();
            ids.sort_by(|&a, &b| {
                along(self.vertices[a].position).total_cmp(&along(self.vertices[b].position))
            });

            for edge in stale {
                self.constraints.remove(&edge);
            }
            for pair in ids.windows(2) {
                self.add_constraint(pair[0], pair[1]);
            }
        }
    }

    /// Fills in elevation for every vertex whose position is not fixed.
    pub fn apply_elevation(&mut self, source: &dyn ElevationSource) {
        for v in self.vertices.iter_mut().filter(|v| !v.fixed_position) {
            v.elevation = Some(source.elevation_at(v.position.x, v.position.y));
        }
    }

    /// Area weighted vertex normals in a local metric frame. Vertices with a
    /// fixed normal keep theirs.
    pub fn compute_normals(&mut self) {
        let center = self.bounds.center();
        let x_scale = METERS_PER_DEGREE * center.y.to_radians().cos();
        let local = |v: &Vertex| {
            [
                (v.position.x - center.x) * x_scale,
                (v.position.y - center.y) * METERS_PER_DEGREE,
                v.elevation.unwrap_or(0.0),
            ]
        };

        let mut sums = vec![[0.0f64; 3]; self.vertices.len()];
        for t in &self.triangles {
            let [a, b, c] = t.vertices.map(|v| local(&self.vertices[v]));
            let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let w = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let n = [
                u[1] * w[2] - u[2] * w[1],
                u[2] * w[0] - u[0] * w[2],
                u[0] * w[1] - u[1] * w[0],
            ];
            for &v in &t.vertices {
                for k in 0..3 {
                    sums[v][k] += n[k];
                }
            }
        }

        for (v, n) in self.vertices.iter_mut().zip(sums) {
            if v.fixed_normal {
                continue;
            }
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            v.normal = if len > 0.0 {
                [n[0] / len, n[1] / len, n[2] / len]
            } else {
                [0.0, 0.0, 1.0]
            };
        }
    }

    /// Constraint edges as position pairs, each pair and the whole list
    /// sorted, for comparing two triangulations.
    pub fn constraint_set(&self) -> Vec<([f64; 2], [f64; 2])> {
        let key = |c: Coord<f64>| [c.x, c.y];
        let cmp = |a: &[f64; 2], b: &[f64; 2]| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1]));
        let mut edges: Vec<([f64; 2], [f64; 2])> = self
            .constraints
            .iter()
            .map(|&(a, b)| {
                let (pa, pb) = (key(self.vertices[a].position), key(self.vertices[b].position));
                if cmp(&pa, &pb).is_gt() {
                    (pb, pa)
                } else {
                    (pa, pb)
                }
            })
            .collect();
        edges.sort_by(|x, y| cmp(&x.0, &y.0).then(cmp(&x.1, &y.1)));
        edges
    }

    pub(crate) fn set_seeds(&mut self, seeds: Vec<SeedPoint>) {
        self.seeds = seeds;
    }

    pub(crate) fn set_triangles(&mut self, triangles: Vec<Triangle>) {
        self.triangles = triangles;
    }
}

#[cfg(test)]
mod tests;
