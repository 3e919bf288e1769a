//! Thin layer over spade's constrained Delaunay triangulation: ring
//! insertion, region labelling across constraint edges and point location.

use std::collections::VecDeque;

use geo_types::Coord;
use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2, PositionInTriangulation, Triangulation};

use crate::error::{Result, TerrainError};

pub type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;

pub fn insert_point(cdt: &mut Cdt, c: Coord<f64>) -> Result<FixedVertexHandle> {
    cdt.insert(Point2::new(c.x, c.y))
        .map_err(|e| TerrainError::Triangulation(format!("insert ({}, {}): {e}", c.x, c.y)))
}

/// Adds a constraint edge. Returns whether a new constraint was created.
///
/// A constraint crossing an existing one is refused with an error; it is
/// never split.
pub fn add_constraint(cdt: &mut Cdt, from: FixedVertexHandle, to: FixedVertexHandle) -> Result<bool> {
    if from == to {
        return Ok(false);
    }
    if !cdt.can_add_constraint(from, to) {
        let a = cdt.vertex(from).position();
        let b = cdt.vertex(to).position();
        return Err(TerrainError::Triangulation(format!(
            "constraint ({}, {}) -> ({}, {}) crosses an existing constraint",
            a.x, a.y, b.x, b.y
        )));
    }
    Ok(cdt.add_constraint(from, to))
}

/// Inserts a closed ring and constrains all of its edges. Returns the vertex
/// handle of every ring coordinate, in ring order.
pub fn insert_ring(cdt: &mut Cdt, coords: &[Coord<f64>]) -> Result<Vec<FixedVertexHandle>> {
    let mut handles = Vec::with_capacity(coords.len());
    for &c in coords {
        handles.push(insert_point(cdt, c)?);
    }
    for i in 0..handles.len() {
        add_constraint(cdt, handles[i], handles[(i + 1) % handles.len()])?;
    }
    Ok(handles)
}

/// Faces grouped into regions that are connected without crossing a
/// constraint edge.
///
/// `level` counts the fewest constraint crossings needed to reach a region
/// from the outer face, so level 0 regions lie outside every constrained
/// boundary.
#[derive(Debug, Default)]
pub struct Regions {
    face_region: Vec<Option<usize>>,
    pub level: Vec<u32>,
}

impl Regions {
    pub fn region_of(&self, face_index: usize) -> Option<usize> {
        self.face_region.get(face_index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.level.len()
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_empty()
    }
}

/// Breadth-first flood from the outer face, one crossing level at a time.
pub fn label_regions(cdt: &Cdt) -> Regions {
    let mut regions = Regions {
        face_region: vec![None; cdt.num_all_faces()],
        level: Vec::new(),
    };

    let mut frontier: Vec<FixedFaceHandle<InnerTag>> = Vec::new();
    let mut next: Vec<FixedFaceHandle<InnerTag>> = Vec::new();
    for edge in cdt.directed_edges() {
        if !edge.face().is_outer() {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                next.push(inner.fix());
            } else {
                frontier.push(inner.fix());
            }
        }
    }

    let mut level = 0;
    loop {
        for start in std::mem::take(&mut frontier) {
            if regions.face_region[start.index()].is_none() {
                flood(cdt, start, level, &mut regions, &mut next);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = std::mem::take(&mut next);
        level += 1;
    }
    regions
}

fn flood(
    cdt: &Cdt,
    start: FixedFaceHandle<InnerTag>,
    level: u32,
    regions: &mut Regions,
    crossings: &mut Vec<FixedFaceHandle<InnerTag>>,
) {
    let region = regions.level.len();
    regions.level.push(level);
    regions.face_region[start.index()] = Some(region);

    let mut queue = VecDeque::from([start]);
    while let Some(fix) = queue.pop_front() {
        for edge in cdt.face(fix).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let idx = neighbor.fix().index();
            if regions.face_region[idx].is_some() {
                continue;
            }
            if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                crossings.push(neighbor.fix());
            } else {
                regions.face_region[idx] = Some(region);
                queue.push_back(neighbor.fix());
            }
        }
    }
}

pub fn face_centroid(cdt: &Cdt, face: FixedFaceHandle<InnerTag>) -> Coord<f64> {
    let [a, b, c] = cdt.face(face).vertices().map(|v| v.position());
    Coord {
        x: (a.x + b.x + c.x) / 3.0,
        y: (a.y + b.y + c.y) / 3.0,
    }
}

/// Inner face containing `c`. Points on an edge or vertex resolve to one of
/// the adjacent inner faces.
pub fn locate_face(cdt: &Cdt, c: Coord<f64>) -> Option<FixedFaceHandle<InnerTag>> {
    match cdt.locate(Point2::new(c.x, c.y)) {
        PositionInTriangulation::OnFace(face) => Some(face),
        PositionInTriangulation::OnEdge(edge) => {
            let edge = cdt.directed_edge(edge);
            edge.face()
                .as_inner()
                .or_else(|| edge.rev().face().as_inner())
                .map(|f| f.fix())
        }
        PositionInTriangulation::OnVertex(vertex) => cdt
            .vertex(vertex)
            .out_edges()
            .find_map(|e| e.face().as_inner())
            .map(|f| f.fix()),
        PositionInTriangulation::OutsideOfConvexHull(_) | PositionInTriangulation::NoTriangulation => {
            None
        }
    }
}
