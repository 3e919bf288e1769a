//! Reconciles a tile's boundary vertices with what its neighbours persisted,
//! so adjacent tiles meet without cracks.
//!
//! The neighbour's boundary is authoritative: matched vertices snap to its
//! positions and take its elevation, its extra points are inserted, and all
//! of them are pinned afterwards so later passes cannot pull them apart.
//! A neighbour point without an elevation is sampled at its position.

mod records;
mod store;

pub use records::{EdgeDirection, EdgeMatch, MovedNode, NodeMembership, SharedEdgeRecord};
pub use store::{BoundaryStore, GeoJsonBoundaryStore, MemoryBoundaryStore};

use std::cmp::Ordering;

use geo_types::Coord;
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::error::Result;
use crate::geometry::Point;
use crate::mesh::{ConstrainedTriangulator, ElevationSource, Mesh, VertexId, BOUNDARY_EPSILON};

type NeighborPoint = GeomWithData<[f64; 2], usize>;

#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Largest distance, in degrees, at which two boundary points are the same.
    pub tolerance: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { tolerance: 1e-5 }
    }
}

impl MatchConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

fn cmp_coord(a: Coord<f64>, b: Coord<f64>) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

#[derive(Clone, Debug, Default)]
pub struct TileEdgeMatcher {
    pub config: MatchConfig,
}

impl TileEdgeMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Mesh vertices lying on `edge`, sorted along it.
    pub fn boundary_vertices(mesh: &Mesh, edge: EdgeDirection) -> Vec<VertexId> {
        let bounds = mesh.bounds();
        let mut ids: Vec<VertexId> = mesh
            .vertices()
            .iter()
            .enumerate()
            .filter(|(_, v)| edge.contains(bounds, v.position, BOUNDARY_EPSILON))
            .map(|(id, _)| id)
            .collect();
        ids.sort_by(|&a, &b| {
            let (pa, pb) = (mesh.vertex(a).position, mesh.vertex(b).position);
            edge.along(pa).total_cmp(&edge.along(pb)).then(cmp_coord(pa, pb))
        });
        ids
    }

    /// Classifies the points of one side against the neighbour's records.
    ///
    /// Candidate pairs within tolerance are taken greedily by distance, ties
    /// broken by the current and then the neighbour coordinates, so the
    /// outcome never depends on input order. Matched points carry the
    /// neighbour's point. The result is sorted along the side.
    pub fn classify(
        &self,
        mesh: &Mesh,
        neighbor: &[SharedEdgeRecord],
        edge: EdgeDirection,
    ) -> Vec<SharedEdgeRecord> {
        let bounds = mesh.bounds();
        let tolerance = self.config.tolerance;
        let (lo, hi) = match edge {
            EdgeDirection::North | EdgeDirection::South => (bounds.min().x, bounds.max().x),
            EdgeDirection::East | EdgeDirection::West => (bounds.min().y, bounds.max().y),
        };

        let theirs: Vec<&SharedEdgeRecord> = neighbor
            .iter()
            .filter(|r| {
                let c = r.point.coord();
                let along = edge.along(c);
                let usable = edge.contains(bounds, c, tolerance) && along >= lo - tolerance && along <= hi + tolerance;
                if !usable {
                    log::warn!("neighbour point ({}, {}) is not on the {edge} side", c.x, c.y);
                }
                usable
            })
            .collect();
        let ours = Self::boundary_vertices(mesh, edge);

        let index: RTree<NeighborPoint> = RTree::bulk_load(
            theirs
                .iter()
                .enumerate()
                .map(|(j, r)| NeighborPoint::new([r.point.lon, r.point.lat], j))
                .collect(),
        );

        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (i, &id) in ours.iter().enumerate() {
            let p = mesh.vertex(id).position;
            for hit in index.locate_within_distance([p.x, p.y], tolerance * tolerance) {
                let q = theirs[hit.data].point.coord();
                let d = ((p.x - q.x).powi(2) + (p.y - q.y).powi(2)).sqrt();
                candidates.push((d, i, hit.data));
            }
        }
        candidates.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| cmp_coord(mesh.vertex(ours[a.1]).position, mesh.vertex(ours[b.1]).position))
                .then_with(|| cmp_coord(theirs[a.2].point.coord(), theirs[b.2].point.coord()))
        });

        let mut our_match: Vec<Option<usize>> = vec![None; ours.len()];
        let mut their_used = vec![false; theirs.len()];
        for (_, i, j) in candidates {
            if our_match[i].is_none() && !their_used[j] {
                our_match[i] = Some(j);
                their_used[j] = true;
            }
        }

        let mut records: Vec<SharedEdgeRecord> = ours
            .iter()
            .zip(&our_match)
            .map(|(&id, m)| match m {
                Some(j) => SharedEdgeRecord::new(theirs[*j].point, NodeMembership::Both).with_vertex(id),
                None => {
                    let v = mesh.vertex(id);
                    let point = Point {
                        lon: v.position.x,
                        lat: v.position.y,
                        elevation: v.elevation,
                    };
                    SharedEdgeRecord::new(point, NodeMembership::OnlyCurrent).with_vertex(id)
                }
            })
            .collect();
        records.extend(
            theirs
                .iter()
                .zip(&their_used)
                .filter(|(_, used)| !**used)
                .map(|(r, _)| SharedEdgeRecord::new(r.point, NodeMembership::OnlyNeighbor)),
        );
        records.sort_by(|a, b| {
            let (pa, pb) = (a.point.coord(), b.point.coord());
            edge.along(pa).total_cmp(&edge.along(pb)).then(cmp_coord(pa, pb))
        });
        records
    }

    /// Applies one side's classification to the mesh without
    /// re-triangulating.
    pub fn apply(
        &self,
        mesh: &mut Mesh,
        edge: EdgeDirection,
        records: Vec<SharedEdgeRecord>,
        elevation: Option<&dyn ElevationSource>,
    ) -> EdgeMatch {
        let mut result = EdgeMatch::new(edge);
        for mut record in records {
            let target = record.point.coord();
            let height = record
                .point
                .elevation
                .or_else(|| elevation.map(|source| source.elevation_at(target.x, target.y)));
            match record.membership {
                NodeMembership::OnlyCurrent => {}
                NodeMembership::Both => {
                    let Some(id) = record.vertex else {
                        continue;
                    };
                    let old = mesh.vertex(id).position;
                    if old != target {
                        if mesh.move_vertex(id, target) {
                            result.moved.push(MovedNode { vertex: id, old, new: target });
                        } else {
                            log::warn!(
                                "{edge} side: vertex {id} at ({}, {}) is pinned, not moved to ({}, {})",
                                old.x, old.y, target.x, target.y
                            );
                            result.pinned.push(id);
                        }
                    }
                    if let Some(e) = height {
                        mesh.set_elevation(id, e);
                    }
                    mesh.fix_position(id);
                }
                NodeMembership::OnlyNeighbor => {
                    let id = mesh.add_vertex(target, height);
                    mesh.fix_position(id);
                    record.vertex = Some(id);
                    result.inserted.push(id);
                }
            }
            result.records.push(record);
        }
        log::debug!(
            "{edge} side: {} shared, {} ours only, {} inserted, {} moved",
            result.count(NodeMembership::Both),
            result.count(NodeMembership::OnlyCurrent),
            result.inserted.len(),
            result.moved.len()
        );
        result
    }

    /// Matches a single side and re-triangulates.
    pub fn match_edge(
        &self,
        mesh: &mut Mesh,
        neighbor: &[SharedEdgeRecord],
        edge: EdgeDirection,
    ) -> Result<EdgeMatch> {
        let mut matches = self.match_edges(mesh, &[(edge, neighbor.to_vec())], None)?;
        Ok(matches.remove(0))
    }

    /// Matches every side with neighbour data, then re-chains the tile
    /// boundary and re-triangulates once. `elevation` fills in heights the
    /// neighbour did not record.
    pub fn match_edges(
        &self,
        mesh: &mut Mesh,
        neighbors: &[(EdgeDirection, Vec<SharedEdgeRecord>)],
        elevation: Option<&dyn ElevationSource>,
    ) -> Result<Vec<EdgeMatch>> {
        let mut matches = Vec::with_capacity(neighbors.len());
        for (edge, records) in neighbors {
            let classified = self.classify(mesh, records, *edge);
            matches.push(self.apply(mesh, *edge, classified, elevation));
        }
        if matches.iter().any(|m| !m.moved.is_empty() || !m.inserted.is_empty()) {
            mesh.chain_boundary();
            ConstrainedTriangulator::new(mesh.fallback()).retriangulate(mesh)?;
        }
        Ok(matches)
    }

    /// The side's boundary as it should be persisted for the neighbour:
    /// every boundary vertex at its final position. Points already known to
    /// the neighbour are marked shared.
    pub fn boundary_records(mesh: &Mesh, edge: EdgeDirection, matched: Option<&EdgeMatch>) -> Vec<SharedEdgeRecord> {
        let shared = |id: VertexId| {
            matched.map_or(false, |m| {
                m.records
                    .iter()
                    .any(|r| r.vertex == Some(id) && r.membership != NodeMembership::OnlyCurrent)
            })
        };
        Self::boundary_vertices(mesh, edge)
            .into_iter()
            .map(|id| {
                let v = mesh.vertex(id);
                let point = Point {
                    lon: v.position.x,
                    lat: v.position.y,
                    elevation: v.elevation,
                };
                let membership = if shared(id) {
                    NodeMembership::Both
                } else {
                    NodeMembership::OnlyCurrent
                };
                SharedEdgeRecord::new(point, membership).with_vertex(id)
            })
            .collect()
    }
}
