use std::collections::HashSet;

use geo_types::Coord;
use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::Triangulation;

use crate::cdt::{self, Cdt};
use crate::contour_tree::{ContourTree, ROOT};
use crate::error::{Result, TerrainError};
use crate::geometry::{ring, Polygon};

/// Interior sample point for every contour reachable in `tree`, resolved
/// children first.
pub(super) fn interior_points(polygon: &Polygon, tree: &ContourTree) -> Result<Vec<Option<Coord<f64>>>> {
    let mut points = vec![None; polygon.contours.len()];
    for id in tree.post_order() {
        if id == ROOT {
            continue;
        }
        let Some(contour) = tree.node(id).contour else {
            continue;
        };
        let holes: Vec<Vec<Coord<f64>>> = tree
            .child_contours(id)
            .map(|c| polygon.contours[c].coords().collect())
            .collect();
        let ring: Vec<Coord<f64>> = polygon.contours[contour].coords().collect();
        let point = point_inside(contour, &ring, &holes)?;
        log::trace!("point inside contour {contour} = ({}, {})", point.x, point.y);
        points[contour] = Some(point);
    }
    Ok(points)
}

/// Triangulates `ring` with `holes` cut out, without Steiner points, and
/// returns the centroid of the in-domain triangle on the ring's safe edge.
fn point_inside(index: usize, ring: &[Coord<f64>], holes: &[Vec<Coord<f64>>]) -> Result<Coord<f64>> {
    // Zero-area rings have no interior.
    if ring::signed_area(ring) == 0.0 {
        return Err(TerrainError::DegenerateContour { contour: index });
    }
    let mut cdt = Cdt::new();
    let handles = cdt::insert_ring(&mut cdt, ring)?;
    for hole in holes {
        cdt::insert_ring(&mut cdt, hole)?;
    }

    // Odd crossing levels are inside the ring but outside its holes.
    let regions = cdt::label_regions(&cdt);
    let in_domain: HashSet<usize> = cdt
        .inner_faces()
        .map(|f| f.fix().index())
        .filter(|&f| regions.region_of(f).map_or(false, |r| regions.level[r] % 2 == 1))
        .collect();
    if in_domain.is_empty() {
        return Err(TerrainError::DegenerateContour { contour: index });
    }

    if let Some(face) = safe_edge_face(&cdt, ring, &handles, &in_domain) {
        return Ok(cdt::face_centroid(&cdt, face));
    }

    // The safe edge got split by a touching hole; settle for any in-domain
    // triangle on the ring, then for any in-domain triangle at all.
    let on_ring: HashSet<FixedVertexHandle> = handles.iter().copied().collect();
    let fallback = cdt
        .inner_faces()
        .filter(|f| in_domain.contains(&f.fix().index()))
        .find(|f| f.vertices().iter().any(|v| on_ring.contains(&v.fix())))
        .or_else(|| cdt.inner_faces().find(|f| in_domain.contains(&f.fix().index())))
        .map(|f| f.fix());
    match fallback {
        Some(face) => Ok(cdt::face_centroid(&cdt, face)),
        None => Err(TerrainError::DegenerateContour { contour: index }),
    }
}

fn safe_edge_face(
    cdt: &Cdt,
    ring: &[Coord<f64>],
    handles: &[FixedVertexHandle],
    in_domain: &HashSet<usize>,
) -> Option<FixedFaceHandle<InnerTag>> {
    let (a, b) = ring::safe_edge(ring)?;
    let edge = cdt.get_edge_from_neighbors(handles[a], handles[b])?;
    [edge.face(), edge.rev().face()]
        .into_iter()
        .filter_map(|f| f.as_inner())
        .map(|f| f.fix())
        .find(|f| in_domain.contains(&f.index()))
}
