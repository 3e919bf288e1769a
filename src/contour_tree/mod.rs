//! Hole/boundary nesting of a polygon's contours.
//!
//! Nodes live in an arena and are addressed by index. A node is only created
//! once its place in the tree is final, so removal during the sibling fix-up
//! never leaves dangling children behind.

mod interior;

use geo::{BoundingRect, Contains};
use geo_types::{Coord, LineString, MultiPolygon, Polygon as GeoPolygon, Rect};
use smallvec::SmallVec;

use crate::error::Result;
use crate::geometry::{ring, Polygon};

pub type NodeId = usize;

/// Index of the synthetic root node.
pub const ROOT: NodeId = 0;

#[derive(Clone, Debug)]
pub struct ContourNode {
    /// Contour index in the source polygon; `None` for the root.
    pub contour: Option<usize>,
    pub hole: bool,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
}

#[derive(Clone, Debug)]
pub struct ContourTree {
    nodes: Vec<ContourNode>,
    /// Contours that fit nowhere with alternating parity.
    orphans: Vec<usize>,
}

/// Per-contour containment data.
struct Rings {
    polygons: Vec<GeoPolygon<f64>>,
    bounds: Vec<Option<Rect<f64>>>,
}

impl Rings {
    fn new(polygon: &Polygon) -> Self {
        let polygons: Vec<_> = polygon
            .contours
            .iter()
            .map(|c| GeoPolygon::new(c.to_line_string(), vec![]))
            .collect();
        let bounds = polygons.iter().map(|p| p.bounding_rect()).collect();
        Self { polygons, bounds }
    }

    /// Whether contour `inner` lies within contour `outer`.
    fn within(&self, inner: usize, outer: usize) -> bool {
        let (Some(a), Some(b)) = (self.bounds[inner], self.bounds[outer]) else {
            return false;
        };
        if a.min().x < b.min().x || a.min().y < b.min().y || a.max().x > b.max().x || a.max().y > b.max().y {
            return false;
        }
        self.polygons[outer].contains(&self.polygons[inner])
    }
}

impl ContourTree {
    /// Resolves which contour is inside which.
    ///
    /// Starting at the root, every node adopts the still available contours
    /// of opposite parity that it contains (the root adopts all outer
    /// boundaries). Adopted children that sit inside one of their siblings
    /// are handed back and picked up further down.
    pub fn build(polygon: &Polygon) -> Result<Self> {
        polygon.validate()?;
        let rings = Rings::new(polygon);
        let n = polygon.contours.len();

        let mut tree = ContourTree {
            nodes: vec![ContourNode {
                contour: None,
                hole: false,
                parent: None,
                children: SmallVec::new(),
            }],
            orphans: Vec::new(),
        };
        let mut available = vec![true; n];

        let mut stack = vec![ROOT];
        while let Some(node) = stack.pop() {
            let (parent_contour, want_hole) = match tree.nodes[node].contour {
                None => (None, false),
                Some(c) => (Some(c), !polygon.contours[c].hole),
            };

            let candidates: Vec<usize> = (0..n)
                .filter(|&i| available[i] && polygon.contours[i].hole == want_hole)
                .filter(|&i| parent_contour.map_or(true, |p| rings.within(i, p)))
                .collect();
            for &i in &candidates {
                available[i] = false;
            }

            let (kept, released) = drop_nested_siblings(&candidates, |a, b| rings.within(a, b));
            for i in released {
                available[i] = true;
            }

            for contour in kept {
                let id = tree.nodes.len();
                tree.nodes.push(ContourNode {
                    contour: Some(contour),
                    hole: polygon.contours[contour].hole,
                    parent: Some(node),
                    children: SmallVec::new(),
                });
                tree.nodes[node].children.push(id);
                stack.push(id);
            }
        }

        tree.orphans = (0..n).filter(|&i| available[i]).collect();
        if !tree.orphans.is_empty() {
            log::warn!(
                "{} contour(s) have no parent of opposite hole parity: {:?}",
                tree.orphans.len(),
                tree.orphans
            );
        }
        Ok(tree)
    }

    pub fn root(&self) -> &ContourNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, id: NodeId) -> &ContourNode {
        &self.nodes[id]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn orphans(&self) -> &[usize] {
        &self.orphans
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.nodes[p].parent;
        }
        depth
    }

    /// Node ids with every child listed before its parent. The root is last.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(ROOT, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
            } else {
                stack.push((id, true));
                for &child in self.nodes[id].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    /// Contour indices of the direct children of `id`.
    pub fn child_contours(&self, id: NodeId) -> impl Iterator<Item = usize> + '_ {
        self.nodes[id].children.iter().filter_map(|&c| self.nodes[c].contour)
    }

    /// Assembles the polygon into exterior/interior form: every outer
    /// boundary node becomes an exterior with its child holes as interiors.
    /// Exteriors wind counter-clockwise, interiors clockwise.
    pub fn to_multi_polygon(&self, polygon: &Polygon) -> MultiPolygon<f64> {
        let oriented = |index: usize, ccw: bool| -> LineString<f64> {
            let contour = &polygon.contours[index];
            let mut coords: Vec<Coord<f64>> = contour.coords().collect();
            if (ring::signed_area(&coords) > 0.0) != ccw {
                coords.reverse();
            }
            if let Some(&first) = coords.first() {
                coords.push(first);
            }
            LineString::new(coords)
        };

        let polygons = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.hole)
            .filter_map(|(id, node)| {
                let contour = node.contour?;
                let interiors = self.child_contours(id).map(|h| oriented(h, false)).collect();
                Some(GeoPolygon::new(oriented(contour, true), interiors))
            })
            .collect();
        MultiPolygon::new(polygons)
    }
}

/// Two-pass sibling fix-up: first mark every candidate that lies inside some
/// other candidate, then compact. Of two identical rings only the later one
/// is marked. Returns `(kept, released)`.
fn drop_nested_siblings(
    candidates: &[usize],
    within: impl Fn(usize, usize) -> bool,
) -> (Vec<usize>, Vec<usize>) {
    let mut marked = vec![false; candidates.len()];
    for (i, &a) in candidates.iter().enumerate() {
        for (j, &b) in candidates.iter().enumerate() {
            if i == j || !within(a, b) {
                continue;
            }
            if i < j && within(b, a) {
                continue;
            }
            marked[i] = true;
            break;
        }
    }

    let mut kept = Vec::with_capacity(candidates.len());
    let mut released = Vec::new();
    for (&c, &m) in candidates.iter().zip(&marked) {
        if m {
            released.push(c);
        } else {
            kept.push(c);
        }
    }
    (kept, released)
}

/// Builds the contour tree of `polygon` and an interior sample point for each
/// of its contours (`None` for orphans).
pub fn build_contour_tree(polygon: &Polygon) -> Result<(ContourTree, Vec<Option<Coord<f64>>>)> {
    let tree = ContourTree::build(polygon)?;
    let points = interior::interior_points(polygon, &tree)?;
    Ok((tree, points))
}

/// Resolves the tree and caches the interior point on every contour.
pub fn calc_points_inside(polygon: &mut Polygon) -> Result<ContourTree> {
    let (tree, points) = build_contour_tree(polygon)?;
    for (contour, point) in polygon.contours.iter_mut().zip(points) {
        if let Some(p) = point {
            contour.set_interior_point(p);
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests;
