use geo::{BoundingRect, Contains, Intersects};
use geo_types::{Coord, Point as GeoPoint, Polygon as GeoPolygon, Rect, Triangle as GeoTriangle};
use rstar::{RTree, RTreeObject, AABB};
use spade::Triangulation;

use crate::area::AreaType;
use crate::cdt::{self, Cdt};
use crate::contour_tree::{build_contour_tree, ContourTree};
use crate::error::{Result, TerrainError};
use crate::geometry::LayeredPolygonSet;
use crate::mesh::{Mesh, SeedPoint, Triangle, VertexId};

// Clipped polygon indexable by rstar
struct IndexedPolygon {
    polygon: GeoPolygon<f64>,
    area: AreaType,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

// Triangle of a previous triangulation indexable by rstar
struct IndexedTriangle {
    triangle: GeoPolygon<f64>,
    area: AreaType,
    envelope: AABB<[f64; 2]>,
}

impl IndexedTriangle {
    fn new(triangle: GeoTriangle<f64>, area: AreaType) -> Self {
        let bbox = triangle.bounding_rect();
        Self {
            triangle: triangle.to_polygon(),
            area,
            envelope: AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]),
        }
    }
}

impl RTreeObject for IndexedTriangle {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn point_envelope(c: Coord<f64>) -> AABB<[f64; 2]> {
    AABB::from_point([c.x, c.y])
}

/// Interior sample points of every outer boundary in `polygons`, tagged with
/// the area type of the polygon they belong to.
pub fn seeds_from(polygons: &LayeredPolygonSet) -> Result<Vec<SeedPoint>> {
    let mut seeds = Vec::new();
    for (area, polygon) in polygons.iter() {
        let (_, points) = build_contour_tree(polygon)?;
        for (contour, point) in polygon.contours.iter().zip(points) {
            if contour.hole {
                continue;
            }
            if let Some(position) = point {
                seeds.push(SeedPoint { position, area });
            }
        }
    }
    Ok(seeds)
}

/// Turns a disjoint polygon subdivision into a tagged triangle mesh.
///
/// Every polygon ring becomes a chain of constraint edges. No Steiner points
/// are added, so the mesh vertices are exactly the input points plus the
/// tile corners.
#[derive(Clone, Debug)]
pub struct ConstrainedTriangulator {
    /// Tag for regions neither a seed nor a polygon accounts for.
    pub fallback: AreaType,
}

impl Default for ConstrainedTriangulator {
    fn default() -> Self {
        Self {
            fallback: AreaType::Ocean,
        }
    }
}

impl ConstrainedTriangulator {
    pub fn new(fallback: AreaType) -> Self {
        Self { fallback }
    }

    pub fn triangulate(
        &self,
        polygons: &LayeredPolygonSet,
        bounds: Rect<f64>,
        seeds: &[SeedPoint],
    ) -> Result<Mesh> {
        let mut mesh = Mesh::new(bounds, self.fallback);
        let mut index = Vec::new();

        for (area, polygon) in polygons.iter() {
            let tree = ContourTree::build(polygon)?;
            for contour in &polygon.contours {
                let ids: Vec<VertexId> = contour
                    .points
                    .iter()
                    .map(|p| mesh.add_vertex(p.coord(), p.elevation))
                    .collect();
                for i in 0..ids.len() {
                    mesh.add_constraint(ids[i], ids[(i + 1) % ids.len()]);
                }
                if area.is_hole() {
                    for &id in &ids {
                        mesh.fix_position(id);
                    }
                }
            }
            for poly in tree.to_multi_polygon(polygon) {
                let Some(bbox) = poly.bounding_rect() else {
                    continue;
                };
                index.push(IndexedPolygon {
                    polygon: poly,
                    area,
                    envelope: AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]),
                });
            }
        }
        mesh.chain_boundary();
        mesh.set_seeds(seeds.to_vec());

        let index = RTree::bulk_load(index);
        let triangles = tag_triangles(&mesh, |c| {
            index
                .locate_in_envelope_intersecting(&point_envelope(c))
                .filter(|e| e.polygon.contains(&GeoPoint::from(c)))
                .map(|e| e.area)
                .min()
        })?;
        mesh.set_triangles(triangles);

        log::debug!(
            "triangulated {} vertices into {} triangles",
            mesh.vertices().len(),
            mesh.triangles().len()
        );
        Ok(mesh)
    }

    /// Triangulates the mesh again from its own vertices, constraints and
    /// seeds. Regions no seed lands in keep the tag of the old triangle
    /// under their first triangle's centroid.
    pub fn retriangulate(&self, mesh: &mut Mesh) -> Result<()> {
        let old: Vec<IndexedTriangle> = mesh
            .triangles()
            .iter()
            .map(|t| {
                let [a, b, c] = mesh.triangle_coords(t);
                IndexedTriangle::new(GeoTriangle::new(a, b, c), t.area)
            })
            .collect();
        let old = RTree::bulk_load(old);

        let triangles = tag_triangles(mesh, |c| {
            old.locate_in_envelope_intersecting(&point_envelope(c))
                .filter(|e| e.triangle.intersects(&GeoPoint::from(c)))
                .map(|e| e.area)
                .min()
        })?;
        log::debug!(
            "retriangulated {} vertices: {} -> {} triangles",
            mesh.vertices().len(),
            mesh.triangles().len(),
            triangles.len()
        );
        mesh.set_triangles(triangles);
        Ok(())
    }
}

/// Runs the CDT over the mesh's vertices and constraints and tags every
/// triangle inside the tile.
///
/// Regions are the face sets bounded by constraint edges. A region takes the
/// area type of the seeds located in it; otherwise `resolve` is asked about
/// one of its triangle centroids, and failing that it becomes the mesh's
/// fallback type. Crossing constraints and regions seeded with two different
/// types are errors: both mean the input was not a noded subdivision.
fn tag_triangles(mesh: &Mesh, resolve: impl Fn(Coord<f64>) -> Option<AreaType>) -> Result<Vec<Triangle>> {
    let mut cdt = Cdt::new();
    let mut handles = Vec::with_capacity(mesh.vertices().len());
    for v in mesh.vertices() {
        handles.push(cdt::insert_point(&mut cdt, v.position)?);
    }
    let mut owner: Vec<Option<VertexId>> = vec![None; cdt.num_vertices()];
    for (id, h) in handles.iter().enumerate() {
        owner[h.index()].get_or_insert(id);
    }
    for (a, b) in mesh.constraints() {
        cdt::add_constraint(&mut cdt, handles[a], handles[b])?;
    }

    let regions = cdt::label_regions(&cdt);
    let mut region_area: Vec<Option<AreaType>> = vec![None; regions.len()];

    for seed in mesh.seeds() {
        let Some(face) = cdt::locate_face(&cdt, seed.position) else {
            log::debug!("seed ({}, {}) lies outside the tile", seed.position.x, seed.position.y);
            continue;
        };
        let Some(r) = regions.region_of(face.index()) else {
            continue;
        };
        if regions.level[r] == 0 {
            continue;
        }
        match region_area[r] {
            None => region_area[r] = Some(seed.area),
            Some(area) if area != seed.area => {
                return Err(TerrainError::Triangulation(format!(
                    "region around ({}, {}) is seeded as both {area} and {}",
                    seed.position.x, seed.position.y, seed.area
                )));
            }
            Some(_) => {}
        }
    }

    let mut triangles = Vec::with_capacity(cdt.num_inner_faces());
    let mut unresolved = 0;
    for face in cdt.inner_faces() {
        let Some(r) = regions.region_of(face.fix().index()) else {
            continue;
        };
        if regions.level[r] == 0 {
            continue;
        }
        let area = match region_area[r] {
            Some(area) => area,
            None => {
                let centroid = cdt::face_centroid(&cdt, face.fix());
                let area = resolve(centroid).unwrap_or_else(|| {
                    unresolved += 1;
                    mesh.fallback()
                });
                region_area[r] = Some(area);
                area
            }
        };

        let [a, b, c] = face.vertices().map(|v| owner[v.fix().index()]);
        match (a, b, c) {
            (Some(a), Some(b), Some(c)) => triangles.push(Triangle { vertices: [a, b, c], area }),
            _ => {
                return Err(TerrainError::Triangulation(format!(
                    "face {} references a vertex outside the mesh",
                    face.fix().index()
                )))
            }
        }
    }
    if unresolved > 0 {
        log::warn!("{unresolved} region(s) without a seed or polygon, tagged {}", mesh.fallback());
    }
    Ok(triangles)
}

#[cfg(test)]
#[path = "triangulator_tests.rs"]
mod tests;
