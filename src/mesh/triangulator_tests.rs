use super::*;
use crate::geometry::{Contour, Point, Polygon};
use approx::assert_relative_eq;
use geo_types::coord;
use std::collections::HashSet;

fn tile() -> Rect<f64> {
    Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 })
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64, hole: bool) -> Contour {
    Contour::from_coords(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)], hole)
}

/// Land square in the middle of the tile, ocean around it.
fn island_tile() -> LayeredPolygonSet {
    let mut set = LayeredPolygonSet::new();
    set.add(
        AreaType::Default,
        Polygon::new(vec![square(0.25, 0.25, 0.75, 0.75, false)]),
    );
    set.add(
        AreaType::Ocean,
        Polygon::new(vec![
            square(0.0, 0.0, 1.0, 1.0, false),
            square(0.25, 0.25, 0.75, 0.75, true),
        ]),
    );
    set
}

fn edges_of(mesh: &Mesh) -> HashSet<(VertexId, VertexId)> {
    mesh.triangles()
        .iter()
        .flat_map(|t| {
            let [a, b, c] = t.vertices;
            [(a, b), (b, c), (c, a)]
        })
        .map(|(a, b)| (a.min(b), a.max(b)))
        .collect()
}

#[test]
fn test_island_tile_is_tagged() {
    let set = island_tile();
    let seeds = seeds_from(&set).unwrap();
    assert_eq!(seeds.len(), 2);

    let mesh = ConstrainedTriangulator::default().triangulate(&set, tile(), &seeds).unwrap();
    assert_eq!(mesh.vertices().len(), 8);
    assert_relative_eq!(mesh.area_of(AreaType::Default), 0.25, epsilon = 1e-12);
    assert_relative_eq!(mesh.area_of(AreaType::Ocean), 0.75, epsilon = 1e-12);
    assert_eq!(mesh.triangles().len(), 10);
}

#[test]
fn test_constraints_survive_as_triangle_edges() {
    let set = island_tile();
    let seeds = seeds_from(&set).unwrap();
    let mesh = ConstrainedTriangulator::default().triangulate(&set, tile(), &seeds).unwrap();

    let edges = edges_of(&mesh);
    for c in mesh.constraints() {
        assert!(edges.contains(&c), "constraint {c:?} missing from the triangulation");
    }
}

#[test]
fn test_triangles_are_counter_clockwise() {
    let set = island_tile();
    let seeds = seeds_from(&set).unwrap();
    let mesh = ConstrainedTriangulator::default().triangulate(&set, tile(), &seeds).unwrap();
    for t in mesh.triangles() {
        let [a, b, c] = mesh.triangle_coords(t);
        assert!((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y) > 0.0);
    }
}

#[test]
fn test_unseeded_regions_resolve_by_containment() {
    let set = island_tile();
    let mesh = ConstrainedTriangulator::default().triangulate(&set, tile(), &[]).unwrap();
    assert_relative_eq!(mesh.area_of(AreaType::Default), 0.25, epsilon = 1e-12);
    assert_relative_eq!(mesh.area_of(AreaType::Ocean), 0.75, epsilon = 1e-12);
}

#[test]
fn test_empty_tile_gets_fallback() {
    let mesh = ConstrainedTriangulator::new(AreaType::Grass)
        .triangulate(&LayeredPolygonSet::new(), tile(), &[])
        .unwrap();
    assert_eq!(mesh.triangles().len(), 2);
    assert_relative_eq!(mesh.area_of(AreaType::Grass), 1.0, epsilon = 1e-12);
}

#[test]
fn test_elevation_is_copied_not_interpolated() {
    let mut set = LayeredPolygonSet::new();
    set.add(
        AreaType::Default,
        Polygon::new(vec![Contour::new(
            vec![
                Point::with_elevation(0.2, 0.2, 100.0),
                Point::with_elevation(0.8, 0.2, 200.0),
                Point::new(0.5, 0.8),
            ],
            false,
        )]),
    );
    let mesh = ConstrainedTriangulator::default().triangulate(&set, tile(), &[]).unwrap();

    let at = |x, y| mesh.vertex(mesh.find_vertex(coord! { x: x, y: y }).unwrap()).elevation;
    assert_eq!(at(0.2, 0.2), Some(100.0));
    assert_eq!(at(0.8, 0.2), Some(200.0));
    assert_eq!(at(0.5, 0.8), None);
    assert_eq!(at(0.0, 0.0), None);
}

#[test]
fn test_hole_type_vertices_are_fixed() {
    let mut set = island_tile();
    set.add(AreaType::Hole, Polygon::new(vec![square(0.05, 0.05, 0.1, 0.1, false)]));
    let mesh = ConstrainedTriangulator::default().triangulate(&set, tile(), &[]).unwrap();

    let hole_corner = mesh.find_vertex(coord! { x: 0.05, y: 0.05 }).unwrap();
    assert!(mesh.vertex(hole_corner).is_fixed_position());
    let land_corner = mesh.find_vertex(coord! { x: 0.25, y: 0.25 }).unwrap();
    assert!(!mesh.vertex(land_corner).is_fixed_position());
    assert_relative_eq!(mesh.area_of(AreaType::Hole), 0.0025, epsilon = 1e-12);
}

#[test]
fn test_triangulation_is_deterministic() {
    let set = island_tile();
    let seeds = seeds_from(&set).unwrap();
    let triangulator = ConstrainedTriangulator::default();
    let a = triangulator.triangulate(&set, tile(), &seeds).unwrap();
    let b = triangulator.triangulate(&set, tile(), &seeds).unwrap();
    assert_eq!(a.constraint_set(), b.constraint_set());
    assert_eq!(a.triangles(), b.triangles());
}

#[test]
fn test_retriangulate_keeps_tags_after_insert() {
    let set = island_tile();
    let seeds = seeds_from(&set).unwrap();
    let triangulator = ConstrainedTriangulator::default();
    let mut mesh = triangulator.triangulate(&set, tile(), &seeds).unwrap();

    mesh.add_vertex(coord! { x: 0.5, y: 0.0 }, Some(3.0));
    mesh.chain_boundary();
    triangulator.retriangulate(&mut mesh).unwrap();

    assert_eq!(mesh.vertices().len(), 9);
    assert_relative_eq!(mesh.area_of(AreaType::Default), 0.25, epsilon = 1e-12);
    assert_relative_eq!(mesh.area_of(AreaType::Ocean), 0.75, epsilon = 1e-12);
    let mid = mesh.find_vertex(coord! { x: 0.5, y: 0.0 }).unwrap();
    assert!(mesh.triangles().iter().any(|t| t.vertices.contains(&mid)));
}

#[test]
fn test_retriangulate_without_seeds_uses_old_tags() {
    let set = island_tile();
    let triangulator = ConstrainedTriangulator::default();
    let mut mesh = triangulator.triangulate(&set, tile(), &[]).unwrap();
    let before = mesh.triangles().len();

    triangulator.retriangulate(&mut mesh).unwrap();
    assert_eq!(mesh.triangles().len(), before);
    assert_relative_eq!(mesh.area_of(AreaType::Default), 0.25, epsilon = 1e-12);
}

#[test]
fn test_overlapping_polygons_are_rejected() {
    // The grass edge y = 0.25 crosses the forest edge x = 0.5 away from any
    // vertex, so the rings are not a noded subdivision.
    let mut set = LayeredPolygonSet::new();
    set.add(AreaType::Forest, Polygon::new(vec![square(0.0, 0.0, 0.5, 1.0, false)]));
    set.add(AreaType::Grass, Polygon::new(vec![square(0.4, 0.25, 1.0, 0.75, false)]));

    let err = ConstrainedTriangulator::default()
        .triangulate(&set, tile(), &[])
        .unwrap_err();
    assert!(matches!(err, TerrainError::Triangulation(_)));
    assert!(err.is_degenerate_geometry());
}

#[test]
fn test_region_seeded_twice_is_rejected() {
    let set = island_tile();
    let mut seeds = seeds_from(&set).unwrap();
    seeds.push(SeedPoint {
        position: coord! { x: 0.5, y: 0.5 },
        area: AreaType::Forest,
    });

    let err = ConstrainedTriangulator::default()
        .triangulate(&set, tile(), &seeds)
        .unwrap_err();
    assert!(matches!(err, TerrainError::Triangulation(_)));
}
