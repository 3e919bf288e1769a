use super::*;
use approx::assert_relative_eq;
use geo_types::coord;

fn unit_tile() -> Mesh {
    Mesh::new(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }), AreaType::Ocean)
}

#[test]
fn test_new_mesh_holds_corners() {
    let mesh = unit_tile();
    assert_eq!(mesh.vertices().len(), 4);
    assert_eq!(mesh.find_vertex(coord! { x: 1.0, y: 1.0 }), Some(2));
    assert!(mesh.triangles().is_empty());
    assert_eq!(mesh.fallback(), AreaType::Ocean);
}

#[test]
fn test_add_vertex_dedups_exact_positions() {
    let mut mesh = unit_tile();
    let a = mesh.add_vertex(coord! { x: 0.5, y: 0.5 }, None);
    let b = mesh.add_vertex(coord! { x: 0.5, y: 0.5 }, Some(12.0));
    assert_eq!(a, b);
    assert_eq!(mesh.vertex(a).elevation, Some(12.0));

    // Known elevation is never overridden.
    mesh.add_vertex(coord! { x: 0.5, y: 0.5 }, Some(99.0));
    assert_eq!(mesh.vertex(a).elevation, Some(12.0));

    // Negative zero is the same position.
    assert_eq!(mesh.add_vertex(coord! { x: -0.0, y: 0.0 }, None), 0);
}

#[test]
fn test_fixed_vertex_refuses_updates() {
    let mut mesh = unit_tile();
    let v = mesh.add_vertex(coord! { x: 0.3, y: 0.3 }, Some(5.0));
    mesh.fix_position(v);

    assert!(!mesh.move_vertex(v, coord! { x: 0.4, y: 0.4 }));
    assert!(!mesh.set_elevation(v, 7.0));
    assert_eq!(mesh.vertex(v).position, coord! { x: 0.3, y: 0.3 });
    assert_eq!(mesh.vertex(v).elevation, Some(5.0));

    mesh.apply_elevation(&|_: f64, _: f64| 100.0);
    assert_eq!(mesh.vertex(v).elevation, Some(5.0));
    assert_eq!(mesh.vertex(0).elevation, Some(100.0));
}

#[test]
fn test_move_vertex_updates_lookup() {
    let mut mesh = unit_tile();
    let v = mesh.add_vertex(coord! { x: 0.3, y: 0.0 }, None);
    assert!(mesh.move_vertex(v, coord! { x: 0.31, y: 0.0 }));
    assert_eq!(mesh.find_vertex(coord! { x: 0.31, y: 0.0 }), Some(v));
    assert_eq!(mesh.find_vertex(coord! { x: 0.3, y: 0.0 }), None);

    // Occupied targets are refused.
    assert!(!mesh.move_vertex(v, coord! { x: 0.0, y: 0.0 }));
}

#[test]
fn test_chain_boundary_runs_through_side_vertices() {
    let mut mesh = unit_tile();
    assert!(mesh.add_constraint(0, 1));
    let mid = mesh.add_vertex(coord! { x: 0.5, y: 0.0 }, None);
    mesh.add_vertex(coord! { x: 0.5, y: 0.5 }, None);

    mesh.chain_boundary();
    assert!(!mesh.is_constraint(0, 1));
    assert!(mesh.is_constraint(0, mid));
    assert!(mesh.is_constraint(mid, 1));
    assert!(mesh.is_constraint(1, 2));
    assert!(mesh.is_constraint(2, 3));
    assert!(mesh.is_constraint(3, 0));
    assert_eq!(mesh.constraints().count(), 5);
}

#[test]
fn test_degenerate_constraint_is_ignored() {
    let mut mesh = unit_tile();
    assert!(!mesh.add_constraint(1, 1));
    assert!(mesh.add_constraint(2, 1));
    assert!(!mesh.add_constraint(1, 2));
    assert_eq!(mesh.constraints().collect::<Vec<_>>(), vec![(1, 2)]);
}

#[test]
fn test_constraint_set_is_position_sorted() {
    let mut mesh = unit_tile();
    mesh.add_constraint(2, 3);
    mesh.add_constraint(1, 0);
    let set = mesh.constraint_set();
    assert_eq!(set, vec![([0.0, 0.0], [1.0, 0.0]), ([0.0, 1.0], [1.0, 1.0])]);
}

#[test]
fn test_normals_follow_slope() {
    let mut mesh = unit_tile();
    mesh.set_triangles(vec![
        Triangle { vertices: [0, 1, 2], area: AreaType::Default },
        Triangle { vertices: [0, 2, 3], area: AreaType::Default },
    ]);

    mesh.compute_normals();
    for v in mesh.vertices() {
        assert_relative_eq!(v.normal[2], 1.0, epsilon = 1e-12);
    }

    // Ground rising to the east tilts normals west.
    mesh.apply_elevation(&|lon: f64, _: f64| lon * 1000.0);
    mesh.fix_normal(3);
    mesh.compute_normals();
    let n = mesh.vertex(0).normal;
    assert!(n[0] < 0.0);
    assert!(n[2] > 0.0);
    assert_relative_eq!(n[0] * n[0] + n[1] * n[1] + n[2] * n[2], 1.0, epsilon = 1e-12);
    assert_eq!(mesh.vertex(3).normal, [0.0, 0.0, 1.0]);
    assert!(!mesh.set_normal(3, [1.0, 0.0, 0.0]));
}

#[test]
fn test_area_of_sums_tagged_triangles() {
    let mut mesh = unit_tile();
    mesh.set_triangles(vec![
        Triangle { vertices: [0, 1, 2], area: AreaType::Default },
        Triangle { vertices: [0, 2, 3], area: AreaType::Ocean },
    ]);
    assert_relative_eq!(mesh.area_of(AreaType::Default), 0.5);
    assert_relative_eq!(mesh.area_of(AreaType::Ocean), 0.5);
    assert_relative_eq!(mesh.area_of(AreaType::Lake), 0.0);
    let c = mesh.triangle_centroid(&mesh.triangles()[0]);
    assert_relative_eq!(c.x, 2.0 / 3.0);
    assert_relative_eq!(c.y, 1.0 / 3.0);
}
