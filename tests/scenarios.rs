use approx::assert_relative_eq;
use geo::Contains;
use geo_scenery::{
    build_contour_tree, AreaType, ConstrainedTriangulator, Contour, LayeredPolygonSet, Polygon, PriorityClipper,
    PriorityTable, TerrainError,
};
use geo_types::{coord, Point as GeoPoint, Rect};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::new(vec![Contour::from_coords(
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
        false,
    )])
}

fn unit_tile() -> Rect<f64> {
    Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 })
}

fn area(set: &LayeredPolygonSet, area: AreaType) -> f64 {
    set.polygons(area).iter().map(Polygon::area).sum()
}

/// Coast with a lake, an island in the lake and an airport running out to sea.
fn coast() -> LayeredPolygonSet {
    let mut input = LayeredPolygonSet::new();
    input.add(AreaType::Default, rect(0.0, 0.0, 0.75, 1.0));
    input.add(AreaType::Lake, rect(0.25, 0.125, 0.5, 0.375));
    input.add(AreaType::Island, rect(0.3125, 0.1875, 0.375, 0.25));
    input.add(AreaType::Airport, rect(0.0625, 0.625, 0.875, 0.875));
    input
}

#[test]
fn test_lake_in_square_tree_and_points() {
    let polygon = Polygon::new(vec![
        Contour::from_coords(
            vec![
                (0.0, 0.0),
                (0.5, 0.0),
                (1.0, 0.0),
                (1.0, 0.5),
                (1.0, 1.0),
                (0.5, 1.0),
                (0.0, 1.0),
                (0.0, 0.5),
            ],
            false,
        ),
        Contour::from_coords(vec![(0.4, 0.4), (0.4, 0.6), (0.6, 0.6), (0.6, 0.4)], true),
    ]);

    let (tree, points) = build_contour_tree(&polygon).unwrap();
    assert_eq!(tree.len(), 3);
    let land = tree.root().children[0];
    assert_eq!(tree.node(land).contour, Some(0));
    assert_eq!(tree.node(land).children.len(), 1);

    let shape = &tree.to_multi_polygon(&polygon).0[0];
    let land_point = points[0].unwrap();
    let lake_point = points[1].unwrap();
    assert!(shape.contains(&GeoPoint::from(land_point)));
    assert!(!shape.contains(&GeoPoint::from(lake_point)));
    assert!(lake_point.x > 0.4 && lake_point.x < 0.6);
    assert!(lake_point.y > 0.4 && lake_point.y < 0.6);
}

#[test]
fn test_coast_is_partitioned_by_priority() {
    let clipper = PriorityClipper::new(PriorityTable::default());
    let out = clipper.clip(&coast(), unit_tile()).unwrap();

    assert_relative_eq!(area(&out, AreaType::Airport), 0.171875, epsilon = 1e-12);
    assert_relative_eq!(area(&out, AreaType::Lake), 0.05859375, epsilon = 1e-12);
    assert_relative_eq!(area(&out, AreaType::Island), 0.00390625, epsilon = 1e-12);
    assert_relative_eq!(area(&out, AreaType::Default), 0.515625, epsilon = 1e-12);
    assert_relative_eq!(area(&out, AreaType::Ocean), 0.25, epsilon = 1e-12);
    assert_relative_eq!(out.total_area(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_coast_mesh_keeps_clipped_areas() {
    let clipper = PriorityClipper::new(PriorityTable::default());
    let clipped = clipper.clip(&coast(), unit_tile()).unwrap();
    let seeds = geo_scenery::mesh::seeds_from(&clipped).unwrap();
    let mesh = ConstrainedTriangulator::default()
        .triangulate(&clipped, unit_tile(), &seeds)
        .unwrap();

    for area_type in clipped.area_types() {
        assert_relative_eq!(mesh.area_of(area_type), area(&clipped, area_type), epsilon = 1e-9);
    }
    let total: f64 = AreaType::ALL.iter().map(|&a| mesh.area_of(a)).sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);
}

#[test]
fn test_sliver_is_absorbed_by_its_neighbour() {
    let b = (2.0e-8 / 2f64.to_radians().tan()).sqrt();
    let h = b * 2f64.to_radians().tan();

    let mut input = LayeredPolygonSet::new();
    input.add(AreaType::Forest, rect(0.0, 0.0, 0.01, 0.01));
    input.add(
        AreaType::Scrub,
        Polygon::new(vec![Contour::from_coords(
            vec![(0.01, 0.0), (0.01 + h, 0.0), (0.01, b)],
            false,
        )]),
    );

    let tile = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.02, y: 0.02 });
    let (out, report) = PriorityClipper::new(PriorityTable::default())
        .clip_with_report(&input, tile)
        .unwrap();

    assert!(out.polygons(AreaType::Scrub).is_empty());
    assert_eq!(out.polygons(AreaType::Forest).len(), 1);
    assert_eq!(report.slivers_merged(), 1);
    assert_eq!(report.slivers_dropped(), 0);
    assert_relative_eq!(out.total_area(), 4.0e-4, epsilon = 1e-10);
}

#[test]
fn test_unranked_type_is_rejected() {
    let mut input = LayeredPolygonSet::new();
    input.add(AreaType::Glacier, rect(0.0, 0.0, 0.5, 0.5));

    let table = PriorityTable::new([AreaType::Lake, AreaType::Default, AreaType::Ocean]);
    let err = PriorityClipper::new(table).clip(&input, unit_tile()).unwrap_err();
    assert!(matches!(err, TerrainError::AreaTypeOutOfRange(AreaType::Glacier)));
}
