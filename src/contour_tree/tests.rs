use super::*;
use crate::error::TerrainError;
use crate::geometry::Contour;
use geo::Contains;
use geo_types::Point as GeoPoint;

fn square(x0: f64, y0: f64, size: f64, hole: bool) -> Contour {
    Contour::from_coords(
        vec![(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)],
        hole,
    )
}

fn hexagon(cx: f64, cy: f64, r: f64, hole: bool) -> Contour {
    let coords = (0..6).map(|k| {
        let a = std::f64::consts::PI / 3.0 * k as f64;
        (cx + r * a.cos(), cy + r * a.sin())
    });
    Contour::from_coords(coords, hole)
}

fn assert_parity_alternates(tree: &ContourTree) {
    for id in 1..tree.len() {
        let node = tree.node(id);
        let parent = node.parent.expect("non-root node has a parent");
        if parent == ROOT {
            assert!(!node.hole, "root child {id} is a hole");
        } else {
            assert_ne!(node.hole, tree.node(parent).hole, "parity broken at node {id}");
        }
    }
}

/// Node id of the only child of `id`.
fn only_child(tree: &ContourTree, id: NodeId) -> NodeId {
    let children = &tree.node(id).children;
    assert_eq!(children.len(), 1, "node {id} has children {children:?}");
    children[0]
}

#[test]
fn test_square_with_lake_hole() {
    let polygon = Polygon::new(vec![
        Contour::from_coords(
            vec![
                (0.0, 0.0),
                (0.5, 0.0),
                (1.0, 0.0),
                (1.0, 0.3),
                (1.0, 0.7),
                (1.0, 1.0),
                (0.5, 1.0),
                (0.0, 1.0),
                (0.0, 0.7),
                (0.0, 0.3),
            ],
            false,
        ),
        hexagon(0.5, 0.5, 0.2, true),
    ]);

    let (tree, points) = build_contour_tree(&polygon).unwrap();
    assert_eq!(tree.len(), 3);
    assert!(tree.orphans().is_empty());

    let land = only_child(&tree, ROOT);
    assert_eq!(tree.node(land).contour, Some(0));
    assert!(!tree.node(land).hole);

    let lake = only_child(&tree, land);
    assert_eq!(tree.node(lake).contour, Some(1));
    assert!(tree.node(lake).hole);
    assert!(tree.node(lake).children.is_empty());

    let mp = tree.to_multi_polygon(&polygon);
    assert_eq!(mp.0.len(), 1);
    assert_eq!(mp.0[0].interiors().len(), 1);

    // Land point lies between the square and the lake, lake point inside the lake.
    let land_shape = &mp.0[0];
    let lake_shape = geo_types::Polygon::new(polygon.contours[1].to_line_string(), vec![]);
    let p0 = points[0].unwrap();
    let p1 = points[1].unwrap();
    assert!(land_shape.contains(&GeoPoint::from(p0)));
    assert!(!lake_shape.contains(&GeoPoint::from(p0)));
    assert!(lake_shape.contains(&GeoPoint::from(p1)));
}

#[test]
fn test_mutually_nested_siblings_form_chain() {
    // A > B > C > D > E concentric, alternating outer/hole, listed innermost first.
    let polygon = Polygon::new(vec![
        square(4.0, 4.0, 2.0, false),  // E
        square(3.0, 3.0, 4.0, true),   // D
        square(2.0, 2.0, 6.0, false),  // C
        square(1.0, 1.0, 8.0, true),   // B
        square(0.0, 0.0, 10.0, false), // A
    ]);

    let tree = ContourTree::build(&polygon).unwrap();
    assert_eq!(tree.len(), 6);
    assert!(tree.orphans().is_empty());
    assert_parity_alternates(&tree);

    let mut id = ROOT;
    for expected in [4, 3, 2, 1, 0] {
        id = only_child(&tree, id);
        assert_eq!(tree.node(id).contour, Some(expected));
    }
    assert_eq!(tree.depth(id), 5);
    assert!(tree.node(id).children.is_empty());
}

#[test]
fn test_siblings_are_not_nested_after_fixup() {
    // Two separate islands each with a lake, plus a third outer ring around all.
    let polygon = Polygon::new(vec![
        square(1.0, 1.0, 3.0, false),
        square(2.0, 2.0, 1.0, true),
        square(6.0, 1.0, 3.0, false),
        square(7.0, 2.0, 1.0, true),
        square(0.0, 0.0, 10.0, false),
        square(0.5, 0.5, 9.0, true),
    ]);

    let tree = ContourTree::build(&polygon).unwrap();
    assert_parity_alternates(&tree);
    assert!(tree.orphans().is_empty());

    let outer = only_child(&tree, ROOT);
    assert_eq!(tree.node(outer).contour, Some(4));
    let sea = only_child(&tree, outer);
    assert_eq!(tree.node(sea).contour, Some(5));

    let islands: Vec<usize> = tree.child_contours(sea).collect();
    assert_eq!(islands, vec![0, 2]);
    for &island in &tree.node(sea).children {
        assert_eq!(tree.node(island).children.len(), 1);
    }
}

#[test]
fn test_duplicate_rings_keep_earlier_index() {
    let polygon = Polygon::new(vec![square(0.0, 0.0, 1.0, false), square(0.0, 0.0, 1.0, false)]);

    let tree = ContourTree::build(&polygon).unwrap();
    let kept = only_child(&tree, ROOT);
    assert_eq!(tree.node(kept).contour, Some(0));
    assert_eq!(tree.orphans(), &[1]);
}

#[test]
fn test_same_parity_inside_is_orphaned() {
    let polygon = Polygon::new(vec![square(0.0, 0.0, 4.0, false), square(1.0, 1.0, 1.0, false)]);

    let (tree, points) = build_contour_tree(&polygon).unwrap();
    assert_eq!(tree.orphans(), &[1]);
    assert!(points[0].is_some());
    assert!(points[1].is_none());
}

#[test]
fn test_too_few_points_is_fatal() {
    let polygon = Polygon::new(vec![Contour::from_coords(vec![(0.0, 0.0), (1.0, 1.0)], false)]);
    let err = ContourTree::build(&polygon).unwrap_err();
    assert!(matches!(err, TerrainError::TooFewPoints { points: 2 }));
    assert!(err.is_input_format());
}

#[test]
fn test_collinear_contour_is_degenerate() {
    let polygon = Polygon::new(vec![Contour::from_coords(
        vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)],
        false,
    )]);
    let err = build_contour_tree(&polygon).unwrap_err();
    assert!(matches!(err, TerrainError::DegenerateContour { contour: 0 }));
    assert!(err.is_degenerate_geometry());
}

#[test]
fn test_calc_points_inside_caches_points() {
    let mut polygon = Polygon::new(vec![
        square(0.0, 0.0, 10.0, false),
        square(1.0, 1.0, 8.0, true),
        square(3.0, 3.0, 4.0, false),
    ]);
    let tree = calc_points_inside(&mut polygon).unwrap();
    assert_parity_alternates(&tree);

    for contour in &polygon.contours {
        assert!(contour.interior_point().is_some());
    }

    // The ring between the outer square and the hole.
    let ring = geo_types::Polygon::new(
        polygon.contours[0].to_line_string(),
        vec![polygon.contours[1].to_line_string()],
    );
    let p = polygon.contours[0].interior_point().unwrap();
    assert!(ring.contains(&GeoPoint::from(p)));

    // The hole's point lies in the hole but outside the island inside it.
    let hole = geo_types::Polygon::new(
        polygon.contours[1].to_line_string(),
        vec![polygon.contours[2].to_line_string()],
    );
    let p = polygon.contours[1].interior_point().unwrap();
    assert!(hole.contains(&GeoPoint::from(p)));
}

#[test]
fn test_post_order_lists_children_first() {
    let polygon = Polygon::new(vec![square(0.0, 0.0, 4.0, false), square(1.0, 1.0, 2.0, true)]);
    let tree = ContourTree::build(&polygon).unwrap();
    let order = tree.post_order();
    assert_eq!(order.last(), Some(&ROOT));
    let pos = |id| order.iter().position(|&x| x == id).unwrap();
    for id in 1..tree.len() {
        let parent = tree.node(id).parent.unwrap();
        assert!(pos(id) < pos(parent));
    }
}
