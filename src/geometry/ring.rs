//! Measurements on single rings.
//!
//! Rings are passed as open coordinate slices; a repeated closing coordinate
//! is tolerated and ignored.

use geo_types::{Coord, LineString, MultiPolygon};

fn open(coords: &[Coord<f64>]) -> &[Coord<f64>] {
    match coords {
        [first, .., last] if coords.len() > 1 && first == last => &coords[..coords.len() - 1],
        _ => coords,
    }
}

/// Shoelace area, positive for counter-clockwise rings.
pub fn signed_area(coords: &[Coord<f64>]) -> f64 {
    let coords = open(coords);
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = coords[i];
        let b = coords[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

pub fn line_string_area(ls: &LineString<f64>) -> f64 {
    signed_area(&ls.0).abs()
}

/// Smallest angle, in radians, between the two edges meeting at any vertex.
///
/// Coincident neighbours contribute an angle of zero.
pub fn min_angle(coords: &[Coord<f64>]) -> f64 {
    let coords = open(coords);
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }
    let mut min = std::f64::consts::PI;
    for i in 0..n {
        let prev = coords[(i + n - 1) % n];
        let cur = coords[i];
        let next = coords[(i + 1) % n];
        let (ax, ay) = (prev.x - cur.x, prev.y - cur.y);
        let (bx, by) = (next.x - cur.x, next.y - cur.y);
        let la = (ax * ax + ay * ay).sqrt();
        let lb = (bx * bx + by * by).sqrt();
        let angle = if la == 0.0 || lb == 0.0 {
            0.0
        } else {
            ((ax * bx + ay * by) / (la * lb)).clamp(-1.0, 1.0).acos()
        };
        if angle < min {
            min = angle;
        }
    }
    min
}

/// Thin or tiny ring left behind by clipping.
pub fn is_sliver(coords: &[Coord<f64>], angle_cutoff_deg: f64, area_cutoff: f64) -> bool {
    let area = signed_area(coords).abs();
    let angle = min_angle(coords);
    (angle < angle_cutoff_deg.to_radians() && area < area_cutoff) || area < area_cutoff / 10.0
}

/// Number of rings, exteriors and interiors alike.
pub fn contour_count(mp: &MultiPolygon<f64>) -> usize {
    mp.0.iter().map(|p| 1 + p.interiors().len()).sum()
}

/// Index of the lowest vertex (smallest lat, then lon) and the neighbour
/// forming the flattest edge with it.
pub fn safe_edge(coords: &[Coord<f64>]) -> Option<(usize, usize)> {
    let coords = open(coords);
    let n = coords.len();
    if n < 3 {
        return None;
    }
    let low = (0..n).min_by(|&a, &b| {
        let (ca, cb) = (coords[a], coords[b]);
        ca.y.total_cmp(&cb.y).then(ca.x.total_cmp(&cb.x))
    })?;
    let prev = (low + n - 1) % n;
    let next = (low + 1) % n;
    let slope = |j: usize| {
        let dx = coords[j].x - coords[low].x;
        let dy = coords[j].y - coords[low].y;
        if dx.abs() > f64::EPSILON {
            (dy / dx).abs()
        } else {
            f64::INFINITY
        }
    };
    if slope(prev) < slope(next) {
        Some((low, prev))
    } else {
        Some((low, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Coord<f64>> {
        vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 2.0, y: 0.0 },
            Coord { x: 2.0, y: 2.0 },
            Coord { x: 0.0, y: 2.0 },
        ]
    }

    #[test]
    fn test_signed_area_orientation() {
        let mut ring = square();
        assert_relative_eq!(signed_area(&ring), 4.0);
        ring.reverse();
        assert_relative_eq!(signed_area(&ring), -4.0);
        // Closing coordinate is ignored.
        let mut closed = square();
        closed.push(closed[0]);
        assert_relative_eq!(signed_area(&closed), 4.0);
    }

    #[test]
    fn test_min_angle_of_square_is_right_angle() {
        assert_relative_eq!(min_angle(&square()), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_sliver_thresholds() {
        // Thin right triangle, 2 degree tip, area 1e-8.
        let b = (2.0e-8 / 2f64.to_radians().tan()).sqrt();
        let h = b * 2f64.to_radians().tan();
        let thin = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: b },
            Coord { x: h, y: 0.0 },
        ];
        assert_relative_eq!(signed_area(&thin).abs(), 1.0e-8, epsilon = 1e-14);
        assert!(is_sliver(&thin, 10.0, 8.0e-8));

        // Tiny but well shaped.
        let tiny: Vec<_> = square().iter().map(|c| Coord { x: c.x * 1e-5, y: c.y * 1e-5 }).collect();
        assert!(is_sliver(&tiny, 10.0, 8.0e-8));

        // Large square is never a sliver.
        assert!(!is_sliver(&square(), 10.0, 8.0e-8));
    }

    #[test]
    fn test_safe_edge_prefers_flat_neighbour() {
        let ring = vec![
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 3.0, y: 0.0 },
            Coord { x: 2.0, y: 3.0 },
        ];
        assert_eq!(safe_edge(&ring), Some((0, 1)));
    }
}
