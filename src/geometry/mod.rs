pub mod ring;
mod layered;

pub use layered::LayeredPolygonSet;

use geo_types::{Coord, LineString};

use crate::error::{Result, TerrainError};

/// Exact-position map key. Negative zero is folded into positive zero so
/// both spellings of a coordinate land in the same bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey(u64, u64);

impl From<Coord<f64>> for CoordKey {
    fn from(c: Coord<f64>) -> Self {
        CoordKey((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
    }
}

impl From<&Point> for CoordKey {
    fn from(p: &Point) -> Self {
        CoordKey::from(p.coord())
    }
}

/// A planar (lon, lat) position with an optional elevation in meters.
///
/// Elevation rides along with the point but never takes part in geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
    pub elevation: Option<f64>,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, elevation: None }
    }

    pub fn with_elevation(lon: f64, lat: f64, elevation: f64) -> Self {
        Self { lon, lat, elevation: Some(elevation) }
    }

    pub fn coord(&self) -> Coord<f64> {
        Coord { x: self.lon, y: self.lat }
    }
}

impl From<Coord<f64>> for Point {
    fn from(c: Coord<f64>) -> Self {
        Point::new(c.x, c.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((lon, lat): (f64, f64)) -> Self {
        Point::new(lon, lat)
    }
}

/// One closed ring. The closing point is not repeated.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    pub points: Vec<Point>,
    pub hole: bool,
    interior: Option<Coord<f64>>,
}

impl Contour {
    pub fn new(points: Vec<Point>, hole: bool) -> Self {
        let mut points = points;
        // Accept closed input rings.
        if points.len() > 1 && points.first().map(Point::coord) == points.last().map(Point::coord) {
            points.pop();
        }
        Self { points, hole, interior: None }
    }

    pub fn from_coords(coords: impl IntoIterator<Item = (f64, f64)>, hole: bool) -> Self {
        Self::new(coords.into_iter().map(Point::from).collect(), hole)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord<f64>> + '_ {
        self.points.iter().map(Point::coord)
    }

    /// Cached interior sample point, set once the contour tree is resolved.
    pub fn interior_point(&self) -> Option<Coord<f64>> {
        self.interior
    }

    pub fn set_interior_point(&mut self, point: Coord<f64>) {
        self.interior = Some(point);
    }

    /// Closed geometry-kernel ring.
    pub fn to_line_string(&self) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = self.coords().collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        LineString::new(coords)
    }

    pub fn validate(&self) -> Result<()> {
        if self.points.len() < 3 {
            return Err(TerrainError::TooFewPoints { points: self.points.len() });
        }
        if self.points.iter().any(|p| !p.lon.is_finite() || !p.lat.is_finite()) {
            return Err(TerrainError::InputFormat("non-finite contour coordinate".into()));
        }
        Ok(())
    }

    pub fn area(&self) -> f64 {
        ring::signed_area(&self.coords().collect::<Vec<_>>()).abs()
    }
}

/// A set of contours; outer boundaries and holes are told apart by the hole flag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub contours: Vec<Contour>,
}

impl Polygon {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    pub fn add_contour(&mut self, contour: Contour) {
        self.contours.push(contour);
    }

    pub fn contour_count(&self) -> usize {
        self.contours.len()
    }

    pub fn hole_count(&self) -> usize {
        self.contours.iter().filter(|c| c.hole).count()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.contours.iter().try_for_each(Contour::validate)
    }

    /// Net area: outer boundaries minus holes.
    pub fn area(&self) -> f64 {
        self.contours
            .iter()
            .map(|c| if c.hole { -c.area() } else { c.area() })
            .sum()
    }
}

impl From<&geo_types::Polygon<f64>> for Polygon {
    fn from(poly: &geo_types::Polygon<f64>) -> Self {
        let mut out = Polygon::default();
        out.add_contour(Contour::new(poly.exterior().coords().map(|c| Point::from(*c)).collect(), false));
        for interior in poly.interiors() {
            out.add_contour(Contour::new(interior.coords().map(|c| Point::from(*c)).collect(), true));
        }
        out
    }
}

impl From<&geo_types::MultiPolygon<f64>> for Polygon {
    fn from(mp: &geo_types::MultiPolygon<f64>) -> Self {
        let mut out = Polygon::default();
        for poly in mp {
            out.contours.extend(Polygon::from(poly).contours);
        }
        out
    }
}
