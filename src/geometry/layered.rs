use std::collections::BTreeMap;

use crate::area::AreaType;
use crate::geometry::Polygon;

/// Polygons bucketed by area type.
///
/// Iteration is always in `AreaType` declaration order, which keeps every
/// downstream stage deterministic.
#[derive(Clone, Debug, Default)]
pub struct LayeredPolygonSet {
    layers: BTreeMap<AreaType, Vec<Polygon>>,
}

impl LayeredPolygonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, area: AreaType, polygon: Polygon) {
        self.layers.entry(area).or_default().push(polygon);
    }

    pub fn polygons(&self, area: AreaType) -> &[Polygon] {
        self.layers.get(&area).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn polygons_mut(&mut self, area: AreaType) -> Option<&mut Vec<Polygon>> {
        self.layers.get_mut(&area)
    }

    pub fn area_types(&self) -> impl Iterator<Item = AreaType> + '_ {
        self.layers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AreaType, &Polygon)> {
        self.layers
            .iter()
            .flat_map(|(area, polys)| polys.iter().map(move |p| (*area, p)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AreaType, &mut Polygon)> {
        self.layers
            .iter_mut()
            .flat_map(|(area, polys)| polys.iter_mut().map(move |p| (*area, p)))
    }

    /// Total number of polygons across all layers.
    pub fn len(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_area(&self) -> f64 {
        self.iter().map(|(_, p)| p.area()).sum()
    }
}
