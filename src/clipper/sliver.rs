use geo::BooleanOps;
use geo_types::{MultiPolygon, Polygon as GeoPolygon};

use super::snap::SnapRounder;
use crate::area::AreaType;
use crate::error::Result;
use crate::geometry::ring;

/// Result of pulling slivers out of a clip result.
#[derive(Debug)]
pub struct SliverSplit {
    /// What is left once slivers are gone.
    pub kept: MultiPolygon<f64>,
    /// Slivers waiting to be merged into a neighbour, with whatever holes
    /// they had that are not slivers themselves.
    pub slivers: Vec<GeoPolygon<f64>>,
    pub holes_removed: usize,
}

impl Default for SliverSplit {
    fn default() -> Self {
        Self {
            kept: MultiPolygon::new(vec![]),
            slivers: Vec::new(),
            holes_removed: 0,
        }
    }
}

/// Splits slivers off `mp`.
///
/// Sliver holes are deleted outright, wherever they sit. A sliver exterior
/// is moved out and keeps its remaining holes.
pub fn move_slivers(mp: MultiPolygon<f64>, angle_cutoff_deg: f64, area_cutoff: f64) -> SliverSplit {
    let mut split = SliverSplit::default();
    let mut kept = Vec::with_capacity(mp.0.len());

    for poly in mp {
        let (exterior, interiors) = poly.into_inner();
        let before = interiors.len();
        let interiors: Vec<_> = interiors
            .into_iter()
            .filter(|hole| !ring::is_sliver(&hole.0, angle_cutoff_deg, area_cutoff))
            .collect();
        split.holes_removed += before - interiors.len();

        if ring::is_sliver(&exterior.0, angle_cutoff_deg, area_cutoff) {
            split.slivers.push(GeoPolygon::new(exterior, interiors));
        } else {
            kept.push(GeoPolygon::new(exterior, interiors));
        }
    }

    split.kept = MultiPolygon::new(kept);
    split
}

/// Offers each sliver to the already clipped polygons, in precedence order.
///
/// The first polygon whose union with the sliver gains no rings beyond the
/// sliver's own holes (the sliver touched it along an edge) absorbs the
/// sliver. Hole-type polygons never take slivers. Returns how many slivers
/// were absorbed; the rest are dropped.
pub fn merge_slivers(
    clipped: &mut [(AreaType, Vec<MultiPolygon<f64>>)],
    slivers: Vec<GeoPolygon<f64>>,
    rounder: &SnapRounder,
) -> Result<usize> {
    let mut merged = 0;
    'slivers: for sliver in slivers {
        let holes = sliver.interiors().len();
        let sliver = MultiPolygon::new(vec![sliver]);
        for (area, polys) in clipped.iter_mut() {
            if area.is_hole() {
                continue;
            }
            for poly in polys.iter_mut() {
                let result = rounder.overlay(poly, &sliver, BooleanOps::union)?;
                if ring::contour_count(&result) == ring::contour_count(poly) + holes {
                    log::trace!("sliver merged into {area} polygon");
                    *poly = result;
                    merged += 1;
                    continue 'slivers;
                }
            }
        }
        let area: f64 = sliver.0.iter().map(|p| ring::line_string_area(p.exterior())).sum();
        log::debug!("no neighbour found for sliver of area {area:e}, dropping it");
    }
    Ok(merged)
}
