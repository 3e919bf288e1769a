//! Resolves overlapping area polygons into a disjoint subdivision of the tile.
//!
//! Area types are clipped one after another in priority order. Each polygon
//! only keeps what no higher-priority polygon already claimed, and whatever
//! is left of the tile at the end belongs to the fallback type.

mod sliver;
mod snap;

pub use sliver::{merge_slivers, move_slivers, SliverSplit};
pub use snap::SnapRounder;

use std::collections::{BTreeMap, HashMap};

use geo::BooleanOps;
use geo_types::{MultiPolygon, Rect};

use crate::area::{AreaType, PriorityTable};
use crate::contour_tree::ContourTree;
use crate::error::Result;
use crate::geometry::{ring, CoordKey, LayeredPolygonSet, Polygon};

#[derive(Clone, Debug)]
pub struct ClipperConfig {
    /// Minimum interior angle, in degrees, below which a small ring is a sliver.
    pub sliver_angle_cutoff: f64,
    /// Area, in square degrees, below which a thin ring is a sliver. A tenth
    /// of this marks any ring as a sliver regardless of shape.
    pub sliver_area_cutoff: f64,
    /// Restrict airports to the land mask (only when land input exists).
    pub clip_airports_to_land: bool,
    /// Precision grid, in degrees, that all overlay input and output is
    /// rounded to.
    pub snap_grid: f64,
}

impl Default for ClipperConfig {
    fn default() -> Self {
        Self {
            sliver_angle_cutoff: 10.0,
            sliver_area_cutoff: 8.0e-8,
            clip_airports_to_land: true,
            snap_grid: 2f64.powi(-30),
        }
    }
}

impl ClipperConfig {
    pub fn with_sliver_cutoffs(mut self, angle_deg: f64, area: f64) -> Self {
        self.sliver_angle_cutoff = angle_deg;
        self.sliver_area_cutoff = area;
        self
    }

    pub fn with_airports_clipped_to_land(mut self, clip: bool) -> Self {
        self.clip_airports_to_land = clip;
        self
    }

    pub fn with_snap_grid(mut self, grid: f64) -> Self {
        self.snap_grid = grid;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipStats {
    pub polygons: usize,
    pub slivers_merged: usize,
    pub slivers_dropped: usize,
    pub sliver_holes_removed: usize,
}

/// Per area type counts from one clipping run.
#[derive(Clone, Debug, Default)]
pub struct ClipReport {
    stats: BTreeMap<AreaType, ClipStats>,
}

impl ClipReport {
    pub fn stats(&self, area: AreaType) -> ClipStats {
        self.stats.get(&area).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AreaType, &ClipStats)> {
        self.stats.iter().map(|(a, s)| (*a, s))
    }

    pub fn slivers_merged(&self) -> usize {
        self.stats.values().map(|s| s.slivers_merged).sum()
    }

    pub fn slivers_dropped(&self) -> usize {
        self.stats.values().map(|s| s.slivers_dropped).sum()
    }

    fn entry(&mut self, area: AreaType) -> &mut ClipStats {
        self.stats.entry(area).or_default()
    }
}

pub struct PriorityClipper {
    table: PriorityTable,
    pub config: ClipperConfig,
}

impl PriorityClipper {
    pub fn new(table: PriorityTable) -> Self {
        Self {
            table,
            config: ClipperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ClipperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table(&self) -> &PriorityTable {
        &self.table
    }

    pub fn clip(&self, input: &LayeredPolygonSet, bounds: Rect<f64>) -> Result<LayeredPolygonSet> {
        self.clip_with_report(input, bounds).map(|(out, _)| out)
    }

    pub fn clip_with_report(
        &self,
        input: &LayeredPolygonSet,
        bounds: Rect<f64>,
    ) -> Result<(LayeredPolygonSet, ClipReport)> {
        for area in input.area_types() {
            self.table.rank(area)?;
        }

        let rounder = SnapRounder::new(self.config.snap_grid).with_bounds(bounds);
        let tile = MultiPolygon::new(vec![bounds.to_polygon()]);
        let elevations = elevation_index(input, &rounder);

        // Everything is cut to the tile up front so the subdivision never
        // leaves it.
        let mut shapes: BTreeMap<AreaType, Vec<MultiPolygon<f64>>> = BTreeMap::new();
        for (area, polygon) in input.iter() {
            if polygon.is_empty() {
                continue;
            }
            let tree = ContourTree::build(polygon)?;
            let mp = rounder.overlay(&tree.to_multi_polygon(polygon), &tile, BooleanOps::intersection)?;
            shapes.entry(area).or_default().push(mp);
        }

        let union_of = |pred: &dyn Fn(AreaType) -> bool| -> Result<MultiPolygon<f64>> {
            shapes
                .iter()
                .filter(|(area, _)| pred(**area))
                .flat_map(|(_, polys)| polys.iter())
                .try_fold(MultiPolygon::new(vec![]), |acc, p| {
                    rounder.overlay(&acc, p, BooleanOps::union)
                })
        };
        let land_mask = union_of(&|a| a == self.table.land_mask)?;
        let water_mask = union_of(&|a| a.is_water())?;
        let island_mask = union_of(&|a| a == self.table.island_mask)?;
        log::debug!(
            "masks: land {} rings, water {} rings, island {} rings",
            ring::contour_count(&land_mask),
            ring::contour_count(&water_mask),
            ring::contour_count(&island_mask)
        );

        let mut clipped: Vec<(AreaType, Vec<MultiPolygon<f64>>)> =
            self.table.ordered().iter().map(|&a| (a, Vec::new())).collect();
        if !self.table.contains(self.table.fallback) {
            clipped.push((self.table.fallback, Vec::new()));
        }
        let mut report = ClipReport::default();
        let mut accum = MultiPolygon::new(vec![]);

        for slot in 0..clipped.len() {
            let area = clipped[slot].0;
            let Some(polys) = shapes.get(&area) else {
                continue;
            };
            for mp in polys {
                let mut current = mp.clone();
                if area.is_airport() {
                    if self.config.clip_airports_to_land && !land_mask.0.is_empty() {
                        current = rounder.overlay(&current, &land_mask, BooleanOps::intersection)?;
                    }
                    if !water_mask.0.is_empty() {
                        current = rounder.overlay(&current, &water_mask, BooleanOps::difference)?;
                    }
                }
                if area.cuts_islands() && !island_mask.0.is_empty() {
                    current = rounder.overlay(&current, &island_mask, BooleanOps::difference)?;
                }

                let diff = if accum.0.is_empty() {
                    current.clone()
                } else {
                    rounder.overlay(&current, &accum, BooleanOps::difference)?
                };
                accum = if accum.0.is_empty() {
                    current
                } else {
                    rounder.overlay(&current, &accum, BooleanOps::union)?
                };

                if !diff.0.is_empty() {
                    self.place(area, slot, diff, &mut clipped, &mut report, &rounder)?;
                }
            }
        }

        let remains = rounder.overlay(&tile, &accum, BooleanOps::difference)?;
        if !remains.0.is_empty() {
            let slot = clipped
                .iter()
                .position(|(a, _)| *a == self.table.fallback)
                .unwrap_or(clipped.len() - 1);
            self.place(self.table.fallback, slot, remains, &mut clipped, &mut report, &rounder)?;
        }

        // Pieces from separate overlays only share boundary vertices once
        // they are noded against each other.
        let (areas, pieces): (Vec<AreaType>, Vec<MultiPolygon<f64>>) = clipped
            .into_iter()
            .flat_map(|(area, polys)| polys.into_iter().map(move |mp| (area, mp)))
            .unzip();
        let pieces = rounder.node_all(pieces);

        let mut out = LayeredPolygonSet::new();
        for (area, mp) in areas.into_iter().zip(&pieces) {
            out.add(area, restore_elevation(Polygon::from(mp), &elevations));
        }
        for (area, stats) in report.iter() {
            log::info!(
                "{area}: {} polygons, {} slivers merged, {} dropped",
                stats.polygons,
                stats.slivers_merged,
                stats.slivers_dropped
            );
        }
        Ok((out, report))
    }

    /// Strips slivers from `diff`, offers them to the polygons placed so
    /// far and stores the remainder under `slot`.
    fn place(
        &self,
        area: AreaType,
        slot: usize,
        diff: MultiPolygon<f64>,
        clipped: &mut [(AreaType, Vec<MultiPolygon<f64>>)],
        report: &mut ClipReport,
        rounder: &SnapRounder,
    ) -> Result<()> {
        let split = move_slivers(diff, self.config.sliver_angle_cutoff, self.config.sliver_area_cutoff);
        let offered = split.slivers.len();
        let merged = if offered > 0 {
            merge_slivers(clipped, split.slivers, rounder)?
        } else {
            0
        };

        let stats = report.entry(area);
        stats.slivers_merged += merged;
        stats.slivers_dropped += offered - merged;
        stats.sliver_holes_removed += split.holes_removed;
        if !split.kept.0.is_empty() {
            stats.polygons += 1;
            clipped[slot].1.push(split.kept);
        }
        Ok(())
    }
}

/// Input elevations keyed by the snapped position of their point.
fn elevation_index(input: &LayeredPolygonSet, rounder: &SnapRounder) -> HashMap<CoordKey, f64> {
    input
        .iter()
        .flat_map(|(_, polygon)| polygon.contours.iter())
        .flat_map(|contour| contour.points.iter())
        .filter_map(|p| p.elevation.map(|e| (CoordKey::from(rounder.snap(p.coord())), e)))
        .collect()
}

/// Output points that coincide with an input point get its elevation back.
fn restore_elevation(mut polygon: Polygon, elevations: &HashMap<CoordKey, f64>) -> Polygon {
    if elevations.is_empty() {
        return polygon;
    }
    for contour in &mut polygon.contours {
        for p in &mut contour.points {
            p.elevation = elevations.get(&CoordKey::from(&*p)).copied();
        }
    }
    polygon
}
