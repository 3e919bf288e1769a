use std::fmt;

use geo_types::{Coord, Rect};

use crate::area::PriorityTable;
use crate::clipper::{ClipReport, ClipperConfig, PriorityClipper};
use crate::edge_match::{BoundaryStore, EdgeDirection, EdgeMatch, MatchConfig, TileEdgeMatcher};
use crate::error::Result;
use crate::geometry::LayeredPolygonSet;
use crate::mesh::{seeds_from, ConstrainedTriangulator, ElevationSource, Mesh};

/// Column/row address of a tile. Rows grow northwards, columns eastwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub col: i32,
    pub row: i32,
}

impl TileId {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The tile sharing `edge` with this one.
    pub fn neighbor(self, edge: EdgeDirection) -> Self {
        match edge {
            EdgeDirection::North => Self::new(self.col, self.row + 1),
            EdgeDirection::South => Self::new(self.col, self.row - 1),
            EdgeDirection::East => Self::new(self.col + 1, self.row),
            EdgeDirection::West => Self::new(self.col - 1, self.row),
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.col, self.row)
    }
}

/// Regular grid of square tiles anchored at `origin`.
///
/// Tile bounds are always computed from the origin, never accumulated, so
/// two neighbours agree bit for bit on their shared side.
#[derive(Clone, Debug)]
pub struct TileGrid {
    origin: Coord<f64>,
    tile_size: f64,
}

impl TileGrid {
    pub fn new(origin: Coord<f64>, tile_size: f64) -> Self {
        Self { origin, tile_size }
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    pub fn bounds(&self, tile: TileId) -> Rect<f64> {
        let x0 = self.origin.x + tile.col as f64 * self.tile_size;
        let y0 = self.origin.y + tile.row as f64 * self.tile_size;
        let x1 = self.origin.x + (tile.col + 1) as f64 * self.tile_size;
        let y1 = self.origin.y + (tile.row + 1) as f64 * self.tile_size;
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    /// Tile containing the position; sides belong to the tile east/north of them.
    pub fn tile_at(&self, lon: f64, lat: f64) -> TileId {
        TileId::new(
            ((lon - self.origin.x) / self.tile_size).floor() as i32,
            ((lat - self.origin.y) / self.tile_size).floor() as i32,
        )
    }

    /// Tiles overlapping `bbox`, row by row from the south-west.
    pub fn tiles_covering(&self, bbox: Rect<f64>) -> Vec<TileId> {
        let min = self.tile_at(bbox.min().x, bbox.min().y);
        let max_col = ((bbox.max().x - self.origin.x) / self.tile_size).ceil() as i32;
        let max_row = ((bbox.max().y - self.origin.y) / self.tile_size).ceil() as i32;

        let mut tiles = Vec::new();
        for row in min.row..max_row.max(min.row + 1) {
            for col in min.col..max_col.max(min.col + 1) {
                tiles.push(TileId::new(col, row));
            }
        }
        tiles
    }
}

#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub priority: PriorityTable,
    pub clipper: ClipperConfig,
    pub matcher: MatchConfig,
    /// Compute vertex normals once the mesh is final.
    pub compute_normals: bool,
}

impl PipelineConfig {
    pub fn with_priority(mut self, priority: PriorityTable) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_clipper(mut self, clipper: ClipperConfig) -> Self {
        self.clipper = clipper;
        self
    }

    pub fn with_matcher(mut self, matcher: MatchConfig) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_normals(mut self, compute: bool) -> Self {
        self.compute_normals = compute;
        self
    }
}

pub struct TileOutput {
    pub tile: TileId,
    pub clipped: LayeredPolygonSet,
    pub report: ClipReport,
    pub mesh: Mesh,
    /// One entry per side that had neighbour data.
    pub matches: Vec<EdgeMatch>,
}

/// Builds one finished tile: clip, triangulate, elevate, match against the
/// neighbours already built and persist the boundary for those still to come.
pub struct TilePipeline {
    grid: TileGrid,
    config: PipelineConfig,
    elevation: Option<Box<dyn ElevationSource>>,
}

impl TilePipeline {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            config: PipelineConfig::default(),
            elevation: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_elevation(mut self, source: impl ElevationSource + 'static) -> Self {
        self.elevation = Some(Box::new(source));
        self
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(
        &self,
        tile: TileId,
        input: &LayeredPolygonSet,
        store: &mut dyn BoundaryStore,
    ) -> Result<TileOutput> {
        let bounds = self.grid.bounds(tile);
        log::info!("building tile {tile}: {} input polygons", input.len());

        let clipper = PriorityClipper::new(self.config.priority.clone()).with_config(self.config.clipper.clone());
        let (clipped, report) = clipper.clip_with_report(input, bounds)?;

        let seeds = seeds_from(&clipped)?;
        let mut mesh =
            ConstrainedTriangulator::new(self.config.priority.fallback).triangulate(&clipped, bounds, &seeds)?;
        if let Some(source) = &self.elevation {
            mesh.apply_elevation(source.as_ref());
        }

        let mut neighbors = Vec::new();
        for edge in EdgeDirection::ALL {
            if let Some(records) = store.load(tile.neighbor(edge), edge.opposite())? {
                neighbors.push((edge, records));
            }
        }
        let matcher = TileEdgeMatcher::new(self.config.matcher.clone());
        let matches = matcher.match_edges(&mut mesh, &neighbors, self.elevation.as_deref())?;

        if self.config.compute_normals {
            mesh.compute_normals();
        }

        for edge in EdgeDirection::ALL {
            let matched = matches.iter().find(|m| m.direction == edge);
            let records = TileEdgeMatcher::boundary_records(&mesh, edge, matched);
            store.save(tile, edge, &records)?;
        }

        log::info!(
            "tile {tile}: {} vertices, {} triangles, {} sides matched",
            mesh.vertices().len(),
            mesh.triangles().len(),
            matches.len()
        );
        Ok(TileOutput {
            tile,
            clipped,
            report,
            mesh,
            matches,
        })
    }
}

#[cfg(test)]
#[path = "tiling_tests.rs"]
mod tests;
