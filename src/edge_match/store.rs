//! Persistence of tile boundaries between neighbouring tile runs.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};

use crate::edge_match::{EdgeDirection, NodeMembership, SharedEdgeRecord};
use crate::error::{Result, TerrainError};
use crate::geometry::Point;
use crate::tiling::TileId;

/// Boundary points of finished tiles, keyed by tile and side.
pub trait BoundaryStore {
    /// `None` when the tile side was never saved.
    fn load(&self, tile: TileId, edge: EdgeDirection) -> Result<Option<Vec<SharedEdgeRecord>>>;

    fn save(&mut self, tile: TileId, edge: EdgeDirection, records: &[SharedEdgeRecord]) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBoundaryStore {
    edges: HashMap<(TileId, EdgeDirection), Vec<SharedEdgeRecord>>,
}

impl MemoryBoundaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl BoundaryStore for MemoryBoundaryStore {
    fn load(&self, tile: TileId, edge: EdgeDirection) -> Result<Option<Vec<SharedEdgeRecord>>> {
        Ok(self.edges.get(&(tile, edge)).cloned())
    }

    fn save(&mut self, tile: TileId, edge: EdgeDirection, records: &[SharedEdgeRecord]) -> Result<()> {
        let stored = records
            .iter()
            .map(|r| SharedEdgeRecord::new(r.point, r.membership))
            .collect();
        self.edges.insert((tile, edge), stored);
        Ok(())
    }
}

/// One GeoJSON FeatureCollection of Point features per tile side, stored as
/// `<col>_<row>_<side>.geojson` in a directory.
#[derive(Clone, Debug)]
pub struct GeoJsonBoundaryStore {
    dir: PathBuf,
}

impl GeoJsonBoundaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, tile: TileId, edge: EdgeDirection) -> PathBuf {
        self.dir.join(format!("{}_{}_{}.geojson", tile.col, tile.row, edge.name()))
    }
}

impl BoundaryStore for GeoJsonBoundaryStore {
    fn load(&self, tile: TileId, edge: EdgeDirection) -> Result<Option<Vec<SharedEdgeRecord>>> {
        let path = self.path(tile, edge);
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&path)?);
        let geojson: GeoJson = serde_json::from_reader(reader)?;
        let GeoJson::FeatureCollection(fc) = geojson else {
            return Err(TerrainError::InputFormat(format!(
                "{}: expected a FeatureCollection",
                path.display()
            )));
        };

        let mut records = Vec::with_capacity(fc.features.len());
        for feature in fc.features {
            let position = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(Value::Point(pos)) if pos.len() >= 2 => (pos[0], pos[1]),
                _ => {
                    return Err(TerrainError::InputFormat(format!(
                        "{}: boundary feature is not a point",
                        path.display()
                    )))
                }
            };
            let membership = match feature.property("membership").and_then(|v| v.as_str()) {
                Some(name) => NodeMembership::from_name(name)?,
                None => NodeMembership::Both,
            };
            let point = match feature.property("elevation").and_then(|v| v.as_f64()) {
                Some(e) => Point::with_elevation(position.0, position.1, e),
                None => Point::new(position.0, position.1),
            };
            records.push(SharedEdgeRecord::new(point, membership));
        }
        log::debug!("loaded {} boundary points from {}", records.len(), path.display());
        Ok(Some(records))
    }

    fn save(&mut self, tile: TileId, edge: EdgeDirection, records: &[SharedEdgeRecord]) -> Result<()> {
        let features = records
            .iter()
            .map(|r| {
                let mut feature = Feature::from(Geometry::new(Value::Point(vec![r.point.lon, r.point.lat])));
                feature.set_property("membership", r.membership.name());
                feature.set_property("elevation", r.point.elevation);
                feature
            })
            .collect();
        let fc = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };

        let path = self.path(tile, edge);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, &GeoJson::FeatureCollection(fc))?;
        log::debug!("saved {} boundary points to {}", records.len(), path.display());
        Ok(())
    }
}
