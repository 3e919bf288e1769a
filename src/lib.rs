pub mod area;
pub mod clipper;
pub mod contour_tree;
pub mod edge_match;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod tiling;

mod cdt;

pub use area::{AreaType, PriorityTable};
pub use clipper::{ClipReport, ClipperConfig, PriorityClipper, SnapRounder};
pub use contour_tree::{build_contour_tree, calc_points_inside, ContourTree};
pub use edge_match::{
    BoundaryStore, EdgeDirection, GeoJsonBoundaryStore, MatchConfig, MemoryBoundaryStore, SharedEdgeRecord,
    TileEdgeMatcher,
};
pub use error::{Result, TerrainError};
pub use geometry::{Contour, LayeredPolygonSet, Point, Polygon};
pub use mesh::{ConstrainedTriangulator, ElevationSource, Mesh};
pub use tiling::{PipelineConfig, TileGrid, TileId, TilePipeline};
