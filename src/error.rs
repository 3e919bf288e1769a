use thiserror::Error;

use crate::area::AreaType;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("Invalid input: {0}")]
    InputFormat(String),

    #[error("Contour has {points} points, at least 3 are required")]
    TooFewPoints { points: usize },

    #[error("Unknown area type name: {0}")]
    UnknownAreaName(String),

    #[error("Area type index out of range: {0}")]
    AreaIndexOutOfRange(usize),

    #[error("Area type {0} has no rank in the priority table")]
    AreaTypeOutOfRange(AreaType),

    #[error("Degenerate contour {contour}: triangulated to zero triangles")]
    DegenerateContour { contour: usize },

    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Polygon overlay failed: {0}")]
    Overlay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TerrainError {
    /// Malformed or out-of-range input that should have been caught upstream.
    pub fn is_input_format(&self) -> bool {
        matches!(
            self,
            TerrainError::InputFormat(_)
                | TerrainError::TooFewPoints { .. }
                | TerrainError::UnknownAreaName(_)
                | TerrainError::AreaIndexOutOfRange(_)
                | TerrainError::AreaTypeOutOfRange(_)
        )
    }

    /// Well-formed input that the geometry could not handle.
    pub fn is_degenerate_geometry(&self) -> bool {
        matches!(
            self,
            TerrainError::DegenerateContour { .. } | TerrainError::Triangulation(_) | TerrainError::Overlay(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
