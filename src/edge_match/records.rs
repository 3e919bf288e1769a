use std::fmt;

use geo_types::{Coord, Rect};

use crate::error::{Result, TerrainError};
use crate::geometry::Point;
use crate::mesh::VertexId;

/// One side of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeDirection {
    North,
    South,
    East,
    West,
}

impl EdgeDirection {
    pub const ALL: [EdgeDirection; 4] = [
        EdgeDirection::North,
        EdgeDirection::South,
        EdgeDirection::East,
        EdgeDirection::West,
    ];

    /// The side of the neighbouring tile that coincides with this one.
    pub fn opposite(self) -> Self {
        match self {
            EdgeDirection::North => EdgeDirection::South,
            EdgeDirection::South => EdgeDirection::North,
            EdgeDirection::East => EdgeDirection::West,
            EdgeDirection::West => EdgeDirection::East,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EdgeDirection::North => "north",
            EdgeDirection::South => "south",
            EdgeDirection::East => "east",
            EdgeDirection::West => "west",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| TerrainError::InputFormat(format!("unknown edge direction '{name}'")))
    }

    /// Latitude (north/south) or longitude (east/west) of this side.
    pub fn side_value(self, bounds: Rect<f64>) -> f64 {
        match self {
            EdgeDirection::North => bounds.max().y,
            EdgeDirection::South => bounds.min().y,
            EdgeDirection::East => bounds.max().x,
            EdgeDirection::West => bounds.min().x,
        }
    }

    /// The coordinate that is constant along this side.
    pub fn across(self, c: Coord<f64>) -> f64 {
        match self {
            EdgeDirection::North | EdgeDirection::South => c.y,
            EdgeDirection::East | EdgeDirection::West => c.x,
        }
    }

    /// The coordinate that varies along this side.
    pub fn along(self, c: Coord<f64>) -> f64 {
        match self {
            EdgeDirection::North | EdgeDirection::South => c.x,
            EdgeDirection::East | EdgeDirection::West => c.y,
        }
    }

    pub fn contains(self, bounds: Rect<f64>, c: Coord<f64>, epsilon: f64) -> bool {
        (self.across(c) - self.side_value(bounds)).abs() <= epsilon
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side of a shared edge knows about a boundary point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeMembership {
    OnlyCurrent,
    OnlyNeighbor,
    Both,
}

impl NodeMembership {
    pub fn name(self) -> &'static str {
        match self {
            NodeMembership::OnlyCurrent => "only_current",
            NodeMembership::OnlyNeighbor => "only_neighbor",
            NodeMembership::Both => "both",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "only_current" => Ok(NodeMembership::OnlyCurrent),
            "only_neighbor" => Ok(NodeMembership::OnlyNeighbor),
            "both" => Ok(NodeMembership::Both),
            other => Err(TerrainError::InputFormat(format!("unknown node membership '{other}'"))),
        }
    }
}

/// A boundary point of a shared tile edge.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedEdgeRecord {
    pub point: Point,
    pub membership: NodeMembership,
    /// Mesh vertex of the current tile, when it has one.
    pub vertex: Option<VertexId>,
}

impl SharedEdgeRecord {
    pub fn new(point: Point, membership: NodeMembership) -> Self {
        Self {
            point,
            membership,
            vertex: None,
        }
    }

    pub fn with_vertex(mut self, vertex: VertexId) -> Self {
        self.vertex = Some(vertex);
        self
    }
}

/// A vertex snapped to its neighbour's position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovedNode {
    pub vertex: VertexId,
    pub old: Coord<f64>,
    pub new: Coord<f64>,
}

/// Outcome of matching one tile side.
#[derive(Clone, Debug)]
pub struct EdgeMatch {
    pub direction: EdgeDirection,
    /// Classified boundary points, sorted along the side.
    pub records: Vec<SharedEdgeRecord>,
    pub moved: Vec<MovedNode>,
    pub inserted: Vec<VertexId>,
    /// Fixed vertices that should have moved but could not.
    pub pinned: Vec<VertexId>,
}

impl EdgeMatch {
    pub fn new(direction: EdgeDirection) -> Self {
        Self {
            direction,
            records: Vec::new(),
            moved: Vec::new(),
            inserted: Vec::new(),
            pinned: Vec::new(),
        }
    }

    pub fn count(&self, membership: NodeMembership) -> usize {
        self.records.iter().filter(|r| r.membership == membership).count()
    }
}
