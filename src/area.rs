use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, TerrainError};

/// Land-use category of a polygon or triangle.
///
/// The declaration order is only the default ranking; the clipper takes its
/// precedence from a [`PriorityTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AreaType {
    Hole,
    Airport,
    Freeway,
    Road,
    Railroad,
    Stream,
    Canal,
    Lake,
    DryLake,
    IntermittentLake,
    Reservoir,
    IntermittentReservoir,
    Pond,
    Marsh,
    Bog,
    Island,
    Glacier,
    Urban,
    Town,
    Forest,
    Scrub,
    Grass,
    Cropland,
    Default,
    Ocean,
}

impl AreaType {
    pub const ALL: [AreaType; 25] = [
        AreaType::Hole,
        AreaType::Airport,
        AreaType::Freeway,
        AreaType::Road,
        AreaType::Railroad,
        AreaType::Stream,
        AreaType::Canal,
        AreaType::Lake,
        AreaType::DryLake,
        AreaType::IntermittentLake,
        AreaType::Reservoir,
        AreaType::IntermittentReservoir,
        AreaType::Pond,
        AreaType::Marsh,
        AreaType::Bog,
        AreaType::Island,
        AreaType::Glacier,
        AreaType::Urban,
        AreaType::Town,
        AreaType::Forest,
        AreaType::Scrub,
        AreaType::Grass,
        AreaType::Cropland,
        AreaType::Default,
        AreaType::Ocean,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(TerrainError::AreaIndexOutOfRange(index))
    }

    pub fn name(self) -> &'static str {
        match self {
            AreaType::Hole => "Hole",
            AreaType::Airport => "Airport",
            AreaType::Freeway => "Freeway",
            AreaType::Road => "Road",
            AreaType::Railroad => "Railroad",
            AreaType::Stream => "Stream",
            AreaType::Canal => "Canal",
            AreaType::Lake => "Lake",
            AreaType::DryLake => "DryLake",
            AreaType::IntermittentLake => "IntermittentLake",
            AreaType::Reservoir => "Reservoir",
            AreaType::IntermittentReservoir => "IntermittentReservoir",
            AreaType::Pond => "Pond",
            AreaType::Marsh => "Marsh",
            AreaType::Bog => "Bog",
            AreaType::Island => "Island",
            AreaType::Glacier => "Glacier",
            AreaType::Urban => "Urban",
            AreaType::Town => "Town",
            AreaType::Forest => "Forest",
            AreaType::Scrub => "Scrub",
            AreaType::Grass => "Grass",
            AreaType::Cropland => "Cropland",
            AreaType::Default => "Default",
            AreaType::Ocean => "Ocean",
        }
    }

    /// Case-insensitive lookup by canonical name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| TerrainError::UnknownAreaName(name.to_string()))
    }

    /// Contributes to the inland water mask airports are cut against.
    pub fn is_water(self) -> bool {
        matches!(
            self,
            AreaType::Pond
                | AreaType::Lake
                | AreaType::DryLake
                | AreaType::IntermittentLake
                | AreaType::Reservoir
                | AreaType::IntermittentReservoir
                | AreaType::Stream
                | AreaType::Canal
                | AreaType::Ocean
                | AreaType::Bog
                | AreaType::Marsh
        )
    }

    /// Water bodies that get islands cut out of them.
    pub fn cuts_islands(self) -> bool {
        matches!(
            self,
            AreaType::Lake
                | AreaType::IntermittentLake
                | AreaType::Reservoir
                | AreaType::IntermittentReservoir
                | AreaType::Stream
                | AreaType::Canal
                | AreaType::Ocean
        )
    }

    pub fn is_airport(self) -> bool {
        self == AreaType::Airport
    }

    pub fn is_hole(self) -> bool {
        self == AreaType::Hole
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit precedence of area types for overlap resolution.
///
/// Rank 0 wins over everything else. Types missing from the table are
/// rejected by the clipper.
#[derive(Clone, Debug)]
pub struct PriorityTable {
    order: Vec<AreaType>,
    ranks: HashMap<AreaType, usize>,
    pub fallback: AreaType,
    pub land_mask: AreaType,
    pub island_mask: AreaType,
}

impl PriorityTable {
    /// Builds a table from a highest-precedence-first list. Duplicates keep
    /// their first position.
    pub fn new(order: impl IntoIterator<Item = AreaType>) -> Self {
        let mut ranks = HashMap::new();
        let mut unique = Vec::new();
        for area in order {
            if !ranks.contains_key(&area) {
                ranks.insert(area, unique.len());
                unique.push(area);
            }
        }
        Self {
            order: unique,
            ranks,
            fallback: AreaType::Ocean,
            land_mask: AreaType::Default,
            island_mask: AreaType::Island,
        }
    }

    pub fn with_fallback(mut self, fallback: AreaType) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_land_mask(mut self, area: AreaType) -> Self {
        self.land_mask = area;
        self
    }

    pub fn with_island_mask(mut self, area: AreaType) -> Self {
        self.island_mask = area;
        self
    }

    pub fn rank(&self, area: AreaType) -> Result<usize> {
        self.ranks
            .get(&area)
            .copied()
            .ok_or(TerrainError::AreaTypeOutOfRange(area))
    }

    pub fn contains(&self, area: AreaType) -> bool {
        self.ranks.contains_key(&area)
    }

    /// Area types in precedence order.
    pub fn ordered(&self) -> &[AreaType] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(AreaType::ALL)
    }
}
