/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// A tile is the *static* classification of a cell. Pickups, rocks and
/// snake segments are dynamic occupants layered on top (see `physics`).

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Wall,    // Solid, level boundary material
    Ground,  // Solid, walkable surface
    Hazard,  // Spikes: lethal on contact
    Goal,    // Exit gate: absorbs the snake
}

impl Tile {
    /// Does this tile block entry? (walls and ground are structure)
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall | Tile::Ground)
    }

    /// Does resting on this tile hold the snake up and protect it from hazards?
    pub fn is_safe_support(self) -> bool {
        matches!(self, Tile::Wall | Tile::Ground | Tile::Goal)
    }

    pub fn is_hazard(self) -> bool {
        matches!(self, Tile::Hazard)
    }

    pub fn is_goal(self) -> bool {
        matches!(self, Tile::Goal)
    }

    /// Can a snake segment occupy this cell? (terrain-wise)
    pub fn is_passable(self) -> bool {
        !self.is_solid()
    }
}
