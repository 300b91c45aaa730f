/// Pure game rules and value types. Nothing here mutates a world.

pub mod entity;
pub mod physics;
pub mod rules;
pub mod tile;
