/// World state and the functions that advance it.

pub mod event;
pub mod level;
pub mod replay;
pub mod step;
pub mod world;
