//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Session-clock timestamps only (no wall clock)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, storage or network dependencies

pub mod collision;
pub mod flappy;
pub mod memory;
pub mod reaction;
pub mod rng;
pub mod sandbox;
pub mod snake;
pub mod state;
pub mod typing;

pub use collision::{Aabb, CollisionResult, circle_circle_collision};
pub use flappy::{Bird, FlappyGame, Pipe};
pub use memory::{Card, Difficulty, MemoryMatch};
pub use reaction::ReactionTest;
pub use rng::SimRng;
pub use sandbox::{Ball, Sandbox};
pub use snake::{Cell, SnakeGame, SnakeMode};
pub use state::{
    CoreKind, CoreOptions, Direction, GameId, Intent, Phase, Rearm, Simulation,
    SimulationCore, TimedIntent,
};
pub use typing::TypingRace;
