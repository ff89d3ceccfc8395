//! Mirage2D - the simulation core of a top-down action game.
//!
//! Actors carry a compact bitmask of facing and action flags. Agents read an
//! influence grid of desirability values to decide where to go, find routes
//! across it with A*, and pick behaviours on a randomized timer.

pub mod actor;
pub mod ai;
pub mod config;
pub mod error;
pub mod grid;
pub mod influence;
pub mod input;
pub mod math;
pub mod pathfinding;
pub mod physics;
pub mod registry;
pub mod simulation;
pub mod state;

pub use crate::actor::{Actor, ActorEvent, Health, ManaPool};
pub use crate::ai::{ActionGate, Controller, Decision, Intent, MageBrain, TickContext};
pub use crate::config::{
    ActorConfig, GridConfig, MageConfig, MovementConfig, PlayerConfig, SimulationConfig,
};
pub use crate::error::{ConfigError, GridError, PathError, SimulationError, StateError};
pub use crate::grid::{Direction, InfluenceGrid, Node, NodeId, OpenField, WalkabilityOracle};
pub use crate::influence::{propagate, InfluenceEmitter, PropagationRange};
pub use crate::input::{Control, InputState, KeyBindings, PlayerController};
pub use crate::math::Vec2;
pub use crate::pathfinding::{find_best_node, lowest_cost, most_desirable, AStarPathfinder, Route, Waypoint};
pub use crate::physics::{ObstacleDef, ObstacleId, ObstacleShape, ObstacleWorld};
pub use crate::registry::{Agent, AgentId, AgentRegistry, Role};
pub use crate::simulation::{FrameReport, Simulation, TickReport};
pub use crate::state::{ActionTable, Octant, StateFlags};
