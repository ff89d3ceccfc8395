//! Error types for the simulation core.

use thiserror::Error;

use crate::math::Vec2;

/// Problems with actor state names and action bit assignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state \"{0}\" is not defined as a possible state")]
    UnknownState(String),
    #[error("cannot assign action \"{name}\": all {capacity} action bits are in use")]
    TooManyActions { name: String, capacity: usize },
    #[error("action \"{0}\" is already assigned")]
    DuplicateAction(String),
}

/// Problems building or querying an influence grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid extents {width}x{height} with node diameter {diameter} produce no nodes")]
    InvalidDimensions {
        width: f32,
        height: f32,
        diameter: f32,
    },
    #[error("world position ({}, {}) maps to node ({x}, {y}) outside a {cols}x{rows} grid", .position.x, .position.y)]
    OutOfBounds {
        position: Vec2,
        x: i64,
        y: i64,
        cols: usize,
        rows: usize,
    },
}

/// Route search failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("no route exists between the requested nodes")]
    NoPath,
    #[error("search gave up after expanding {0} nodes")]
    ExpansionLimit(usize),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Invalid tunables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f32,
    },
}

/// Anything that can go wrong setting up or stepping a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    State(#[from] StateError),
}
