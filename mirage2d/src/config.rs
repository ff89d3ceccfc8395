//! Tunables for the grid, the actors and the agents that drive them.
//!
//! Every struct deserializes with defaults for missing fields, so a config
//! file only needs the values it changes.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::influence::{InfluenceEmitter, PropagationRange};
use crate::math::Vec2;
use crate::physics::ObstacleDef;
use crate::state::DEFAULT_IGNORED;

fn check(field: &'static str, requirement: &'static str, value: f32, ok: bool) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement,
            value,
        })
    }
}

/// Extents and resolution of the influence grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
    /// Half the spacing between node centres.
    pub node_radius: f32,
    /// Multiplier applied to walkable nodes' desirability on every refresh.
    pub decay_rate: f32,
    /// Reach of the repulsion sent out when a node becomes blocked.
    pub obstacle_burst_hops: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            width: 6.0,
            height: 6.0,
            node_radius: 0.05,
            decay_rate: 0.9,
            obstacle_burst_hops: 1,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("grid.width", "positive", self.width, self.width > 0.0)?;
        check("grid.height", "positive", self.height, self.height > 0.0)?;
        check("grid.node_radius", "positive", self.node_radius, self.node_radius > 0.0)?;
        check(
            "grid.decay_rate",
            "within [0, 1]",
            self.decay_rate,
            (0.0..=1.0).contains(&self.decay_rate),
        )
    }
}

/// Velocity model shared by every actor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Fraction of velocity lost per fixed tick.
    pub friction: f32,
    /// Fraction of the gap to top speed closed per fixed tick while walking.
    pub acceleration: f32,
    /// Top speed in world units per second.
    pub speed: f32,
    /// Blend weight of a new heading against the current facing.
    pub turn_rate: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            friction: 0.2,
            acceleration: 0.6,
            speed: 1.5,
            turn_rate: 0.25,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "movement.friction",
            "within [0, 1]",
            self.friction,
            (0.0..=1.0).contains(&self.friction),
        )?;
        check(
            "movement.acceleration",
            "within [0, 1]",
            self.acceleration,
            (0.0..=1.0).contains(&self.acceleration),
        )?;
        check("movement.speed", "non-negative", self.speed, self.speed >= 0.0)?;
        check(
            "movement.turn_rate",
            "within [0, 1]",
            self.turn_rate,
            (0.0..=1.0).contains(&self.turn_rate),
        )
    }
}

/// Everything needed to spawn an [`Actor`](crate::actor::Actor).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Animation names; each non-ignored one becomes an action.
    pub animations: Vec<String>,
    /// Animations that never get an action bit.
    pub ignored: Vec<String>,
    pub health: i32,
    /// Seconds of invulnerability after a hit.
    pub invulnerability: f32,
    pub mana: u32,
    /// Seconds per recharged mana point.
    pub mana_recharge: f32,
    pub movement: MovementConfig,
    pub emitter: InfluenceEmitter,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl ActorConfig {
    pub fn player() -> Self {
        Self {
            animations: names(&[
                "Idle",
                "Walk",
                "AttackSword",
                "AttackFlame",
                "Pickup",
                "Hurt",
                "Dying",
                "Dead",
            ]),
            health: 5,
            mana: 5,
            mana_recharge: 1.0,
            ..Self::default()
        }
    }

    pub fn mage() -> Self {
        Self {
            animations: names(&["Idle", "Walk", "Attack", "Hurt", "Dying", "Dead"]),
            health: 3,
            mana: 3,
            mana_recharge: 0.5,
            movement: MovementConfig {
                speed: 1.2,
                ..MovementConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.movement.validate()?;
        check("actor.health", "positive", self.health as f32, self.health > 0)?;
        check(
            "actor.invulnerability",
            "non-negative",
            self.invulnerability,
            self.invulnerability >= 0.0,
        )?;
        check(
            "actor.mana_recharge",
            "positive",
            self.mana_recharge,
            self.mana_recharge > 0.0,
        )
    }
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            animations: names(&["Idle", "Walk"]),
            ignored: names(&DEFAULT_IGNORED),
            health: 3,
            invulnerability: 0.25,
            mana: 3,
            mana_recharge: 0.5,
            movement: MovementConfig::default(),
            emitter: InfluenceEmitter {
                strength: -0.8,
                range: PropagationRange::Hops(2),
            },
        }
    }
}

/// Keyboard-driven actor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub actor: ActorConfig,
    /// Extra weight given to held direction keys over the turn rate.
    pub steer_gain: f32,
    /// Reach of the sword.
    pub melee_range: f32,
    /// Half-width of the sword's arc, in degrees.
    pub melee_arc: f32,
    pub melee_damage: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            actor: ActorConfig::player(),
            steer_gain: 1.25,
            melee_range: 0.5,
            melee_arc: 10.0,
            melee_damage: 2,
        }
    }
}

/// Ranged caster that keeps its distance from the target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MageConfig {
    pub actor: ActorConfig,
    /// Beyond this the mage teleports next to the target.
    pub teleport_distance: f32,
    /// How far from the target a teleport lands.
    pub teleport_offset: f32,
    /// Beyond this the mage paths towards the target.
    pub max_distance: f32,
    /// Closer than this the mage backs away.
    pub min_distance: f32,
    /// Chance in `[0, 1]` of attacking rather than repositioning.
    pub aggression: f32,
    /// How many frames of target motion to lead an attack by.
    pub overshoot: f32,
    /// Mean seconds between decisions.
    pub action_opportunity: f32,
    /// Squared displacement between decisions below which the mage is stuck.
    pub stuck_distance: f32,
    /// Velocity kick along the facing when an attack is launched.
    pub lunge_impulse: Option<f32>,
    /// Half-size of the square searched for a good node to reposition to.
    pub search_radius: f32,
    /// Cap on path search expansions per decision.
    pub max_expansions: Option<usize>,
}

impl Default for MageConfig {
    fn default() -> Self {
        Self {
            actor: ActorConfig::mage(),
            teleport_distance: 5.0,
            teleport_offset: 1.0,
            max_distance: 3.0,
            min_distance: 0.5,
            aggression: 0.5,
            overshoot: 10.0,
            action_opportunity: 1.5,
            stuck_distance: 0.025,
            lunge_impulse: None,
            search_radius: 0.5,
            max_expansions: Some(4096),
        }
    }
}

impl MageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.actor.validate()?;
        check(
            "mage.min_distance",
            "non-negative",
            self.min_distance,
            self.min_distance >= 0.0,
        )?;
        check(
            "mage.max_distance",
            "at least min_distance",
            self.max_distance,
            self.max_distance >= self.min_distance,
        )?;
        check(
            "mage.teleport_distance",
            "at least max_distance",
            self.teleport_distance,
            self.teleport_distance >= self.max_distance,
        )?;
        check(
            "mage.aggression",
            "within [0, 1]",
            self.aggression,
            (0.0..=1.0).contains(&self.aggression),
        )?;
        check(
            "mage.action_opportunity",
            "positive",
            self.action_opportunity,
            self.action_opportunity > 0.0,
        )?;
        check(
            "mage.search_radius",
            "finite and non-negative",
            self.search_radius,
            self.search_radius.is_finite() && self.search_radius >= 0.0,
        )
    }
}

/// Top-level configuration of a [`Simulation`](crate::simulation::Simulation).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub player: PlayerConfig,
    pub mage: MageConfig,
    pub obstacles: Vec<ObstacleDef>,
    /// Seed for the shared random source; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    #[must_use]
    pub fn with_player(mut self, player: PlayerConfig) -> Self {
        self.player = player;
        self
    }

    #[must_use]
    pub fn with_mage(mut self, mage: MageConfig) -> Self {
        self.mage = mage;
        self
    }

    #[must_use]
    pub fn with_obstacle(mut self, obstacle: ObstacleDef) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.player.actor.validate()?;
        self.mage.validate()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
