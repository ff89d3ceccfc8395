//! Agent controllers and the mage's decision loop.
//!
//! A [`Controller`] runs once per fixed tick for the actor it owns. The mage
//! only thinks when its [`ActionGate`] opens, which happens at random with a
//! probability that grows with the time since its last decision.

use crate::actor::{Actor, WALK};
use crate::config::MageConfig;
use crate::error::{PathError, StateError};
use crate::grid::InfluenceGrid;
use crate::input::InputState;
use crate::math::{Vec2, TAU};
use crate::pathfinding::{find_best_node, most_desirable, AStarPathfinder};

/// The mage's single attack action.
pub const ATTACK: &str = "Attack";

/// What a controller asks the world to resolve on its behalf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intent {
    /// Short-range strike along `direction`.
    Melee { direction: Vec2 },
    /// Ranged spell launched along `direction`.
    Cast { direction: Vec2 },
    Pickup,
}

/// Shared, read-mostly world data handed to every controller.
pub struct TickContext<'a> {
    pub grid: &'a InfluenceGrid,
    pub input: &'a InputState,
    /// Where the actor's target currently stands, if it has one.
    pub target: Option<Vec2>,
    pub rng: &'a mut fastrand::Rng,
    pub dt: f32,
}

/// Drives one actor.
pub trait Controller {
    fn name(&self) -> &'static str;

    /// Update the actor's state for this tick and report any intents.
    fn update(&mut self, actor: &mut Actor, ctx: &mut TickContext<'_>) -> Result<Vec<Intent>, StateError>;
}

/// Randomized decision timer.
///
/// Each poll adds `dt` to the elapsed time and opens with probability
/// `elapsed / interval`; opening resets the elapsed time.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionGate {
    interval: f32,
    elapsed: f32,
}

impl ActionGate {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn poll(&mut self, dt: f32, rng: &mut fastrand::Rng) -> bool {
        self.elapsed += dt;
        if rng.f32() < self.elapsed / self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}

/// Outcome of one mage decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Jumped from far away to `to`, next to the target.
    Teleport { to: Vec2 },
    /// Following a route of `waypoints` towards the target.
    Approach { waypoints: usize },
    /// Walking off in a random direction.
    Wander { heading: Vec2 },
    /// Backing away from a target that came too close.
    Flee { heading: Vec2 },
    /// Following a route of `waypoints` to a better spot near the target.
    Reposition { waypoints: usize },
    Attack { direction: Vec2 },
    /// Wanted to attack but had no mana.
    AttackCancelled,
}

/// Ranged caster that keeps the target inside a comfortable band.
#[derive(Clone, Debug)]
pub struct MageBrain {
    config: MageConfig,
    gate: ActionGate,
    pathfinder: AStarPathfinder,
    target: Option<Vec2>,
    last_target: Option<Vec2>,
    last_position: Option<Vec2>,
}

impl MageBrain {
    pub fn new(config: MageConfig) -> Self {
        let mut pathfinder = AStarPathfinder::new();
        if let Some(limit) = config.max_expansions {
            pathfinder = pathfinder.with_max_expansions(limit);
        }
        Self {
            gate: ActionGate::new(config.action_opportunity),
            config,
            pathfinder,
            target: None,
            last_target: None,
            last_position: None,
        }
    }

    pub fn config(&self) -> &MageConfig {
        &self.config
    }

    /// Record where the target is this tick.
    pub fn observe(&mut self, target: Vec2) {
        self.last_target = self.target.or(Some(target));
        self.target = Some(target);
    }

    /// Target position extrapolated by its last displacement times the overshoot.
    pub fn predicted_target(&self) -> Option<Vec2> {
        let target = self.target?;
        let last = self.last_target.unwrap_or(target);
        Some(target + (target - last) * self.config.overshoot)
    }

    /// Pick and apply a behaviour given the target's current position.
    ///
    /// Clears the actor's action bits and any route it was following before
    /// choosing; the facing is kept.
    pub fn decide(
        &mut self,
        actor: &mut Actor,
        grid: &InfluenceGrid,
        rng: &mut fastrand::Rng,
    ) -> Result<Option<Decision>, StateError> {
        let Some(target) = self.target else {
            return Ok(None);
        };
        let position = actor.position();
        let relative = position - target;
        let distance_sq = relative.length_squared();
        let moved_sq = self
            .last_position
            .map_or(f32::INFINITY, |last| position.distance_squared(last));
        self.last_position = Some(position);

        let facing = actor.facing();
        actor.clear_state();
        actor.set_facing(facing);
        actor.clear_route();

        let c = &self.config;
        let decision = if distance_sq > c.teleport_distance * c.teleport_distance {
            let to = target - relative.normalized() * c.teleport_offset;
            actor.set_position(to);
            self.last_position = Some(to);
            actor.set_facing(target - to);
            actor.set_state(WALK)?;
            log::debug!("mage teleported to ({:.2}, {:.2})", to.x, to.y);
            Decision::Teleport { to }
        } else if distance_sq > c.max_distance * c.max_distance {
            if moved_sq < c.stuck_distance {
                self.wander(actor, rng)?
            } else {
                match self.pathfinder.find_path(grid, position, target) {
                    Ok(route) => {
                        let waypoints = route.len();
                        actor.set_facing(-relative);
                        actor.set_state(WALK)?;
                        actor.set_route(route);
                        Decision::Approach { waypoints }
                    }
                    Err(err) => {
                        log_search_failure(&err);
                        self.wander(actor, rng)?
                    }
                }
            }
        } else if distance_sq < c.min_distance * c.min_distance {
            let heading = if relative.is_zero() {
                Vec2::from_angle(rng.f32() * TAU)
            } else {
                relative.normalized()
            };
            actor.set_facing(heading);
            actor.set_state(WALK)?;
            Decision::Flee { heading }
        } else if rng.f32() > c.aggression {
            self.reposition(actor, grid, target, rng)?
        } else {
            self.attack(actor, position)?
        };

        log::trace!("mage decision: {:?}", decision);
        Ok(Some(decision))
    }

    fn wander(&self, actor: &mut Actor, rng: &mut fastrand::Rng) -> Result<Decision, StateError> {
        let reach = self.config.max_distance;
        let wander = Vec2::new(
            (rng.f32() * 2.0 - 1.0) * reach,
            (rng.f32() * 2.0 - 1.0) * reach,
        );
        if !wander.is_zero() {
            let turn = actor.movement().turn_rate;
            actor.set_facing(wander.normalized().lerp(actor.facing(), turn));
        }
        actor.set_state(WALK)?;
        Ok(Decision::Wander {
            heading: actor.facing(),
        })
    }

    fn reposition(
        &self,
        actor: &mut Actor,
        grid: &InfluenceGrid,
        target: Vec2,
        rng: &mut fastrand::Rng,
    ) -> Result<Decision, StateError> {
        let c = &self.config;
        let band = c.min_distance + rng.f32() * (c.max_distance - c.min_distance);
        let spot = target + Vec2::from_angle(rng.f32() * TAU) * band;

        let route = grid
            .node_at(actor.position())
            .and_then(|start| {
                find_best_node(grid, spot, target, most_desirable, c.search_radius)
                    .map(|goal| (start, goal))
            })
            .map_err(PathError::from)
            .and_then(|(start, goal)| self.pathfinder.find_path_between(grid, start, goal));

        match route {
            Ok(route) if route.is_empty() => self.attack(actor, actor.position()),
            Ok(route) => {
                let waypoints = route.len();
                actor.set_state(WALK)?;
                actor.set_route(route);
                Ok(Decision::Reposition { waypoints })
            }
            Err(err) => {
                log_search_failure(&err);
                self.wander(actor, rng)
            }
        }
    }

    fn attack(&self, actor: &mut Actor, position: Vec2) -> Result<Decision, StateError> {
        let Some(predicted) = self.predicted_target() else {
            return Ok(Decision::AttackCancelled);
        };
        let direction = (predicted - position).normalized();
        actor.set_facing(direction);
        if !actor.mana_mut().try_consume() {
            actor.unset_state(ATTACK)?;
            return Ok(Decision::AttackCancelled);
        }
        actor.set_state(ATTACK)?;
        if let Some(impulse) = self.config.lunge_impulse {
            actor.add_impulse(direction * impulse);
        }
        Ok(Decision::Attack { direction })
    }
}

fn log_search_failure(err: &PathError) {
    match err {
        PathError::NoPath => log::trace!("no route, wandering instead"),
        other => log::debug!("route search failed: {}", other),
    }
}

impl Controller for MageBrain {
    fn name(&self) -> &'static str {
        "mage"
    }

    fn update(&mut self, actor: &mut Actor, ctx: &mut TickContext<'_>) -> Result<Vec<Intent>, StateError> {
        actor.remember_state();
        let Some(target) = ctx.target else {
            return Ok(Vec::new());
        };
        self.observe(target);

        if !self.gate.poll(ctx.dt, ctx.rng) {
            return Ok(Vec::new());
        }
        match self.decide(actor, ctx.grid, ctx.rng)? {
            Some(Decision::Attack { direction }) => Ok(vec![Intent::Cast { direction }]),
            _ => Ok(Vec::new()),
        }
    }
}
