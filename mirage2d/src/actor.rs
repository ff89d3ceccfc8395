//! Actors: anything that moves, faces, animates and can be hurt.

use crate::config::{ActorConfig, MovementConfig};
use crate::error::StateError;
use crate::influence::InfluenceEmitter;
use crate::math::Vec2;
use crate::pathfinding::{Route, Waypoint};
use crate::state::{direction_from_vector, ActionTable, Octant, StateFlags};

/// Action every actor must define; it drives acceleration.
pub const WALK: &str = "Walk";

/// Hit points with a short invulnerability window after each hit.
#[derive(Clone, Debug, PartialEq)]
pub struct Health {
    current: i32,
    max: i32,
    invulnerability: f32,
    hit_timer: f32,
    dying: bool,
}

impl Health {
    pub fn new(max: i32, invulnerability: f32) -> Self {
        Self {
            current: max,
            max,
            invulnerability,
            hit_timer: 0.0,
            dying: false,
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    /// Inside the invulnerability window of the last hit.
    pub fn is_hit(&self) -> bool {
        self.hit_timer > 0.0
    }

    pub fn is_dying(&self) -> bool {
        self.dying
    }

    /// Apply damage unless invulnerable or already dying. Returns whether it landed.
    pub fn damage(&mut self, amount: i32) -> bool {
        if self.dying || self.is_hit() {
            return false;
        }
        self.current -= amount;
        self.hit_timer = self.invulnerability;
        true
    }

    pub fn tick(&mut self, dt: f32) {
        if self.hit_timer > 0.0 {
            self.hit_timer = (self.hit_timer - dt).max(0.0);
        }
    }

    fn begin_dying(&mut self) -> bool {
        if self.is_alive() || self.dying {
            return false;
        }
        self.dying = true;
        true
    }
}

/// Mana that refills one point at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct ManaPool {
    current: u32,
    max: u32,
    recharge: f32,
    timer: f32,
}

impl ManaPool {
    pub fn new(max: u32, recharge: f32) -> Self {
        Self {
            current: max,
            max,
            recharge,
            timer: 0.0,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Spend one point if there is one.
    pub fn try_consume(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn tick(&mut self, dt: f32) {
        if self.current >= self.max {
            self.timer = 0.0;
            return;
        }
        self.timer += dt;
        if self.recharge > 0.0 && self.timer > self.recharge {
            self.timer %= self.recharge;
            self.current += 1;
        }
    }
}

/// Something that happened to an actor while its timers advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorEvent {
    Died,
}

/// A moving, animated body on the world plane.
#[derive(Clone, Debug)]
pub struct Actor {
    position: Vec2,
    velocity: Vec2,
    facing: Vec2,
    octant: Octant,
    state: StateFlags,
    last_state: StateFlags,
    actions: ActionTable,
    walk: StateFlags,
    health: Health,
    mana: ManaPool,
    movement: MovementConfig,
    emitter: InfluenceEmitter,
    route: Option<Route>,
}

impl Actor {
    /// Build an actor from its animation list and tunables.
    ///
    /// Fails if the animations cannot be packed into action bits or do not
    /// include [`WALK`].
    pub fn from_config(position: Vec2, config: &ActorConfig) -> Result<Self, StateError> {
        let ignored: Vec<&str> = config.ignored.iter().map(String::as_str).collect();
        let actions = ActionTable::from_animations(config.animations.as_slice(), &ignored)?;
        let walk = actions.get(WALK)?;
        let mut state = StateFlags::IDLE;
        let octant = direction_from_vector(&mut state, 0.0, -1.0);

        Ok(Self {
            position,
            velocity: Vec2::ZERO,
            facing: Vec2::SOUTH,
            octant,
            state,
            last_state: state,
            actions,
            walk,
            health: Health::new(config.health, config.invulnerability),
            mana: ManaPool::new(config.mana, config.mana_recharge),
            movement: config.movement,
            emitter: config.emitter,
            route: None,
        })
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn add_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse;
    }

    /// Unit facing vector.
    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    pub fn octant(&self) -> Octant {
        self.octant
    }

    /// Face along `direction`, replacing the direction bits. Zero vectors are ignored.
    pub fn set_facing(&mut self, direction: Vec2) {
        if direction.is_zero() || !direction.x.is_finite() || !direction.y.is_finite() {
            return;
        }
        self.facing = direction.normalized();
        self.state.remove(StateFlags::DIRECTION);
        self.octant = direction_from_vector(&mut self.state, direction.x, direction.y);
    }

    pub fn state(&self) -> StateFlags {
        self.state
    }

    pub fn last_state(&self) -> StateFlags {
        self.last_state
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    /// Turn a named action on. Ignored while recoiling from a hit.
    pub fn set_state(&mut self, name: &str) -> Result<(), StateError> {
        let flags = self.actions.get(name)?;
        if !self.health.is_hit() {
            self.state.enable(flags);
        }
        Ok(())
    }

    pub fn unset_state(&mut self, name: &str) -> Result<(), StateError> {
        self.actions.unset(&mut self.state, name)
    }

    /// Whether every bit of the named action is set.
    pub fn state_is(&self, name: &str) -> Result<bool, StateError> {
        self.actions.compare(self.state, name)
    }

    /// Drop every action and direction bit.
    pub fn clear_state(&mut self) {
        self.state = StateFlags::IDLE;
    }

    /// Snapshot the state for [`Actor::state_changed`]; skipped while hit.
    pub fn remember_state(&mut self) {
        if !self.health.is_hit() {
            self.last_state = self.state;
        }
    }

    pub fn state_changed(&self) -> bool {
        self.state != self.last_state
    }

    /// Names of the actions currently on, or `["Idle"]`.
    pub fn active_actions(&self) -> Vec<&str> {
        self.actions.active(self.state)
    }

    pub fn is_walking(&self) -> bool {
        self.state.compare(self.walk)
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn mana(&self) -> &ManaPool {
        &self.mana
    }

    pub fn mana_mut(&mut self) -> &mut ManaPool {
        &mut self.mana
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive() && !self.health.is_dying()
    }

    pub fn take_damage(&mut self, amount: i32) -> bool {
        let landed = self.health.damage(amount);
        if landed {
            log::trace!("actor hit for {}, {} left", amount, self.health.current());
        }
        landed
    }

    pub fn emitter(&self) -> &InfluenceEmitter {
        &self.emitter
    }

    pub fn movement(&self) -> &MovementConfig {
        &self.movement
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: Route) {
        self.route = if route.is_empty() { None } else { Some(route) };
    }

    pub fn clear_route(&mut self) {
        self.route = None;
    }

    /// Advance health and mana timers. Reports a death the first time it happens.
    pub fn tick_timers(&mut self, dt: f32) -> Option<ActorEvent> {
        self.health.tick(dt);
        self.mana.tick(dt);
        if self.health.begin_dying() {
            self.clear_state();
            self.route = None;
            self.velocity = Vec2::ZERO;
            return Some(ActorEvent::Died);
        }
        None
    }

    /// Drop waypoints within `arrival_radius` and face the next one.
    pub fn follow_route(&mut self, arrival_radius: f32) -> Option<Waypoint> {
        let route = self.route.as_mut()?;
        while let Some(next) = route.peek() {
            if next.position.distance(self.position) > arrival_radius {
                break;
            }
            route.pop();
        }
        let Some(next) = route.peek().copied() else {
            self.route = None;
            return None;
        };
        self.set_facing(next.position - self.position);
        Some(next)
    }

    /// Apply friction and, while walking, accelerate along the facing.
    pub fn integrate(&mut self, dt: f32) {
        self.velocity *= 1.0 - self.movement.friction;
        if self.is_walking() {
            let margin = self.movement.speed - self.velocity.length();
            self.velocity += self.facing * (self.movement.acceleration * margin);
        }
        self.position += self.velocity * dt;
    }
}
