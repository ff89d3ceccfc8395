//! The simulation driver.
//!
//! Game time advances in two cadences. Every frame, actor timers (health
//! invulnerability, mana recharge) advance by the real frame time. Whenever a
//! fixed timestep's worth of time has accumulated, a fixed tick runs:
//!
//! 1. the grid re-samples walkability and decays desirability,
//! 2. every living agent stamps its influence onto the grid,
//! 3. controllers run and may start routes or attacks,
//! 4. actors follow their routes, integrate their velocity and are kept
//!    inside the grid,
//! 5. melee strikes are resolved.

use std::time::Duration;

use crate::actor::{Actor, ActorEvent};
use crate::ai::{Intent, MageBrain, TickContext};
use crate::config::SimulationConfig;
use crate::error::{SimulationError, StateError};
use crate::grid::{InfluenceGrid, RefreshReport};
use crate::influence;
use crate::input::{InputState, KeyBindings, PlayerController};
use crate::math::Vec2;
use crate::physics::ObstacleWorld;
use crate::registry::{Agent, AgentId, AgentRegistry, Role};

/// What happened during one fixed tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub refresh: RefreshReport,
    /// Every intent raised by a controller, in agent order.
    pub intents: Vec<(AgentId, Intent)>,
    /// Agents a melee strike landed on.
    pub hits: Vec<AgentId>,
}

/// What happened during one call to [`Simulation::advance`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub ticks: Vec<TickReport>,
    pub deaths: Vec<AgentId>,
}

pub struct Simulation {
    config: SimulationConfig,
    grid: InfluenceGrid,
    obstacles: ObstacleWorld,
    registry: AgentRegistry,
    input: InputState,
    key_bindings: KeyBindings,
    rng: fastrand::Rng,
    fixed_delta_time: Duration,
    fixed_time_accumulator: Duration,
    elapsed_time: Duration,
    tick_count: u64,
}

impl Simulation {
    /// Validate `config`, place its obstacles and build the grid around them.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let obstacles = ObstacleWorld::from_defs(&config.obstacles);
        let grid = InfluenceGrid::build(&config.grid, &obstacles)?;
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        log::info!(
            "simulation ready: {}x{} grid, {} obstacles",
            grid.cols(),
            grid.rows(),
            obstacles.len()
        );

        Ok(Self {
            config,
            grid,
            obstacles,
            registry: AgentRegistry::new(),
            input: InputState::new(),
            key_bindings: KeyBindings::default(),
            rng,
            fixed_delta_time: Duration::from_secs_f64(1.0 / 60.0),
            fixed_time_accumulator: Duration::ZERO,
            elapsed_time: Duration::ZERO,
            tick_count: 0,
        })
    }

    /// Override the fixed timestep (60 Hz by default).
    #[must_use]
    pub fn with_fixed_timestep(mut self, step: Duration) -> Self {
        self.fixed_delta_time = step;
        self
    }

    #[must_use]
    pub fn with_key_bindings(mut self, bindings: KeyBindings) -> Self {
        self.key_bindings = bindings;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &InfluenceGrid {
        &self.grid
    }

    pub fn obstacles(&self) -> &ObstacleWorld {
        &self.obstacles
    }

    /// Obstacles may be added or moved at any time; the grid notices on the next tick.
    pub fn obstacles_mut(&mut self) -> &mut ObstacleWorld {
        &mut self.obstacles
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AgentRegistry {
        &mut self.registry
    }

    pub fn actor(&self, id: AgentId) -> Option<&Actor> {
        self.registry.get(id).map(|agent| &agent.actor)
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Forward a host key event through the key bindings.
    pub fn handle_key(&mut self, key: &str, pressed: bool) {
        self.key_bindings.handle_key(&mut self.input, key, pressed);
    }

    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_time
    }

    pub fn fixed_delta_time(&self) -> Duration {
        self.fixed_delta_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn spawn_player(&mut self, position: Vec2) -> Result<AgentId, SimulationError> {
        let player = &self.config.player;
        let actor = Actor::from_config(position, &player.actor)?;
        let id = self.registry.spawn(Agent::new(
            Role::Player,
            actor,
            PlayerController::new(player.steer_gain),
        ));
        log::debug!("spawned player {:?}", id);
        Ok(id)
    }

    pub fn spawn_mage(&mut self, position: Vec2) -> Result<AgentId, SimulationError> {
        let mage = &self.config.mage;
        let actor = Actor::from_config(position, &mage.actor)?;
        let id = self
            .registry
            .spawn(Agent::new(Role::Enemy, actor, MageBrain::new(mage.clone())));
        log::debug!("spawned mage {:?}", id);
        Ok(id)
    }

    /// Advance by one frame of real time, running as many fixed ticks as fit.
    pub fn advance(&mut self, delta: Duration) -> Result<FrameReport, SimulationError> {
        self.elapsed_time += delta;
        self.fixed_time_accumulator += delta;

        let mut report = FrameReport {
            ticks: Vec::new(),
            deaths: self.tick_frame(delta.as_secs_f32()),
        };

        while self.fixed_time_accumulator >= self.fixed_delta_time && !self.fixed_delta_time.is_zero() {
            self.fixed_time_accumulator -= self.fixed_delta_time;
            report.ticks.push(self.fixed_tick(self.fixed_delta_time.as_secs_f32())?);
        }
        if !report.ticks.is_empty() {
            self.input.begin_frame();
        }
        Ok(report)
    }

    /// Advance actor timers. Returns agents that died this frame.
    pub fn tick_frame(&mut self, dt: f32) -> Vec<AgentId> {
        let mut deaths = Vec::new();
        for (id, agent) in self.registry.iter_mut() {
            if let Some(ActorEvent::Died) = agent.actor.tick_timers(dt) {
                log::info!("{} {:?} died", agent.controller.name(), id);
                deaths.push(id);
            }
        }
        deaths
    }

    /// Run one fixed tick of `dt` seconds.
    pub fn fixed_tick(&mut self, dt: f32) -> Result<TickReport, StateError> {
        self.tick_count += 1;
        let mut report = TickReport {
            refresh: self.grid.refresh(&self.obstacles),
            ..TickReport::default()
        };

        influence::emit_all(
            &mut self.grid,
            self.registry
                .iter()
                .filter(|(_, agent)| agent.actor.is_alive())
                .map(|(_, agent)| (agent.actor.position(), agent.actor.emitter())),
        );

        let player_position = self
            .registry
            .first_with_role(Role::Player)
            .filter(|(_, agent)| agent.actor.is_alive())
            .map(|(_, agent)| agent.actor.position());

        let mut ctx = TickContext {
            grid: &self.grid,
            input: &self.input,
            target: None,
            rng: &mut self.rng,
            dt,
        };
        let arrival_radius = self.grid.node_radius();
        for (id, agent) in self.registry.iter_mut() {
            if !agent.actor.is_alive() {
                continue;
            }
            ctx.target = match agent.role {
                Role::Enemy => player_position,
                Role::Player => None,
            };
            let intents = agent.controller.update(&mut agent.actor, &mut ctx)?;
            report.intents.extend(intents.into_iter().map(|intent| (id, intent)));

            agent.actor.follow_route(arrival_radius);
            agent.actor.integrate(dt);
            let inside = self.grid.clamp_to_bounds(agent.actor.position());
            agent.actor.set_position(inside);
        }

        report.hits = self.resolve_melee(&report.intents);
        Ok(report)
    }

    fn resolve_melee(&mut self, intents: &[(AgentId, Intent)]) -> Vec<AgentId> {
        let player = &self.config.player;
        let min_alignment = player.melee_arc.to_radians().cos();
        let mut hits = Vec::new();

        for &(attacker, intent) in intents {
            let Intent::Melee { direction } = intent else {
                continue;
            };
            let Some((origin, role)) = self
                .registry
                .get(attacker)
                .map(|agent| (agent.actor.position(), agent.role))
            else {
                continue;
            };

            for (id, agent) in self.registry.iter_mut() {
                if agent.role == role || !agent.actor.is_alive() {
                    continue;
                }
                let offset = agent.actor.position() - origin;
                let distance = offset.length();
                if distance > player.melee_range {
                    continue;
                }
                let aligned = distance == 0.0 || offset.normalized().dot(direction) >= min_alignment;
                if aligned && agent.actor.take_damage(player.melee_damage) {
                    hits.push(id);
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::input::Control;
    use crate::pathfinding::AStarPathfinder;
    use crate::physics::ObstacleShape;

    fn small_config() -> SimulationConfig {
        SimulationConfig::new()
            .with_seed(11)
            .with_grid(GridConfig {
                node_radius: 0.1,
                ..GridConfig::default()
            })
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = small_config();
        config.grid.node_radius = -1.0;
        assert!(matches!(
            Simulation::new(config),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn advance_runs_whole_fixed_steps() {
        let mut sim = Simulation::new(small_config())
            .expect("valid config")
            .with_fixed_timestep(Duration::from_millis(20));

        let report = sim.advance(Duration::from_millis(50)).expect("tick");
        assert_eq!(report.ticks.len(), 2);
        let report = sim.advance(Duration::from_millis(10)).expect("tick");
        assert_eq!(report.ticks.len(), 1);
        assert_eq!(sim.tick_count(), 3);
    }

    #[test]
    fn agents_stamp_influence_every_tick() {
        let mut sim = Simulation::new(small_config()).expect("valid config");
        let player = sim.spawn_player(Vec2::ZERO).expect("spawn");
        sim.fixed_tick(1.0 / 60.0).expect("tick");

        let position = sim.actor(player).expect("alive").position();
        let node = sim.grid().node_at(position).expect("on grid");
        assert!(sim.grid().node(node).desirability() < 0.0);
    }

    #[test]
    fn new_obstacles_are_seen_on_the_next_tick() {
        let mut sim = Simulation::new(small_config()).expect("valid config");
        sim.obstacles_mut()
            .add(ObstacleShape::Box { hx: 0.5, hy: 0.5 }, Vec2::new(2.0, 2.0), 0.0);

        let report = sim.fixed_tick(1.0 / 60.0).expect("tick");
        assert!(report.refresh.blocked > 0);
        let node = sim.grid().node_at(Vec2::new(2.0, 2.0)).expect("on grid");
        assert!(!sim.grid().is_walkable(node));
    }

    #[test]
    fn waypoints_count_as_reached_within_a_node_radius() {
        let mut sim = Simulation::new(small_config()).expect("valid config");
        assert_eq!(sim.grid().node_radius(), 0.1);
        let route = AStarPathfinder::new()
            .find_path(sim.grid(), Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0))
            .expect("open grid");
        let first = *route.peek().expect("non-empty route");
        let waypoints = route.len();

        let player = sim.spawn_player(first.position + Vec2::new(0.0, 0.08)).expect("spawn");
        sim.registry_mut()
            .get_mut(player)
            .expect("spawned")
            .actor
            .set_route(route);
        sim.fixed_tick(1.0 / 60.0).expect("tick");

        let route = sim.actor(player).and_then(Actor::route).expect("still routing");
        assert_eq!(route.len(), waypoints - 1);
        assert_ne!(route.peek().map(|w| w.node), Some(first.node));
    }

    #[test]
    fn sword_hits_an_enemy_in_front() {
        let mut sim = Simulation::new(small_config()).expect("valid config");
        let _player = sim.spawn_player(Vec2::ZERO).expect("spawn");
        let mage = sim.spawn_mage(Vec2::new(0.0, -0.3)).expect("spawn");
        let behind = sim.spawn_mage(Vec2::new(0.0, 0.3)).expect("spawn");

        sim.input_mut().press(Control::Attack);
        let report = sim.fixed_tick(1.0 / 60.0).expect("tick");

        assert_eq!(report.hits, vec![mage]);
        assert_eq!(sim.actor(mage).expect("spawned").health().current(), 1);
        assert_eq!(sim.actor(behind).expect("spawned").health().current(), 3);
    }

    #[test]
    fn dead_agents_are_reported_once() {
        let mut sim = Simulation::new(small_config()).expect("valid config");
        let mage = sim.spawn_mage(Vec2::new(1.0, 0.0)).expect("spawn");
        sim.registry_mut()
            .get_mut(mage)
            .expect("spawned")
            .actor
            .take_damage(10);

        let report = sim.advance(Duration::from_millis(5)).expect("frame");
        assert_eq!(report.deaths, vec![mage]);
        let report = sim.advance(Duration::from_millis(5)).expect("frame");
        assert!(report.deaths.is_empty());
    }
}
