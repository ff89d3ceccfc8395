use std::time::Duration;

use mirage2d::{
    Control, Intent, ObstacleDef, ObstacleShape, Simulation, SimulationConfig, Vec2,
};

const FRAME: Duration = Duration::from_millis(16);

fn duel(seed: u64) -> (Simulation, mirage2d::AgentId, mirage2d::AgentId) {
    let config = SimulationConfig::new()
        .with_seed(seed)
        .with_obstacle(ObstacleDef {
            shape: ObstacleShape::Box { hx: 0.2, hy: 1.0 },
            position: Vec2::new(0.0, 0.0),
            rotation: 0.0,
        });
    let mut sim = Simulation::new(config).expect("default config is valid");
    let player = sim.spawn_player(Vec2::new(-2.0, 0.0)).expect("player animations");
    let mage = sim.spawn_mage(Vec2::new(2.5, 0.5)).expect("mage animations");
    (sim, player, mage)
}

fn trace(seed: u64, frames: usize) -> Vec<(Vec2, u16)> {
    let (mut sim, player, mage) = duel(seed);
    sim.input_mut().press(Control::Up);
    let mut out = Vec::new();
    for _ in 0..frames {
        sim.advance(FRAME).expect("frame");
        let p = sim.actor(player).expect("player");
        let m = sim.actor(mage).expect("mage");
        out.push((p.position(), p.state().bits()));
        out.push((m.position(), m.state().bits()));
    }
    out
}

#[test]
fn same_seed_same_story() {
    assert_eq!(trace(5, 240), trace(5, 240));
}

#[test]
fn obstacles_are_never_walkable_nodes() {
    let (sim, _, _) = duel(1);
    let grid = sim.grid();
    let wall = grid.node_at(Vec2::new(0.0, 0.5)).expect("on grid");
    assert!(!grid.is_walkable(wall));
    let open = grid.node_at(Vec2::new(1.0, 0.5)).expect("on grid");
    assert!(grid.is_walkable(open));
}

#[test]
fn mage_keeps_acting_and_stays_on_the_map() {
    let (mut sim, player, mage) = duel(9);
    let mut casts = 0;
    for _ in 0..600 {
        let report = sim.advance(FRAME).expect("frame");
        casts += report
            .ticks
            .iter()
            .flat_map(|tick| tick.intents.iter())
            .filter(|(id, intent)| *id == mage && matches!(intent, Intent::Cast { .. }))
            .count();
    }

    let m = sim.actor(mage).expect("mage");
    assert!(m.is_alive());
    assert!(sim.grid().node_at(m.position()).is_ok());
    assert!(sim.actor(player).expect("player").is_alive());
    // Three charges up front plus one per recharge interval.
    assert!(casts <= 3 + 600 * 16 / 500 + 1);
}

#[test]
fn held_direction_moves_the_player() {
    let (mut sim, player, _) = duel(2);
    sim.input_mut().press(Control::Down);
    for _ in 0..60 {
        sim.advance(FRAME).expect("frame");
    }
    let p = sim.actor(player).expect("player");
    assert!(p.position().y < -0.5);
    assert!(p.is_walking());
    assert_eq!(p.active_actions(), vec!["Walk"]);
}
