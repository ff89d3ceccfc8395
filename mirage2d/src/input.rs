use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, WALK};
use crate::ai::{Controller, Intent, TickContext};
use crate::error::StateError;
use crate::math::Vec2;

/// A logical game button, independent of the host's key codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Up,
    Down,
    Left,
    Right,
    Attack,
    AttackSpecial,
    Interact,
}

/// Tracks control state across frames.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    controls_down: HashSet<Control>,
    controls_pressed: HashSet<Control>,
    controls_released: HashSet<Control>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame pressed/released flags.
    pub fn begin_frame(&mut self) {
        self.controls_pressed.clear();
        self.controls_released.clear();
    }

    pub fn press(&mut self, control: Control) {
        if !self.controls_down.contains(&control) {
            self.controls_pressed.insert(control);
        }
        self.controls_down.insert(control);
    }

    pub fn release(&mut self, control: Control) {
        self.controls_down.remove(&control);
        self.controls_released.insert(control);
    }

    /// Returns true if the control is currently held down.
    pub fn is_down(&self, control: Control) -> bool {
        self.controls_down.contains(&control)
    }

    /// Returns true if the control was pressed this frame.
    pub fn is_pressed(&self, control: Control) -> bool {
        self.controls_pressed.contains(&control)
    }

    /// Returns true if the control was released this frame.
    pub fn is_released(&self, control: Control) -> bool {
        self.controls_released.contains(&control)
    }
}

/// Maps host key names (e.g. `"W"`, `"Space"`) to controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    bindings: HashMap<String, Control>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, key: impl Into<String>, control: Control) {
        self.bindings.insert(key.into(), control);
    }

    pub fn control(&self, key: &str) -> Option<Control> {
        self.bindings.get(key).copied()
    }

    /// Forward a host key event. Unbound keys are ignored.
    pub fn handle_key(&self, input: &mut InputState, key: &str, pressed: bool) {
        if let Some(control) = self.control(key) {
            if pressed {
                input.press(control);
            } else {
                input.release(control);
            }
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut keys = Self::new();
        keys.bind("W", Control::Up);
        keys.bind("S", Control::Down);
        keys.bind("A", Control::Left);
        keys.bind("D", Control::Right);
        keys.bind("J", Control::Attack);
        keys.bind("K", Control::AttackSpecial);
        keys.bind("E", Control::Interact);
        keys
    }
}

pub const ATTACK_SWORD: &str = "AttackSword";
pub const ATTACK_FLAME: &str = "AttackFlame";
pub const PICKUP: &str = "Pickup";

/// Actions that pin the player in place while they play.
const STOP_MOVEMENT: [&str; 3] = [ATTACK_SWORD, ATTACK_FLAME, PICKUP];

const REVERSAL_DOT: f32 = -0.999;

const STEERING: [(Control, Vec2); 4] = [
    (Control::Up, Vec2::NORTH),
    (Control::Left, Vec2::WEST),
    (Control::Right, Vec2::EAST),
    (Control::Down, Vec2::SOUTH),
];

/// Turns held and pressed controls into the player's state.
///
/// Held direction controls steer the facing a little each tick, and the
/// attack and interact controls fire on the tick they are pressed.
#[derive(Clone, Debug)]
pub struct PlayerController {
    steer_gain: f32,
}

impl PlayerController {
    pub fn new(steer_gain: f32) -> Self {
        Self { steer_gain }
    }
}

impl Controller for PlayerController {
    fn name(&self) -> &'static str {
        "player"
    }

    fn update(&mut self, actor: &mut Actor, ctx: &mut TickContext<'_>) -> Result<Vec<Intent>, StateError> {
        actor.remember_state();
        actor.clear_state();

        let steer = STEERING
            .iter()
            .filter(|(control, _)| ctx.input.is_down(*control))
            .fold(Vec2::ZERO, |sum, (_, dir)| sum + *dir);
        let facing = actor.facing();
        let heading = if steer.is_zero() {
            facing
        } else if facing.dot(steer.normalized()) <= REVERSAL_DOT {
            // Blending with the exact opposite would never leave the axis.
            steer
        } else {
            let turn = actor.movement().turn_rate;
            facing * (1.0 - turn) + steer * (turn * self.steer_gain)
        };
        if !steer.is_zero() {
            actor.set_state(WALK)?;
        }
        actor.set_facing(heading);

        if ctx.input.is_pressed(Control::Attack) {
            actor.set_state(ATTACK_SWORD)?;
        }
        if ctx.input.is_pressed(Control::AttackSpecial) {
            actor.set_state(ATTACK_FLAME)?;
        }
        if ctx.input.is_pressed(Control::Interact) {
            actor.set_state(PICKUP)?;
        }

        let mut intents = Vec::new();
        let direction = actor.facing();
        if actor.state_is(ATTACK_FLAME)? {
            if actor.mana_mut().try_consume() {
                intents.push(Intent::Cast { direction });
            } else {
                actor.unset_state(ATTACK_FLAME)?;
            }
        }
        if actor.state_is(ATTACK_SWORD)? {
            intents.push(Intent::Melee { direction });
        }
        if actor.state_is(PICKUP)? {
            intents.push(Intent::Pickup);
        }

        for name in STOP_MOVEMENT {
            if actor.state_is(name)? {
                actor.unset_state(WALK)?;
            }
        }
        Ok(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActorConfig, GridConfig};
    use crate::grid::{InfluenceGrid, OpenField};
    use crate::state::Octant;

    fn run(player: &mut PlayerController, actor: &mut Actor, input: &InputState) -> Vec<Intent> {
        let grid = InfluenceGrid::build(&GridConfig::default(), &OpenField).expect("valid grid");
        let mut rng = fastrand::Rng::with_seed(1);
        let mut ctx = TickContext {
            grid: &grid,
            input,
            target: None,
            rng: &mut rng,
            dt: 0.02,
        };
        player.update(actor, &mut ctx).expect("player actions exist")
    }

    fn setup() -> (PlayerController, Actor) {
        let actor = Actor::from_config(Vec2::ZERO, &ActorConfig::player()).expect("valid animations");
        (PlayerController::new(1.25), actor)
    }

    #[test]
    fn pressed_is_reported_for_one_frame() {
        let mut input = InputState::new();
        input.press(Control::Up);
        assert!(input.is_pressed(Control::Up));
        input.press(Control::Up);
        input.begin_frame();
        assert!(!input.is_pressed(Control::Up));
        assert!(input.is_down(Control::Up));
        input.release(Control::Up);
        assert!(input.is_released(Control::Up));
        assert!(!input.is_down(Control::Up));
    }

    #[test]
    fn bindings_forward_host_keys() {
        let keys = KeyBindings::default();
        let mut input = InputState::new();
        keys.handle_key(&mut input, "D", true);
        keys.handle_key(&mut input, "F12", true);
        assert!(input.is_down(Control::Right));
        assert_eq!(keys.control("F12"), None);
    }

    #[test]
    fn holding_a_direction_walks_and_turns() {
        let (mut player, mut actor) = setup();
        let mut input = InputState::new();
        input.press(Control::Right);

        for _ in 0..10 {
            assert!(run(&mut player, &mut actor, &input).is_empty());
            input.begin_frame();
        }
        assert!(actor.is_walking());
        assert_eq!(actor.octant(), Octant::East);
    }

    #[test]
    fn holding_the_opposite_direction_turns_around() {
        let (mut player, mut actor) = setup();
        let mut input = InputState::new();
        input.press(Control::Up);

        run(&mut player, &mut actor, &input);
        assert_eq!(actor.octant(), Octant::North);
        assert!(actor.is_walking());
    }

    #[test]
    fn idle_player_keeps_facing() {
        let (mut player, mut actor) = setup();
        run(&mut player, &mut actor, &InputState::new());
        assert_eq!(actor.active_actions(), vec!["Idle"]);
        assert_eq!(actor.octant(), Octant::South);
    }

    #[test]
    fn attacks_stop_movement_and_spend_mana() {
        let (mut player, mut actor) = setup();
        let mut input = InputState::new();
        input.press(Control::Up);
        input.press(Control::AttackSpecial);

        let intents = run(&mut player, &mut actor, &input);
        assert!(matches!(intents.as_slice(), [Intent::Cast { .. }]));
        assert!(!actor.is_walking());
        assert_eq!(actor.mana().current(), 4);
    }

    #[test]
    fn flame_without_mana_is_cancelled() {
        let (mut player, mut actor) = setup();
        while actor.mana_mut().try_consume() {}
        let mut input = InputState::new();
        input.press(Control::AttackSpecial);
        input.press(Control::Attack);

        let intents = run(&mut player, &mut actor, &input);
        assert!(matches!(intents.as_slice(), [Intent::Melee { .. }]));
        assert!(!actor.state_is(ATTACK_FLAME).expect("known"));
        assert!(actor.state_is(ATTACK_SWORD).expect("known"));
    }
}
