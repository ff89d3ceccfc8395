//! Actor state as a 16-bit flag set.
//!
//! Bits 0-3 hold the facing direction. The four cardinals own one bit each and
//! a diagonal is the union of its two neighbouring cardinals, so "facing north"
//! is still true while facing north-east. Bits 4-15 are handed out to named
//! actions discovered from an actor's animation list.
//!
//! "The actor is in state X" always means "every bit of X is set", never
//! equality, so direction and action flags can be tested independently.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::error::StateError;
use crate::math::{Vec2, INV_EIGHTH_TURN};

bitflags! {
    /// Compact actor state: facing direction plus up to twelve action flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u16 {
        const SOUTH = 1;
        const EAST = 1 << 1;
        const NORTH = 1 << 2;
        const WEST = 1 << 3;

        const SOUTH_EAST = Self::SOUTH.bits() | Self::EAST.bits();
        const NORTH_EAST = Self::NORTH.bits() | Self::EAST.bits();
        const SOUTH_WEST = Self::SOUTH.bits() | Self::WEST.bits();
        const NORTH_WEST = Self::NORTH.bits() | Self::WEST.bits();

        /// Mask covering every direction bit.
        const DIRECTION = 0b1111;

        // Action bits are assigned at runtime.
        const _ = !0;
    }
}

impl StateFlags {
    /// The default state: nothing set.
    pub const IDLE: Self = Self::empty();

    /// Position of the first bit available to actions.
    pub const FIRST_ACTION_BIT: u32 = 4;

    /// True iff every bit of `flag` is set in `self`.
    pub fn compare(self, flag: Self) -> bool {
        self.contains(flag)
    }

    pub fn enable(&mut self, flag: Self) {
        self.insert(flag);
    }

    pub fn disable(&mut self, flag: Self) {
        self.remove(flag);
    }

    /// Only the direction bits of this state.
    pub fn direction(self) -> Self {
        self & Self::DIRECTION
    }

    /// Bits rendered least significant first, in groups of four.
    pub fn bit_string(self) -> String {
        let mut out = String::with_capacity(19);
        for bit in 0..16 {
            if bit > 0 && bit % 4 == 0 {
                out.push(' ');
            }
            out.push(if self.bits() & (1 << bit) != 0 { '1' } else { '0' });
        }
        out
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        Self::IDLE
    }
}

/// One of the eight facing directions, in sprite-sheet row order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Octant {
    South = 0,
    SouthEast = 1,
    East = 2,
    NorthEast = 3,
    North = 4,
    NorthWest = 5,
    West = 6,
    SouthWest = 7,
}

impl Octant {
    pub const ALL: [Octant; 8] = [
        Octant::South,
        Octant::SouthEast,
        Octant::East,
        Octant::NorthEast,
        Octant::North,
        Octant::NorthWest,
        Octant::West,
        Octant::SouthWest,
    ];

    /// Rotates the atan2 octant so that index 0 lands on south.
    pub const ANGLE_OFFSET: usize = 2;

    /// Wraps any index into `0..8`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 8]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn flags(self) -> StateFlags {
        match self {
            Octant::South => StateFlags::SOUTH,
            Octant::SouthEast => StateFlags::SOUTH_EAST,
            Octant::East => StateFlags::EAST,
            Octant::NorthEast => StateFlags::NORTH_EAST,
            Octant::North => StateFlags::NORTH,
            Octant::NorthWest => StateFlags::NORTH_WEST,
            Octant::West => StateFlags::WEST,
            Octant::SouthWest => StateFlags::SOUTH_WEST,
        }
    }

    /// Nearest octant to a world-plane vector. The zero vector reads as east.
    pub fn from_vector(x: f32, z: f32) -> Self {
        let angle = Vec2::new(x, z).angle();
        let index = (angle * INV_EIGHTH_TURN).round() as usize + Self::ANGLE_OFFSET;
        Self::from_index(index)
    }
}

/// Sets the direction bits nearest to `(x, z)` in `state` and returns the
/// octant so callers can pick the matching sprite variant.
pub fn direction_from_vector(state: &mut StateFlags, x: f32, z: f32) -> Octant {
    let octant = Octant::from_vector(x, z);
    state.enable(octant.flags());
    octant
}

/// Animations that are played explicitly and never get an action bit.
pub const DEFAULT_IGNORED: [&str; 4] = ["Dead", "Dying", "Idle", "Hurt"];

/// Name of the default state. Always mapped to [`StateFlags::IDLE`].
pub const IDLE: &str = "Idle";

/// Lookup from action names to their state bits.
#[derive(Clone, Debug)]
pub struct ActionTable {
    flags: HashMap<String, StateFlags>,
    order: Vec<String>,
    assigned: usize,
}

impl ActionTable {
    /// Number of distinct action bits available above the direction bits.
    pub const CAPACITY: usize = 16 - StateFlags::FIRST_ACTION_BIT as usize;

    /// A table holding only the idle state.
    pub fn new() -> Self {
        let mut table = Self {
            flags: HashMap::new(),
            order: Vec::new(),
            assigned: 0,
        };
        table.flags.insert(IDLE.to_string(), StateFlags::IDLE);
        table.order.push(IDLE.to_string());
        table
    }

    /// Assign action bits to `names` in first-seen order.
    ///
    /// Names in `ignore` and names already seen are skipped. Idle is always
    /// present and maps to no bits.
    pub fn from_animations<S: AsRef<str>>(names: &[S], ignore: &[&str]) -> Result<Self, StateError> {
        let mut table = Self::new();
        for name in names {
            let name = name.as_ref();
            if ignore.contains(&name) || table.flags.contains_key(name) {
                continue;
            }
            table.register(name)?;
        }
        log::debug!("assigned {} action bits", table.assigned);
        Ok(table)
    }

    /// Assign the next free action bit to `name`.
    pub fn register(&mut self, name: &str) -> Result<StateFlags, StateError> {
        if self.flags.contains_key(name) {
            return Err(StateError::DuplicateAction(name.to_string()));
        }
        if self.assigned >= Self::CAPACITY {
            return Err(StateError::TooManyActions {
                name: name.to_string(),
                capacity: Self::CAPACITY,
            });
        }
        let flag = StateFlags::from_bits_retain(1 << (StateFlags::FIRST_ACTION_BIT as usize + self.assigned));
        self.assigned += 1;
        self.flags.insert(name.to_string(), flag);
        self.order.push(name.to_string());
        Ok(flag)
    }

    pub fn get(&self, name: &str) -> Result<StateFlags, StateError> {
        self.flags
            .get(name)
            .copied()
            .ok_or_else(|| StateError::UnknownState(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// True iff the named state is fully set in `state`.
    pub fn compare(&self, state: StateFlags, name: &str) -> Result<bool, StateError> {
        Ok(state.compare(self.get(name)?))
    }

    pub fn set(&self, state: &mut StateFlags, name: &str) -> Result<(), StateError> {
        state.enable(self.get(name)?);
        Ok(())
    }

    pub fn unset(&self, state: &mut StateFlags, name: &str) -> Result<(), StateError> {
        state.disable(self.get(name)?);
        Ok(())
    }

    /// Names whose bits are set in `state`, in assignment order.
    ///
    /// Idle is reported only when no action bit is set.
    pub fn active(&self, state: StateFlags) -> Vec<&str> {
        let active: Vec<&str> = self
            .order
            .iter()
            .filter(|name| {
                let flag = self.flags[name.as_str()];
                !flag.is_empty() && state.compare(flag)
            })
            .map(String::as_str)
            .collect();
        if active.is_empty() {
            vec![IDLE]
        } else {
            active
        }
    }

    /// Named entries including Idle, in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, StateFlags)> + '_ {
        self.order
            .iter()
            .map(move |name| (name.as_str(), self.flags[name.as_str()]))
    }

    /// Number of action bits handed out.
    pub fn assigned(&self) -> usize {
        self.assigned
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, -1.0, Octant::South)]
    #[case(1.0, -1.0, Octant::SouthEast)]
    #[case(1.0, 0.0, Octant::East)]
    #[case(1.0, 1.0, Octant::NorthEast)]
    #[case(0.0, 1.0, Octant::North)]
    #[case(-1.0, 1.0, Octant::NorthWest)]
    #[case(-1.0, 0.0, Octant::West)]
    #[case(-1.0, -1.0, Octant::SouthWest)]
    fn vectors_map_to_their_octant(#[case] x: f32, #[case] z: f32, #[case] expected: Octant) {
        let mut state = StateFlags::IDLE;
        let octant = direction_from_vector(&mut state, x, z);
        assert_eq!(octant, expected);
        assert_eq!(state, expected.flags());
    }

    #[rstest]
    #[case(0.001)]
    #[case(1.0)]
    #[case(37.5)]
    #[case(12_000.0)]
    fn octant_ignores_magnitude(#[case] scale: f32) {
        for step in 0..64 {
            let angle = step as f32 * crate::math::TAU / 64.0 + 0.01;
            let dir = Vec2::from_angle(angle);
            let unit = Octant::from_vector(dir.x, dir.y);
            let scaled = Octant::from_vector(dir.x * scale, dir.y * scale);
            assert_eq!(unit, scaled, "angle {angle} scale {scale}");
        }
    }

    #[test]
    fn diagonals_are_unions_of_cardinals() {
        assert_eq!(StateFlags::NORTH_EAST, StateFlags::NORTH | StateFlags::EAST);
        assert_eq!(StateFlags::NORTH_WEST, StateFlags::NORTH | StateFlags::WEST);
        assert_eq!(StateFlags::SOUTH_EAST, StateFlags::SOUTH | StateFlags::EAST);
        assert_eq!(StateFlags::SOUTH_WEST, StateFlags::SOUTH | StateFlags::WEST);
    }

    #[test]
    fn compare_is_a_subset_test() {
        let table = ActionTable::from_animations(&["Walk", "Attack", "Cast", "Pickup"], &DEFAULT_IGNORED)
            .expect("four actions fit");
        let actions: Vec<StateFlags> = ["Walk", "Attack", "Cast", "Pickup"]
            .iter()
            .map(|name| table.get(name).expect("registered"))
            .collect();

        for octant in Octant::ALL {
            for (i, action) in actions.iter().enumerate() {
                for other in &actions[i..] {
                    let state = octant.flags() | *action | *other;
                    for probe in Octant::ALL {
                        let expected = state.bits() & probe.flags().bits() == probe.flags().bits();
                        assert_eq!(state.compare(probe.flags()), expected);
                    }
                    assert!(state.compare(*action));
                    assert!(state.compare(*other));
                    assert!(state.compare(*action | *other));
                    assert!(state.compare(StateFlags::IDLE));
                }
            }
        }
        assert!(StateFlags::NORTH_EAST.compare(StateFlags::NORTH));
        assert!(!StateFlags::NORTH.compare(StateFlags::NORTH_EAST));
    }

    #[test]
    fn action_bits_follow_first_seen_order() {
        let table = ActionTable::from_animations(
            &["Walk", "Idle", "Attack", "Dead", "Hurt", "Cast"],
            &DEFAULT_IGNORED,
        )
        .expect("valid animation list");

        let mapping: Vec<(&str, u16)> = table.iter().map(|(name, flag)| (name, flag.bits())).collect();
        assert_eq!(
            mapping,
            vec![("Idle", 0), ("Walk", 16), ("Attack", 32), ("Cast", 64)]
        );
    }

    #[test]
    fn duplicates_in_animation_list_are_skipped() {
        let table = ActionTable::from_animations(&["Walk", "Walk", "Cast"], &DEFAULT_IGNORED)
            .expect("valid animation list");
        assert_eq!(table.get("Cast").map(|flag| flag.bits()), Ok(32));
        assert_eq!(table.assigned(), 2);
    }

    #[test]
    fn thirteenth_action_is_rejected() {
        let names: Vec<String> = (0..13).map(|i| format!("Action{i}")).collect();
        let err = ActionTable::from_animations(names.as_slice(), &DEFAULT_IGNORED).unwrap_err();
        assert_eq!(
            err,
            StateError::TooManyActions {
                name: "Action12".to_string(),
                capacity: 12
            }
        );

        let table = ActionTable::from_animations(&names[..12], &DEFAULT_IGNORED).expect("twelve fit");
        assert_eq!(table.get("Action11").map(|flag| flag.bits()), Ok(1 << 15));
    }

    #[test]
    fn unknown_names_are_errors() {
        let table = ActionTable::new();
        let mut state = StateFlags::IDLE;
        assert_eq!(
            table.set(&mut state, "Fly"),
            Err(StateError::UnknownState("Fly".to_string()))
        );
        assert!(table.compare(state, "Fly").is_err());
        assert_eq!(state, StateFlags::IDLE);
    }

    #[test]
    fn registering_twice_is_an_error() {
        let mut table = ActionTable::new();
        table.register("Walk").expect("first registration");
        assert_eq!(
            table.register("Walk"),
            Err(StateError::DuplicateAction("Walk".to_string()))
        );
        assert_eq!(table.register("Idle"), Err(StateError::DuplicateAction("Idle".to_string())));
    }

    #[test]
    fn active_lists_set_actions_or_idle() {
        let table = ActionTable::from_animations(&["Walk", "Attack"], &DEFAULT_IGNORED).expect("valid");
        let mut state = StateFlags::NORTH;
        assert_eq!(table.active(state), vec!["Idle"]);
        table.set(&mut state, "Attack").expect("known");
        table.set(&mut state, "Walk").expect("known");
        assert_eq!(table.active(state), vec!["Walk", "Attack"]);
        table.unset(&mut state, "Walk").expect("known");
        assert_eq!(table.active(state), vec!["Attack"]);
        assert!(state.compare(StateFlags::NORTH));
    }

    #[test]
    fn bit_string_is_lsb_first() {
        let state = StateFlags::NORTH_EAST | StateFlags::from_bits_retain(16);
        assert_eq!(state.bit_string(), "0110 1000 0000 0000");
    }
}
