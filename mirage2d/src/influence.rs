//! Desirability propagation.
//!
//! An event at a node spreads outward along the four cardinal links, fading by
//! [`ATTENUATION`] per hop. Each branch remembers which cardinal directions it
//! may still take, so the footprint is a diamond rather than a flood: cardinal
//! neighbours end up more affected than diagonal ones.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, InfluenceGrid, NodeId};
use crate::math::Vec2;

/// Fraction of the value lost on every hop.
pub const ATTENUATION: f32 = 0.15;

/// Hop count reached by a fractional range of zero.
const MAX_FRACTION_HOPS: u32 = 4;

/// How far a propagation event reaches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationRange {
    /// Exact number of hops from the origin.
    Hops(u32),
    /// A value in `[0, 1]` mapped to `4 - floor(4 * r)` hops, so `0` reaches
    /// furthest and `1` touches only the origin.
    Fraction(f32),
}

impl PropagationRange {
    pub fn hops(self) -> u32 {
        match self {
            PropagationRange::Hops(hops) => hops,
            PropagationRange::Fraction(r) => {
                let r = if r.is_nan() { 0.0 } else { r.clamp(0.0, 1.0) };
                MAX_FRACTION_HOPS - (MAX_FRACTION_HOPS as f32 * r).floor() as u32
            }
        }
    }
}

impl Default for PropagationRange {
    fn default() -> Self {
        PropagationRange::Hops(2)
    }
}

impl From<u32> for PropagationRange {
    fn from(hops: u32) -> Self {
        PropagationRange::Hops(hops)
    }
}

/// Set of cardinal directions a branch may still expand into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Heading(u8);

impl Heading {
    const ALL: Heading = Heading(0b1111);

    fn bit(dir: Direction) -> u8 {
        1 << (dir.index() / 2)
    }

    fn contains(self, dir: Direction) -> bool {
        self.0 & Self::bit(dir) != 0
    }

    fn without(self, dir: Direction) -> Self {
        Heading(self.0 & !Self::bit(dir))
    }

    /// Directions left after arriving by `dir`: the way back is dropped if it
    /// is still open, otherwise `dir` itself is.
    fn after(self, dir: Direction) -> Self {
        let back = dir.opposite();
        if self.contains(back) {
            self.without(back)
        } else {
            self.without(dir)
        }
    }

    fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::CARDINALS.into_iter().filter(move |&d| self.contains(d))
    }
}

/// Spread `value` from `origin` through walkable cardinal links.
///
/// Each node touched by the event receives the strongest contribution that
/// reached it; the result is added to its desirability and clamped. Returns the
/// number of nodes touched.
pub fn propagate(
    grid: &mut InfluenceGrid,
    origin: NodeId,
    value: f32,
    range: impl Into<PropagationRange>,
) -> usize {
    let hops = range.into().hops();
    let footprint = footprint(grid, origin, value, hops);
    let touched = footprint.len();
    for (id, delta) in footprint {
        grid.node_mut(id).add_desirability(delta);
    }
    touched
}

fn footprint(grid: &InfluenceGrid, origin: NodeId, value: f32, hops: u32) -> HashMap<NodeId, f32> {
    let mut strongest: HashMap<NodeId, f32> = HashMap::new();
    strongest.insert(origin, value);

    let mut pending = vec![(origin, value, Heading::ALL, hops)];
    while let Some((id, value, heading, remaining)) = pending.pop() {
        if remaining == 0 {
            continue;
        }
        let next_value = value * (1.0 - ATTENUATION);
        for dir in heading.iter() {
            let Some(next) = grid.node(id).neighbor(dir) else {
                continue;
            };
            if !grid.is_walkable(next) {
                continue;
            }
            let entry = strongest.entry(next).or_insert(0.0);
            if next_value.abs() > entry.abs() {
                *entry = next_value;
            }
            pending.push((next, next_value, heading.after(dir), remaining - 1));
        }
    }
    strongest
}

/// An actor's standing influence on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfluenceEmitter {
    pub strength: f32,
    pub range: PropagationRange,
}

impl Default for InfluenceEmitter {
    fn default() -> Self {
        Self {
            strength: -0.8,
            range: PropagationRange::Hops(2),
        }
    }
}

/// Apply every emitter at its position. Emitters off the grid are skipped.
pub fn emit_all<'a>(
    grid: &mut InfluenceGrid,
    emitters: impl IntoIterator<Item = (Vec2, &'a InfluenceEmitter)>,
) {
    for (position, emitter) in emitters {
        match grid.node_at(position) {
            Ok(id) => {
                propagate(grid, id, emitter.strength, emitter.range);
            }
            Err(err) => log::warn!("influence emitter skipped: {}", err),
        }
    }
}
