//! A* pathfinding over an [`InfluenceGrid`].
//!
//! Per-search bookkeeping lives in maps owned by the search, never on the
//! grid, so concurrent or repeated searches cannot see each other's costs.

use std::collections::{HashMap, HashSet};

use crate::error::{GridError, PathError};
use crate::grid::{Direction, InfluenceGrid, Node, NodeId};
use crate::math::Vec2;

/// One stop along a [`Route`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    pub node: NodeId,
    pub position: Vec2,
}

/// Waypoints stacked so that [`Route::pop`] yields them in travel order.
///
/// The start node is not included; the goal is the last waypoint popped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Route {
    stack: Vec<Waypoint>, // goal at index 0
    cost: f32,
}

impl Route {
    /// The next waypoint to travel to.
    pub fn peek(&self) -> Option<&Waypoint> {
        self.stack.last()
    }

    pub fn pop(&mut self) -> Option<Waypoint> {
        self.stack.pop()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Sum of node-to-node distances from start to goal.
    pub fn cost(&self) -> f32 {
        self.cost
    }

    pub fn goal(&self) -> Option<&Waypoint> {
        self.stack.first()
    }

    /// Waypoints from the first one to visit up to the goal.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.stack.iter().rev()
    }
}

#[derive(Clone, Copy, Debug)]
struct Scores {
    g: f32,
    h: f32,
    parent: Option<NodeId>,
}

impl Scores {
    fn f(&self) -> f32 {
        self.g + self.h
    }
}

/// A* search with an optional cap on node expansions.
#[derive(Clone, Copy, Debug, Default)]
pub struct AStarPathfinder {
    max_expansions: Option<usize>,
}

impl AStarPathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up with [`PathError::ExpansionLimit`] after `limit` expansions.
    pub fn with_max_expansions(mut self, limit: usize) -> Self {
        self.max_expansions = Some(limit);
        self
    }

    /// Find a route between the nodes under two world positions.
    pub fn find_path(&self, grid: &InfluenceGrid, start: Vec2, goal: Vec2) -> Result<Route, PathError> {
        let start = grid.node_at(start)?;
        let goal = grid.node_at(goal)?;
        self.find_path_between(grid, start, goal)
    }

    /// Find a route between two nodes.
    ///
    /// The open set is scanned in insertion order; a later entry replaces the
    /// current best only when both its f and h costs are strictly lower.
    pub fn find_path_between(
        &self,
        grid: &InfluenceGrid,
        start: NodeId,
        goal: NodeId,
    ) -> Result<Route, PathError> {
        if start == goal {
            return Ok(Route::default());
        }

        let mut open_set: Vec<NodeId> = vec![start];
        let mut in_open: HashSet<NodeId> = HashSet::from([start]);
        let mut closed_set: HashSet<NodeId> = HashSet::new();
        let mut scores: HashMap<NodeId, Scores> = HashMap::new();
        scores.insert(
            start,
            Scores {
                g: 0.0,
                h: grid.distance(start, goal),
                parent: None,
            },
        );

        let mut expansions = 0;
        while !open_set.is_empty() {
            let mut best = 0;
            for i in 1..open_set.len() {
                let candidate = &scores[&open_set[i]];
                let current = &scores[&open_set[best]];
                if candidate.f() < current.f() && candidate.h < current.h {
                    best = i;
                }
            }

            let current = open_set.remove(best);
            in_open.remove(&current);
            closed_set.insert(current);

            if current == goal {
                return retrace(grid, &scores, start, goal);
            }

            expansions += 1;
            if self.max_expansions.is_some_and(|limit| expansions >= limit) {
                return Err(PathError::ExpansionLimit(expansions));
            }

            let current_g = scores[&current].g;
            for dir in Direction::ALL {
                let Some(neighbor) = grid.node(current).neighbor(dir) else {
                    continue;
                };
                if !grid.is_walkable(neighbor) || closed_set.contains(&neighbor) {
                    continue;
                }

                let tentative_g = current_g + grid.distance(current, neighbor);
                let improves = scores.get(&neighbor).map_or(true, |s| tentative_g < s.g);
                if improves || !in_open.contains(&neighbor) {
                    scores.insert(
                        neighbor,
                        Scores {
                            g: tentative_g,
                            h: grid.distance(neighbor, goal),
                            parent: Some(current),
                        },
                    );
                    if in_open.insert(neighbor) {
                        open_set.push(neighbor);
                    }
                }
            }
        }

        Err(PathError::NoPath)
    }
}

fn retrace(
    grid: &InfluenceGrid,
    scores: &HashMap<NodeId, Scores>,
    start: NodeId,
    goal: NodeId,
) -> Result<Route, PathError> {
    let mut stack = Vec::new();
    let mut node = goal;
    while node != start {
        stack.push(Waypoint {
            node,
            position: grid.world_position(node),
        });
        node = scores
            .get(&node)
            .and_then(|s| s.parent)
            .ok_or(PathError::NoPath)?;
    }
    let cost = scores.get(&goal).map_or(0.0, |s| s.g);
    Ok(Route { stack, cost })
}

/// Ranks a candidate against the current best, given the target node.
/// Returns `true` if the candidate should replace the best.
pub trait NodeComparator {
    fn prefer(&self, candidate: &Node, best: &Node, target: &Node) -> bool;
}

impl<F> NodeComparator for F
where
    F: Fn(&Node, &Node, &Node) -> bool,
{
    fn prefer(&self, candidate: &Node, best: &Node, target: &Node) -> bool {
        self(candidate, best, target)
    }
}

/// Lower desirability plus inverse distance to the target wins.
pub fn lowest_cost(candidate: &Node, best: &Node, target: &Node) -> bool {
    let score = |n: &Node| n.desirability() + 1.0 / n.distance(target);
    score(candidate) < score(best)
}

/// Higher desirability wins; ties go to the node closer to the target.
pub fn most_desirable(candidate: &Node, best: &Node, target: &Node) -> bool {
    let (c, b) = (candidate.desirability(), best.desirability());
    c > b || (c == b && candidate.distance(target) < best.distance(target))
}

/// Scan a square of half-size `radius` around `around` at node spacing and
/// return the walkable node the comparator likes best.
///
/// Samples start at `-radius` and stop short of `+radius`. The node under
/// `around` is the initial best. Sample points off the grid are skipped.
/// Radii wider than the grid scan the whole grid.
pub fn find_best_node(
    grid: &InfluenceGrid,
    around: Vec2,
    target: Vec2,
    comparator: impl NodeComparator,
    radius: f32,
) -> Result<NodeId, GridError> {
    let mut best = grid.node_at(around)?;
    let target = grid.node_at(target)?;
    let step = grid.node_radius();
    if !(step > 0.0) || !radius.is_finite() {
        return Ok(best);
    }

    let span = 2.0 * step * grid.cols().max(grid.rows()) as f32;
    let radius = radius.min(span);
    let steps = (2.0 * radius / step).floor() as i32;
    for i in 0..steps {
        let x = -radius + i as f32 * step;
        for j in 0..steps {
            let y = -radius + j as f32 * step;
            let Ok(candidate) = grid.node_at(around + Vec2::new(x, y)) else {
                continue;
            };
            if candidate == best || !grid.is_walkable(candidate) {
                continue;
            }
            if comparator.prefer(grid.node(candidate), grid.node(best), grid.node(target)) {
                best = candidate;
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::unit_config;
    use crate::grid::{GridCoord, OpenField};
    use approx::assert_relative_eq;

    fn id(grid: &InfluenceGrid, x: i32, y: i32) -> NodeId {
        grid.id_at(GridCoord::new(x, y)).expect("in bounds")
    }

    #[test]
    fn corner_to_corner_goes_diagonal() {
        let grid = InfluenceGrid::build(&unit_config(5, 5), &OpenField).expect("valid grid");
        let mut route = AStarPathfinder::new()
            .find_path_between(&grid, id(&grid, 0, 0), id(&grid, 4, 4))
            .expect("open grid has a route");

        assert_eq!(route.len(), 4);
        assert_relative_eq!(route.cost(), 4.0 * std::f32::consts::SQRT_2, epsilon = 1e-4);

        let visited: Vec<NodeId> = std::iter::from_fn(|| route.pop().map(|w| w.node)).collect();
        let expected: Vec<NodeId> = (1..=4).map(|i| id(&grid, i, i)).collect();
        assert_eq!(visited, expected);
    }

    #[test]
    fn same_node_is_an_empty_route() {
        let grid = InfluenceGrid::build(&unit_config(5, 5), &OpenField).expect("valid grid");
        let route = AStarPathfinder::new()
            .find_path(&grid, Vec2::new(0.1, 0.1), Vec2::ZERO)
            .expect("trivial route");
        assert!(route.is_empty());
        assert_eq!(route.cost(), 0.0);
    }

    #[test]
    fn off_grid_endpoints_surface_the_grid_error() {
        let grid = InfluenceGrid::build(&unit_config(5, 5), &OpenField).expect("valid grid");
        let result = AStarPathfinder::new().find_path(&grid, Vec2::ZERO, Vec2::new(50.0, 0.0));
        assert!(matches!(result, Err(PathError::Grid(GridError::OutOfBounds { .. }))));
    }

    #[test]
    fn expansion_limit_is_reported() {
        let grid = InfluenceGrid::build(&unit_config(9, 9), &OpenField).expect("valid grid");
        let result = AStarPathfinder::new()
            .with_max_expansions(3)
            .find_path_between(&grid, id(&grid, 0, 0), id(&grid, 8, 8));
        assert_eq!(result, Err(PathError::ExpansionLimit(3)));
    }

    #[test]
    fn lowest_cost_prefers_low_desirability_far_from_target() {
        let mut grid = InfluenceGrid::build(&unit_config(5, 5), &OpenField).expect("valid grid");
        let target = id(&grid, 4, 2);
        let near = id(&grid, 3, 2);
        let far = id(&grid, 0, 2);
        assert!(lowest_cost(grid.node(far), grid.node(near), grid.node(target)));

        grid.node_mut(far).set_desirability(1.0);
        assert!(!lowest_cost(grid.node(far), grid.node(near), grid.node(target)));
    }

    #[test]
    fn best_node_search_finds_the_desirable_spot() {
        let mut grid = InfluenceGrid::build(&unit_config(7, 7), &OpenField).expect("valid grid");
        let sweet_spot = id(&grid, 4, 2);
        grid.node_mut(sweet_spot).set_desirability(0.6);

        let best = find_best_node(&grid, Vec2::ZERO, Vec2::new(3.0, 3.0), most_desirable, 1.5)
            .expect("on grid");
        assert_eq!(best, sweet_spot);

        // Flat desirability: the sampled node nearest the target wins.
        let closer = find_best_node(&grid, Vec2::new(-3.0, -3.0), Vec2::ZERO, most_desirable, 1.0)
            .expect("on grid");
        assert_eq!(closer, id(&grid, 1, 1));
    }

    #[test]
    fn best_node_scan_stops_short_of_the_far_edge() {
        let mut grid = InfluenceGrid::build(&unit_config(7, 7), &OpenField).expect("valid grid");
        // Centre at (1, 0): only reachable from the origin by sampling at +1.0.
        let edge = id(&grid, 4, 3);
        grid.node_mut(edge).set_desirability(0.9);

        let best = find_best_node(&grid, Vec2::ZERO, Vec2::ZERO, most_desirable, 1.0)
            .expect("on grid");
        assert_ne!(best, edge);

        let best = find_best_node(&grid, Vec2::ZERO, Vec2::ZERO, most_desirable, 1.5)
            .expect("on grid");
        assert_eq!(best, edge);
    }

    #[test]
    fn huge_radius_scans_the_grid_once() {
        let mut grid = InfluenceGrid::build(&unit_config(7, 7), &OpenField).expect("valid grid");
        let far = id(&grid, 6, 6);
        grid.node_mut(far).set_desirability(0.5);

        let best = find_best_node(&grid, Vec2::ZERO, Vec2::ZERO, most_desirable, 1.0e30)
            .expect("on grid");
        assert_eq!(best, far);
    }
}
