//! Influence grid: a fixed lattice of nodes over the world plane.
//!
//! Each node knows whether it is walkable, carries a desirability score in
//! `[-1, 1]`, and links to up to eight neighbours. Links are computed once when
//! the grid is built; nodes on the border simply have fewer of them.

use crate::config::GridConfig;
use crate::error::GridError;
use crate::influence::{self, PropagationRange};
use crate::math::Vec2;

/// Lower and upper bound of a node's desirability.
pub const DESIRABILITY_RANGE: (f32, f32) = (-1.0, 1.0);

/// Answers whether a circular region of the world is free of blocking geometry.
pub trait WalkabilityOracle {
    fn is_walkable(&self, position: Vec2, radius: f32) -> bool;
}

impl<F> WalkabilityOracle for F
where
    F: Fn(Vec2, f32) -> bool,
{
    fn is_walkable(&self, position: Vec2, radius: f32) -> bool {
        self(position, radius)
    }
}

/// Oracle for a world without obstacles.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenField;

impl WalkabilityOracle for OpenField {
    fn is_walkable(&self, _position: Vec2, _radius: f32) -> bool {
        true
    }
}

/// Column/row address of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Neighbour slot. North is `+y` (world `+z`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 4) % 8]
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::NorthEast => (1, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, -1),
            Direction::South => (0, -1),
            Direction::SouthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, 1),
        }
    }
}

/// Stable index of a node inside its grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One cell of the grid.
#[derive(Clone, Debug)]
pub struct Node {
    coord: GridCoord,
    position: Vec2,
    walkable: bool,
    desirability: f32,
    neighbors: [Option<NodeId>; 8],
}

impl Node {
    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    /// Cell centre in world space.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    pub fn desirability(&self) -> f32 {
        self.desirability
    }

    /// The linked neighbour in `direction`, walkable or not.
    pub fn neighbor(&self, direction: Direction) -> Option<NodeId> {
        self.neighbors[direction.index()]
    }

    /// Linked neighbours with the direction they lie in.
    pub fn neighbors(&self) -> impl Iterator<Item = (Direction, NodeId)> + '_ {
        Direction::ALL
            .iter()
            .filter_map(move |&dir| self.neighbor(dir).map(|id| (dir, id)))
    }

    pub fn link_count(&self) -> usize {
        self.neighbors.iter().flatten().count()
    }

    pub fn distance(&self, other: &Node) -> f32 {
        self.position.distance(other.position)
    }

    pub(crate) fn add_desirability(&mut self, delta: f32) {
        self.set_desirability(self.desirability + delta);
    }

    pub(crate) fn set_desirability(&mut self, value: f32) {
        let (lo, hi) = DESIRABILITY_RANGE;
        self.desirability = if value.is_nan() { 0.0 } else { value.clamp(lo, hi) };
    }
}

/// Outcome of one walkability refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Nodes that went from walkable to blocked.
    pub blocked: usize,
    /// Nodes that went from blocked to walkable.
    pub cleared: usize,
}

/// Row-major lattice of nodes covering a rectangle of the world plane.
#[derive(Clone, Debug)]
pub struct InfluenceGrid {
    center: Vec2,
    width: f32,
    height: f32,
    node_radius: f32,
    cols: usize,
    rows: usize,
    decay_rate: f32,
    burst_hops: u32,
    nodes: Vec<Node>, // [row * cols + col]
}

impl InfluenceGrid {
    /// Build a grid from `config`, sampling `oracle` once per node.
    pub fn build(config: &GridConfig, oracle: &impl WalkabilityOracle) -> Result<Self, GridError> {
        let diameter = config.node_radius * 2.0;
        let invalid = || GridError::InvalidDimensions {
            width: config.width,
            height: config.height,
            diameter,
        };
        if !(diameter > 0.0) || !config.width.is_finite() || !config.height.is_finite() {
            return Err(invalid());
        }

        let cols = (config.width / diameter).round();
        let rows = (config.height / diameter).round();
        if !(cols >= 1.0 && rows >= 1.0) {
            return Err(invalid());
        }
        let (cols, rows) = (cols as usize, rows as usize);

        let bottom_left = config.center - Vec2::new(config.width * 0.5, config.height * 0.5);
        let mut nodes = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let position = bottom_left
                    + Vec2::new(
                        col as f32 * diameter + config.node_radius,
                        row as f32 * diameter + config.node_radius,
                    );
                nodes.push(Node {
                    coord: GridCoord::new(col as i32, row as i32),
                    position,
                    walkable: oracle.is_walkable(position, config.node_radius),
                    desirability: 0.0,
                    neighbors: [None; 8],
                });
            }
        }

        let mut grid = Self {
            center: config.center,
            width: config.width,
            height: config.height,
            node_radius: config.node_radius,
            cols,
            rows,
            decay_rate: config.decay_rate,
            burst_hops: config.obstacle_burst_hops,
            nodes,
        };
        grid.link_neighbors();
        log::debug!("built {}x{} influence grid", cols, rows);
        Ok(grid)
    }

    /// Replace this grid with a freshly built one, e.g. after the world bounds change.
    pub fn rebuild(&mut self, config: &GridConfig, oracle: &impl WalkabilityOracle) -> Result<(), GridError> {
        *self = Self::build(config, oracle)?;
        Ok(())
    }

    fn link_neighbors(&mut self) {
        for index in 0..self.nodes.len() {
            let coord = self.nodes[index].coord;
            for dir in Direction::ALL {
                self.nodes[index].neighbors[dir.index()] = self.id_at(coord.offset(dir));
            }
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn node_radius(&self) -> f32 {
        self.node_radius
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Check if a grid coordinate is within bounds.
    pub fn is_valid(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && (coord.x as usize) < self.cols && coord.y >= 0 && (coord.y as usize) < self.rows
    }

    pub fn id_at(&self, coord: GridCoord) -> Option<NodeId> {
        if !self.is_valid(coord) {
            return None;
        }
        Some(NodeId(coord.y as usize * self.cols + coord.x as usize))
    }

    /// Node under a world position.
    ///
    /// Indices are `round((cols - 1) * (x - left) / width)` and likewise for
    /// rows. Positions more than a node radius outside the covered rectangle,
    /// or that round outside the lattice, are errors.
    pub fn node_at(&self, position: Vec2) -> Result<NodeId, GridError> {
        let left = self.center.x - self.width * 0.5;
        let bottom = self.center.y - self.height * 0.5;
        let r = self.node_radius;
        let inside = (left - r..=left + self.width + r).contains(&position.x)
            && (bottom - r..=bottom + self.height + r).contains(&position.y);
        let fx = (self.cols - 1) as f32 * (position.x - left) / self.width;
        let fy = (self.rows - 1) as f32 * (position.y - bottom) / self.height;

        let out_of_bounds = |x: i64, y: i64| GridError::OutOfBounds {
            position,
            x,
            y,
            cols: self.cols,
            rows: self.rows,
        };
        if !fx.is_finite() || !fy.is_finite() {
            return Err(out_of_bounds(i64::MIN, i64::MIN));
        }

        let (x, y) = (fx.round() as i64, fy.round() as i64);
        if !inside || x < 0 || y < 0 || x as usize >= self.cols || y as usize >= self.rows {
            return Err(out_of_bounds(x, y));
        }
        Ok(NodeId(y as usize * self.cols + x as usize))
    }

    /// Nearest point to `position` no further out than the outermost node centres.
    pub fn clamp_to_bounds(&self, position: Vec2) -> Vec2 {
        let half = Vec2::new(self.width * 0.5, self.height * 0.5);
        let inset = Vec2::new(self.node_radius, self.node_radius);
        let lo = self.center - half + inset;
        let hi = self.center + half - inset;
        Vec2::new(position.x.clamp(lo.x, hi.x), position.y.clamp(lo.y, hi.y))
    }

    /// Cell centre of a node.
    pub fn world_position(&self, id: NodeId) -> Vec2 {
        self.nodes[id.0].position
    }

    pub fn is_walkable(&self, id: NodeId) -> bool {
        self.nodes[id.0].walkable
    }

    /// Euclidean distance between two node centres.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f32 {
        self.node(a).distance(self.node(b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Re-sample every node against `oracle`.
    ///
    /// Walkable nodes decay towards zero. A node that has just become blocked
    /// sends a full-strength negative burst to its surroundings.
    pub fn refresh(&mut self, oracle: &impl WalkabilityOracle) -> RefreshReport {
        let mut report = RefreshReport::default();
        let mut bursts = Vec::new();

        for (index, node) in self.nodes.iter_mut().enumerate() {
            let walkable = oracle.is_walkable(node.position, self.node_radius);
            match (node.walkable, walkable) {
                (true, false) => {
                    report.blocked += 1;
                    bursts.push(NodeId(index));
                }
                (false, true) => report.cleared += 1,
                _ => {}
            }
            node.walkable = walkable;
            if walkable {
                node.desirability *= self.decay_rate;
            }
        }

        let range = PropagationRange::Hops(self.burst_hops);
        for id in bursts {
            influence::propagate(self, id, DESIRABILITY_RANGE.0, range);
        }
        if report.blocked > 0 || report.cleared > 0 {
            log::debug!(
                "grid refresh: {} nodes blocked, {} cleared",
                report.blocked,
                report.cleared
            );
        }
        report
    }
}
