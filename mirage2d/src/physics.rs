use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::grid::WalkabilityOracle;
use crate::math::Vec2;

// Rapier is private implementation detail: do NOT re-export it.
use rapier2d::prelude::*;

/// Handle to a static obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// Engine-facing obstacle shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObstacleShape {
    Box { hx: f32, hy: f32 },
    Circle { radius: f32 },
    CapsuleY { half_height: f32, radius: f32 },
}

/// An obstacle as written in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleDef {
    pub shape: ObstacleShape,
    pub position: Vec2,
    #[serde(default)]
    pub rotation: f32,
}

/// Static blocking geometry, queried by the influence grid.
///
/// Obstacles are parentless colliders; nothing is simulated, the world only
/// answers overlap queries.
pub struct ObstacleWorld {
    island_manager: IslandManager,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    query_pipeline: QueryPipeline,

    obstacle_to_collider: HashMap<ObstacleId, ColliderHandle>,
    next_id: u32,
}

impl Default for ObstacleWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleWorld {
    pub fn new() -> Self {
        Self {
            island_manager: IslandManager::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            obstacle_to_collider: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn from_defs(defs: &[ObstacleDef]) -> Self {
        let mut world = Self::new();
        for def in defs {
            world.add(def.shape, def.position, def.rotation);
        }
        world
    }

    pub fn add(&mut self, shape: ObstacleShape, position: Vec2, rotation: f32) -> ObstacleId {
        let collider = ColliderBuilder::new(to_rapier_shape(shape))
            .translation(vector![position.x, position.y])
            .rotation(rotation)
            .build();
        let handle = self.colliders.insert(collider);

        let id = ObstacleId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.obstacle_to_collider.insert(id, handle);
        self.update_query_pipeline();
        log::debug!("added obstacle {:?} at ({}, {})", id, position.x, position.y);
        id
    }

    pub fn remove(&mut self, id: ObstacleId) -> bool {
        let Some(handle) = self.obstacle_to_collider.remove(&id) else {
            return false;
        };
        self.colliders
            .remove(handle, &mut self.island_manager, &mut self.rigid_bodies, true);
        self.update_query_pipeline();
        true
    }

    /// Teleport an obstacle. Returns false for unknown ids.
    pub fn set_position(&mut self, id: ObstacleId, position: Vec2) -> bool {
        let Some(collider) = self
            .obstacle_to_collider
            .get(&id)
            .and_then(|&handle| self.colliders.get_mut(handle))
        else {
            return false;
        };
        collider.set_translation(vector![position.x, position.y]);
        self.update_query_pipeline();
        true
    }

    pub fn position(&self, id: ObstacleId) -> Option<Vec2> {
        let handle = self.obstacle_to_collider.get(&id)?;
        let t = self.colliders.get(*handle)?.translation();
        Some(Vec2::new(t.x, t.y))
    }

    pub fn contains(&self, id: ObstacleId) -> bool {
        self.obstacle_to_collider.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.obstacle_to_collider.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacle_to_collider.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// True if a circle at `position` overlaps any obstacle.
    pub fn overlaps(&self, position: Vec2, radius: f32) -> bool {
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(position.x, position.y);
        self.query_pipeline
            .intersection_with_shape(
                &self.rigid_bodies,
                &self.colliders,
                &shape_pos,
                &shape,
                QueryFilter::default(),
            )
            .is_some()
    }

    fn update_query_pipeline(&mut self) {
        self.query_pipeline
            .update(&self.rigid_bodies, &self.colliders);
    }
}

impl WalkabilityOracle for ObstacleWorld {
    fn is_walkable(&self, position: Vec2, radius: f32) -> bool {
        !self.overlaps(position, radius)
    }
}

fn to_rapier_shape(s: ObstacleShape) -> SharedShape {
    match s {
        ObstacleShape::Box { hx, hy } => SharedShape::cuboid(hx, hy),
        ObstacleShape::Circle { radius } => SharedShape::ball(radius),
        ObstacleShape::CapsuleY {
            half_height,
            radius,
        } => SharedShape::capsule_y(half_height, radius),
    }
}
