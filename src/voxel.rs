//! Consumed interface to the voxel world: per-voxel validity, emptiness and
//! support queries, plus the non-rail static objects the placement
//! validator has to collide against. The storage engine behind it is not
//! this crate's concern; tests fill a small sparse world by hand.

use bevy::prelude::*;
use std::collections::HashMap;

/// Contents of a single voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum VoxelKind {
    #[default]
    Empty,
    Solid,
    Water,
}

/// Sparse voxel grid; unlisted voxels are empty. Coordinates are valid
/// inside `[0, bounds)` on every axis.
#[derive(Resource, Debug, Clone)]
pub struct VoxelWorld {
    bounds: IVec3,
    voxels: HashMap<IVec3, VoxelKind>,
}

impl Default for VoxelWorld {
    fn default() -> Self {
        Self::new(IVec3::new(64, 16, 64))
    }
}

impl VoxelWorld {
    pub fn new(bounds: IVec3) -> Self {
        Self {
            bounds,
            voxels: HashMap::new(),
        }
    }

    pub fn is_valid(&self, at: IVec3) -> bool {
        at.cmpge(IVec3::ZERO).all() && at.cmplt(self.bounds).all()
    }

    pub fn kind(&self, at: IVec3) -> VoxelKind {
        self.voxels.get(&at).copied().unwrap_or_default()
    }

    pub fn set(&mut self, at: IVec3, kind: VoxelKind) {
        if kind == VoxelKind::Empty {
            self.voxels.remove(&at);
        } else {
            self.voxels.insert(at, kind);
        }
    }

    pub fn is_empty(&self, at: IVec3) -> bool {
        self.kind(at) == VoxelKind::Empty
    }

    /// A voxel is supported when the voxel directly below it is solid
    pub fn has_support(&self, at: IVec3) -> bool {
        self.kind(at - IVec3::Y) == VoxelKind::Solid
    }

    /// Fill a horizontal slab, handy for test fixtures
    pub fn fill_slab(&mut self, min: IVec2, max: IVec2, y: i32, kind: VoxelKind) {
        for x in min.x..=max.x {
            for z in min.y..=max.y {
                self.set(IVec3::new(x, y, z), kind);
            }
        }
    }

    /// World-space center of a voxel
    pub fn center(at: IVec3) -> Vec3 {
        at.as_vec3()
    }
}

/// Collision category of a placed non-rail object. Resolved once at
/// construction; placement filtering checks the tag instead of downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ObjectCategory {
    /// Solid construction that blocks placement
    Structure,
    /// Stockpiled goods waiting for haulers; never blocks
    WorkPile,
    /// Invisible trigger volume; never blocks
    VoxelSensor,
}

/// A static object occupying one voxel
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct SolidObject {
    pub voxel: IVec3,
    pub category: ObjectCategory,
}
