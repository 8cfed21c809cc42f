use bevy::prelude::*;
use thiserror::Error;

use super::combinations::CombinationTable;
use super::orientation::Orientation;
use super::patterns::JunctionPiece;
use crate::voxel::{ObjectCategory, VoxelKind, VoxelWorld};

/// Why a candidate placement was rejected. The display string doubles as
/// the tooltip shown by the tool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("outside the world")]
    OutOfBounds,
    #[error("voxel is not empty")]
    Occupied,
    #[error("cannot build underwater")]
    Underwater,
    #[error("cannot build on the world floor")]
    AtFloor,
    #[error("needs solid ground beneath")]
    Unsupported,
    #[error("blocked by existing construction")]
    Blocked,
}

/// A validated placement: either a fresh instance, or a merge into an
/// already-placed one via the combination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Fresh,
    Merge {
        target: Entity,
        merged: JunctionPiece,
    },
}

/// Validate placing `piece` at `voxel`. `solids` and `rails` are the static
/// objects whose voxel intersects the candidate's; callers gather them from
/// the world (excluding the candidate itself and any previews).
pub fn validate_placement(
    world: &VoxelWorld,
    table: &CombinationTable,
    voxel: IVec3,
    piece: &JunctionPiece,
    solids: &[(IVec3, ObjectCategory)],
    rails: &[(Entity, IVec3, JunctionPiece)],
) -> Result<Placement, PlacementError> {
    if !world.is_valid(voxel) {
        return Err(PlacementError::OutOfBounds);
    }
    match world.kind(voxel) {
        VoxelKind::Empty => {}
        VoxelKind::Water => return Err(PlacementError::Underwater),
        VoxelKind::Solid => return Err(PlacementError::Occupied),
    }
    if voxel.y == 0 {
        return Err(PlacementError::AtFloor);
    }
    if !world.has_support(voxel) {
        return Err(PlacementError::Unsupported);
    }

    // Work-piles and sensors share voxels freely; any other solid object
    // blocks outright.
    for (at, category) in solids {
        if *at != voxel {
            continue;
        }
        match category {
            ObjectCategory::WorkPile | ObjectCategory::VoxelSensor => {}
            ObjectCategory::Structure => return Err(PlacementError::Blocked),
        }
    }

    // An intersecting rail is only acceptable when the combination table
    // can merge the two pieces; the placement then becomes that merge.
    let mut merge = None;
    for (entity, at, existing) in rails {
        if *at != voxel {
            continue;
        }
        let relative = Orientation::relative(existing.orientation, piece.orientation);
        match table.find(
            &existing.piece,
            &piece.piece,
            Orientation::from_index(relative),
        ) {
            Some((result, result_relative)) if merge.is_none() => {
                merge = Some(Placement::Merge {
                    target: *entity,
                    merged: JunctionPiece::new(
                        existing.offset,
                        result,
                        existing.orientation.rotate(result_relative.index()),
                    ),
                });
            }
            Some(_) => {}
            None => return Err(PlacementError::Blocked),
        }
    }

    Ok(merge.unwrap_or(Placement::Fresh))
}
