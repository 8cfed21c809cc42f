use bevy::prelude::*;

use super::patterns::JunctionPiece;

/// Mouse button went down on a voxel with the rail tool active
#[derive(Message, Debug, Clone, Copy)]
pub struct RailDragStart {
    pub voxel: IVec3,
}

/// Pointer moved to a new voxel while dragging
#[derive(Message, Debug, Clone, Copy)]
pub struct RailDragUpdate {
    pub voxel: IVec3,
}

/// Drag released (`commit: true`) or the tool ended (`commit: false`)
#[derive(Message, Debug, Clone, Copy)]
pub struct RailDragEnd {
    pub commit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    Left,
    Right,
}

/// Key-edge event cycling the override for the chain's entrance direction
#[derive(Message, Debug, Clone, Copy)]
pub struct CycleEntranceOverride {
    pub direction: RotateDirection,
}

/// Key-edge event cycling the override for the chain's exit direction
#[derive(Message, Debug, Clone, Copy)]
pub struct CycleExitOverride {
    pub direction: RotateDirection,
}

/// Switches the drag tool between single-piece layout (`None`) and
/// repeating a named chainable pattern along the drag
#[derive(Message, Debug, Clone)]
pub struct SelectLayoutPattern {
    pub pattern: Option<String>,
}

/// Request to tear down a placed instance, detaching its neighbors first
#[derive(Message, Debug, Clone, Copy)]
pub struct RemoveRail {
    pub entity: Entity,
}

/// Request to rebuild one instance's neighbor edges after its piece or
/// location changed
#[derive(Message, Debug, Clone, Copy)]
pub struct RefreshNeighbors {
    pub entity: Entity,
}

/// Produced on commit: the external job system should craft and build this
/// piece
#[derive(Message, Debug, Clone)]
pub struct RailBuildTask {
    pub entity: Entity,
    pub piece: JunctionPiece,
}

/// Produced when a commit merged into an existing instance: the external
/// job system should update its designation instead of crafting anew
#[derive(Message, Debug, Clone, Copy)]
pub struct RailDesignationUpdate {
    pub entity: Entity,
}

/// User-facing tooltip/status line emitted by the tool
#[derive(Message, Debug, Clone)]
pub struct ToolFeedback {
    pub message: String,
}
