// Orientation arithmetic
pub mod orientation;
pub use orientation::{CompassOrientation, Orientation, UnknownOrientation};

// Piece definitions and the piece registry
pub mod pieces;
pub use pieces::{CompassConnection, ConnectionPair, PieceCatalog, PieceDefinition, Shape};

// Merge rules
pub mod combinations;
pub use combinations::{Combination, CombinationTable, RuleParseError, parse_rule};

// Multi-piece layouts and derived chain patterns
pub mod patterns;
pub use patterns::{JunctionPattern, JunctionPiece, PatternLibrary, Portal};

// Placed instances and neighbor discovery
pub mod network;
pub use network::{
    NeighborEdge, Preview, RailInstance, build_rail_graph, reachable_from,
    refresh_neighbor_edges, remove_rail,
};

// Interactive path-laying tool
pub mod planner;
pub use planner::{
    PathLayoutPlanner, PlannedPiece, PlannerState, PreviewTint, cycle_override, find_piece,
    greedy_path, plan_chain, plan_pattern_chain,
};

// Placement checks
pub mod validation;
pub use validation::{Placement, PlacementError, validate_placement};

// Messages
pub mod messages;
pub use messages::{
    CycleEntranceOverride, CycleExitOverride, RailBuildTask, RailDesignationUpdate, RailDragEnd,
    RailDragStart, RailDragUpdate, RefreshNeighbors, RemoveRail, RotateDirection,
    SelectLayoutPattern, ToolFeedback,
};


use bevy::prelude::*;

use crate::voxel::VoxelWorld;

/// Plugin wiring the rail topology engine: catalogs as resources, the drag
/// tool state machine, and neighbor maintenance. Headless-compatible.
pub struct RailPlugin;

impl Plugin for RailPlugin {
    fn build(&self, app: &mut App) {
        // Catalogs are built once at startup and immutable afterwards.
        app.insert_resource(PieceCatalog::standard())
            .insert_resource(CombinationTable::standard())
            .insert_resource(PatternLibrary::standard())
            .init_resource::<VoxelWorld>()
            .init_resource::<PathLayoutPlanner>();

        app.register_type::<RailInstance>()
            .register_type::<Preview>()
            .register_type::<PreviewTint>()
            .register_type::<crate::voxel::SolidObject>();

        app.add_message::<RailDragStart>()
            .add_message::<RailDragUpdate>()
            .add_message::<RailDragEnd>()
            .add_message::<CycleEntranceOverride>()
            .add_message::<CycleExitOverride>()
            .add_message::<SelectLayoutPattern>()
            .add_message::<RemoveRail>()
            .add_message::<RefreshNeighbors>()
            .add_message::<RailBuildTask>()
            .add_message::<RailDesignationUpdate>()
            .add_message::<ToolFeedback>();

        app.add_systems(
            Update,
            (
                planner::drive_rail_drag,
                planner::update_preview_validity.after(planner::drive_rail_drag),
                planner::end_rail_drag.after(planner::update_preview_validity),
                network::remove_rail.after(planner::end_rail_drag),
                network::refresh_neighbor_edges.after(network::remove_rail),
            ),
        );
    }
}
