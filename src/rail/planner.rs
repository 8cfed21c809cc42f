use bevy::prelude::*;

use super::combinations::CombinationTable;
use super::messages::{
    CycleEntranceOverride, CycleExitOverride, RailBuildTask, RailDesignationUpdate, RailDragEnd,
    RailDragStart, RailDragUpdate, RefreshNeighbors, RotateDirection, SelectLayoutPattern,
    ToolFeedback,
};
use super::network::{Preview, RailInstance};
use super::orientation::{CompassOrientation, Orientation};
use super::patterns::{JunctionPiece, PatternLibrary};
use super::pieces::{CompassConnection, PieceCatalog, PieceDefinition};
use super::validation::{Placement, validate_placement};
use crate::voxel::{SolidObject, VoxelWorld};

/// Hard cap on the greedy walk; longer drags truncate here
pub const MAX_PATH_LEN: usize = 100;

/// Name of the corner patch inserted beside diagonal junctions
pub const DIAG_EDGE_PIECE: &str = "diag-edge";

/// Preview color cue for the renderer
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub enum PreviewTint {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlannerState {
    #[default]
    Idle,
    Dragging,
}

/// Interactive greedy router state. Lives as a resource; input systems feed
/// it drag messages and it maintains the preview chain.
#[derive(Resource, Debug, Default)]
pub struct PathLayoutPlanner {
    pub state: PlannerState,
    pub start: IVec3,
    pub destination: IVec3,
    /// User override for the chain's entrance direction, cycled by the
    /// rotate keys. `None` means "opposite of the first step".
    pub entrance_override: Option<CompassOrientation>,
    /// User override for the chain's exit direction, cycled the same way.
    /// `None` means "opposite of the last step's incoming side".
    pub exit_override: Option<CompassOrientation>,
    /// When set, the drag repeats this chainable pattern instead of laying
    /// single pieces
    pub pattern: Option<String>,
    pub previews: Vec<Entity>,
}

/// Walk from `start` toward `destination`, each step picking the compass
/// offset that minimizes the remaining squared distance. Terminates at the
/// destination or at [`MAX_PATH_LEN`] waypoints, whichever comes first.
pub fn greedy_path(start: IVec2, destination: IVec2) -> Vec<IVec2> {
    let mut path = vec![start];
    let mut current = start;
    while current != destination && path.len() < MAX_PATH_LEN {
        let step = CompassOrientation::ALL
            .into_iter()
            .min_by_key(|direction| (current + direction.offset() - destination).length_squared())
            .unwrap_or(CompassOrientation::North);
        current += step.offset();
        path.push(current);
    }
    path
}

/// The compass connection each waypoint must serve. The first waypoint's
/// entrance defaults to the opposite of the first step unless overridden;
/// the last waypoint exits straight out along the final step unless
/// overridden; interior waypoints connect their two neighboring deltas.
pub fn connection_requirements(
    path: &[IVec2],
    entrance_override: Option<CompassOrientation>,
    exit_override: Option<CompassOrientation>,
) -> Vec<CompassConnection> {
    if path.len() < 2 {
        return Vec::new();
    }
    let mut requirements = Vec::with_capacity(path.len());
    for i in 0..path.len() {
        let incoming = if i == 0 {
            let first_step = CompassOrientation::from_offset(path[1] - path[0])
                .unwrap_or(CompassOrientation::North);
            entrance_override.unwrap_or_else(|| first_step.opposite())
        } else {
            CompassOrientation::from_offset(path[i - 1] - path[i])
                .unwrap_or(CompassOrientation::North)
        };
        let outgoing = if i + 1 < path.len() {
            CompassOrientation::from_offset(path[i + 1] - path[i])
                .unwrap_or(CompassOrientation::North)
        } else {
            exit_override.unwrap_or_else(|| incoming.opposite())
        };
        requirements.push(CompassConnection::new(incoming, outgoing));
    }
    requirements
}

/// Search the catalog over all four orientations for the first piece whose
/// declared compass connection, rotated, matches the requirement
pub fn find_piece<'a>(
    catalog: &'a PieceCatalog,
    requirement: CompassConnection,
) -> Option<(&'a PieceDefinition, Orientation)> {
    for piece in catalog.pieces() {
        if piece.compass_connections.is_empty() {
            continue;
        }
        for orientation in Orientation::ALL {
            for connection in &piece.compass_connections {
                if connection.rotated_by(orientation).matches(requirement) {
                    return Some((piece, orientation));
                }
            }
        }
    }
    None
}

/// Cycle one endpoint override a compass step at a time, holding the other
/// endpoint fixed, until some catalog piece serves the resulting
/// connection, up to 8 attempts. Falls back to the current direction when
/// nothing matches. Connection matching ignores polarity, so the same
/// routine cycles the entrance and the exit side.
pub fn cycle_override(
    catalog: &PieceCatalog,
    current: CompassOrientation,
    fixed: CompassOrientation,
    direction: RotateDirection,
) -> CompassOrientation {
    let step = match direction {
        RotateDirection::Right => 1,
        RotateDirection::Left => CompassOrientation::COUNT - 1,
    };
    let mut candidate = current;
    for _ in 0..CompassOrientation::COUNT {
        candidate = candidate.rotate(step);
        if find_piece(catalog, CompassConnection::new(candidate, fixed)).is_some() {
            return candidate;
        }
    }
    current
}

/// One entry of a planned chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPiece {
    pub voxel: IVec3,
    pub piece: JunctionPiece,
    /// Corner patch, excluded from matching and neighbor discovery
    pub filler: bool,
}

/// Resolve a greedy path into concrete pieces. An unsatisfiable waypoint
/// truncates the chain right there; the planner never backtracks.
pub fn plan_chain(
    catalog: &PieceCatalog,
    path: &[IVec2],
    y: i32,
    entrance_override: Option<CompassOrientation>,
    exit_override: Option<CompassOrientation>,
) -> Vec<PlannedPiece> {
    let requirements = connection_requirements(path, entrance_override, exit_override);
    let mut planned = Vec::new();
    for (waypoint, requirement) in path.iter().zip(&requirements) {
        let Some((piece, orientation)) = find_piece(catalog, *requirement) else {
            break;
        };
        let voxel = IVec3::new(waypoint.x, y, waypoint.y);
        planned.push(PlannedPiece {
            voxel,
            piece: JunctionPiece::new(IVec2::ZERO, &piece.name, orientation),
            filler: false,
        });
        if requirement.has_diagonal() {
            // Two corner patches flanking the diagonal junction, at fixed
            // relative rotations.
            for turns in [1, 3] {
                planned.push(PlannedPiece {
                    voxel,
                    piece: JunctionPiece::new(
                        IVec2::ZERO,
                        DIAG_EDGE_PIECE,
                        orientation.rotate(turns),
                    ),
                    filler: true,
                });
            }
        }
    }
    planned
}

/// Repeat a chainable pattern from `start` toward `destination` along the
/// dominant cardinal direction. Each stamp is the pre-expanded variant
/// whose entrance faces back along the travel direction; the next stamp
/// begins one cell past the previous exit portal. Stops once the next
/// stamp would overshoot the destination, or at [`MAX_PATH_LEN`] pieces.
pub fn plan_pattern_chain(
    library: &PatternLibrary,
    pattern: &str,
    start: IVec2,
    destination: IVec2,
    y: i32,
) -> Vec<PlannedPiece> {
    let delta = destination - start;
    if delta == IVec2::ZERO {
        return Vec::new();
    }
    let travel = if delta.x.abs() >= delta.y.abs() {
        if delta.x > 0 { Orientation::East } else { Orientation::West }
    } else if delta.y > 0 {
        Orientation::North
    } else {
        Orientation::South
    };
    let travel_step = CompassOrientation::from(travel).offset();
    let distance = delta.dot(travel_step);

    let mut planned = Vec::new();
    let mut origin = start;
    while (origin - start).dot(travel_step) <= distance && planned.len() < MAX_PATH_LEN {
        let Some(chain) = library.chain_for_entrance(pattern, travel.rotate(2)) else {
            break;
        };
        for piece in &chain.pieces {
            planned.push(PlannedPiece {
                voxel: IVec3::new(origin.x + piece.offset.x, y, origin.y + piece.offset.y),
                piece: JunctionPiece::new(IVec2::ZERO, &piece.piece, piece.orientation),
                filler: false,
            });
        }
        let Some(exit) = chain.exit else {
            break;
        };
        origin += exit.offset + CompassOrientation::from(exit.direction).offset();
    }
    planned
}

fn rebuild_previews(
    commands: &mut Commands,
    planner: &mut PathLayoutPlanner,
    catalog: &PieceCatalog,
    library: &PatternLibrary,
) {
    for entity in planner.previews.drain(..) {
        commands.entity(entity).despawn();
    }
    if planner.state != PlannerState::Dragging {
        return;
    }
    let start = IVec2::new(planner.start.x, planner.start.z);
    let destination = IVec2::new(planner.destination.x, planner.destination.z);
    let planned = match &planner.pattern {
        Some(pattern) => {
            plan_pattern_chain(library, pattern, start, destination, planner.start.y)
        }
        None => {
            let path = greedy_path(start, destination);
            plan_chain(
                catalog,
                &path,
                planner.start.y,
                planner.entrance_override,
                planner.exit_override,
            )
        }
    };
    for planned in planned {
        let entity = commands
            .spawn((
                RailInstance {
                    voxel: planned.voxel,
                    piece: planned.piece,
                    neighbors: Vec::new(),
                },
                Preview,
                PreviewTint::Valid,
            ))
            .id();
        planner.previews.push(entity);
    }
}

/// Drive the drag state machine: start, pointer moves, pattern selection,
/// and override-cycle key edges all rebuild the preview chain
pub fn drive_rail_drag(
    mut commands: Commands,
    mut planner: ResMut<PathLayoutPlanner>,
    mut starts: MessageReader<RailDragStart>,
    mut updates: MessageReader<RailDragUpdate>,
    mut entrance_cycles: MessageReader<CycleEntranceOverride>,
    mut exit_cycles: MessageReader<CycleExitOverride>,
    mut selections: MessageReader<SelectLayoutPattern>,
    catalog: Res<PieceCatalog>,
    library: Res<PatternLibrary>,
) {
    let mut dirty = false;

    for selection in selections.read() {
        // Tool mode, so it persists across drags.
        planner.pattern = selection.pattern.clone();
        dirty = true;
    }

    if let Some(start) = starts.read().last() {
        planner.state = PlannerState::Dragging;
        planner.start = start.voxel;
        planner.destination = start.voxel;
        planner.entrance_override = None;
        planner.exit_override = None;
        dirty = true;
    }

    if planner.state != PlannerState::Dragging {
        updates.clear();
        entrance_cycles.clear();
        exit_cycles.clear();
        return;
    }

    if let Some(update) = updates.read().last() {
        // No slope routing: the chain stays on the start height.
        planner.destination = IVec3::new(update.voxel.x, planner.start.y, update.voxel.z);
        dirty = true;
    }

    let start = IVec2::new(planner.start.x, planner.start.z);
    let destination = IVec2::new(planner.destination.x, planner.destination.z);

    for cycle in entrance_cycles.read() {
        let path = greedy_path(start, destination);
        if path.len() < 2 {
            continue;
        }
        let first_step = CompassOrientation::from_offset(path[1] - path[0])
            .unwrap_or(CompassOrientation::North);
        let current = planner
            .entrance_override
            .unwrap_or_else(|| first_step.opposite());
        planner.entrance_override =
            Some(cycle_override(&catalog, current, first_step, cycle.direction));
        dirty = true;
    }

    for cycle in exit_cycles.read() {
        let path = greedy_path(start, destination);
        if path.len() < 2 {
            continue;
        }
        let last_incoming =
            CompassOrientation::from_offset(path[path.len() - 2] - path[path.len() - 1])
                .unwrap_or(CompassOrientation::North);
        let current = planner
            .exit_override
            .unwrap_or_else(|| last_incoming.opposite());
        planner.exit_override =
            Some(cycle_override(&catalog, current, last_incoming, cycle.direction));
        dirty = true;
    }

    if dirty {
        rebuild_previews(&mut commands, &mut planner, &catalog, &library);
    }
}

/// Revalidate the preview chain every frame and retint it; a tint flipping
/// to invalid surfaces the reason as tool feedback
pub fn update_preview_validity(
    planner: Res<PathLayoutPlanner>,
    world: Res<VoxelWorld>,
    table: Res<CombinationTable>,
    solids: Query<&SolidObject>,
    placed: Query<(Entity, &RailInstance), Without<Preview>>,
    mut previews: Query<(&RailInstance, &mut PreviewTint), With<Preview>>,
    mut feedback: MessageWriter<ToolFeedback>,
) {
    if planner.state != PlannerState::Dragging {
        return;
    }
    let solids: Vec<_> = solids
        .iter()
        .map(|object| (object.voxel, object.category))
        .collect();
    let rails: Vec<_> = placed
        .iter()
        .map(|(entity, instance)| (entity, instance.voxel, instance.piece.clone()))
        .collect();

    for (instance, mut tint) in previews.iter_mut() {
        let result = validate_placement(
            &world,
            &table,
            instance.voxel,
            &instance.piece,
            &solids,
            &rails,
        );
        let new_tint = match &result {
            Ok(_) => PreviewTint::Valid,
            Err(_) => PreviewTint::Invalid,
        };
        if *tint != new_tint {
            if let Err(error) = result {
                feedback.write(ToolFeedback {
                    message: error.to_string(),
                });
            }
            *tint = new_tint;
        }
    }
}

/// Resolve a drag release: commit the whole chain or roll the whole chain
/// back. There is no partial commit.
pub fn end_rail_drag(
    mut commands: Commands,
    mut ends: MessageReader<RailDragEnd>,
    mut planner: ResMut<PathLayoutPlanner>,
    world: Res<VoxelWorld>,
    table: Res<CombinationTable>,
    solids: Query<&SolidObject>,
    mut placed: Query<(Entity, &mut RailInstance), Without<Preview>>,
    previews: Query<&RailInstance, With<Preview>>,
    mut refresh: MessageWriter<RefreshNeighbors>,
    mut tasks: MessageWriter<RailBuildTask>,
    mut designations: MessageWriter<RailDesignationUpdate>,
    mut feedback: MessageWriter<ToolFeedback>,
) {
    let Some(end) = ends.read().last().copied() else {
        return;
    };
    if planner.state != PlannerState::Dragging {
        return;
    }
    planner.state = PlannerState::Idle;
    planner.entrance_override = None;
    planner.exit_override = None;
    let preview_entities = std::mem::take(&mut planner.previews);

    if !end.commit {
        for entity in &preview_entities {
            commands.entity(*entity).despawn();
        }
        feedback.write(ToolFeedback {
            message: "rail layout discarded".to_string(),
        });
        return;
    }

    let solid_list: Vec<_> = solids
        .iter()
        .map(|object| (object.voxel, object.category))
        .collect();
    let rail_list: Vec<_> = placed
        .iter()
        .map(|(entity, instance)| (entity, instance.voxel, instance.piece.clone()))
        .collect();

    // Validate the whole chain first so a failure anywhere rolls back
    // everything.
    let mut resolved = Vec::with_capacity(preview_entities.len());
    for &entity in &preview_entities {
        let Ok(instance) = previews.get(entity) else {
            continue;
        };
        match validate_placement(
            &world,
            &table,
            instance.voxel,
            &instance.piece,
            &solid_list,
            &rail_list,
        ) {
            Ok(placement) => resolved.push((entity, instance.piece.clone(), placement)),
            Err(error) => {
                for entity in &preview_entities {
                    commands.entity(*entity).despawn();
                }
                feedback.write(ToolFeedback {
                    message: format!("cannot build here: {error}"),
                });
                return;
            }
        }
    }

    let mut built = 0usize;
    let mut merged = 0usize;
    for (entity, piece, placement) in resolved {
        match placement {
            Placement::Fresh => {
                commands.entity(entity).remove::<(Preview, PreviewTint)>();
                refresh.write(RefreshNeighbors { entity });
                tasks.write(RailBuildTask { entity, piece });
                built += 1;
            }
            Placement::Merge {
                target,
                merged: merged_piece,
            } => {
                if let Ok((_, mut existing)) = placed.get_mut(target) {
                    existing.piece = merged_piece;
                }
                commands.entity(entity).despawn();
                refresh.write(RefreshNeighbors { entity: target });
                designations.write(RailDesignationUpdate { entity: target });
                merged += 1;
            }
        }
    }

    info!("committed rail chain: {built} built, {merged} merged");
    feedback.write(ToolFeedback {
        message: format!("laid {} rail piece(s)", built + merged),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_walk_terminates_with_unit_compass_steps() {
        let cases = [
            (IVec2::new(0, 0), IVec2::new(5, 0)),
            (IVec2::new(0, 0), IVec2::new(3, 7)),
            (IVec2::new(4, 4), IVec2::new(-6, 2)),
            (IVec2::new(0, 0), IVec2::new(0, 0)),
        ];
        for (start, destination) in cases {
            let path = greedy_path(start, destination);
            assert!(path.len() <= MAX_PATH_LEN);
            assert_eq!(path[0], start);
            assert_eq!(*path.last().unwrap(), destination);
            for pair in path.windows(2) {
                assert!(CompassOrientation::from_offset(pair[1] - pair[0]).is_some());
            }
        }
    }

    #[test]
    fn greedy_walk_truncates_at_the_cap() {
        let path = greedy_path(IVec2::ZERO, IVec2::new(500, 0));
        assert_eq!(path.len(), MAX_PATH_LEN);
        assert_eq!(*path.last().unwrap(), IVec2::new(99, 0));
    }

    #[test]
    fn straight_drag_plans_straight_pieces() {
        let catalog = PieceCatalog::standard();
        let path = greedy_path(IVec2::ZERO, IVec2::new(0, 4));
        let planned = plan_chain(&catalog, &path, 1, None, None);
        assert_eq!(planned.len(), 5);
        for entry in &planned {
            assert_eq!(entry.piece.piece, "straight");
            assert_eq!(entry.piece.orientation, Orientation::North);
            assert!(!entry.filler);
        }
    }

    #[test]
    fn diagonal_waypoints_gain_two_fillers() {
        let catalog = PieceCatalog::standard();
        let path = greedy_path(IVec2::ZERO, IVec2::new(3, 3));
        let planned = plan_chain(&catalog, &path, 1, None, None);
        let fillers = planned.iter().filter(|entry| entry.filler).count();
        let junctions = planned.iter().filter(|entry| !entry.filler).count();
        assert_eq!(junctions, 4);
        assert_eq!(fillers, junctions * 2);
        for filler in planned.iter().filter(|entry| entry.filler) {
            assert_eq!(filler.piece.piece, DIAG_EDGE_PIECE);
        }
    }

    #[test]
    fn unsatisfiable_waypoint_truncates_without_backtracking() {
        // A catalog with only straight pieces cannot serve the corner the
        // dog-leg path needs.
        let catalog = PieceCatalog::new(vec![
            PieceDefinition {
                name: "straight".to_string(),
                shape: crate::rail::pieces::Shape::Flat,
                connections: vec![],
                compass_connections: vec![CompassConnection::new(
                    CompassOrientation::South,
                    CompassOrientation::North,
                )],
                auto_slope: false,
                spline_points: vec![],
            },
        ]);
        let path = vec![
            IVec2::new(0, 0),
            IVec2::new(0, 1),
            IVec2::new(0, 2),
            IVec2::new(1, 2),
        ];
        let planned = plan_chain(&catalog, &path, 1, None, None);
        // Waypoints 0 and 1 run straight; waypoint 2 needs a corner and
        // cuts the chain.
        assert_eq!(planned.len(), 2);
    }

    #[test]
    fn entrance_override_rotates_to_the_nearest_servable_direction() {
        let catalog = PieceCatalog::standard();
        // Path heads North, so the default entrance is South.
        let rotated = cycle_override(
            &catalog,
            CompassOrientation::South,
            CompassOrientation::North,
            RotateDirection::Right,
        );
        assert_ne!(rotated, CompassOrientation::South);
        assert!(find_piece(&catalog, CompassConnection::new(rotated, CompassOrientation::North))
            .is_some());
    }

    #[test]
    fn exit_override_rotates_to_the_nearest_servable_direction() {
        let catalog = PieceCatalog::standard();
        // Path heads North, so the last waypoint's incoming side is South
        // and the default exit is North.
        let rotated = cycle_override(
            &catalog,
            CompassOrientation::North,
            CompassOrientation::South,
            RotateDirection::Right,
        );
        assert_ne!(rotated, CompassOrientation::North);
        assert!(find_piece(&catalog, CompassConnection::new(CompassOrientation::South, rotated))
            .is_some());
    }

    #[test]
    fn exit_override_replaces_the_last_waypoint_outgoing() {
        let path = vec![IVec2::new(0, 0), IVec2::new(0, 1), IVec2::new(0, 2)];
        let requirements =
            connection_requirements(&path, None, Some(CompassOrientation::NorthEast));
        assert!(requirements[2].matches(CompassConnection::new(
            CompassOrientation::South,
            CompassOrientation::NorthEast,
        )));
        // Interior waypoints keep their neighbor deltas.
        assert!(requirements[1].matches(CompassConnection::new(
            CompassOrientation::South,
            CompassOrientation::North,
        )));

        let catalog = PieceCatalog::standard();
        let planned =
            plan_chain(&catalog, &path, 1, None, Some(CompassOrientation::NorthEast));
        let last = planned.iter().filter(|entry| !entry.filler).last().unwrap();
        assert_eq!(last.piece.piece, "curve-diag");
    }

    #[test]
    fn pattern_chain_repeats_a_siding_along_the_drag() {
        let library = PatternLibrary::standard();
        let planned =
            plan_pattern_chain(&library, "siding", IVec2::ZERO, IVec2::new(0, 5), 1);
        // The siding spans two cells of travel, so three stampings fit in
        // six cells. Four pieces each.
        assert_eq!(planned.len(), 12);
        let tees: Vec<_> = planned
            .iter()
            .filter(|entry| entry.piece.piece == "tee")
            .map(|entry| entry.voxel)
            .collect();
        assert_eq!(
            tees,
            vec![IVec3::new(0, 1, 0), IVec3::new(0, 1, 2), IVec3::new(0, 1, 4)]
        );
    }

    #[test]
    fn pattern_chain_stops_at_the_destination() {
        let library = PatternLibrary::standard();
        let planned =
            plan_pattern_chain(&library, "crossing", IVec2::ZERO, IVec2::new(3, 0), 1);
        // One single-cell crossing per cell, inclusive of both endpoints.
        assert_eq!(planned.len(), 4);
        assert!(planned.iter().all(|entry| entry.piece.piece == "cross"));
        assert!(plan_pattern_chain(&library, "turntable", IVec2::ZERO, IVec2::new(3, 0), 1)
            .is_empty());
    }

    #[test]
    fn requirements_use_neighbor_deltas_and_default_endpoints() {
        let path = vec![IVec2::new(0, 0), IVec2::new(0, 1), IVec2::new(1, 1)];
        let requirements = connection_requirements(&path, None, None);
        assert_eq!(requirements.len(), 3);
        assert!(requirements[0].matches(CompassConnection::new(
            CompassOrientation::South,
            CompassOrientation::North,
        )));
        assert!(requirements[1].matches(CompassConnection::new(
            CompassOrientation::South,
            CompassOrientation::East,
        )));
        assert!(requirements[2].matches(CompassConnection::new(
            CompassOrientation::West,
            CompassOrientation::East,
        )));
    }
}
