use bevy::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

use super::messages::{RefreshNeighbors, RemoveRail};
use super::orientation::Orientation;
use super::patterns::JunctionPiece;
use super::pieces::PieceCatalog;

/// Two endpoints closer than this (squared) are considered the same
/// connection point.
pub const CONNECTION_TOLERANCE_SQ: f32 = 0.01;

/// A discovered adjacency to another placed instance at a shared world
/// connection point. `raised` marks the auto-slope end that sits one voxel
/// above its neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct NeighborEdge {
    pub neighbor: Entity,
    pub world_point: Vec3,
    pub raised: bool,
}

/// A placed track entity. The instance owns its edge list; edges name
/// neighbors by `Entity` and are resolved lazily, so a despawned neighbor
/// simply fails the lookup and counts as detached.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct RailInstance {
    pub voxel: IVec3,
    pub piece: JunctionPiece,
    pub neighbors: Vec<NeighborEdge>,
}

impl RailInstance {
    pub fn new(voxel: IVec3, piece: &str, orientation: Orientation) -> Self {
        Self {
            voxel,
            piece: JunctionPiece::new(IVec2::ZERO, piece, orientation),
            neighbors: Vec::new(),
        }
    }

    /// World-space connection endpoints: piece-local connections rotated by
    /// the instance orientation, then offset to the instance voxel. Empty
    /// when the piece is unknown.
    pub fn world_endpoints(&self, catalog: &PieceCatalog) -> Vec<Vec3> {
        let Some(pairs) = catalog.connections(&self.piece.piece, self.piece.orientation) else {
            return Vec::new();
        };
        let center = self.voxel.as_vec3();
        pairs
            .iter()
            .flat_map(|pair| [center + pair.entrance, center + pair.exit])
            .collect()
    }
}

/// Marker for planner previews that have not been committed yet
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct Preview;

struct Candidate {
    entity: Entity,
    points: Vec<Vec3>,
    auto_slope: bool,
}

/// Rebuild the neighbor edges of every instance named in a
/// [`RefreshNeighbors`] message. Detach and reattach happen back-to-back
/// within this system, so observers never see the instance half-linked.
pub fn refresh_neighbor_edges(
    mut events: MessageReader<RefreshNeighbors>,
    catalog: Res<PieceCatalog>,
    mut rails: Query<(Entity, &mut RailInstance), Without<Preview>>,
) {
    for event in events.read() {
        let entity = event.entity;
        let Ok((_, instance)) = rails.get(entity) else {
            continue;
        };

        // Detach from all current neighbors before rescanning.
        let old_neighbors: Vec<Entity> =
            instance.neighbors.iter().map(|edge| edge.neighbor).collect();
        for neighbor in old_neighbors {
            if let Ok((_, mut other)) = rails.get_mut(neighbor) {
                other.neighbors.retain(|edge| edge.neighbor != entity);
            }
        }
        if let Ok((_, mut me)) = rails.get_mut(entity) {
            me.neighbors.clear();
        }

        let Ok((_, instance)) = rails.get(entity) else {
            continue;
        };
        let voxel = instance.voxel;
        let own_points = instance.world_endpoints(&catalog);
        // Endpoints come in entrance/exit pairs.
        debug_assert!(own_points.len() % 2 == 0);
        let self_slopes = catalog
            .get(&instance.piece.piece)
            .is_some_and(|piece| piece.auto_slope);

        // Candidates within a one-voxel margin of the instance, sorted by
        // entity id so attachment order is deterministic.
        let mut candidates: Vec<Candidate> = rails
            .iter()
            .filter(|(other, inst)| {
                *other != entity && (inst.voxel - voxel).abs().max_element() <= 1
            })
            .map(|(other, inst)| Candidate {
                entity: other,
                points: inst.world_endpoints(&catalog),
                auto_slope: catalog
                    .get(&inst.piece.piece)
                    .is_some_and(|piece| piece.auto_slope),
            })
            .collect();
        candidates.sort_by_key(|candidate| candidate.entity);

        let mut own_edges: Vec<NeighborEdge> = Vec::new();
        let mut remote_edges: Vec<(Entity, NeighborEdge)> = Vec::new();

        // First match wins per own endpoint; no multi-attachment.
        'own: for &point in &own_points {
            for candidate in &candidates {
                for &other_point in &candidate.points {
                    if point.distance_squared(other_point) < CONNECTION_TOLERANCE_SQ {
                        own_edges.push(NeighborEdge {
                            neighbor: candidate.entity,
                            world_point: point,
                            raised: false,
                        });
                        remote_edges.push((
                            candidate.entity,
                            NeighborEdge {
                                neighbor: entity,
                                world_point: point,
                                raised: false,
                            },
                        ));
                        continue 'own;
                    }
                }
                if self_slopes {
                    let raised = point + Vec3::Y;
                    for &other_point in &candidate.points {
                        if raised.distance_squared(other_point) < CONNECTION_TOLERANCE_SQ {
                            own_edges.push(NeighborEdge {
                                neighbor: candidate.entity,
                                world_point: other_point,
                                raised: true,
                            });
                            remote_edges.push((
                                candidate.entity,
                                NeighborEdge {
                                    neighbor: entity,
                                    world_point: other_point,
                                    raised: false,
                                },
                            ));
                            continue 'own;
                        }
                    }
                }
                if candidate.auto_slope {
                    let lowered = point - Vec3::Y;
                    for &other_point in &candidate.points {
                        if lowered.distance_squared(other_point) < CONNECTION_TOLERANCE_SQ {
                            own_edges.push(NeighborEdge {
                                neighbor: candidate.entity,
                                world_point: point,
                                raised: false,
                            });
                            remote_edges.push((
                                candidate.entity,
                                NeighborEdge {
                                    neighbor: entity,
                                    world_point: point,
                                    raised: true,
                                },
                            ));
                            continue 'own;
                        }
                    }
                }
            }
        }

        debug!(
            "rail {:?} at {} reattached with {} neighbor edge(s)",
            entity,
            voxel,
            own_edges.len()
        );

        if let Ok((_, mut me)) = rails.get_mut(entity) {
            me.neighbors = own_edges;
        }
        for (other, edge) in remote_edges {
            if let Ok((_, mut other_instance)) = rails.get_mut(other) {
                other_instance.neighbors.push(edge);
            }
        }
    }
}

/// Tear down instances named in [`RemoveRail`] messages, detaching their
/// neighbors first so no edge keeps pointing at the despawned entity.
pub fn remove_rail(
    mut commands: Commands,
    mut events: MessageReader<RemoveRail>,
    mut rails: Query<&mut RailInstance>,
) {
    for event in events.read() {
        let Ok(instance) = rails.get(event.entity) else {
            continue;
        };
        let neighbors: Vec<Entity> =
            instance.neighbors.iter().map(|edge| edge.neighbor).collect();
        for neighbor in neighbors {
            if let Ok(mut other) = rails.get_mut(neighbor) {
                other.neighbors.retain(|edge| edge.neighbor != event.entity);
            }
        }
        info!("removed rail {:?}", event.entity);
        commands.entity(event.entity).despawn();
    }
}

/// Build an adjacency list over live instances. Edges whose neighbor is not
/// in the set are treated as detached and dropped.
pub fn build_rail_graph<'a>(
    rails: impl IntoIterator<Item = (Entity, &'a RailInstance)>,
) -> HashMap<Entity, Vec<Entity>> {
    let collected: Vec<(Entity, &RailInstance)> = rails.into_iter().collect();
    let live: HashSet<Entity> = collected.iter().map(|(entity, _)| *entity).collect();
    let mut graph: HashMap<Entity, Vec<Entity>> = HashMap::new();
    for (entity, instance) in collected {
        let edges = graph.entry(entity).or_default();
        for edge in &instance.neighbors {
            if live.contains(&edge.neighbor) {
                edges.push(edge.neighbor);
            }
        }
    }
    graph
}

/// All instances reachable from `start` over neighbor edges (BFS)
pub fn reachable_from(
    graph: &HashMap<Entity, Vec<Entity>>,
    start: Entity,
) -> HashSet<Entity> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();
    reachable.insert(start);
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        if let Some(neighbors) = graph.get(&current) {
            for &neighbor in neighbors {
                if reachable.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
    }
    reachable
}
