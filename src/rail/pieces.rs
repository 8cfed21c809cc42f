use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::orientation::{CompassOrientation, Orientation};

/// Vertical profile of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    Flat,
    SlopeUp,
    SlopeDown,
}

/// Entrance/exit endpoints of one traversal through a piece, in piece-local
/// space (x East, y up, z North; the piece occupies the unit cube around the
/// origin).
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct ConnectionPair {
    pub entrance: Vec3,
    pub exit: Vec3,
}

impl ConnectionPair {
    pub fn new(entrance: Vec3, exit: Vec3) -> Self {
        Self { entrance, exit }
    }
}

/// Pair of compass directions a piece serves in its canonical (North)
/// orientation. Matching is polarity-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct CompassConnection {
    pub a: CompassOrientation,
    pub b: CompassOrientation,
}

impl CompassConnection {
    pub fn new(a: CompassOrientation, b: CompassOrientation) -> Self {
        Self { a, b }
    }

    /// Rotate both ends clockwise by `n` eighth turns
    pub fn rotated(self, n: u8) -> Self {
        Self::new(self.a.rotate(n), self.b.rotate(n))
    }

    /// Rotate both ends by a cardinal piece orientation (two eighth turns
    /// per quarter turn)
    pub fn rotated_by(self, orientation: Orientation) -> Self {
        self.rotated(orientation.index() * 2)
    }

    pub fn matches(self, other: Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }

    pub fn has_diagonal(self) -> bool {
        self.a.is_diagonal() || self.b.is_diagonal()
    }
}

/// Immutable definition of one track piece, identified by name
#[derive(Debug, Clone, Serialize, Deserialize, Reflect)]
pub struct PieceDefinition {
    pub name: String,
    pub shape: Shape,
    pub connections: Vec<ConnectionPair>,
    pub compass_connections: Vec<CompassConnection>,
    pub auto_slope: bool,
    /// Rail-curve control points, one list per traversal. Owned by mesh
    /// generation; stored here only as geometry data.
    pub spline_points: Vec<Vec<Vec3>>,
}

impl PieceDefinition {
    fn flat(name: &str, connections: Vec<ConnectionPair>, compass: Vec<CompassConnection>) -> Self {
        let spline_points = connections
            .iter()
            .map(|pair| vec![pair.entrance, pair.entrance.midpoint(pair.exit), pair.exit])
            .collect();
        Self {
            name: name.to_string(),
            shape: Shape::Flat,
            connections,
            compass_connections: compass,
            auto_slope: false,
            spline_points,
        }
    }
}

/// Rotate a piece-local point about the vertical axis by `90° × orientation`,
/// clockwise when viewed from above (North maps onto East after one turn).
pub fn rotate_point(point: Vec3, orientation: Orientation) -> Vec3 {
    let mut p = point;
    for _ in 0..orientation.index() {
        p = Vec3::new(p.z, p.y, -p.x);
    }
    p
}

/// Registry of every known piece definition, with the rotated connection
/// endpoints precomputed for all four instance orientations.
#[derive(Resource, Debug, Clone)]
pub struct PieceCatalog {
    pieces: Vec<PieceDefinition>,
    rotated_connections: Vec<[Vec<ConnectionPair>; 4]>,
}

impl PieceCatalog {
    pub fn new(pieces: Vec<PieceDefinition>) -> Self {
        let rotated_connections = pieces
            .iter()
            .map(|piece| {
                Orientation::ALL.map(|orientation| {
                    piece
                        .connections
                        .iter()
                        .map(|pair| {
                            ConnectionPair::new(
                                rotate_point(pair.entrance, orientation),
                                rotate_point(pair.exit, orientation),
                            )
                        })
                        .collect()
                })
            })
            .collect();
        Self {
            pieces,
            rotated_connections,
        }
    }

    /// The authored piece set
    pub fn standard() -> Self {
        use CompassOrientation::*;
        let south = Vec3::new(0.0, 0.0, -0.5);
        let north = Vec3::new(0.0, 0.0, 0.5);
        let east = Vec3::new(0.5, 0.0, 0.0);
        let west = Vec3::new(-0.5, 0.0, 0.0);
        let south_west = Vec3::new(-0.5, 0.0, -0.5);
        let north_east = Vec3::new(0.5, 0.0, 0.5);
        let north_west = Vec3::new(-0.5, 0.0, 0.5);

        let mut pieces = vec![
            PieceDefinition::flat(
                "straight",
                vec![ConnectionPair::new(south, north)],
                vec![CompassConnection::new(South, North)],
            ),
            PieceDefinition::flat(
                "curve",
                vec![ConnectionPair::new(south, east)],
                vec![CompassConnection::new(South, East)],
            ),
            PieceDefinition::flat(
                "diag",
                vec![ConnectionPair::new(south_west, north_east)],
                vec![CompassConnection::new(SouthWest, NorthEast)],
            ),
            PieceDefinition::flat(
                "diag-turn",
                vec![ConnectionPair::new(south_west, north_west)],
                vec![CompassConnection::new(SouthWest, NorthWest)],
            ),
            PieceDefinition::flat(
                "curve-diag",
                vec![ConnectionPair::new(south, north_east)],
                vec![CompassConnection::new(South, NorthEast)],
            ),
            PieceDefinition::flat(
                "curve-diag-left",
                vec![ConnectionPair::new(south, north_west)],
                vec![CompassConnection::new(South, NorthWest)],
            ),
            PieceDefinition::flat(
                "cross",
                vec![
                    ConnectionPair::new(south, north),
                    ConnectionPair::new(west, east),
                ],
                vec![
                    CompassConnection::new(South, North),
                    CompassConnection::new(West, East),
                ],
            ),
            PieceDefinition::flat(
                "tee",
                vec![
                    ConnectionPair::new(south, north),
                    ConnectionPair::new(south, east),
                ],
                vec![
                    CompassConnection::new(South, North),
                    CompassConnection::new(South, East),
                ],
            ),
            // Corner patch flanking a diagonal junction; takes no part in
            // compass matching or neighbor discovery.
            PieceDefinition::flat("diag-edge", vec![], vec![]),
        ];

        let mut slope = PieceDefinition::flat(
            "slope",
            vec![ConnectionPair::new(south, north)],
            vec![CompassConnection::new(South, North)],
        );
        slope.shape = Shape::SlopeUp;
        slope.auto_slope = true;
        pieces.push(slope);

        Self::new(pieces)
    }

    /// Linear scan by name; the catalog holds tens of entries. `None` means
    /// the piece is unknown and the caller must skip or abort.
    pub fn get(&self, name: &str) -> Option<&PieceDefinition> {
        self.pieces.iter().find(|piece| piece.name == name)
    }

    /// Precomputed local connection endpoints for a piece at the given
    /// instance orientation
    pub fn connections(&self, name: &str, orientation: Orientation) -> Option<&[ConnectionPair]> {
        let index = self.pieces.iter().position(|piece| piece.name == name)?;
        Some(&self.rotated_connections[index][orientation.index() as usize])
    }

    pub fn pieces(&self) -> &[PieceDefinition] {
        &self.pieces
    }
}

impl Default for PieceCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_point_turns_north_onto_east() {
        let north = Vec3::new(0.0, 0.0, 0.5);
        assert_eq!(rotate_point(north, Orientation::East), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(rotate_point(north, Orientation::South), Vec3::new(0.0, 0.0, -0.5));
        assert_eq!(rotate_point(north, Orientation::West), Vec3::new(-0.5, 0.0, 0.0));
        assert_eq!(rotate_point(north, Orientation::North), north);
    }

    #[test]
    fn unknown_piece_lookup_returns_none() {
        let catalog = PieceCatalog::standard();
        assert!(catalog.get("monorail").is_none());
        assert!(catalog.connections("monorail", Orientation::North).is_none());
    }

    #[test]
    fn precomputed_connections_match_rotated_locals() {
        let catalog = PieceCatalog::standard();
        let straight = catalog.get("straight").unwrap().clone();
        for orientation in Orientation::ALL {
            let rotated = catalog.connections("straight", orientation).unwrap();
            assert_eq!(rotated.len(), straight.connections.len());
            for (pair, local) in rotated.iter().zip(&straight.connections) {
                assert_eq!(pair.entrance, rotate_point(local.entrance, orientation));
                assert_eq!(pair.exit, rotate_point(local.exit, orientation));
            }
        }
    }

    #[test]
    fn compass_connection_matching_ignores_polarity() {
        use CompassOrientation::*;
        let forward = CompassConnection::new(South, East);
        let backward = CompassConnection::new(East, South);
        assert!(forward.matches(backward));
        assert!(!forward.matches(CompassConnection::new(South, West)));
    }

    #[test]
    fn curve_rotations_cover_all_four_corners() {
        use CompassOrientation::*;
        let curve = CompassConnection::new(South, East);
        let corners = [
            CompassConnection::new(South, East),
            CompassConnection::new(West, South),
            CompassConnection::new(North, West),
            CompassConnection::new(East, North),
        ];
        for (turns, expected) in corners.into_iter().enumerate() {
            assert!(curve.rotated_by(Orientation::from_index(turns as u8)).matches(expected));
        }
    }
}
