use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::orientation::Orientation;

/// Where a chainable pattern is entered or left: a facing plus a 2D offset
/// from the pattern origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct Portal {
    pub direction: Orientation,
    pub offset: IVec2,
}

/// One piece of a multi-piece layout, offset from the pattern origin
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct JunctionPiece {
    pub offset: IVec2,
    pub piece: String,
    pub orientation: Orientation,
}

impl JunctionPiece {
    pub fn new(offset: IVec2, piece: &str, orientation: Orientation) -> Self {
        Self {
            offset,
            piece: piece.to_string(),
            orientation,
        }
    }
}

/// Rotate a grid offset clockwise by `n` quarter turns (+y North onto +x East)
pub fn rotate_offset(offset: IVec2, n: u8) -> IVec2 {
    let mut p = offset;
    for _ in 0..(n % Orientation::COUNT) {
        p = IVec2::new(p.y, -p.x);
    }
    p
}

/// A named multi-piece layout. Patterns carrying both portals are eligible
/// for chaining by the path planner.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub struct JunctionPattern {
    pub name: String,
    pub pieces: Vec<JunctionPiece>,
    pub entrance: Option<Portal>,
    pub exit: Option<Portal>,
}

impl JunctionPattern {
    /// Rotate the whole layout clockwise by `n` quarter turns about the
    /// pattern origin
    pub fn rotated(&self, n: u8) -> Self {
        let rotate_portal = |portal: &Option<Portal>| {
            portal.map(|p| Portal {
                direction: p.direction.rotate(n),
                offset: rotate_offset(p.offset, n),
            })
        };
        Self {
            name: self.name.clone(),
            pieces: self
                .pieces
                .iter()
                .map(|piece| JunctionPiece {
                    offset: rotate_offset(piece.offset, n),
                    piece: piece.piece.clone(),
                    orientation: piece.orientation.rotate(n),
                })
                .collect(),
            entrance: rotate_portal(&self.entrance),
            exit: rotate_portal(&self.exit),
        }
    }

    /// The same layout traversed the other way round
    pub fn with_swapped_portals(&self) -> Self {
        Self {
            name: self.name.clone(),
            pieces: self.pieces.clone(),
            entrance: self.exit,
            exit: self.entrance,
        }
    }

    /// Shift every piece and portal so the entrance sits at the origin.
    /// Identity for patterns without an entrance.
    pub fn normalized(&self) -> Self {
        let Some(entrance) = self.entrance else {
            return self.clone();
        };
        let shift = entrance.offset;
        Self {
            name: self.name.clone(),
            pieces: self
                .pieces
                .iter()
                .map(|piece| JunctionPiece {
                    offset: piece.offset - shift,
                    piece: piece.piece.clone(),
                    orientation: piece.orientation,
                })
                .collect(),
            entrance: Some(Portal {
                direction: entrance.direction,
                offset: IVec2::ZERO,
            }),
            exit: self.exit.map(|p| Portal {
                direction: p.direction,
                offset: p.offset - shift,
            }),
        }
    }
}

/// Authored patterns plus the pre-expanded chain patterns the path planner
/// searches. Expanding every rotation and traversal polarity up front means
/// layout-time lookups never rotate patterns on the fly.
#[derive(Resource, Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<JunctionPattern>,
    chain_patterns: Vec<JunctionPattern>,
}

impl PatternLibrary {
    pub fn new(patterns: Vec<JunctionPattern>) -> Self {
        let mut chain_patterns = Vec::new();
        for pattern in &patterns {
            if pattern.entrance.is_none() || pattern.exit.is_none() {
                continue;
            }
            for n in 0..Orientation::COUNT {
                let rotated = pattern.rotated(n);
                chain_patterns.push(rotated.normalized());
                chain_patterns.push(rotated.with_swapped_portals().normalized());
            }
        }
        Self {
            patterns,
            chain_patterns,
        }
    }

    /// The authored pattern set
    pub fn standard() -> Self {
        Self::new(vec![
            JunctionPattern {
                name: "siding".to_string(),
                pieces: vec![
                    JunctionPiece::new(IVec2::new(0, 0), "tee", Orientation::North),
                    JunctionPiece::new(IVec2::new(1, 0), "curve", Orientation::West),
                    JunctionPiece::new(IVec2::new(0, 1), "straight", Orientation::North),
                    JunctionPiece::new(IVec2::new(1, 1), "straight", Orientation::North),
                ],
                entrance: Some(Portal {
                    direction: Orientation::South,
                    offset: IVec2::new(0, 0),
                }),
                exit: Some(Portal {
                    direction: Orientation::North,
                    offset: IVec2::new(0, 1),
                }),
            },
            JunctionPattern {
                name: "crossing".to_string(),
                pieces: vec![JunctionPiece::new(IVec2::new(0, 0), "cross", Orientation::North)],
                entrance: Some(Portal {
                    direction: Orientation::South,
                    offset: IVec2::new(0, 0),
                }),
                exit: Some(Portal {
                    direction: Orientation::North,
                    offset: IVec2::new(0, 0),
                }),
            },
            // Decorative, not chainable: no portals.
            JunctionPattern {
                name: "turntable".to_string(),
                pieces: vec![
                    JunctionPiece::new(IVec2::new(0, 0), "cross", Orientation::North),
                    JunctionPiece::new(IVec2::new(0, 1), "straight", Orientation::North),
                    JunctionPiece::new(IVec2::new(0, -1), "straight", Orientation::North),
                    JunctionPiece::new(IVec2::new(1, 0), "straight", Orientation::East),
                    JunctionPiece::new(IVec2::new(-1, 0), "straight", Orientation::East),
                ],
                entrance: None,
                exit: None,
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&JunctionPattern> {
        self.patterns.iter().find(|pattern| pattern.name == name)
    }

    pub fn patterns(&self) -> &[JunctionPattern] {
        &self.patterns
    }

    pub fn chain_patterns(&self) -> &[JunctionPattern] {
        &self.chain_patterns
    }

    /// First pre-expanded variant of the named pattern whose entrance faces
    /// `direction`. Because every rotation and polarity was emitted up
    /// front, this is a plain scan with no on-the-fly rotation.
    pub fn chain_for_entrance(
        &self,
        name: &str,
        direction: Orientation,
    ) -> Option<&JunctionPattern> {
        self.chain_patterns.iter().find(|pattern| {
            pattern.name == name && pattern.entrance.is_some_and(|p| p.direction == direction)
        })
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_rotations_restore_a_chain_pattern() {
        let library = PatternLibrary::standard();
        assert!(!library.chain_patterns().is_empty());
        for pattern in library.chain_patterns() {
            let full_turn = pattern.rotated(1).rotated(1).rotated(1).rotated(1);
            assert_eq!(&full_turn, pattern);
        }
    }

    #[test]
    fn chain_patterns_have_entrance_at_origin() {
        let library = PatternLibrary::standard();
        for pattern in library.chain_patterns() {
            let entrance = pattern.entrance.expect("chain patterns keep portals");
            assert_eq!(entrance.offset, IVec2::ZERO);
            assert!(pattern.exit.is_some());
        }
    }

    #[test]
    fn chain_expansion_covers_rotations_and_both_polarities() {
        let library = PatternLibrary::standard();
        let chainable = library
            .patterns()
            .iter()
            .filter(|p| p.entrance.is_some() && p.exit.is_some())
            .count();
        assert_eq!(library.chain_patterns().len(), chainable * 4 * 2);
        // The decorative pattern contributes nothing.
        assert!(library.get("turntable").is_some());
    }

    #[test]
    fn chain_lookup_finds_every_entrance_facing() {
        let library = PatternLibrary::standard();
        for name in ["siding", "crossing"] {
            for direction in Orientation::ALL {
                let pattern = library
                    .chain_for_entrance(name, direction)
                    .expect("expanded set covers all four facings");
                assert_eq!(pattern.name, name);
                assert_eq!(pattern.entrance.unwrap().direction, direction);
                assert_eq!(pattern.entrance.unwrap().offset, IVec2::ZERO);
            }
        }
        assert!(library.chain_for_entrance("turntable", Orientation::North).is_none());
    }

    #[test]
    fn rotation_turns_offsets_with_orientations() {
        let pattern = PatternLibrary::standard().get("siding").unwrap().clone();
        let rotated = pattern.rotated(1);
        // (0, 1) faces North; one clockwise turn puts it East at (1, 0).
        let straight = rotated
            .pieces
            .iter()
            .find(|p| p.offset == IVec2::new(1, 0) && p.piece == "straight")
            .expect("rotated straight piece");
        assert_eq!(straight.orientation, Orientation::East);
        assert_eq!(rotated.entrance.unwrap().direction, Orientation::West);
    }
}
