//! The set of chunk coordinates eligible for meshing and rendering this frame.

use std::collections::HashSet;

use crate::engine_state::voxels::coordinate::{coordinates_within_radius, ChunkCoordinate};

/// Coordinates within render distance of the viewpoint chunk, nearest first,
/// with constant-time membership checks.
#[derive(Debug, Clone, Default)]
pub struct VisibleSet {
    center: ChunkCoordinate,
    ordered: Vec<ChunkCoordinate>,
    members: HashSet<ChunkCoordinate>,
}

impl VisibleSet {
    /// Computes the visible set around `center` with a circular
    /// `dx² + dz² ≤ render_distance²` test.
    pub fn compute(center: ChunkCoordinate, render_distance: i32) -> Self {
        let ordered = coordinates_within_radius(center, render_distance);
        let members = ordered.iter().copied().collect();
        VisibleSet {
            center,
            ordered,
            members,
        }
    }

    /// The viewpoint chunk.
    pub fn center(&self) -> ChunkCoordinate {
        self.center
    }

    /// Whether a coordinate is visible.
    pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
        self.members.contains(&coordinate)
    }

    /// Visible coordinates, nearest first.
    pub fn as_slice(&self) -> &[ChunkCoordinate] {
        &self.ordered
    }

    /// Iterates over the visible coordinates, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
        self.ordered.iter().copied()
    }

    /// Number of visible coordinates.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_distance_two_has_thirteen_chunks() {
        let visible = VisibleSet::compute(ChunkCoordinate::new(0, 0), 2);
        assert_eq!(visible.len(), 13);

        let mut expected = Vec::new();
        for dx in -2i32..=2 {
            for dz in -2i32..=2 {
                if dx * dx + dz * dz <= 4 {
                    expected.push(ChunkCoordinate::new(dx, dz));
                }
            }
        }
        for coordinate in &expected {
            assert!(visible.contains(*coordinate));
        }

        let distances: Vec<i64> = visible
            .iter()
            .map(|c| c.distance_squared(&ChunkCoordinate::new(0, 0)))
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(visible.as_slice()[0], visible.center());
    }
}
