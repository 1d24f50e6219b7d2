//! Fixed-size exploration regions with aggregate walkable weights.

use wavefarm_core::Vec2;

use crate::grid::WalkabilityGrid;

/// Column and row of a chunk within the chunk index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    column: u32,
    row: u32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based chunk column.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based chunk row.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Fixed-size grid region used to score exploration targets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chunk {
    coord: ChunkCoord,
    position: Vec2,
    weight: u32,
    revealed: bool,
}

impl Chunk {
    /// Coordinate of the chunk inside the index.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Grid-space anchor of the chunk, half a resolution past its start corner.
    ///
    /// Truncated chunks on the far edges keep the same offset, so their
    /// anchor may sit outside the grid.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Number of walkable cells inside the chunk bounds.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Whether the chunk has already been seen.
    #[must_use]
    pub const fn is_revealed(&self) -> bool {
        self.revealed
    }
}

/// Partition of the walkability grid into square chunks.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkIndex {
    resolution: u32,
    columns: u32,
    rows: u32,
    chunks: Vec<Chunk>,
}

impl ChunkIndex {
    /// Partitions the grid into chunks of `resolution` cells per side.
    ///
    /// A zero resolution is treated as one.
    #[must_use]
    pub fn build(grid: &WalkabilityGrid, resolution: u32) -> Self {
        let resolution = resolution.max(1);
        let columns = grid.width().div_ceil(resolution);
        let rows = grid.height().div_ceil(resolution);
        let half = resolution as f32 / 2.0;

        let mut chunks = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                let start_x = column * resolution;
                let start_y = row * resolution;
                let weight = grid.walkable_in(
                    start_x..start_x.saturating_add(resolution),
                    start_y..start_y.saturating_add(resolution),
                );
                chunks.push(Chunk {
                    coord: ChunkCoord::new(column, row),
                    position: Vec2::new(start_x as f32 + half, start_y as f32 + half),
                    weight,
                    revealed: false,
                });
            }
        }

        Self {
            resolution,
            columns,
            rows,
            chunks,
        }
    }

    /// Side length of a chunk in cells.
    #[must_use]
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Number of chunk columns and rows.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Iterator over every chunk in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Chunk stored at the coordinate.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.offset(coord).and_then(|offset| self.chunks.get(offset))
    }

    /// Marks a chunk as seen or unseen; returns whether the coordinate exists.
    pub fn set_revealed(&mut self, coord: ChunkCoord, revealed: bool) -> bool {
        match self.offset(coord).and_then(|offset| self.chunks.get_mut(offset)) {
            Some(chunk) => {
                chunk.revealed = revealed;
                true
            }
            None => false,
        }
    }

    /// Reveals every chunk whose anchor lies strictly within `radius` of `position`.
    ///
    /// Returns the number of chunks that were newly revealed.
    pub fn reveal_within(&mut self, position: Vec2, radius: f32) -> usize {
        let mut revealed = 0;
        for chunk in &mut self.chunks {
            if !chunk.revealed && chunk.position.distance(position) < radius {
                chunk.revealed = true;
                revealed += 1;
            }
        }
        revealed
    }

    /// Sum of weights of unrevealed chunks whose anchor lies strictly within
    /// `view_distance` of `position`.
    #[must_use]
    pub fn explore_score(&self, position: Vec2, view_distance: f32) -> u64 {
        self.chunks
            .iter()
            .filter(|chunk| !chunk.revealed && chunk.position.distance(position) < view_distance)
            .map(|chunk| u64::from(chunk.weight))
            .sum()
    }

    /// Share of positive-weight chunks already revealed.
    ///
    /// Chunks without walkable cells are ignored entirely; an index without
    /// any positive-weight chunk counts as fully explored.
    #[must_use]
    pub fn completeness(&self) -> f64 {
        let mut total = 0_u32;
        let mut revealed = 0_u32;
        for chunk in self.chunks.iter().filter(|chunk| chunk.weight > 0) {
            total += 1;
            if chunk.revealed {
                revealed += 1;
            }
        }

        if total == 0 {
            1.0
        } else {
            f64::from(revealed) / f64::from(total)
        }
    }

    fn offset(&self, coord: ChunkCoord) -> Option<usize> {
        if coord.column >= self.columns || coord.row >= self.rows {
            return None;
        }
        let columns = usize::try_from(self.columns).ok()?;
        let column = usize::try_from(coord.column).ok()?;
        let row = usize::try_from(coord.row).ok()?;
        row.checked_mul(columns)?.checked_add(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> WalkabilityGrid {
        WalkabilityGrid::from_ascii(
            "
            ..#..
            ..#..
            #####
            ..#.#
            ",
        )
    }

    #[test]
    fn region_counts_round_up_and_truncate_edges() {
        let index = ChunkIndex::build(&grid(), 2);

        assert_eq!(index.dimensions(), (3, 2));
        let weights: Vec<u32> = index.iter().map(Chunk::weight).collect();
        assert_eq!(weights, vec![4, 2, 2, 2, 1, 0]);
    }

    #[test]
    fn truncated_chunks_keep_half_resolution_offset() {
        let index = ChunkIndex::build(&grid(), 2);
        let edge = index.get(ChunkCoord::new(2, 1)).copied();

        assert_eq!(edge.map(|chunk| chunk.position()), Some(Vec2::new(5.0, 3.0)));
    }

    #[test]
    fn explore_score_sums_unrevealed_weights_in_view() {
        let mut index = ChunkIndex::build(&grid(), 2);

        assert_eq!(index.explore_score(Vec2::new(1.0, 1.0), 2.5), 4 + 2 + 2);
        assert!(index.set_revealed(ChunkCoord::new(0, 0), true));
        assert_eq!(index.explore_score(Vec2::new(1.0, 1.0), 2.5), 2 + 2);
        assert_eq!(index.explore_score(Vec2::new(1.0, 1.0), 0.5), 0);
    }

    #[test]
    fn explore_score_excludes_chunks_on_the_view_boundary() {
        let index = ChunkIndex::build(&grid(), 2);
        assert_eq!(index.explore_score(Vec2::new(1.0, 1.0), 2.0), 4);
    }

    #[test]
    fn completeness_ignores_zero_weight_chunks_and_is_monotonic() {
        let mut index = ChunkIndex::build(&grid(), 2);
        assert_eq!(index.completeness(), 0.0);

        assert!(index.set_revealed(ChunkCoord::new(2, 1), true));
        assert_eq!(index.completeness(), 0.0);

        let order = [
            ChunkCoord::new(1, 1),
            ChunkCoord::new(2, 0),
            ChunkCoord::new(0, 0),
            ChunkCoord::new(1, 0),
            ChunkCoord::new(0, 1),
        ];
        let mut previous = index.completeness();
        for coord in order {
            assert!(index.set_revealed(coord, true));
            let current = index.completeness();
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn completeness_without_walkable_cells_is_full() {
        let walls = WalkabilityGrid::from_ascii("###\n###");
        assert_eq!(ChunkIndex::build(&walls, 2).completeness(), 1.0);
    }

    #[test]
    fn reveal_within_counts_new_reveals_only() {
        let mut index = ChunkIndex::build(&grid(), 2);

        assert_eq!(index.reveal_within(Vec2::new(1.0, 1.0), 1.0), 1);
        assert_eq!(index.reveal_within(Vec2::new(1.0, 1.0), 1.0), 0);
        assert!(!index.set_revealed(ChunkCoord::new(9, 9), true));
    }
}
