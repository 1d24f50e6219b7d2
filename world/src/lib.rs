#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Immutable per-area navigation context for the wave farming engine.
//!
//! An [`AreaContext`] is rebuilt from a [`TerrainSnapshot`] whenever the
//! player changes area. It owns the walkability grid, the tile feature index
//! and the exploration chunks. Only the chunk revealed flags change afterward.

mod chunks;
mod features;
mod grid;
mod navigation;

use rand::Rng;
use tracing::debug;
use wavefarm_core::{AreaInfo, CellCoord, Timestamp, Vec2};

pub use chunks::{Chunk, ChunkCoord, ChunkIndex};
pub use features::{FeatureIndex, NamedTile, NamedTiles, TileResolver};
pub use grid::{GridDimensions, WalkabilityGrid};

const NUDGE_ATTEMPTS: usize = 15;
const NUDGE_RANGE: i32 = 15;

/// Raw terrain data captured by the host when entering an area.
#[derive(Clone, Debug, Default)]
pub struct TerrainSnapshot<T> {
    /// Number of terrain tile columns.
    pub columns: u32,
    /// Number of terrain tile rows.
    pub rows: u32,
    /// Stride of the packed walkability layer in bytes.
    pub bytes_per_row: usize,
    /// Packed walkability layer, two cells per byte.
    pub walkability: Vec<u8>,
    /// Raw tile instances in row-major order.
    pub tiles: Vec<T>,
}

impl<T> TerrainSnapshot<T> {
    /// Grid dimensions implied by the tile counts.
    #[must_use]
    pub fn dimensions(&self) -> GridDimensions {
        GridDimensions::from_terrain(self.columns, self.rows)
    }
}

/// Navigation data for the area the player currently stands in.
#[derive(Clone, Debug)]
pub struct AreaContext {
    area: AreaInfo,
    built_at: Timestamp,
    grid: WalkabilityGrid,
    features: FeatureIndex,
    chunks: ChunkIndex,
}

impl AreaContext {
    /// Builds the context on the calling thread.
    #[must_use]
    pub fn build<R: TileResolver>(
        area: AreaInfo,
        terrain: &TerrainSnapshot<R::Tile>,
        resolver: &R,
        chunk_resolution: u32,
        built_at: Timestamp,
    ) -> Self {
        let features = FeatureIndex::build(&terrain.tiles, terrain.columns, resolver);
        Self::assemble(area, terrain, features, chunk_resolution, built_at)
    }

    /// Builds the context with the feature index resolved in parallel.
    #[must_use]
    pub fn build_parallel<R: TileResolver>(
        area: AreaInfo,
        terrain: &TerrainSnapshot<R::Tile>,
        resolver: &R,
        chunk_resolution: u32,
        built_at: Timestamp,
    ) -> Self {
        let features = FeatureIndex::build_parallel(&terrain.tiles, terrain.columns, resolver);
        Self::assemble(area, terrain, features, chunk_resolution, built_at)
    }

    /// Wraps an already decoded grid without any tile features.
    #[must_use]
    pub fn from_grid(
        area: AreaInfo,
        grid: WalkabilityGrid,
        chunk_resolution: u32,
        built_at: Timestamp,
    ) -> Self {
        let chunks = ChunkIndex::build(&grid, chunk_resolution);
        Self {
            area,
            built_at,
            grid,
            features: FeatureIndex::default(),
            chunks,
        }
    }

    fn assemble<T>(
        area: AreaInfo,
        terrain: &TerrainSnapshot<T>,
        features: FeatureIndex,
        chunk_resolution: u32,
        built_at: Timestamp,
    ) -> Self {
        let grid = WalkabilityGrid::decode(
            terrain.dimensions(),
            terrain.bytes_per_row,
            &terrain.walkability,
        );
        let chunks = ChunkIndex::build(&grid, chunk_resolution);
        debug!(
            area = area.hash,
            width = grid.width(),
            height = grid.height(),
            features = features.len(),
            chunks = chunks.iter().count(),
            "built area context"
        );

        Self {
            area,
            built_at,
            grid,
            features,
            chunks,
        }
    }

    /// Area the context was built for.
    #[must_use]
    pub const fn area(&self) -> AreaInfo {
        self.area
    }

    /// Clock reading at which the context was built.
    #[must_use]
    pub const fn built_at(&self) -> Timestamp {
        self.built_at
    }

    /// Walkability grid of the area.
    #[must_use]
    pub const fn grid(&self) -> &WalkabilityGrid {
        &self.grid
    }

    /// Tile feature index of the area.
    #[must_use]
    pub const fn features(&self) -> &FeatureIndex {
        &self.features
    }

    /// Exploration chunks of the area.
    #[must_use]
    pub const fn chunks(&self) -> &ChunkIndex {
        &self.chunks
    }

    /// Marks a chunk as seen or unseen; returns whether the coordinate exists.
    pub fn set_revealed(&mut self, coord: ChunkCoord, revealed: bool) -> bool {
        self.chunks.set_revealed(coord, revealed)
    }

    /// Reveals chunks anchored strictly within `radius` of `position`.
    pub fn reveal_within(&mut self, position: Vec2, radius: f32) -> usize {
        self.chunks.reveal_within(position, radius)
    }

    /// Reports whether the point's cell is walkable.
    #[must_use]
    pub fn is_walkable(&self, position: Vec2) -> bool {
        CellCoord::from_point(position).is_some_and(|cell| self.grid.is_walkable(cell))
    }

    /// First grid position recorded for a tile name, exact match first.
    #[must_use]
    pub fn find_feature(&self, name: &str) -> Option<Vec2> {
        self.features.find(name)
    }

    /// Raw waypoints of a shortest grid route between two points.
    ///
    /// Points are truncated onto their cells. When `spacing` is positive the
    /// interior cells are thinned so consecutive kept points lie at least
    /// `spacing` apart; the first and last cells are always kept.
    #[must_use]
    pub fn find_route(&self, start: Vec2, end: Vec2, spacing: f32) -> Option<Vec<Vec2>> {
        let start = CellCoord::from_point(start)?;
        let end = CellCoord::from_point(end)?;
        let route = navigation::find_route(&self.grid, start, end)?;
        let points: Vec<Vec2> = route.into_iter().map(CellCoord::to_point).collect();

        if spacing <= 0.0 || points.len() <= 2 {
            return Some(points);
        }

        let mut thinned = Vec::with_capacity(points.len());
        let mut last_kept = points[0];
        thinned.push(last_kept);
        for point in &points[1..points.len() - 1] {
            if point.distance(last_kept) >= spacing {
                thinned.push(*point);
                last_kept = *point;
            }
        }
        thinned.push(points[points.len() - 1]);
        Some(thinned)
    }

    /// Random walkable point near `position`, or `position` itself when none is found.
    ///
    /// Tries a bounded number of offsets drawn from `[-15, 15)` on each axis.
    pub fn random_nearby_walkable<R: Rng + ?Sized>(&self, position: Vec2, rng: &mut R) -> Vec2 {
        for _ in 0..NUDGE_ATTEMPTS {
            let offset = Vec2::new(
                rng.gen_range(-NUDGE_RANGE..NUDGE_RANGE) as f32,
                rng.gen_range(-NUDGE_RANGE..NUDGE_RANGE) as f32,
            );
            let candidate = position + offset;
            if self.is_walkable(candidate) {
                return candidate;
            }
        }
        position
    }

    /// Exploration score of a position with the given view radius.
    #[must_use]
    pub fn explore_score(&self, position: Vec2, view_distance: f32) -> u64 {
        self.chunks.explore_score(position, view_distance)
    }

    /// Share of positive-weight chunks already revealed.
    #[must_use]
    pub fn completeness(&self) -> f64 {
        self.chunks.completeness()
    }
}
