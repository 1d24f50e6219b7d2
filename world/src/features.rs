//! Name-keyed index of terrain tile positions.

use std::collections::BTreeMap;

use dashmap::DashMap;
use rayon::prelude::*;
use wavefarm_core::{Vec2, TILE_WORLD_UNIT};

/// Capability that resolves raw tile instances into their names.
///
/// Implementations must be shareable across threads so the index can be
/// built in parallel.
pub trait TileResolver: Sync {
    /// Raw tile instance type stored in the terrain snapshot.
    type Tile: Sync;

    /// Detail name attached to the tile, if any.
    fn detail_name(&self, tile: &Self::Tile) -> Option<String>;

    /// Asset path of the tile, if any.
    fn path(&self, tile: &Self::Tile) -> Option<String>;
}

/// Resolver for tiles that already carry their names.
#[derive(Clone, Copy, Debug, Default)]
pub struct NamedTiles;

/// Tile whose detail name and path were resolved by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamedTile {
    /// Detail name, empty when absent.
    pub detail_name: String,
    /// Asset path, empty when absent.
    pub path: String,
}

impl NamedTile {
    /// Creates a tile from its detail name and asset path.
    #[must_use]
    pub fn new(detail_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            detail_name: detail_name.into(),
            path: path.into(),
        }
    }
}

impl TileResolver for NamedTiles {
    type Tile = NamedTile;

    fn detail_name(&self, tile: &NamedTile) -> Option<String> {
        Some(tile.detail_name.clone())
    }

    fn path(&self, tile: &NamedTile) -> Option<String> {
        Some(tile.path.clone())
    }
}

/// Mapping from tile names to the grid positions where they occur.
///
/// Every tile is recorded under both its asset path and its detail name.
/// Positions for a name are kept in tile order, so the first entry is the
/// first tile carrying that name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureIndex {
    entries: BTreeMap<String, Vec<Vec2>>,
}

impl FeatureIndex {
    /// Builds the index on the calling thread.
    #[must_use]
    pub fn build<R: TileResolver>(tiles: &[R::Tile], columns: u32, resolver: &R) -> Self {
        let mut entries: BTreeMap<String, Vec<(usize, Vec2)>> = BTreeMap::new();
        for (index, tile) in tiles.iter().enumerate() {
            for name in tile_names(resolver, tile) {
                entries
                    .entry(name)
                    .or_default()
                    .push((index, tile_position(index, columns)));
            }
        }

        Self::freeze(entries)
    }

    /// Builds the index with tiles resolved concurrently.
    ///
    /// Produces the same index as [`FeatureIndex::build`].
    #[must_use]
    pub fn build_parallel<R: TileResolver>(tiles: &[R::Tile], columns: u32, resolver: &R) -> Self {
        let shared: DashMap<String, Vec<(usize, Vec2)>> = DashMap::new();
        tiles.par_iter().enumerate().for_each(|(index, tile)| {
            let position = tile_position(index, columns);
            for name in tile_names(resolver, tile) {
                shared.entry(name).or_default().push((index, position));
            }
        });

        Self::freeze(shared.into_iter().collect())
    }

    fn freeze(entries: BTreeMap<String, Vec<(usize, Vec2)>>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, mut positions)| {
                positions.sort_by_key(|(index, _)| *index);
                let positions = positions.into_iter().map(|(_, position)| position).collect();
                (name, positions)
            })
            .collect();
        Self { entries }
    }

    /// First recorded position for a tile name.
    ///
    /// An exact name match wins. Otherwise the first name, in lexicographic
    /// order, that contains `search` as a substring is used.
    #[must_use]
    pub fn find(&self, search: &str) -> Option<Vec2> {
        if let Some(position) = self.positions(search).first() {
            return Some(*position);
        }

        self.entries
            .iter()
            .find(|(name, _)| name.contains(search))
            .and_then(|(_, positions)| positions.first().copied())
    }

    /// All positions recorded under the exact name, in tile order.
    #[must_use]
    pub fn positions(&self, name: &str) -> &[Vec2] {
        self.entries.get(name).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct names in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the index holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over indexed names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn tile_names<R: TileResolver>(resolver: &R, tile: &R::Tile) -> impl Iterator<Item = String> {
    [resolver.path(tile), resolver.detail_name(tile)]
        .into_iter()
        .flatten()
        .filter(|name| !name.is_empty())
}

fn tile_position(index: usize, columns: u32) -> Vec2 {
    let columns = usize::try_from(columns).unwrap_or(usize::MAX).max(1);
    let column = (index % columns) as f32;
    let row = (index / columns) as f32;
    let unit = TILE_WORLD_UNIT as f32;
    Vec2::new(column * unit, row * unit)
}
