//! Dense walkability grid decoded from the packed terrain layer.

use wavefarm_core::{CellCoord, TILE_WORLD_UNIT};

/// Dimensions of the walkability grid derived from terrain tile counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDimensions {
    /// Number of cell columns.
    pub width: u32,
    /// Number of cell rows.
    pub height: u32,
}

impl GridDimensions {
    /// Derives grid dimensions from the terrain's tile counts.
    ///
    /// Each tile spans [`TILE_WORLD_UNIT`] cells. The width is bumped to the
    /// next even value and then widened by one column so the packed layer,
    /// which stores two columns per byte, always decodes whole pairs. Both
    /// axes are at least one cell.
    #[must_use]
    pub fn from_terrain(tile_columns: u32, tile_rows: u32) -> Self {
        let mut width = tile_columns.saturating_sub(1).saturating_mul(TILE_WORLD_UNIT);
        if width % 2 != 0 {
            width = width.saturating_add(1);
        }
        let width = width.saturating_add(1);
        let height = tile_rows.saturating_sub(1).saturating_mul(TILE_WORLD_UNIT);

        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Total number of cells.
    #[must_use]
    pub fn area(&self) -> usize {
        usize::try_from(u64::from(self.width) * u64::from(self.height)).unwrap_or(usize::MAX)
    }
}

/// Immutable per-cell walkability map, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkabilityGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl WalkabilityGrid {
    /// Decodes a grid from the packed walkability layer.
    ///
    /// Each byte packs two adjacent cells: the low nibble covers the even
    /// column and the high nibble the odd column; a nonzero nibble marks the
    /// cell walkable. Rows start every `bytes_per_row` bytes. Cells whose byte
    /// lies past the end of the row or of the blob stay unwalkable.
    #[must_use]
    pub fn decode(dimensions: GridDimensions, bytes_per_row: usize, bytes: &[u8]) -> Self {
        let width = dimensions.width.max(1);
        let height = dimensions.height.max(1);
        let width_usize = usize::try_from(width).unwrap_or(0);
        let height_usize = usize::try_from(height).unwrap_or(0);
        let mut cells = vec![0_u8; width_usize.saturating_mul(height_usize)];

        for row in 0..height_usize {
            let Some(row_offset) = row.checked_mul(bytes_per_row) else {
                break;
            };
            if row_offset >= bytes.len() {
                break;
            }

            for column in (0..width_usize).step_by(2) {
                let byte_in_row = column >> 1;
                if byte_in_row >= bytes_per_row {
                    break;
                }
                let Some(&packed) = bytes.get(row_offset + byte_in_row) else {
                    break;
                };

                let base = row * width_usize + column;
                cells[base] = u8::from(packed & 0x0f != 0);
                if column + 1 < width_usize {
                    cells[base + 1] = u8::from(packed >> 4 != 0);
                }
            }
        }

        Self {
            width,
            height,
            cells,
        }
    }

    /// Builds a grid from explicit row-major cell values; nonzero means walkable.
    ///
    /// Missing trailing cells stay unwalkable and surplus values are ignored.
    #[must_use]
    pub fn from_cells(width: u32, height: u32, values: &[u8]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let len = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        let mut cells = vec![0_u8; len];
        for (cell, value) in cells.iter_mut().zip(values) {
            *cell = u8::from(*value != 0);
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Builds a grid from a text map where `.` marks walkable cells.
    ///
    /// Rows are separated by newlines and surrounding whitespace is ignored;
    /// every other character is a wall. Short rows are padded with walls.
    #[must_use]
    pub fn from_ascii(map: &str) -> Self {
        let rows: Vec<&str> = map
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let width_u32 = u32::try_from(width).unwrap_or(u32::MAX);
        let height_u32 = u32::try_from(rows.len()).unwrap_or(u32::MAX);

        let mut values = Vec::with_capacity(width * rows.len());
        for row in &rows {
            let mut count = 0;
            for symbol in row.chars() {
                values.push(u8::from(symbol == '.'));
                count += 1;
            }
            values.extend(std::iter::repeat(0).take(width - count));
        }

        Self::from_cells(width_u32, height_u32, &values)
    }

    /// Number of cell columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of cell rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw cell value, `1` for walkable and `0` otherwise; `None` outside the grid.
    #[must_use]
    pub fn value(&self, cell: CellCoord) -> Option<u8> {
        self.index(cell).and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell lies inside the grid and is walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.value(cell).is_some_and(|value| value != 0)
    }

    /// Counts walkable cells inside `[columns.start, columns.end) x [rows.start, rows.end)`,
    /// clipped to the grid.
    #[must_use]
    pub fn walkable_in(&self, columns: std::ops::Range<u32>, rows: std::ops::Range<u32>) -> u32 {
        let column_end = columns.end.min(self.width);
        let row_end = rows.end.min(self.height);
        let mut total = 0;
        for row in rows.start..row_end {
            for column in columns.start..column_end {
                if self.is_walkable(CellCoord::new(column, row)) {
                    total += 1;
                }
            }
        }
        total
    }

    /// Dense cell values stored in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    pub(crate) fn coord(&self, index: usize) -> CellCoord {
        let width = usize::try_from(self.width).unwrap_or(1).max(1);
        let column = u32::try_from(index % width).unwrap_or(u32::MAX);
        let row = u32::try_from(index / width).unwrap_or(u32::MAX);
        CellCoord::new(column, row)
    }
}
