//! Eight-directional grid search used by the area context.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use wavefarm_core::CellCoord;

use crate::grid::WalkabilityGrid;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Finds a shortest 8-directional route between two cells.
///
/// Straight steps cost 10 and diagonal steps 14, with no penalty for changing
/// direction. Diagonal steps that squeeze between two blocked orthogonal
/// neighbours are rejected. The search expands at most `width * height`
/// nodes. Returns the visited cells from `start` to `end` inclusive, or `None`
/// when either endpoint is blocked, both are equal, or no route exists within
/// the budget.
pub(crate) fn find_route(
    grid: &WalkabilityGrid,
    start: CellCoord,
    end: CellCoord,
) -> Option<Vec<CellCoord>> {
    if start == end || !grid.is_walkable(start) || !grid.is_walkable(end) {
        return None;
    }

    let start_index = grid.index(start)?;
    let end_index = grid.index(end)?;
    let cell_count = grid.cells().len();
    let budget = cell_count;

    let mut costs = vec![u32::MAX; cell_count];
    let mut parents: Vec<Option<usize>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut open = BinaryHeap::new();

    costs[start_index] = 0;
    let start_estimate = octile(start, end);
    open.push(Reverse((start_estimate, start_estimate, start_index)));

    let mut expanded = 0_usize;
    while let Some(Reverse((_, _, current_index))) = open.pop() {
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if current_index == end_index {
            return Some(reconstruct(grid, &parents, end_index));
        }

        expanded += 1;
        if expanded > budget {
            return None;
        }

        let current = grid.coord(current_index);
        let current_cost = costs[current_index];

        for (dx, dy) in DIRECTIONS {
            let Some(neighbor) = offset(current, dx, dy) else {
                continue;
            };
            if !grid.is_walkable(neighbor) {
                continue;
            }

            let diagonal = dx != 0 && dy != 0;
            if diagonal && is_squeeze(grid, current, dx, dy) {
                continue;
            }

            let Some(neighbor_index) = grid.index(neighbor) else {
                continue;
            };
            if closed[neighbor_index] {
                continue;
            }

            let step = if diagonal { DIAGONAL_COST } else { STRAIGHT_COST };
            let tentative = current_cost.saturating_add(step);
            if tentative >= costs[neighbor_index] {
                continue;
            }

            costs[neighbor_index] = tentative;
            parents[neighbor_index] = Some(current_index);
            let estimate = octile(neighbor, end);
            open.push(Reverse((
                tentative.saturating_add(estimate),
                estimate,
                neighbor_index,
            )));
        }
    }

    None
}

fn reconstruct(grid: &WalkabilityGrid, parents: &[Option<usize>], end: usize) -> Vec<CellCoord> {
    let mut route = vec![grid.coord(end)];
    let mut cursor = end;
    while let Some(parent) = parents.get(cursor).copied().flatten() {
        route.push(grid.coord(parent));
        cursor = parent;
    }
    route.reverse();
    route
}

fn is_squeeze(grid: &WalkabilityGrid, from: CellCoord, dx: i32, dy: i32) -> bool {
    let horizontal = offset(from, dx, 0).is_some_and(|cell| grid.is_walkable(cell));
    let vertical = offset(from, 0, dy).is_some_and(|cell| grid.is_walkable(cell));
    !horizontal && !vertical
}

fn offset(cell: CellCoord, dx: i32, dy: i32) -> Option<CellCoord> {
    let column = cell.column().checked_add_signed(dx)?;
    let row = cell.row().checked_add_signed(dy)?;
    Some(CellCoord::new(column, row))
}

fn octile(from: CellCoord, to: CellCoord) -> u32 {
    let dx = from.column().abs_diff(to.column());
    let dy = from.row().abs_diff(to.row());
    let (low, high) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST
        .saturating_mul(low)
        .saturating_add(STRAIGHT_COST.saturating_mul(high - low))
}
