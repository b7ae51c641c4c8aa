use std::cmp::Reverse;
use std::collections::BinaryHeap;

use anyhow::{bail, Result};

use crate::domain::atom::Pos;

/// Saturating distance for unreachable cells. Large enough to dominate any
/// real path sum, small enough that adding a few of them cannot wrap.
pub const UNREACHABLE: i64 = i64::MAX / 4;

/// Immutable location index: wall mask plus, for every free cell, its
/// precomputed orthogonal free neighbors. Built once per level and shared
/// read-only across the whole search.
#[derive(Debug, Clone)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    walls: Vec<Vec<bool>>,
    neighbors: Vec<Vec<Vec<Pos>>>,
}

impl Grid {
    pub fn new(walls: Vec<Vec<bool>>) -> Result<Self> {
        if walls.is_empty() || walls[0].is_empty() {
            bail!("empty wall matrix");
        }
        let rows = walls.len();
        let cols = walls[0].len();
        if let Some(bad) = walls.iter().position(|row| row.len() != cols) {
            bail!(
                "non-rectangular wall matrix: row {bad} has {} cells, expected {cols}",
                walls[bad].len()
            );
        }

        let mut grid = Grid {
            rows,
            cols,
            walls,
            neighbors: vec![vec![Vec::new(); cols]; rows],
        };
        grid.initialize_neighbors();
        Ok(grid)
    }

    fn initialize_neighbors(&mut self) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                if !self.walls[row][col] {
                    self.neighbors[row][col] = self.compute_neighbors(row, col);
                }
            }
        }
    }

    // Fixed W, E, N, S order; only affects action enumeration order.
    fn compute_neighbors(&self, row: usize, col: usize) -> Vec<Pos> {
        let directions = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        let mut neighbors = Vec::new();

        for &(dr, dc) in &directions {
            let r = row as i64 + dr;
            let c = col as i64 + dc;
            if r >= 0
                && c >= 0
                && r < self.rows as i64
                && c < self.cols as i64
                && !self.walls[r as usize][c as usize]
            {
                neighbors.push((r as usize, c as usize));
            }
        }

        neighbors
    }

    pub fn is_wall(&self, pos: Pos) -> bool {
        self.walls[pos.0][pos.1]
    }

    pub fn neighbors(&self, pos: Pos) -> &[Pos] {
        &self.neighbors[pos.0][pos.1]
    }

    /// Single-source distance field over free cells, one per orthogonal
    /// step, walls as obstacles. Unreachable cells hold [`UNREACHABLE`].
    pub fn dijkstra_map(&self, source: Pos) -> Vec<Vec<i64>> {
        let mut distances = vec![vec![UNREACHABLE; self.cols]; self.rows];
        if self.is_wall(source) {
            return distances;
        }

        let mut heap = BinaryHeap::new();
        distances[source.0][source.1] = 0;
        heap.push((Reverse(0), source));

        while let Some((Reverse(cost), pos)) = heap.pop() {
            if cost > distances[pos.0][pos.1] {
                continue;
            }

            for &next in self.neighbors(pos) {
                let next_cost = cost + 1;
                if next_cost < distances[next.0][next.1] {
                    distances[next.0][next.1] = next_cost;
                    heap.push((Reverse(next_cost), next));
                }
            }
        }

        distances
    }
}
