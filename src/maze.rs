//! Procedural maze generation.
//!
//! A maze is planned from the level and the display area, carved with a
//! randomized depth-first walk on a two-cell stride, repaired around the exit
//! and finally checked with a breadth-first search. When carving leaves the
//! exit cut off, a staircase path is opened from the entry so every returned
//! maze is solvable.

use crate::error::MazeError;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use std::fmt;

/// Side length, in cells, of the smallest planned maze.
pub const BASE_SIZE: usize = 5;
/// Largest planned side length, in cells, whatever the area allows.
pub const MAX_SIDE: usize = 100;
/// A carve target must have at least this many walls among its direct neighbours.
const MIN_SURROUNDING_WALLS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Right,
    Down,
    Left,
    Up,
}

impl Dir {
    /// Enumeration order shared by the carver and the solver.
    pub const ALL: [Dir; 4] = [Dir::Right, Dir::Down, Dir::Left, Dir::Up];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Up => (0, -1),
        }
    }
}

/// Dense `height x width` grid of cells. (0, 0) is the entry, the bottom-right
/// corner is the exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// All walls except the entry.
    pub fn new(width: usize, height: usize) -> Result<Self, MazeError> {
        if width == 0 || height == 0 {
            return Err(MazeError::EmptyGrid);
        }
        let mut cells = vec![vec![Cell::Wall; width]; height];
        cells[0][0] = Cell::Open;
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn entry(&self) -> Pos {
        Pos { x: 0, y: 0 }
    }

    pub fn exit(&self) -> Pos {
        Pos {
            x: self.width - 1,
            y: self.height - 1,
        }
    }

    /// `None` when `pos` is outside the grid.
    pub fn cell(&self, pos: Pos) -> Option<Cell> {
        self.cells.get(pos.y).and_then(|row| row.get(pos.x)).copied()
    }

    pub fn is_open(&self, pos: Pos) -> bool {
        self.cell(pos) == Some(Cell::Open)
    }

    pub fn is_wall(&self, pos: Pos) -> bool {
        self.cell(pos) == Some(Cell::Wall)
    }

    /// The cell `stride` steps away from `pos` in `dir`, if it is in bounds.
    pub fn step(&self, pos: Pos, dir: Dir, stride: usize) -> Option<Pos> {
        let (dx, dy) = dir.delta();
        let nx = pos.x as isize + dx * stride as isize;
        let ny = pos.y as isize + dy * stride as isize;
        if nx < 0 || ny < 0 {
            return None;
        }
        let nx = nx as usize;
        let ny = ny as usize;
        if nx >= self.width || ny >= self.height {
            return None;
        }
        Some(Pos { x: nx, y: ny })
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.iter().map(|row| row.as_slice())
    }

    pub fn open_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell == Cell::Open)
            .count()
    }

    fn open(&mut self, pos: Pos) {
        self.cells[pos.y][pos.x] = Cell::Open;
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for cell in row {
                let glyph = match cell {
                    Cell::Wall => '#',
                    Cell::Open => ' ',
                };
                write!(f, "{}", glyph)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A generated level: the grid plus the par move count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maze {
    pub grid: Grid,
    pub par: usize,
}

/// Generates the maze for `level` on a `width x height` display area split
/// into square cells of `cell_size` units.
///
/// The returned grid always has its entry and exit open and a path between
/// them. `par` is the BFS distance from entry to exit minus one, floored at 0.
pub fn generate_maze(
    rng: &mut impl Rng,
    level: u32,
    width: u32,
    height: u32,
    cell_size: u32,
) -> Result<Maze, MazeError> {
    if width == 0 || height == 0 || cell_size == 0 {
        return Err(MazeError::InvalidArea {
            width,
            height,
            cell_size,
        });
    }

    let (maze_w, maze_h) = maze_size(level, width, height, cell_size);
    debug!(
        "level {}: planned {}x{} maze on {}x{} area (cell size {})",
        level, maze_w, maze_h, width, height, cell_size
    );

    let mut grid = Grid::new(maze_w, maze_h)?;
    carve_paths(&mut grid, rng);
    ensure_exit_reachable(&mut grid);

    let steps = match min_moves(&grid) {
        Some(steps) => steps,
        None => {
            let path = connect_start_and_exit(&mut grid);
            warn!(
                "level {}: exit unreachable after carving, opened {} fallback cells",
                level,
                path.len()
            );
            min_moves(&grid).ok_or(MazeError::Unsolvable)?
        }
    };

    let par = steps.saturating_sub(1);
    info!(
        "level {}: generated {}x{} maze with {} open cells, par {}",
        level,
        maze_w,
        maze_h,
        grid.open_cells(),
        par
    );
    Ok(Maze { grid, par })
}

/// Maze dimensions in cells: grows by one cell on each axis every second
/// level, capped by how many cells fit in the area and by [`MAX_SIDE`].
/// Never below 1x1.
pub fn maze_size(level: u32, width: u32, height: u32, cell_size: u32) -> (usize, usize) {
    let cell_size = cell_size.max(1);
    let max_cells_w = (width / cell_size) as usize;
    let max_cells_h = (height / cell_size) as usize;

    let size = (BASE_SIZE + (level / 2) as usize).min(MAX_SIDE);
    (size.min(max_cells_w).max(1), size.min(max_cells_h).max(1))
}

/// Randomized depth-first carve from the entry on a two-cell stride. Each
/// step opens a target cell and the doorway between it and the current cell.
pub fn carve_paths(grid: &mut Grid, rng: &mut impl Rng) {
    let mut stack = vec![grid.entry()];
    while let Some(&current) = stack.last() {
        let targets = carve_targets(grid, current);
        match targets.choose(rng) {
            Some(&(target, doorway)) => {
                grid.open(target);
                grid.open(doorway);
                stack.push(target);
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// `(target, doorway)` pairs reachable from `pos`.
fn carve_targets(grid: &Grid, pos: Pos) -> Vec<(Pos, Pos)> {
    let mut targets = Vec::new();
    for dir in Dir::ALL {
        let Some(target) = grid.step(pos, dir, 2) else {
            continue;
        };
        if !is_carvable(grid, target) {
            continue;
        }
        if let Some(doorway) = grid.step(pos, dir, 1) {
            targets.push((target, doorway));
        }
    }
    targets
}

// Out-of-bounds neighbours do not count as walls, so corner cells never qualify.
fn is_carvable(grid: &Grid, pos: Pos) -> bool {
    if !grid.is_wall(pos) {
        return false;
    }
    let walls = Dir::ALL
        .iter()
        .filter_map(|&dir| grid.step(pos, dir, 1))
        .filter(|&next| grid.is_wall(next))
        .count();
    walls >= MIN_SURROUNDING_WALLS
}

/// Gives the exit an open neighbour, preferring the one to its left, and
/// opens the exit itself. Does not guarantee the neighbour reaches the entry.
pub fn ensure_exit_reachable(grid: &mut Grid) {
    let exit = grid.exit();
    let above = grid.step(exit, Dir::Up, 1);
    let left = grid.step(exit, Dir::Left, 1);

    let walled_in = above.map_or(true, |pos| grid.is_wall(pos))
        && left.map_or(true, |pos| grid.is_wall(pos));
    if walled_in {
        if let Some(pos) = left.or(above) {
            grid.open(pos);
        }
    }
    grid.open(exit);
}

/// Number of moves on the shortest path from entry to exit, or `None` if the
/// exit cannot be reached.
pub fn min_moves(grid: &Grid) -> Option<usize> {
    let exit = grid.exit();
    distance_map(grid, grid.entry())[exit.y][exit.x]
}

fn distance_map(grid: &Grid, start: Pos) -> Vec<Vec<Option<usize>>> {
    let mut dist = vec![vec![None; grid.width]; grid.height];
    let mut q = VecDeque::new();
    dist[start.y][start.x] = Some(0);
    q.push_back((start, 0));

    while let Some((pos, base)) = q.pop_front() {
        for dir in Dir::ALL {
            let Some(next) = grid.step(pos, dir, 1) else {
                continue;
            };
            if !grid.is_open(next) || dist[next.y][next.x].is_some() {
                continue;
            }
            dist[next.y][next.x] = Some(base + 1);
            q.push_back((next, base + 1));
        }
    }
    dist
}

/// Opens a staircase from the entry to the exit: right along the top row, then
/// down the last column. Returns the cells on the path in walking order.
pub fn connect_start_and_exit(grid: &mut Grid) -> Vec<Pos> {
    let exit = grid.exit();
    let mut pos = grid.entry();
    let mut path = vec![pos];
    grid.open(pos);
    while pos != exit {
        pos = if pos.x < exit.x {
            Pos { x: pos.x + 1, ..pos }
        } else {
            Pos { y: pos.y + 1, ..pos }
        };
        grid.open(pos);
        path.push(pos);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_from(rows: &[&str]) -> Grid {
        let cells: Vec<Vec<Cell>> = rows
            .iter()
            .map(|row| {
                row.chars()
                    .map(|c| if c == '#' { Cell::Wall } else { Cell::Open })
                    .collect()
            })
            .collect();
        Grid {
            width: cells[0].len(),
            height: cells.len(),
            cells,
        }
    }

    #[test]
    fn plans_base_size_on_first_level() {
        assert_eq!(maze_size(1, 800, 600, 40), (5, 5));
        assert_eq!(maze_size(2, 800, 600, 40), (6, 6));
        assert_eq!(maze_size(11, 800, 600, 40), (10, 10));
    }

    #[test]
    fn planned_size_is_capped_by_area() {
        assert_eq!(maze_size(100, 800, 600, 40), (20, 15));
        assert_eq!(maze_size(1, 120, 600, 40), (3, 5));
    }

    #[test]
    fn planned_size_grows_monotonically() {
        let mut last = maze_size(1, 740, 540, 30);
        for level in 2..80 {
            let next = maze_size(level, 740, 540, 30);
            assert!(next.0 >= last.0 && next.1 >= last.1, "level {}", level);
            assert!(next.0 <= 740 / 30 && next.1 <= 540 / 30);
            last = next;
        }
    }

    #[test]
    fn planned_size_never_exceeds_max_side() {
        assert_eq!(maze_size(u32::MAX, u32::MAX, u32::MAX, 1), (MAX_SIDE, MAX_SIDE));
        assert_eq!(maze_size(400, 10_000, 60, 10), (MAX_SIDE, 6));
    }

    #[test]
    fn huge_area_generates_a_capped_maze() {
        let mut rng = StdRng::seed_from_u64(4);
        let maze = generate_maze(&mut rng, u32::MAX, u32::MAX, u32::MAX, 1).unwrap();
        assert_eq!((maze.grid.width(), maze.grid.height()), (MAX_SIDE, MAX_SIDE));
        assert!(min_moves(&maze.grid).is_some());
    }

    #[test]
    fn area_smaller_than_a_cell_plans_single_cell() {
        assert_eq!(maze_size(1, 10, 10, 40), (1, 1));
        assert_eq!(maze_size(7, 800, 30, 40), (8, 1));
    }

    #[test]
    fn new_grid_is_walls_with_open_entry() {
        let grid = Grid::new(4, 3).unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
        assert!(grid.is_open(Pos { x: 0, y: 0 }));
        assert_eq!(grid.open_cells(), 1);
        assert_eq!(grid.exit(), Pos { x: 3, y: 2 });
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        assert_eq!(Grid::new(0, 5), Err(MazeError::EmptyGrid));
        assert_eq!(Grid::new(5, 0), Err(MazeError::EmptyGrid));
    }

    #[test]
    fn out_of_bounds_cells_are_neither_open_nor_wall() {
        let grid = Grid::new(2, 2).unwrap();
        let outside = Pos { x: 2, y: 0 };
        assert_eq!(grid.cell(outside), None);
        assert!(!grid.is_open(outside));
        assert!(!grid.is_wall(outside));
        assert_eq!(grid.step(Pos { x: 0, y: 0 }, Dir::Up, 1), None);
        assert_eq!(grid.step(Pos { x: 0, y: 0 }, Dir::Right, 2), None);
    }

    #[test]
    fn carvable_needs_three_surrounding_walls() {
        let grid = grid_from(&[
            "#####", //
            "# ###",
            "#####",
        ]);
        assert!(is_carvable(&grid, Pos { x: 2, y: 1 }));

        let grid = grid_from(&[
            "#####", //
            "# # #",
            "#####",
        ]);
        assert!(!is_carvable(&grid, Pos { x: 2, y: 1 }));
        assert!(!is_carvable(&grid, Pos { x: 1, y: 1 }));
    }

    #[test]
    fn corner_cells_are_never_carve_targets() {
        let grid = Grid::new(5, 5).unwrap();
        assert!(!is_carvable(&grid, Pos { x: 4, y: 4 }));
        assert!(!is_carvable(&grid, Pos { x: 4, y: 0 }));
        assert!(is_carvable(&grid, Pos { x: 2, y: 0 }));
    }

    #[test]
    fn carve_targets_pair_target_with_doorway() {
        let grid = Grid::new(5, 5).unwrap();
        let targets = carve_targets(&grid, Pos { x: 0, y: 0 });
        assert_eq!(
            targets,
            vec![
                (Pos { x: 2, y: 0 }, Pos { x: 1, y: 0 }),
                (Pos { x: 0, y: 2 }, Pos { x: 0, y: 1 }),
            ]
        );
    }

    #[test]
    fn each_carve_opens_two_cells() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut grid = Grid::new(9, 7).unwrap();
            carve_paths(&mut grid, &mut rng);
            // Entry plus target/doorway pairs.
            assert_eq!(grid.open_cells() % 2, 1, "seed {}", seed);
            assert!(grid.open_cells() > 1, "seed {}", seed);
        }
    }

    #[test]
    fn carving_stays_connected_to_entry() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = Grid::new(11, 11).unwrap();
        carve_paths(&mut grid, &mut rng);
        let dist = distance_map(&grid, grid.entry());
        for (y, row) in grid.rows().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if *cell == Cell::Open {
                    assert!(dist[y][x].is_some(), "({}, {}) is isolated", x, y);
                }
            }
        }
    }

    #[test]
    fn carving_a_single_cell_does_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut grid = Grid::new(1, 1).unwrap();
        carve_paths(&mut grid, &mut rng);
        assert_eq!(grid.open_cells(), 1);
    }

    #[test]
    fn walled_in_exit_opens_left_neighbour() {
        let mut grid = grid_from(&[
            " ##", //
            "###",
            "###",
        ]);
        ensure_exit_reachable(&mut grid);
        assert!(grid.is_open(Pos { x: 2, y: 2 }));
        assert!(grid.is_open(Pos { x: 1, y: 2 }));
        assert!(grid.is_wall(Pos { x: 2, y: 1 }));
    }

    #[test]
    fn exit_with_open_neighbour_only_opens_exit() {
        let mut grid = grid_from(&[
            "   ", //
            "## ",
            "###",
        ]);
        ensure_exit_reachable(&mut grid);
        assert!(grid.is_open(Pos { x: 2, y: 2 }));
        assert!(grid.is_wall(Pos { x: 1, y: 2 }));
    }

    #[test]
    fn single_column_exit_opens_cell_above() {
        let mut grid = Grid::new(1, 4).unwrap();
        ensure_exit_reachable(&mut grid);
        assert!(grid.is_open(Pos { x: 0, y: 3 }));
        assert!(grid.is_open(Pos { x: 0, y: 2 }));
        assert!(grid.is_wall(Pos { x: 0, y: 1 }));
    }

    #[test]
    fn shortest_path_counts_moves() {
        let grid = grid_from(&[
            "  ", //
            "  ",
        ]);
        assert_eq!(min_moves(&grid), Some(2));

        let grid = grid_from(&[" "]);
        assert_eq!(min_moves(&grid), Some(0));
    }

    #[test]
    fn shortest_path_takes_the_detour() {
        let grid = grid_from(&[
            "   #", //
            "## #",
            "    ",
            " ## ",
        ]);
        assert_eq!(min_moves(&grid), Some(6));
    }

    #[test]
    fn unreachable_exit_has_no_distance() {
        let grid = grid_from(&[
            "  #", //
            "###",
            "#  ",
        ]);
        assert_eq!(min_moves(&grid), None);
    }

    #[test]
    fn fallback_path_walks_right_then_down() {
        let mut grid = Grid::new(4, 3).unwrap();
        let path = connect_start_and_exit(&mut grid);
        assert_eq!(path.first(), Some(&grid.entry()));
        assert_eq!(path.last(), Some(&grid.exit()));
        assert_eq!(path.len(), 4 + 3 - 1);
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let right = b.x == a.x + 1 && b.y == a.y;
            let down = b.y == a.y + 1 && b.x == a.x;
            assert!(right || down, "{:?} -> {:?}", a, b);
        }
        assert!(path.iter().all(|&pos| grid.is_open(pos)));
        assert_eq!(min_moves(&grid), Some(5));
    }

    #[test]
    fn invalid_area_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate_maze(&mut rng, 1, 0, 600, 40).unwrap_err();
        assert_eq!(
            err,
            MazeError::InvalidArea {
                width: 0,
                height: 600,
                cell_size: 40
            }
        );
        assert!(generate_maze(&mut rng, 1, 800, 600, 0).is_err());
    }

    #[test]
    fn two_by_two_maze_has_par_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let maze = generate_maze(&mut rng, 1, 80, 80, 40).unwrap();
        assert_eq!(maze.grid.width(), 2);
        assert_eq!(maze.grid.height(), 2);
        assert_eq!(min_moves(&maze.grid), Some(2));
        assert_eq!(maze.par, 1);
    }

    #[test]
    fn single_cell_maze_has_zero_par() {
        let mut rng = StdRng::seed_from_u64(3);
        let maze = generate_maze(&mut rng, 1, 40, 40, 40).unwrap();
        assert_eq!(maze.grid.width(), 1);
        assert_eq!(maze.par, 0);
        assert!(maze.grid.is_open(maze.grid.entry()));
    }

    #[test]
    fn display_draws_walls_as_hashes() {
        let grid = grid_from(&[
            " #", //
            "# ",
        ]);
        assert_eq!(grid.to_string(), " #\n# \n");
    }
}
