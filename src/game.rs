use crate::error::MazeError;
use crate::maze::{generate_maze, Dir, Grid, Maze, Pos};
use log::info;
use rand::Rng;
use std::collections::HashSet;

/// Virtual canvas the maze is planned on, in display units.
pub const DISPLAY_W: u32 = 800;
pub const DISPLAY_H: u32 = 600;
pub const PADDING: u32 = 30;
const BASE_CELL_SIZE: u32 = 50;
const MIN_CELL_SIZE: u32 = 20;
const LEVEL_SCORE: usize = 1000;

/// Cells shrink by one unit per level so later mazes fit more cells.
pub fn cell_size_for_level(level: u32) -> u32 {
    BASE_CELL_SIZE.saturating_sub(level).max(MIN_CELL_SIZE)
}

pub fn level_score(moves: usize) -> usize {
    LEVEL_SCORE.saturating_sub(moves)
}

fn maze_for_level(rng: &mut impl Rng, level: u32) -> Result<Maze, MazeError> {
    generate_maze(
        rng,
        level,
        DISPLAY_W - 2 * PADDING,
        DISPLAY_H - 2 * PADDING,
        cell_size_for_level(level),
    )
}

/// One run through the levels: the current maze, the player on it and the
/// score carried over from finished levels.
pub struct Game {
    level: u32,
    total_score: usize,
    maze: Maze,
    player: Pos,
    visited: HashSet<Pos>,
    moves: usize,
}

impl Game {
    pub fn new(rng: &mut impl Rng) -> Result<Self, MazeError> {
        let maze = maze_for_level(rng, 1)?;
        Ok(Self::with_maze(1, 0, maze))
    }

    fn with_maze(level: u32, total_score: usize, maze: Maze) -> Self {
        let player = maze.grid.entry();
        let mut visited = HashSet::new();
        visited.insert(player);
        Self {
            level,
            total_score,
            maze,
            player,
            visited,
            moves: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn grid(&self) -> &Grid {
        &self.maze.grid
    }

    pub fn par(&self) -> usize {
        self.maze.par
    }

    pub fn player(&self) -> Pos {
        self.player
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn total_score(&self) -> usize {
        self.total_score
    }

    pub fn is_visited(&self, pos: Pos) -> bool {
        self.visited.contains(&pos)
    }

    /// Score shown while playing: the banked total plus what this level would
    /// be worth if it ended now.
    pub fn live_score(&self) -> usize {
        self.total_score + level_score(self.moves)
    }

    /// Moves one cell onto an open neighbour. Blocked moves are free.
    pub fn try_move(&mut self, dir: Dir) -> bool {
        let Some(next) = self.maze.grid.step(self.player, dir, 1) else {
            return false;
        };
        if !self.maze.grid.is_open(next) {
            return false;
        }
        self.player = next;
        self.moves += 1;
        self.visited.insert(next);
        true
    }

    pub fn is_level_complete(&self) -> bool {
        self.player == self.maze.grid.exit()
    }

    /// Banks this level's score and generates the next, larger maze.
    pub fn advance_level(&mut self, rng: &mut impl Rng) -> Result<(), MazeError> {
        info!(
            "level {} completed with {} moves (par {})",
            self.level, self.moves, self.maze.par
        );
        let total_score = self.total_score + level_score(self.moves);
        let level = self.level.saturating_add(1);
        let maze = maze_for_level(rng, level)?;
        *self = Self::with_maze(level, total_score, maze);
        Ok(())
    }
}
