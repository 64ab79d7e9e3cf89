//! Terminal maze game: a procedural maze engine plus the game state that
//! walks a player through ever larger levels.

pub mod config;
pub mod error;
pub mod game;
pub mod maze;

pub use error::MazeError;
pub use maze::{generate_maze, Maze};
