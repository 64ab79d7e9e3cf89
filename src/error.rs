use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("display area must be positive, got {width}x{height} with cell size {cell_size}")]
    InvalidArea {
        width: u32,
        height: u32,
        cell_size: u32,
    },
    #[error("maze grid needs at least one cell on each axis")]
    EmptyGrid,
    #[error("no path from entry to exit after the fallback connection")]
    Unsolvable,
}
