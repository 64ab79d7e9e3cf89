//! Prints one generated maze as ASCII, `#` for walls, followed by its par.
//!
//! `MAZE_LEVEL` picks the level (default 1) and `MAZE_SEED` makes the output
//! reproducible. Set `RUST_LOG=debug` to see the generation steps on stderr.

use anyhow::Context;
use maze_game::config::Settings;
use maze_game::generate_maze;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const CELL_SIZE: u32 = 40;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = Settings::from_env();
    let level = match std::env::var("MAZE_LEVEL") {
        Ok(v) => v
            .trim()
            .parse::<u32>()
            .with_context(|| format!("MAZE_LEVEL must be a level number, got {:?}", v))?,
        Err(_) => 1,
    };

    let mut rng = settings.rng();
    let maze = generate_maze(&mut rng, level, WIDTH, HEIGHT, CELL_SIZE)?;
    print!("{}", maze.grid);
    println!("Minimum moves: {}", maze.par);
    Ok(())
}
