use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TICK_MS: u64 = 55;
const DEFAULT_RENDER_FPS: u64 = 60;
const DEFAULT_BANNER_MS: u64 = 2000;
const DEFAULT_LOG_FILE: &str = "maze.log";

/// Runtime knobs read from `MAZE_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub tick_ms: u64,
    pub render_fps: u64,
    pub banner_ms: u64,
    pub seed: Option<u64>,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            render_fps: DEFAULT_RENDER_FPS,
            banner_ms: DEFAULT_BANNER_MS,
            seed: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset, unparsable and zero durations fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            tick_ms: positive("MAZE_TICK_MS", DEFAULT_TICK_MS),
            render_fps: positive("MAZE_FPS", DEFAULT_RENDER_FPS),
            banner_ms: positive("MAZE_BANNER_MS", DEFAULT_BANNER_MS),
            seed: lookup("MAZE_SEED").and_then(|v| v.trim().parse::<u64>().ok()),
            log_file: lookup("MAZE_LOG_FILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn frame_time(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.render_fps.max(1))
    }

    pub fn banner(&self) -> Duration {
        Duration::from_millis(self.banner_ms)
    }

    /// Seeded when `MAZE_SEED` is set so a run can be replayed.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
