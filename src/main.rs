use anyhow::Context;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use maze_game::config::Settings;
use maze_game::game::Game;
use maze_game::maze::{Cell as MazeCell, Dir, Pos};
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

const CELL_W: usize = 2;
const INPUT_HOLD_MS: u64 = 160;
const MENU_POLL_MS: u64 = 50;

#[derive(Clone, Copy, PartialEq)]
enum Glyph {
    Player,
    Exit,
    Wall,
    Open,
    Visited,
}

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    glyph: Glyph,
    color: Color,
}

/// What the player asked for when a screen hands control back.
#[derive(Clone, Copy, PartialEq)]
enum Flow {
    Continue,
    Menu,
    Quit,
}

struct Renderer {
    last: Vec<Cell>,
    last_hud: String,
    width: usize,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
}

impl Renderer {
    fn new(width: usize, height: usize) -> Self {
        Self {
            last: vec![
                Cell {
                    glyph: Glyph::Open,
                    color: Color::Reset,
                };
                width * height
            ],
            last_hud: String::new(),
            width,
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();
    init_logging(&settings)?;

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, &settings);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

/// Logs go to a file so they never land on the alternate screen.
fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let file = File::create(&settings.log_file)
        .with_context(|| format!("creating log file {}", settings.log_file.display()))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run(stdout: &mut Stdout, settings: &Settings) -> anyhow::Result<()> {
    let mut rng = settings.rng();
    log::info!("starting maze game with {:?}", settings);

    loop {
        if main_menu(stdout)? == Flow::Quit {
            return Ok(());
        }
        let mut game = Game::new(&mut rng)?;
        loop {
            if show_level_banner(stdout, game.level(), settings.banner())? == Flow::Quit {
                return Ok(());
            }
            match play_level(stdout, &mut game, settings)? {
                Flow::Continue => game.advance_level(&mut rng)?,
                Flow::Menu => break,
                Flow::Quit => return Ok(()),
            }
        }
    }
}

fn main_menu(stdout: &mut Stdout) -> io::Result<Flow> {
    let lines = [
        "MAZE",
        "",
        "Press any key to start",
        "Arrows, WASD or hjkl to move",
        "Esc for this menu, q to quit anytime",
    ];
    draw_centered(stdout, &lines)?;
    loop {
        if event::poll(Duration::from_millis(MENU_POLL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(match key.code {
                        KeyCode::Char('q') => Flow::Quit,
                        _ => Flow::Continue,
                    });
                }
                Event::Resize(_, _) => draw_centered(stdout, &lines)?,
                _ => {}
            }
        }
    }
}

fn show_level_banner(stdout: &mut Stdout, level: u32, banner: Duration) -> io::Result<Flow> {
    let title = format!("Level {}", level);
    draw_centered(stdout, &[title.as_str()])?;
    let shown = Instant::now();
    while shown.elapsed() < banner {
        if event::poll(Duration::from_millis(MENU_POLL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') {
                    return Ok(Flow::Quit);
                }
            }
        }
    }
    Ok(Flow::Continue)
}

fn draw_centered(stdout: &mut Stdout, lines: &[&str]) -> io::Result<()> {
    let (term_w, term_h) = terminal::size()?;
    stdout.queue(Clear(ClearType::All))?;
    let top = (term_h as usize).saturating_sub(lines.len()) / 2;
    for (i, line) in lines.iter().enumerate() {
        let w = UnicodeWidthStr::width(*line);
        let x = (term_w as usize).saturating_sub(w) / 2;
        stdout.queue(MoveTo(x as u16, (top + i) as u16))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Print(line))?;
    }
    stdout.queue(ResetColor)?;
    stdout.flush()
}

/// Runs one level until the exit is reached or the player leaves.
fn play_level(stdout: &mut Stdout, game: &mut Game, settings: &Settings) -> io::Result<Flow> {
    let mut renderer = Renderer::new(game.grid().width(), game.grid().height());
    let mut last_tick = Instant::now();
    let mut last_seen: [Option<Instant>; 4] = [None, None, None, None];
    let mut last_pressed: Option<Dir> = None;
    let frame_time = settings.frame_time();
    stdout.queue(Clear(ClearType::All))?;

    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) => match key.kind {
                    KeyEventKind::Press | KeyEventKind::Repeat => match key.code {
                        KeyCode::Char('q') => return Ok(Flow::Quit),
                        KeyCode::Esc => return Ok(Flow::Menu),
                        code => {
                            if let Some(dir) = dir_for_key(code) {
                                last_seen[idx_for_dir(dir)] = Some(Instant::now());
                                last_pressed = Some(dir);
                            }
                        }
                    },
                    _ => {}
                },
                Event::Resize(_, _) => {
                    stdout.queue(Clear(ClearType::All))?;
                    renderer.needs_full = true;
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= settings.tick() {
            last_tick = Instant::now();
            if let Some(dir) = take_pending_dir(&mut last_seen, last_pressed, Instant::now()) {
                game.try_move(dir);
            }
            render(stdout, game, &mut renderer)?;
            if game.is_level_complete() {
                return Ok(Flow::Continue);
            }
        } else {
            render(stdout, game, &mut renderer)?;
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

fn dir_for_key(code: KeyCode) -> Option<Dir> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') => Some(Dir::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') => Some(Dir::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('h') => Some(Dir::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('l') => Some(Dir::Right),
        _ => None,
    }
}

fn render(stdout: &mut Stdout, game: &Game, renderer: &mut Renderer) -> io::Result<()> {
    let grid = game.grid();
    let needed_h = (grid.height() + 2) as u16;
    let needed_w = (grid.width() * CELL_W) as u16;

    stdout.queue(MoveTo(0, 0))?;

    let (term_w, term_h) = terminal::size()?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(Clear(ClearType::All))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        renderer.needs_full = true;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;
    if origin_x != renderer.origin_x || origin_y != renderer.origin_y {
        stdout.queue(Clear(ClearType::All))?;
        renderer.origin_x = origin_x;
        renderer.origin_y = origin_y;
        renderer.needs_full = true;
    }

    let hud = format!(
        "Moves: {}  Par: {}  Level: {}  Score: {}  (q to quit)",
        game.moves(),
        game.par(),
        game.level(),
        game.live_score()
    );
    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(0, renderer.origin_y - 1))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        let hud_x = (term_w as usize).saturating_sub(UnicodeWidthStr::width(hud.as_str())) / 2;
        stdout.queue(MoveTo(hud_x as u16, renderer.origin_y - 1))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Print(&hud))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let cell = cell_for(game, Pos { x, y });
            let idx = y * renderer.width + x;
            if renderer.needs_full || cell != renderer.last[idx] {
                renderer.last[idx] = cell;
                draw_cell(stdout, renderer, x, y, cell)?;
            }
        }
    }
    renderer.needs_full = false;

    stdout.flush()?;
    Ok(())
}

fn cell_for(game: &Game, pos: Pos) -> Cell {
    if pos == game.player() {
        return Cell {
            glyph: Glyph::Player,
            color: Color::Yellow,
        };
    }
    if pos == game.grid().exit() {
        return Cell {
            glyph: Glyph::Exit,
            color: Color::Red,
        };
    }
    if game.is_visited(pos) {
        return Cell {
            glyph: Glyph::Visited,
            color: Color::Cyan,
        };
    }
    match game.grid().cell(pos) {
        Some(MazeCell::Open) => Cell {
            glyph: Glyph::Open,
            color: Color::Reset,
        },
        _ => Cell {
            glyph: Glyph::Wall,
            color: Color::Blue,
        },
    }
}

fn draw_cell(stdout: &mut Stdout, renderer: &Renderer, x: usize, y: usize, cell: Cell) -> io::Result<()> {
    let (text, color) = match cell.glyph {
        Glyph::Player => ("😃", cell.color),
        Glyph::Exit => ("🏁", cell.color),
        Glyph::Wall => ("██", cell.color),
        Glyph::Open => ("  ", cell.color),
        Glyph::Visited => ("· ", cell.color),
    };
    let x_pos = renderer.origin_x + (x * CELL_W) as u16;
    let y_pos = renderer.origin_y + y as u16;
    stdout.queue(MoveTo(x_pos, y_pos))?;
    stdout.queue(SetForegroundColor(color))?;
    stdout.queue(Print(text))?;
    let w = UnicodeWidthStr::width(text);
    if w < CELL_W {
        for _ in 0..(CELL_W - w) {
            stdout.queue(Print(' '))?;
        }
    }
    stdout.queue(ResetColor)?;
    Ok(())
}

/// Picks the direction to move this tick and consumes its key event, so
/// each press or auto-repeat moves the player at most one cell.
fn take_pending_dir(
    last_seen: &mut [Option<Instant>; 4],
    last_pressed: Option<Dir>,
    now: Instant,
) -> Option<Dir> {
    let hold = Duration::from_millis(INPUT_HOLD_MS);
    let fresh = |t: Instant| now.saturating_duration_since(t) <= hold;

    let mut chosen = last_pressed.filter(|dir| last_seen[idx_for_dir(*dir)].map_or(false, fresh));
    if chosen.is_none() {
        let mut best: Option<(Dir, Instant)> = None;
        for (idx, dir) in [Dir::Up, Dir::Down, Dir::Left, Dir::Right].iter().enumerate() {
            if let Some(t) = last_seen[idx].filter(|t| fresh(*t)) {
                match best {
                    None => best = Some((*dir, t)),
                    Some((_, bt)) if t > bt => best = Some((*dir, t)),
                    _ => {}
                }
            }
        }
        chosen = best.map(|(dir, _)| dir);
    }

    if let Some(dir) = chosen {
        last_seen[idx_for_dir(dir)] = None;
    }
    chosen
}

fn idx_for_dir(dir: Dir) -> usize {
    match dir {
        Dir::Up => 0,
        Dir::Down => 1,
        Dir::Left => 2,
        Dir::Right => 3,
    }
}
