//! tui2048: 2048-style sliding tile puzzle in the terminal.

mod app;
mod catalog;
mod game;
mod grid;
mod input;
mod theme;
mod tile;
mod ui;
mod view;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use env_logger::{Env, Target};
use game::BoardConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub board: BoardConfig,
    pub seed: Option<u64>,
    pub no_animation: bool,
    pub frame_rate: f64,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Self {
        // Without animation the tween never runs, so any travel is accepted.
        let travel_ms = if args.no_animation {
            args.travel_ms.max(1)
        } else {
            args.travel_ms
        };
        Self {
            board: BoardConfig {
                width: args.width as usize,
                height: args.height as usize,
                win_value: args.win_value,
                travel: Duration::from_millis(travel_ms),
                strict_lose: args.strict_lose,
                skip_noop_moves: args.skip_noop_moves,
            },
            seed: args.seed,
            no_animation: args.no_animation,
            frame_rate: args.frame_rate,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette)
        .context("failed to load theme")?;
    let config = GameConfig::from_args(&args);
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Send `log` records to a file; without one, logging stays off so the screen is not disturbed.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// 2048-style sliding tile puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tui2048",
    version,
    about = "2048-style sliding tile puzzle in the terminal. Slide tiles, merge equal values, reach 2048.",
    long_about = "tui2048 is a terminal take on the 2048 sliding tile puzzle.\n\n\
        Every move slides all tiles as far as they go in one direction. Two tiles of the same \
        value that collide merge into one of double value. A new 2 or 4 appears after every move. \
        Reach the win value to win; run out of room to lose.\n\n\
        CONTROLS:\n  Arrows / hjkl / wasd  Slide    R  Restart    Q / Esc  Quit menu\n\n\
        Use --theme to load a btop-style theme; tile colours use keys like theme[tile_2048]=\"#EDC22E\"."
)]
pub struct Args {
    /// Board width in cells.
    #[arg(
        long,
        default_value = "4",
        value_name = "COLS",
        value_parser = clap::value_parser!(u16).range(1..=game::MAX_BOARD_SIDE as i64)
    )]
    pub width: u16,

    /// Board height in cells.
    #[arg(
        long,
        default_value = "4",
        value_name = "ROWS",
        value_parser = clap::value_parser!(u16).range(1..=game::MAX_BOARD_SIDE as i64)
    )]
    pub height: u16,

    /// Tile value that wins the game (power of two).
    #[arg(long, default_value = "2048", value_name = "N")]
    pub win_value: u32,

    /// Duration of the slide animation in ms.
    #[arg(long, default_value = "200", value_name = "MS")]
    pub travel_ms: u64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the classic palette if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for tile spawns; the same seed and moves replay the same game.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Disable slide and spawn animations.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Also lose when the board is full and no slide can merge anything.
    #[arg(long)]
    pub strict_lose: bool,

    /// Moves that change nothing do not spawn a new tile.
    #[arg(long)]
    pub skip_noop_moves: bool,

    /// Write debug logs to this file (RUST_LOG overrides the level).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
