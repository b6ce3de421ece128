//! App: terminal init, main loop, key handling and move completion.

use crate::GameConfig;
use crate::catalog::BlockCatalog;
use crate::game::{Board, Phase};
use crate::grid::Direction;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::view::TileView;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Finished,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    NewGame,
    Exit,
}

impl QuitOption {
    fn next(self) -> Self {
        match self {
            Self::Resume => Self::NewGame,
            Self::NewGame => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::NewGame => Self::Resume,
            Self::Exit => Self::NewGame,
        }
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    board: Board<StdRng>,
    view: TileView,
    screen: Screen,
    quit_selected: QuitOption,
    /// Restart asked for while a move was animating; honoured once it lands.
    restart_requested: bool,
}

impl App {
    /// Builds and validates the board; fails before the terminal is touched.
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let catalog = BlockCatalog::from_theme(&theme, config.board.win_value);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let board = Board::new(config.board.clone(), catalog, rng)?;
        let view = TileView::new(config.no_animation);
        Ok(Self {
            config,
            theme,
            board,
            view,
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            restart_requested: false,
        })
    }

    fn start_game(&mut self) -> Result<()> {
        self.view.reset();
        self.board.start(&mut self.view)?;
        self.restart_requested = false;
        self.screen = if self.board.phase().is_terminal() {
            Screen::Finished
        } else {
            Screen::Playing
        };
        Ok(())
    }

    /// Moves cannot be cancelled, so a restart during one waits for it to land.
    fn request_restart(&mut self) -> Result<()> {
        if self.board.phase() == Phase::Moving {
            self.restart_requested = true;
            self.screen = Screen::Playing;
            Ok(())
        } else {
            self.start_game()
        }
    }

    fn resume(&mut self) {
        self.screen = if self.board.phase().is_terminal() {
            Screen::Finished
        } else {
            Screen::Playing
        };
    }

    /// Hand the board its completion signal once the slide tween is done.
    fn complete_move(&mut self, now: Instant) -> Result<()> {
        if self.board.phase() != Phase::Moving || !self.view.is_settled(now) {
            return Ok(());
        }
        self.view.settle();
        self.board.finish_move(&mut self.view)?;
        if self.restart_requested {
            return self.start_game();
        }
        if self.screen == Screen::Playing && self.board.phase().is_terminal() {
            self.screen = Screen::Finished;
        }
        Ok(())
    }

    /// Returns true when the app should exit.
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Playing => match action {
                Action::Shift(direction) => {
                    self.board.shift(direction, &mut self.view)?;
                }
                Action::Restart => self.request_restart()?,
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::Confirm | Action::None => {}
            },
            Screen::Finished => match action {
                Action::Restart | Action::Confirm => self.request_restart()?,
                Action::Quit => return Ok(true),
                Action::Shift(_) | Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Shift(Direction::Down | Direction::Right) => {
                    self.quit_selected = self.quit_selected.next();
                }
                Action::Shift(Direction::Up | Direction::Left) => {
                    self.quit_selected = self.quit_selected.prev();
                }
                Action::Confirm => match self.quit_selected {
                    QuitOption::Resume => self.resume(),
                    QuitOption::NewGame => self.request_restart()?,
                    QuitOption::Exit => return Ok(true),
                },
                Action::Restart => self.request_restart()?,
                Action::Quit => self.resume(),
                Action::None => {}
            },
        }
        Ok(false)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.start_game().and_then(|()| self.run_loop(&mut terminal));

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        info!(
            "session ended: {:?}, {} moves, largest tile {:?}",
            self.board.phase(),
            self.board.moves_made(),
            self.board.largest_tile()
        );
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.board,
                    &mut self.view,
                    &self.theme,
                    self.quit_selected,
                    now,
                )
            })?;

            self.complete_move(Instant::now())?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_action(key_to_action(key))? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
