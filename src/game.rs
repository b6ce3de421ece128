//! Board controller: grid, live tiles, spawning, shift/merge resolution, win and lose.
//!
//! A move runs in two phases. [`Board::shift`] resolves the whole move on the data model
//! without touching it and hands the destinations to the [`Presenter`]; once the presenter's
//! animation has finished, [`Board::finish_move`] commits positions, resolves merges and spawns.

use crate::catalog::{BlockCatalog, BlockStyle, CatalogError};
use crate::grid::{Coord, Direction, Grid};
use crate::tile::{MergeState, Tile, TileArena, TileId};
use log::{debug, info};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WIN_VALUE: u32 = 2048;
pub const DEFAULT_TRAVEL: Duration = Duration::from_millis(200);

/// Tiles placed on the first spawn of a session; every later spawn places one.
const FIRST_SPAWN_AMOUNT: usize = 2;
const SPAWN_AMOUNT: usize = 1;

/// Probability that a spawned tile is a 4 rather than a 2.
pub const FOUR_PROBABILITY: f64 = 0.2;
/// Largest board side; keeps the drawn board within terminal coordinates.
pub const MAX_BOARD_SIDE: usize = 64;

/// Session state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GenerateLevel,
    SpawningBlocks,
    WaitingInput,
    Moving,
    Win,
    Lose,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Win | Self::Lose)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board must be at least 1x1, got {width}x{height}")]
    EmptyBoard { width: usize, height: usize },
    #[error("board sides are limited to {max}, got {width}x{height}")]
    BoardTooLarge {
        width: usize,
        height: usize,
        max: usize,
    },
    #[error("win value {0} must be a power of two and at least 4")]
    WinValue(u32),
    #[error("move travel time must be greater than zero")]
    ZeroTravel,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("no move is waiting for its animation to finish")]
    NoMoveInFlight,
    #[error("tile {0:?} is no longer on the board")]
    StaleTile(TileId),
}

/// Board settings fixed for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    /// Tile value that ends the session in a win.
    pub win_value: u32,
    /// Duration of one move animation.
    pub travel: Duration,
    /// Also lose when the board is full and no shift can merge anything.
    pub strict_lose: bool,
    /// Shifts that move and merge nothing do not count as a turn.
    pub skip_noop_moves: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            win_value: DEFAULT_WIN_VALUE,
            travel: DEFAULT_TRAVEL,
            strict_lose: false,
            skip_noop_moves: false,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyBoard {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_BOARD_SIDE || self.height > MAX_BOARD_SIDE {
            return Err(ConfigError::BoardTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_BOARD_SIDE,
            });
        }
        if self.win_value < 4 || !self.win_value.is_power_of_two() {
            return Err(ConfigError::WinValue(self.win_value));
        }
        if self.travel.is_zero() {
            return Err(ConfigError::ZeroTravel);
        }
        Ok(())
    }
}

/// Where one tile ends up after a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMove {
    pub tile: TileId,
    pub value: u32,
    pub from: Coord,
    /// Cell the tile stopped on.
    pub to: Coord,
    /// Where the tile is drawn at the end of the move: the merge target's cell, else `to`.
    pub display: Coord,
    /// Tile this one merges into.
    pub merge_into: Option<TileId>,
}

/// Output of resolving a shift on the data model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub direction: Direction,
    /// One entry per live tile, in processing order.
    pub moves: Vec<TileMove>,
}

impl MoveResult {
    /// Moves that end in a merge.
    pub fn merges(&self) -> impl Iterator<Item = &TileMove> + '_ {
        self.moves.iter().filter(|m| m.merge_into.is_some())
    }

    /// True when nothing slid and nothing merged.
    pub fn is_noop(&self) -> bool {
        self.moves
            .iter()
            .all(|m| m.from == m.to && m.merge_into.is_none())
    }
}

/// Presentation side of the board: receives placement, motion and end-of-game commands.
pub trait Presenter {
    /// Assign the display style of a new tile.
    fn initialize(&mut self, tile: TileId, style: &BlockStyle);
    /// Place a tile immediately.
    fn set_position(&mut self, tile: TileId, cell: Coord);
    /// Start moving every tile to its display cell; all moves start together.
    fn animate_move(&mut self, moves: &[TileMove], duration: Duration);
    fn destroy(&mut self, tile: TileId);
    fn show_win(&mut self);
    fn show_lose(&mut self);
}

/// Pick the value of a freshly spawned tile.
pub fn roll_spawn_value<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_bool(FOUR_PROBABILITY) { 4 } else { 2 }
}

/// Owns the grid and every live tile, and drives the phase machine.
#[derive(Debug)]
pub struct Board<R> {
    config: BoardConfig,
    catalog: BlockCatalog,
    grid: Grid,
    tiles: TileArena,
    phase: Phase,
    /// Spawn steps taken this session; the first one places two tiles.
    round: u32,
    moves_made: u32,
    pending: Option<MoveResult>,
    rng: R,
}

impl<R: Rng> Board<R> {
    /// Validate configuration and catalog, then build an idle board. Call [`Board::start`] to play.
    pub fn new(config: BoardConfig, catalog: BlockCatalog, rng: R) -> Result<Self, GameError> {
        config.validate()?;
        catalog.validate(config.win_value)?;
        Ok(Self {
            grid: Grid::new(config.width, config.height),
            config,
            catalog,
            tiles: TileArena::new(),
            phase: Phase::GenerateLevel,
            round: 0,
            moves_made: 0,
            pending: None,
            rng,
        })
    }

    /// Generate a fresh level and spawn the opening tiles. Also used to restart.
    pub fn start(&mut self, presenter: &mut impl Presenter) -> Result<(), GameError> {
        self.set_phase(Phase::GenerateLevel);
        for (id, _) in self.tiles.iter() {
            presenter.destroy(id);
        }
        self.grid = Grid::new(self.config.width, self.config.height);
        self.tiles.clear();
        debug_assert!(self.tiles.is_empty());
        self.round = 0;
        self.moves_made = 0;
        self.pending = None;
        info!(
            "new {}x{} board, win at {}",
            self.config.width, self.config.height, self.config.win_value
        );
        self.enter_spawning(presenter)
    }

    /// Request a shift. Returns `Ok(false)` when the request is ignored.
    pub fn shift(
        &mut self,
        direction: Direction,
        presenter: &mut impl Presenter,
    ) -> Result<bool, GameError> {
        if self.phase != Phase::WaitingInput {
            debug!("ignoring {:?} while {:?}", direction, self.phase);
            return Ok(false);
        }
        self.set_phase(Phase::Moving);
        let result = self.compute_move(direction);
        if self.config.skip_noop_moves && result.is_noop() {
            debug!("{:?} changes nothing, not counted", direction);
            self.set_phase(Phase::WaitingInput);
            return Ok(false);
        }
        self.moves_made += 1;
        presenter.animate_move(&result.moves, self.config.travel);
        self.pending = Some(result);
        Ok(true)
    }

    /// Completion signal for the move animation: commit the move, then spawn.
    pub fn finish_move(&mut self, presenter: &mut impl Presenter) -> Result<(), GameError> {
        if self.phase != Phase::Moving {
            return Err(GameError::NoMoveInFlight);
        }
        let result = self.pending.take().ok_or(GameError::NoMoveInFlight)?;
        self.commit_move(&result, presenter)?;
        self.enter_spawning(presenter)
    }

    /// Resolve a shift without changing the board.
    pub fn compute_move(&self, direction: Direction) -> MoveResult {
        let mut order: Vec<(TileId, Tile)> = self.tiles.iter().map(|(id, t)| (id, *t)).collect();
        order.sort_by_key(|(_, t)| (t.cell.x, t.cell.y));
        if direction.processes_descending() {
            order.reverse();
        }

        let mut occupancy = self.grid.clone();
        let mut stops: HashMap<TileId, Coord> = HashMap::with_capacity(order.len());
        let mut receiving: HashSet<TileId> = HashSet::new();
        let mut targets: HashMap<TileId, TileId> = HashMap::new();

        for &(id, tile) in &order {
            let mut current = tile.cell;
            while let Some(next) = occupancy.neighbor(current, direction) {
                match occupancy.occupant(next) {
                    None => {
                        occupancy.clear_occupant(current);
                        occupancy.set_occupant(next, id);
                        current = next;
                    }
                    Some(other) => {
                        let mergeable = self.tiles.get(other).is_some_and(|o| {
                            o.can_merge(
                                tile.value,
                                MergeState {
                                    receiving: receiving.contains(&other),
                                    merging_away: targets.contains_key(&other),
                                },
                            )
                        });
                        if mergeable {
                            targets.insert(id, other);
                            receiving.insert(other);
                            occupancy.clear_occupant(current);
                        }
                        break;
                    }
                }
            }
            stops.insert(id, current);
        }

        let moves = order
            .iter()
            .map(|&(id, tile)| {
                let to = stops.get(&id).copied().unwrap_or(tile.cell);
                let merge_into = targets.get(&id).copied();
                let display = merge_into
                    .and_then(|t| stops.get(&t).copied())
                    .unwrap_or(to);
                TileMove {
                    tile: id,
                    value: tile.value,
                    from: tile.cell,
                    to,
                    display,
                    merge_into,
                }
            })
            .collect();
        MoveResult { direction, moves }
    }

    /// Write final cells back and resolve merges.
    fn commit_move(
        &mut self,
        result: &MoveResult,
        presenter: &mut impl Presenter,
    ) -> Result<(), GameError> {
        self.grid.clear();
        for m in &result.moves {
            let tile = self.tiles.get_mut(m.tile).ok_or(GameError::StaleTile(m.tile))?;
            tile.cell = m.to;
            // A tile merging away has already vacated its cell.
            if m.merge_into.is_none() {
                self.grid.set_occupant(m.to, m.tile);
            }
        }
        for m in result.merges() {
            if let Some(target) = m.merge_into {
                self.merge_blocks(target, m.tile, presenter)?;
            }
        }
        Ok(())
    }

    fn merge_blocks(
        &mut self,
        target: TileId,
        source: TileId,
        presenter: &mut impl Presenter,
    ) -> Result<(), GameError> {
        let base = *self.tiles.get(target).ok_or(GameError::StaleTile(target))?;
        let merged = base.value.saturating_mul(2);
        self.spawn_block(base.cell, merged, presenter)?;
        self.remove_block(target, presenter);
        self.remove_block(source, presenter);
        debug!("merged {} + {} at {:?}", base.value, base.value, base.cell);
        Ok(())
    }

    fn remove_block(&mut self, id: TileId, presenter: &mut impl Presenter) {
        if let Some(tile) = self.tiles.remove(id) {
            if self.grid.occupant(tile.cell) == Some(id) {
                self.grid.clear_occupant(tile.cell);
            }
            presenter.destroy(id);
        }
    }

    fn spawn_block(
        &mut self,
        cell: Coord,
        value: u32,
        presenter: &mut impl Presenter,
    ) -> Result<TileId, GameError> {
        let style = self.catalog.style(value)?;
        let id = self.tiles.insert(Tile { value, cell });
        self.grid.set_occupant(cell, id);
        presenter.initialize(id, style);
        presenter.set_position(id, cell);
        Ok(id)
    }

    fn enter_spawning(&mut self, presenter: &mut impl Presenter) -> Result<(), GameError> {
        self.set_phase(Phase::SpawningBlocks);
        let amount = if self.round == 0 {
            FIRST_SPAWN_AMOUNT
        } else {
            SPAWN_AMOUNT
        };
        self.round += 1;
        self.spawn_blocks(amount, presenter)
    }

    fn spawn_blocks(
        &mut self,
        amount: usize,
        presenter: &mut impl Presenter,
    ) -> Result<(), GameError> {
        let mut free = self.grid.empty_cells();
        let free_before = free.len();
        free.shuffle(&mut self.rng);
        for &cell in free.iter().take(amount) {
            let value = roll_spawn_value(&mut self.rng);
            self.spawn_block(cell, value, presenter)?;
        }

        // The classic rule only looks at the count before spawning; a full board with zero
        // free cells is caught by `strict_lose` alone.
        let stuck =
            self.config.strict_lose && self.grid.empty_cells().is_empty() && !self.has_legal_move();
        if free_before == 1 || stuck {
            self.set_phase(Phase::Lose);
            presenter.show_lose();
            return Ok(());
        }
        if self
            .tiles
            .iter()
            .any(|(_, t)| t.value == self.config.win_value)
        {
            self.set_phase(Phase::Win);
            presenter.show_win();
            return Ok(());
        }
        self.set_phase(Phase::WaitingInput);
        Ok(())
    }

    fn set_phase(&mut self, phase: Phase) {
        if phase.is_terminal() {
            info!("game over: {:?} after {} moves", phase, self.moves_made);
        } else {
            debug!("{:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
    }
}

impl<R> Board<R> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> + '_ {
        self.tiles.iter()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_at(&self, cell: Coord) -> Option<&Tile> {
        self.grid.occupant(cell).and_then(|id| self.tiles.get(id))
    }

    pub fn largest_tile(&self) -> Option<u32> {
        self.tiles.iter().map(|(_, t)| t.value).max()
    }

    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    /// Move waiting for its animation, if any.
    pub fn pending_move(&self) -> Option<&MoveResult> {
        self.pending.as_ref()
    }

    /// True if some shift would slide or merge a tile.
    pub fn has_legal_move(&self) -> bool {
        if self.tiles.len() < self.grid.len() {
            return true;
        }
        self.tiles.iter().any(|(_, t)| {
            [Direction::Right, Direction::Up].iter().any(|&d| {
                self.grid
                    .neighbor(t.cell, d)
                    .and_then(|n| self.tile_at(n))
                    .is_some_and(|n| n.value == t.value)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Initialize(TileId, u32),
        SetPosition(TileId, Coord),
        Animate(Vec<(TileId, Coord)>),
        Destroy(TileId),
        Win,
        Lose,
    }

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl Presenter for Recorder {
        fn initialize(&mut self, tile: TileId, style: &BlockStyle) {
            self.events.push(Event::Initialize(tile, style.value));
        }
        fn set_position(&mut self, tile: TileId, cell: Coord) {
            self.events.push(Event::SetPosition(tile, cell));
        }
        fn animate_move(&mut self, moves: &[TileMove], _duration: Duration) {
            self.events
                .push(Event::Animate(moves.iter().map(|m| (m.tile, m.display)).collect()));
        }
        fn destroy(&mut self, tile: TileId) {
            self.events.push(Event::Destroy(tile));
        }
        fn show_win(&mut self) {
            self.events.push(Event::Win);
        }
        fn show_lose(&mut self) {
            self.events.push(Event::Lose);
        }
    }

    fn config(width: usize, height: usize) -> BoardConfig {
        BoardConfig {
            width,
            height,
            ..BoardConfig::default()
        }
    }

    fn new_board(config: BoardConfig, seed: u64) -> Board<StdRng> {
        let catalog = BlockCatalog::from_theme(&Theme::default(), config.win_value);
        Board::new(config, catalog, StdRng::seed_from_u64(seed)).unwrap()
    }

    /// Board in `WaitingInput` with exactly the given tiles, past its opening spawn.
    fn board_with(config: BoardConfig, tiles: &[(i32, i32, u32)]) -> (Board<StdRng>, Recorder) {
        let mut board = new_board(config, 11);
        let mut rec = Recorder::default();
        for &(x, y, v) in tiles {
            board.spawn_block(Coord::new(x, y), v, &mut rec).unwrap();
        }
        board.round = 1;
        board.phase = Phase::WaitingInput;
        rec.events.clear();
        (board, rec)
    }

    fn layout<R>(board: &Board<R>) -> BTreeMap<(i32, i32), u32> {
        board
            .tiles()
            .map(|(_, t)| ((t.cell.x, t.cell.y), t.value))
            .collect()
    }

    fn expected(tiles: &[(i32, i32, u32)]) -> BTreeMap<(i32, i32), u32> {
        tiles.iter().map(|&(x, y, v)| ((x, y), v)).collect()
    }

    /// Shift and commit without the following spawn, leaving the board ready for input.
    fn shift_and_commit(board: &mut Board<StdRng>, rec: &mut Recorder, dir: Direction) {
        assert!(board.shift(dir, rec).unwrap());
        let result = board.pending.take().unwrap();
        board.commit_move(&result, rec).unwrap();
        board.phase = Phase::WaitingInput;
    }

    fn assert_occupancy_consistent<R>(board: &Board<R>) {
        let mut seen = HashSet::new();
        for (id, t) in board.tiles() {
            assert!(seen.insert(t.cell), "two tiles on {:?}", t.cell);
            assert_eq!(board.grid().occupant(t.cell), Some(id));
        }
        let occupied = board
            .grid()
            .coords()
            .filter(|&c| board.grid().occupant(c).is_some())
            .count();
        assert_eq!(occupied, board.tile_count());
    }

    #[test]
    fn test_start_spawns_two_tiles() {
        let mut board = new_board(config(4, 4), 3);
        let mut rec = Recorder::default();
        board.start(&mut rec).unwrap();
        assert_eq!(board.phase(), Phase::WaitingInput);
        assert_eq!(board.tile_count(), 2);
        assert_occupancy_consistent(&board);
        let inits = rec
            .events
            .iter()
            .filter(|e| matches!(e, Event::Initialize(_, v) if *v == 2 || *v == 4))
            .count();
        let placements = rec
            .events
            .iter()
            .filter(|e| matches!(e, Event::SetPosition(..)))
            .count();
        assert_eq!((inits, placements), (2, 2));
    }

    #[test]
    fn test_restart_destroys_previous_tiles() {
        let mut board = new_board(config(4, 4), 5);
        let mut rec = Recorder::default();
        board.start(&mut rec).unwrap();
        let old: Vec<TileId> = board.tiles().map(|(id, _)| id).collect();
        rec.events.clear();
        board.start(&mut rec).unwrap();
        for id in old {
            assert!(rec.events.contains(&Event::Destroy(id)));
        }
        assert_eq!(board.tile_count(), 2);
        assert_eq!(board.moves_made(), 0);
    }

    #[test]
    fn test_simple_merge() {
        let (mut board, mut rec) = board_with(config(4, 4), &[(0, 0, 2), (1, 0, 2)]);
        let a = board.grid().occupant(Coord::new(0, 0)).unwrap();
        let b = board.grid().occupant(Coord::new(1, 0)).unwrap();
        shift_and_commit(&mut board, &mut rec, Direction::Left);

        assert_eq!(layout(&board), expected(&[(0, 0, 4)]));
        assert_occupancy_consistent(&board);
        // Both tiles slide onto the target's cell, then the merge replaces them.
        assert_eq!(
            rec.events[0],
            Event::Animate(vec![(a, Coord::new(0, 0)), (b, Coord::new(0, 0))])
        );
        assert!(matches!(rec.events[1], Event::Initialize(_, 4)));
        assert!(matches!(rec.events[2], Event::SetPosition(_, c) if c == Coord::new(0, 0)));
        assert_eq!(rec.events[3], Event::Destroy(a));
        assert_eq!(rec.events[4], Event::Destroy(b));
    }

    #[test]
    fn test_chain_block_stays_put() {
        let tiles = [(0, 0, 2), (1, 0, 4), (2, 0, 2)];
        let (mut board, mut rec) = board_with(config(4, 4), &tiles);
        let result = board.compute_move(Direction::Left);
        assert!(result.is_noop());
        shift_and_commit(&mut board, &mut rec, Direction::Left);
        assert_eq!(layout(&board), expected(&tiles));
    }

    #[test]
    fn test_ordering_on_strip() {
        let strip = [(0, 0, 2), (1, 0, 2), (3, 0, 4)];

        let (mut board, mut rec) = board_with(config(4, 1), &strip);
        let result = board.compute_move(Direction::Right);
        let mut resting = HashSet::new();
        for m in result.moves.iter().filter(|m| m.merge_into.is_none()) {
            assert!(resting.insert(m.to), "two tiles stop on {:?}", m.to);
        }
        shift_and_commit(&mut board, &mut rec, Direction::Right);
        assert_eq!(layout(&board), expected(&[(2, 0, 4), (3, 0, 4)]));

        let (mut board, mut rec) = board_with(config(4, 1), &strip);
        let result = board.compute_move(Direction::Left);
        // The 4 slides through the cell the merging 2 vacated but stops short of the receiver.
        let four = result.moves.iter().find(|m| m.value == 4).unwrap();
        assert_eq!((four.from, four.to), (Coord::new(3, 0), Coord::new(1, 0)));
        shift_and_commit(&mut board, &mut rec, Direction::Left);
        assert_eq!(layout(&board), expected(&[(0, 0, 4), (1, 0, 4)]));
    }

    #[test]
    fn test_receiver_merges_once_per_move() {
        let (mut board, mut rec) = board_with(config(4, 1), &[(0, 0, 2), (1, 0, 2), (2, 0, 2), (3, 0, 2)]);
        shift_and_commit(&mut board, &mut rec, Direction::Left);
        assert_eq!(layout(&board), expected(&[(0, 0, 4), (1, 0, 4)]));

        let (mut board, mut rec) = board_with(config(4, 1), &[(0, 0, 4), (1, 0, 2), (2, 0, 2)]);
        shift_and_commit(&mut board, &mut rec, Direction::Left);
        assert_eq!(layout(&board), expected(&[(0, 0, 4), (1, 0, 4)]));
    }

    #[test]
    fn test_vertical_moves() {
        let (mut board, mut rec) = board_with(config(4, 4), &[(2, 0, 8), (2, 3, 8), (0, 1, 2)]);
        shift_and_commit(&mut board, &mut rec, Direction::Up);
        assert_eq!(layout(&board), expected(&[(2, 3, 16), (0, 3, 2)]));
        shift_and_commit(&mut board, &mut rec, Direction::Down);
        assert_eq!(layout(&board), expected(&[(2, 0, 16), (0, 0, 2)]));
    }

    #[test]
    fn test_vertical_moves_through_finish() {
        let (mut board, mut rec) = board_with(config(1, 4), &[(0, 0, 2), (0, 1, 2), (0, 3, 4)]);
        assert!(board.shift(Direction::Down, &mut rec).unwrap());
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.phase(), Phase::WaitingInput);
        let values: Vec<u32> = (0..2)
            .filter_map(|y| board.tile_at(Coord::new(0, y)).map(|t| t.value))
            .collect();
        assert_eq!(values, vec![4, 4]);
        // One spawn lands on one of the two cells above.
        assert_eq!(board.tile_count(), 3);

        assert!(board.shift(Direction::Up, &mut rec).unwrap());
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.tile_at(Coord::new(0, 3)).map(|t| t.value).unwrap() % 2, 0);
        assert_occupancy_consistent(&board);
    }

    #[test]
    fn test_win_detection() {
        let (mut board, mut rec) = board_with(config(4, 4), &[(0, 0, 1024), (1, 0, 1024)]);
        assert!(board.shift(Direction::Left, &mut rec).unwrap());
        assert_eq!(board.phase(), Phase::Moving);
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.phase(), Phase::Win);
        assert_eq!(rec.events.iter().filter(|e| **e == Event::Win).count(), 1);
        assert_eq!(board.largest_tile(), Some(2048));

        rec.events.clear();
        assert!(!board.shift(Direction::Right, &mut rec).unwrap());
        assert!(rec.events.is_empty());
        assert_eq!(board.phase(), Phase::Win);
    }

    #[test]
    fn test_small_win_value() {
        let cfg = BoardConfig {
            win_value: 8,
            ..config(4, 4)
        };
        let (mut board, mut rec) = board_with(cfg, &[(0, 0, 4), (0, 1, 4)]);
        board.shift(Direction::Down, &mut rec).unwrap();
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.phase(), Phase::Win);
    }

    #[test]
    fn test_lose_when_one_cell_was_free() {
        let (mut board, mut rec) = board_with(config(2, 2), &[(0, 0, 2), (1, 0, 4), (0, 1, 8)]);
        assert!(board.shift(Direction::Left, &mut rec).unwrap());
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.phase(), Phase::Lose);
        assert_eq!(board.tile_count(), 4);
        assert_eq!(rec.events.last(), Some(&Event::Lose));
        assert!(!board.shift(Direction::Up, &mut rec).unwrap());
    }

    #[test]
    fn test_full_board_without_moves_needs_strict_rule() {
        let tiles = [(0, 0, 8), (1, 1, 16)];

        let (mut board, mut rec) = board_with(config(2, 2), &tiles);
        board.round = 0;
        board.enter_spawning(&mut rec).unwrap();
        assert_eq!(board.tile_count(), 4);
        assert!(!board.has_legal_move());
        assert_eq!(board.phase(), Phase::WaitingInput);

        let strict = BoardConfig {
            strict_lose: true,
            ..config(2, 2)
        };
        let (mut board, mut rec) = board_with(strict, &tiles);
        board.round = 0;
        board.enter_spawning(&mut rec).unwrap();
        assert_eq!(board.phase(), Phase::Lose);
    }

    #[test]
    fn test_has_legal_move() {
        let (board, _) = board_with(config(2, 2), &[(0, 0, 2), (1, 0, 4), (0, 1, 8), (1, 1, 4)]);
        assert!(board.has_legal_move());
        let (board, _) = board_with(config(2, 2), &[(0, 0, 2), (1, 0, 4), (0, 1, 8), (1, 1, 16)]);
        assert!(!board.has_legal_move());
        let (board, _) = board_with(config(2, 2), &[(0, 0, 2)]);
        assert!(board.has_legal_move());
    }

    #[test]
    fn test_noop_move_still_spawns_by_default() {
        let (mut board, mut rec) = board_with(config(4, 4), &[(0, 0, 2)]);
        assert!(board.shift(Direction::Left, &mut rec).unwrap());
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.tile_count(), 2);
        assert_eq!(board.moves_made(), 1);
    }

    #[test]
    fn test_noop_move_skipped_when_configured() {
        let cfg = BoardConfig {
            skip_noop_moves: true,
            ..config(4, 4)
        };
        let (mut board, mut rec) = board_with(cfg, &[(0, 0, 2)]);
        assert!(!board.shift(Direction::Left, &mut rec).unwrap());
        assert_eq!(board.phase(), Phase::WaitingInput);
        assert!(rec.events.is_empty());
        assert!(board.shift(Direction::Right, &mut rec).unwrap());
    }

    #[test]
    fn test_input_ignored_outside_waiting() {
        let (mut board, mut rec) = board_with(config(4, 4), &[(0, 0, 2), (3, 0, 2)]);
        assert!(board.shift(Direction::Left, &mut rec).unwrap());
        assert!(!board.shift(Direction::Right, &mut rec).unwrap());
        assert_eq!(board.moves_made(), 1);
        board.finish_move(&mut rec).unwrap();
        assert_eq!(board.finish_move(&mut rec), Err(GameError::NoMoveInFlight));
    }

    #[test]
    fn test_board_untouched_until_finish() {
        let (mut board, mut rec) = board_with(config(4, 4), &[(3, 2, 2), (0, 2, 2)]);
        let before = layout(&board);
        board.shift(Direction::Left, &mut rec).unwrap();
        assert_eq!(layout(&board), before);
        assert!(board.pending_move().is_some());
        board.finish_move(&mut rec).unwrap();
        assert!(board.pending_move().is_none());
        assert_eq!(board.tile_at(Coord::new(0, 2)).map(|t| t.value), Some(4));
    }

    #[test]
    fn test_invalid_setup_rejected() {
        let catalog = BlockCatalog::from_theme(&Theme::default(), 2048);
        let rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Board::new(config(0, 4), catalog.clone(), rng.clone()).err(),
            Some(GameError::Config(ConfigError::EmptyBoard { width: 0, height: 4 }))
        );
        let odd = BoardConfig {
            win_value: 1000,
            ..config(4, 4)
        };
        assert_eq!(
            Board::new(odd, catalog.clone(), rng.clone()).err(),
            Some(GameError::Config(ConfigError::WinValue(1000)))
        );
        let instant = BoardConfig {
            travel: Duration::ZERO,
            ..config(4, 4)
        };
        assert_eq!(
            Board::new(instant, catalog.clone(), rng.clone()).err(),
            Some(GameError::Config(ConfigError::ZeroTravel))
        );
        assert_eq!(
            Board::new(config(MAX_BOARD_SIDE + 1, 4), catalog.clone(), rng.clone()).err(),
            Some(GameError::Config(ConfigError::BoardTooLarge {
                width: MAX_BOARD_SIDE + 1,
                height: 4,
                max: MAX_BOARD_SIDE,
            }))
        );
        assert!(config(MAX_BOARD_SIDE, MAX_BOARD_SIDE).validate().is_ok());
        let bigger = BoardConfig {
            win_value: 4096,
            ..config(4, 4)
        };
        assert_eq!(
            Board::new(bigger, catalog, rng).err(),
            Some(GameError::Catalog(CatalogError::MissingStyle(4096)))
        );
    }

    #[test]
    fn test_spawn_distribution() {
        let mut rng = StdRng::seed_from_u64(2048);
        let trials = 20_000;
        let fours = (0..trials)
            .filter(|_| roll_spawn_value(&mut rng) == 4)
            .count();
        let ratio = fours as f64 / trials as f64;
        assert!((0.185..0.215).contains(&ratio), "ratio of fours {}", ratio);
    }

    #[test]
    fn test_random_play_keeps_invariants() {
        for seed in 0..8 {
            let mut board = new_board(config(4, 4), seed);
            let mut rec = Recorder::default();
            board.start(&mut rec).unwrap();
            for step in 0..400 {
                if board.phase().is_terminal() {
                    break;
                }
                assert_occupancy_consistent(&board);
                let dir = Direction::ALL[(step * 7 + seed as usize) % 4];
                assert!(board.shift(dir, &mut rec).unwrap());
                let result = board.pending_move().cloned().unwrap();
                let values: HashMap<TileId, u32> = board.tiles().map(|(id, t)| (id, t.value)).collect();
                board.finish_move(&mut rec).unwrap();
                for m in result.merges() {
                    let target = m.merge_into.unwrap();
                    assert_eq!(values[&target], m.value);
                    assert_eq!(
                        board.tile_at(m.display).map(|t| t.value),
                        Some(m.value * 2)
                    );
                }
            }
        }
    }
}
