//! Terminal side of the board: sprite positions, the move tween and spawn fades.

use crate::catalog::BlockStyle;
use crate::game::{Presenter, TileMove};
use crate::grid::Coord;
use crate::tile::TileId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tachyonfx::{Effect, Interpolation};

/// End-of-game banner requested by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

/// One drawn tile.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub style: BlockStyle,
    from: Coord,
    to: Coord,
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    started: Instant,
    duration: Duration,
}

/// Implements [`Presenter`] for the terminal UI.
pub struct TileView {
    sprites: HashMap<TileId, Sprite>,
    motion: Option<Motion>,
    /// Tiles placed since the last spawn effect was built.
    fresh: Vec<TileId>,
    /// TachyonFX fade-in for freshly spawned tiles (built lazily by the UI).
    pub spawn_effect: Option<Effect>,
    /// Last time the spawn effect was processed (for delta).
    pub spawn_effect_time: Option<Instant>,
    outcome: Option<Outcome>,
    no_animation: bool,
}

impl TileView {
    pub fn new(no_animation: bool) -> Self {
        Self {
            sprites: HashMap::new(),
            motion: None,
            fresh: Vec::new(),
            spawn_effect: None,
            spawn_effect_time: None,
            outcome: None,
            no_animation,
        }
    }

    /// True once the current move tween has run its full duration.
    pub fn is_settled(&self, now: Instant) -> bool {
        self.motion
            .is_none_or(|m| now.saturating_duration_since(m.started) >= m.duration)
    }

    /// False under `--no-animation`; spawn fades are skipped too.
    pub fn animates(&self) -> bool {
        !self.no_animation
    }

    /// Snap every sprite to its destination and drop the tween.
    pub fn settle(&mut self) {
        self.motion = None;
        for sprite in self.sprites.values_mut() {
            sprite.from = sprite.to;
        }
    }

    /// Tween progress in 0..=1 after easing.
    fn progress(&self, now: Instant) -> f32 {
        match self.motion {
            Some(m) if !m.duration.is_zero() => {
                let t = now.saturating_duration_since(m.started).as_secs_f32()
                    / m.duration.as_secs_f32();
                if t >= 1.0 {
                    1.0
                } else {
                    Interpolation::QuadOut.alpha(t)
                }
            }
            _ => 1.0,
        }
    }

    /// Sprites with their interpolated lattice position at `now`.
    pub fn sprites_at(&self, now: Instant) -> Vec<(TileId, &Sprite, (f32, f32))> {
        let a = self.progress(now);
        let mut out: Vec<_> = self
            .sprites
            .iter()
            .map(|(&id, s)| {
                let x = s.from.x as f32 + (s.to.x - s.from.x) as f32 * a;
                let y = s.from.y as f32 + (s.to.y - s.from.y) as f32 * a;
                (id, s, (x, y))
            })
            .collect();
        // Lower values first so a merge source never hides under its receiver.
        out.sort_by_key(|(id, s, _)| (s.style.value, *id));
        out
    }

    /// Cells of tiles spawned since the last call; resets the spawn fade.
    pub fn take_fresh(&mut self) -> Vec<Coord> {
        let cells = self
            .fresh
            .drain(..)
            .filter_map(|id| self.sprites.get(&id).map(|s| s.to))
            .collect();
        cells
    }

    pub fn has_fresh(&self) -> bool {
        !self.fresh.is_empty()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Forget everything; used when a new game starts.
    pub fn reset(&mut self) {
        self.sprites.clear();
        self.motion = None;
        self.fresh.clear();
        self.spawn_effect = None;
        self.spawn_effect_time = None;
        self.outcome = None;
    }
}

impl Presenter for TileView {
    fn initialize(&mut self, tile: TileId, style: &BlockStyle) {
        let origin = Coord::new(0, 0);
        self.sprites.insert(
            tile,
            Sprite {
                style: style.clone(),
                from: origin,
                to: origin,
            },
        );
    }

    fn set_position(&mut self, tile: TileId, cell: Coord) {
        if let Some(sprite) = self.sprites.get_mut(&tile) {
            sprite.from = cell;
            sprite.to = cell;
            self.fresh.push(tile);
        }
    }

    fn animate_move(&mut self, moves: &[TileMove], duration: Duration) {
        for m in moves {
            if let Some(sprite) = self.sprites.get_mut(&m.tile) {
                sprite.from = sprite.to;
                sprite.to = m.display;
            }
        }
        let duration = if self.no_animation {
            Duration::ZERO
        } else {
            duration
        };
        self.motion = Some(Motion {
            started: Instant::now(),
            duration,
        });
    }

    fn destroy(&mut self, tile: TileId) {
        self.sprites.remove(&tile);
        self.fresh.retain(|&id| id != tile);
    }

    fn show_win(&mut self) {
        self.outcome = Some(Outcome::Win);
    }

    fn show_lose(&mut self) {
        self.outcome = Some(Outcome::Lose);
    }
}
