//! Tiles and the arena that owns them.

use crate::grid::Coord;

/// Stable handle to a live tile. A removed slot bumps its generation, so old ids stop resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    index: u32,
    generation: u32,
}

/// Game piece: a power-of-two value sitting on one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub value: u32,
    pub cell: Coord,
}

/// Merge bookkeeping of a tile during one move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeState {
    /// Already the target of a merge this move.
    pub receiving: bool,
    /// Merging into another tile this move.
    pub merging_away: bool,
}

impl Tile {
    /// Merge guard on the receiving side: same value, not already receiving,
    /// and not itself merging away.
    pub fn can_merge(&self, value: u32, state: MergeState) -> bool {
        self.value == value && !state.receiving && !state.merging_away
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    tile: Option<Tile>,
}

/// Generational arena of tiles.
#[derive(Debug, Clone, Default)]
pub struct TileArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl TileArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile: Tile) -> TileId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.tile = Some(tile);
            return TileId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            tile: Some(tile),
        });
        TileId {
            index,
            generation: 0,
        }
    }

    /// Remove a tile; returns it if `id` was live.
    pub fn remove(&mut self, id: TileId) -> Option<Tile> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let tile = slot.tile.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(tile)
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.tile.as_ref())
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.tile.as_mut())
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Remove every tile. Slots are kept so ids issued before the clear stay stale.
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.tile.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(i as u32);
            }
        }
        self.live = 0;
    }

    /// Live tiles in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.tile.as_ref().map(|t| {
                (
                    TileId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    t,
                )
            })
        })
    }
}
