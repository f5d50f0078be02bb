// World geometry queries, and a flat tile grid that answers them.
//
// The AI core does not own level geometry. Everything it needs from the
// world goes through `WorldQuery`: which sector (room, box, floor and ceiling)
// lies under a point, the floor and ceiling height there, and whether a room
// is flooded. A host engine implements the trait over its own room/portal
// data.
//
// `SectorGrid` is the in-crate implementation: a dense single-storey grid of
// one-block tiles, indexed `x + z * size_x` relative to a tile origin, each
// tile holding its room, box and heights. Out-of-bounds tiles read as solid
// wall (`NO_HEIGHT`, no box). `SectorGrid::from_boxes` rasterizes a box graph
// so a level built with `BoxGraphBuilder` has matching geometry for free.
//
// See also: `movement.rs`, the main consumer, `sensing.rs` for box lookups
// of the enemy, `boxes.rs` for the graph `from_boxes` rasterizes.
//
// **Critical constraint: determinism.** Queries are pure functions of the
// grid; the water set is a `BTreeSet`.

use crate::boxes::BoxGraph;
use crate::types::{BoxId, Position, RoomId, WALL_L, WALL_SHIFT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Height reported for solid wall. Far above any floor (Y down), so no
/// envelope accepts it.
pub const NO_HEIGHT: i32 = -0x7F00;

/// The floor column under a point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub room: RoomId,
    /// Navigation box, or `None` for wall and unmapped space.
    pub box_id: Option<BoxId>,
    pub floor: i32,
    pub ceiling: i32,
}

impl Sector {
    pub const WALL: Sector = Sector {
        room: RoomId(0),
        box_id: None,
        floor: NO_HEIGHT,
        ceiling: NO_HEIGHT,
    };
}

/// Geometry queries the AI core consumes.
pub trait WorldQuery {
    /// Sector containing `pos`, starting the search from `room`.
    fn sector(&self, pos: Position, room: RoomId) -> Sector;

    /// Floor height at `pos` within `sector`. Flat sectors need not override.
    fn floor_height(&self, sector: &Sector, _pos: Position) -> i32 {
        sector.floor
    }

    /// Ceiling height at `pos` within `sector`.
    fn ceiling_height(&self, sector: &Sector, _pos: Position) -> i32 {
        sector.ceiling
    }

    fn is_underwater(&self, room: RoomId) -> bool;
}

/// Dense single-storey tile grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorGrid {
    /// Tile coordinates of the grid's minimum corner.
    pub origin_x: i32,
    pub origin_z: i32,
    pub size_x: u32,
    pub size_z: u32,
    tiles: Vec<Sector>,
    water: BTreeSet<RoomId>,
}

impl SectorGrid {
    /// A grid of solid wall.
    pub fn new(origin_x: i32, origin_z: i32, size_x: u32, size_z: u32) -> Self {
        Self {
            origin_x,
            origin_z,
            size_x,
            size_z,
            tiles: vec![Sector::WALL; size_x as usize * size_z as usize],
            water: BTreeSet::new(),
        }
    }

    /// Rasterize every box into its tiles, room 0, with `headroom` between
    /// floor and ceiling. Later boxes overwrite earlier ones where they
    /// overlap.
    pub fn from_boxes(graph: &BoxGraph, headroom: i32) -> Self {
        let Some(first) = graph.boxes().first() else {
            return Self::default();
        };
        let (mut min_x, mut max_x) = (first.top, first.bottom);
        let (mut min_z, mut max_z) = (first.left, first.right);
        for b in graph.boxes() {
            min_x = min_x.min(b.top);
            max_x = max_x.max(b.bottom);
            min_z = min_z.min(b.left);
            max_z = max_z.max(b.right);
        }
        let origin_x = min_x >> WALL_SHIFT;
        let origin_z = min_z >> WALL_SHIFT;
        let size_x = ((max_x + WALL_L - 1) >> WALL_SHIFT) - origin_x;
        let size_z = ((max_z + WALL_L - 1) >> WALL_SHIFT) - origin_z;
        let mut grid = Self::new(origin_x, origin_z, size_x as u32, size_z as u32);

        for id in graph.ids() {
            let b = graph.box_info(id);
            for tx in (b.top >> WALL_SHIFT)..(b.bottom >> WALL_SHIFT) {
                for tz in (b.left >> WALL_SHIFT)..(b.right >> WALL_SHIFT) {
                    grid.set(
                        tx,
                        tz,
                        Sector {
                            room: RoomId(0),
                            box_id: Some(id),
                            floor: b.height,
                            ceiling: b.height - headroom,
                        },
                    );
                }
            }
        }
        grid
    }

    fn index(&self, tile_x: i32, tile_z: i32) -> Option<usize> {
        let x = tile_x - self.origin_x;
        let z = tile_z - self.origin_z;
        if x < 0 || z < 0 || x as u32 >= self.size_x || z as u32 >= self.size_z {
            return None;
        }
        Some(x as usize + z as usize * self.size_x as usize)
    }

    /// Tile contents. Wall outside the grid.
    pub fn get(&self, tile_x: i32, tile_z: i32) -> Sector {
        self.index(tile_x, tile_z)
            .map(|i| self.tiles[i])
            .unwrap_or(Sector::WALL)
    }

    /// Overwrite a tile. No-op outside the grid.
    pub fn set(&mut self, tile_x: i32, tile_z: i32, sector: Sector) {
        if let Some(i) = self.index(tile_x, tile_z) {
            self.tiles[i] = sector;
        }
    }

    /// Edit a tile in place. No-op outside the grid.
    pub fn update(&mut self, tile_x: i32, tile_z: i32, f: impl FnOnce(&mut Sector)) {
        if let Some(i) = self.index(tile_x, tile_z) {
            f(&mut self.tiles[i]);
        }
    }

    /// Assign a room to every tile in the half-open tile rectangle.
    pub fn set_room(&mut self, x_tiles: std::ops::Range<i32>, z_tiles: std::ops::Range<i32>, room: RoomId) {
        for tx in x_tiles {
            for tz in z_tiles.clone() {
                self.update(tx, tz, |s| s.room = room);
            }
        }
    }

    pub fn set_underwater(&mut self, room: RoomId, underwater: bool) {
        if underwater {
            self.water.insert(room);
        } else {
            self.water.remove(&room);
        }
    }
}

impl WorldQuery for SectorGrid {
    fn sector(&self, pos: Position, _room: RoomId) -> Sector {
        self.get(pos.tile_x(), pos.tile_z())
    }

    fn is_underwater(&self, room: RoomId) -> bool {
        self.water.contains(&room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{BoxGraphBuilder, BoxInfo};

    #[test]
    fn from_boxes_rasterizes_each_tile() {
        let mut b = BoxGraphBuilder::new();
        b.add_box(BoxInfo::from_tiles(0, 2, 0, 1, 0));
        b.add_box(BoxInfo::from_tiles(0, 2, 1, 3, -256));
        b.connect_touching();
        let graph = b.build().unwrap();
        let grid = SectorGrid::from_boxes(&graph, 4 * WALL_L);

        assert_eq!((grid.size_x, grid.size_z), (2, 3));
        let s = grid.sector(Position::new(1500, 0, 2500), RoomId(0));
        assert_eq!(s.box_id, Some(BoxId(1)));
        assert_eq!(s.floor, -256);
        assert_eq!(s.ceiling, -256 - 4 * WALL_L);
        assert_eq!(grid.floor_height(&s, Position::new(1500, 0, 2500)), -256);
    }

    #[test]
    fn outside_the_grid_is_wall() {
        let grid = SectorGrid::new(0, 0, 2, 2);
        let s = grid.sector(Position::new(-10, 0, 10), RoomId(0));
        assert_eq!(s, Sector::WALL);
        assert_eq!(grid.get(5, 5).floor, NO_HEIGHT);
    }

    #[test]
    fn water_is_per_room() {
        let mut grid = SectorGrid::new(0, 0, 4, 4);
        grid.set_room(2..4, 0..4, RoomId(1));
        grid.set_underwater(RoomId(1), true);
        let dry = grid.sector(Position::new(100, 0, 100), RoomId(0));
        let wet = grid.sector(Position::new(2100, 0, 100), RoomId(0));
        assert!(!grid.is_underwater(dry.room));
        assert!(grid.is_underwater(wet.room));
        grid.set_underwater(RoomId(1), false);
        assert!(!grid.is_underwater(wet.room));
    }
}
