// Navigation boxes: the static spatial partition creatures path over.
//
// The walkable world is cut into axis-aligned rectangles ("boxes"), each with
// a single floor height. Boxes are non-uniform: a long corridor can be one
// box, a cluttered room dozens. Adjacency lives in one shared flat `u32`
// list; each box's `OverlapRecord` holds the offset of its run, and the last
// entry of a run carries `END_OF_LIST`. The same record packs the two dynamic
// flags doors and movable blocks toggle at runtime: `BLOCKABLE` (this box can
// be shut) and `BLOCKED` (it currently is).
//
// Rectangle naming follows the level data: `left`/`right` bound the Z axis,
// `top`/`bottom` bound the X axis. All bounds are world units and in
// practice whole blocks.
//
// `BoxGraphBuilder` assembles a graph from rectangles plus neighbor pairs (or
// connects edge-touching rectangles itself); `BoxGraph::from_raw` accepts the
// loader's packed tables directly. Both go through the same validation.
//
// See also: `zone.rs` for reachability classes computed over this graph,
// `lot.rs` for the per-creature search, `target.rs` for the target clamp that
// walks box rectangles, `world.rs` for the sector grid that maps points to
// boxes.
//
// **Critical constraint: determinism.** Box ids are dense indices assigned
// in insertion order; neighbor runs keep insertion order. Only the flag
// bits ever change after construction.

use crate::error::{LevelError, NavError};
use crate::types::{BoxId, HALF_BLOCK, WALL_L};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Marks the last neighbor in a box's adjacency run.
pub const END_OF_LIST: u32 = 1 << 31;

/// Mask extracting the box index from an adjacency entry.
pub const BOX_INDEX_MASK: u32 = END_OF_LIST - 1;

bitflags! {
    /// Dynamic per-box flags. They share the overlap record's high bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BoxFlags: u32 {
        /// The box sits under a door or movable block and may be shut.
        const BLOCKABLE = 1 << 31;
        /// The box is currently shut.
        const BLOCKED = 1 << 30;
    }
}

/// Packed adjacency offset plus `BoxFlags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRecord(u32);

impl OverlapRecord {
    const OFFSET_MASK: u32 = (1 << 30) - 1;

    /// Offset value meaning "this box has no neighbors".
    pub const NO_NEIGHBORS: u32 = Self::OFFSET_MASK;

    pub fn new(offset: u32, flags: BoxFlags) -> Self {
        Self((offset & Self::OFFSET_MASK) | flags.bits())
    }

    pub fn isolated(flags: BoxFlags) -> Self {
        Self::new(Self::NO_NEIGHBORS, flags)
    }

    pub fn offset(self) -> Option<usize> {
        let offset = self.0 & Self::OFFSET_MASK;
        (offset != Self::NO_NEIGHBORS).then_some(offset as usize)
    }

    pub fn flags(self) -> BoxFlags {
        BoxFlags::from_bits_truncate(self.0)
    }

    fn set_flag(&mut self, flag: BoxFlags, on: bool) {
        if on {
            self.0 |= flag.bits();
        } else {
            self.0 &= !flag.bits();
        }
    }
}

/// A rectangular navigation cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxInfo {
    /// Minimum Z.
    pub left: i32,
    /// Maximum Z.
    pub right: i32,
    /// Minimum X.
    pub top: i32,
    /// Maximum X.
    pub bottom: i32,
    /// Floor height (Y down).
    pub height: i32,
    pub overlap: OverlapRecord,
}

impl BoxInfo {
    /// A box with no neighbors yet and no flags.
    pub fn new(left: i32, right: i32, top: i32, bottom: i32, height: i32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            height,
            overlap: OverlapRecord::isolated(BoxFlags::empty()),
        }
    }

    /// A box covering whole tiles: X tiles `x0..x1`, Z tiles `z0..z1`.
    pub fn from_tiles(x0: i32, x1: i32, z0: i32, z1: i32, height: i32) -> Self {
        Self::new(z0 * WALL_L, z1 * WALL_L, x0 * WALL_L, x1 * WALL_L, height)
    }

    pub fn with_flags(mut self, flags: BoxFlags) -> Self {
        self.overlap = OverlapRecord::new(self.overlap.0 & OverlapRecord::OFFSET_MASK, flags);
        self
    }

    pub fn flags(&self) -> BoxFlags {
        self.overlap.flags()
    }

    /// Strict interior test on the XZ plane.
    pub fn contains(&self, x: i32, z: i32) -> bool {
        z > self.left && z < self.right && x > self.top && x < self.bottom
    }

    /// Interior-or-edge test on the XZ plane.
    pub fn contains_inclusive(&self, x: i32, z: i32) -> bool {
        z >= self.left && z <= self.right && x >= self.top && x <= self.bottom
    }

    pub fn center_x(&self) -> i32 {
        (self.top + self.bottom) / 2
    }

    pub fn center_z(&self) -> i32 {
        (self.left + self.right) / 2
    }

    /// Whether two rectangles share an edge segment of positive length.
    pub fn touches(&self, other: &BoxInfo) -> bool {
        let x_overlap = self.top.max(other.top) < self.bottom.min(other.bottom);
        let z_overlap = self.left.max(other.left) < self.right.min(other.right);
        let z_edge = self.right == other.left || other.right == self.left;
        let x_edge = self.bottom == other.top || other.bottom == self.top;
        (x_overlap && z_edge) || (z_overlap && x_edge)
    }

    fn is_well_formed(&self) -> bool {
        self.right - self.left >= WALL_L && self.bottom - self.top >= WALL_L
    }
}

/// Iterator over one box's adjacency run.
pub struct Neighbors<'a> {
    overlaps: &'a [u32],
    cursor: Option<usize>,
}

impl Iterator for Neighbors<'_> {
    type Item = BoxId;

    fn next(&mut self) -> Option<BoxId> {
        let i = self.cursor?;
        let entry = self.overlaps[i];
        self.cursor = if entry & END_OF_LIST != 0 { None } else { Some(i + 1) };
        Some(BoxId(entry & BOX_INDEX_MASK))
    }
}

/// The box graph: rectangles, packed adjacency, dynamic flags.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoxGraph {
    boxes: Vec<BoxInfo>,
    overlaps: Vec<u32>,
}

impl BoxGraph {
    /// Adopt loader-produced tables after checking every offset, neighbor
    /// index and terminator.
    pub fn from_raw(boxes: Vec<BoxInfo>, overlaps: Vec<u32>) -> Result<Self, LevelError> {
        if boxes.len() > BOX_INDEX_MASK as usize {
            return Err(LevelError::TooManyBoxes { count: boxes.len() });
        }
        for (i, info) in boxes.iter().enumerate() {
            let box_id = BoxId(i as u32);
            if !info.is_well_formed() {
                return Err(LevelError::BadBoxShape { box_id });
            }
            let Some(offset) = info.overlap.offset() else {
                continue;
            };
            if offset >= overlaps.len() {
                return Err(LevelError::OverlapOffsetOutOfRange {
                    box_id,
                    offset,
                    len: overlaps.len(),
                });
            }
            let mut terminated = false;
            for &entry in &overlaps[offset..] {
                let neighbor = entry & BOX_INDEX_MASK;
                if neighbor as usize >= boxes.len() {
                    return Err(LevelError::NeighborOutOfRange {
                        box_id,
                        neighbor,
                        box_count: boxes.len(),
                    });
                }
                if entry & END_OF_LIST != 0 {
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                return Err(LevelError::MissingTerminator { box_id });
            }
        }
        Ok(Self { boxes, overlaps })
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn get(&self, id: BoxId) -> Option<&BoxInfo> {
        self.boxes.get(id.index())
    }

    /// Box by id. Ids come from this graph, so an out-of-range id is a bug.
    pub fn box_info(&self, id: BoxId) -> &BoxInfo {
        &self.boxes[id.index()]
    }

    pub fn boxes(&self) -> &[BoxInfo] {
        &self.boxes
    }

    pub fn ids(&self) -> impl Iterator<Item = BoxId> + use<> {
        (0..self.boxes.len() as u32).map(BoxId)
    }

    /// Raw adjacency list, as a loader would hand it over.
    pub fn overlaps(&self) -> &[u32] {
        &self.overlaps
    }

    pub fn neighbors(&self, id: BoxId) -> Neighbors<'_> {
        Neighbors {
            overlaps: &self.overlaps,
            cursor: self.boxes[id.index()].overlap.offset(),
        }
    }

    pub fn flags(&self, id: BoxId) -> BoxFlags {
        self.boxes[id.index()].flags()
    }

    /// Whether a creature with `block_mask` may not enter this box right now.
    pub fn is_impassable(&self, id: BoxId, block_mask: BoxFlags) -> bool {
        self.flags(id).intersects(block_mask)
    }

    /// Shut or open a blockable box (door/platform trigger path).
    pub fn set_blocked(&mut self, id: BoxId, blocked: bool) -> Result<(), NavError> {
        let info = self.boxes.get_mut(id.index()).ok_or(NavError::UnknownBox(id))?;
        if !info.flags().contains(BoxFlags::BLOCKABLE) {
            return Err(NavError::NotBlockable(id));
        }
        info.overlap.set_flag(BoxFlags::BLOCKED, blocked);
        Ok(())
    }

    /// Mark or unmark a box as blockable. Clearing it also opens the box.
    pub fn set_blockable(&mut self, id: BoxId, blockable: bool) -> Result<(), NavError> {
        let info = self.boxes.get_mut(id.index()).ok_or(NavError::UnknownBox(id))?;
        info.overlap.set_flag(BoxFlags::BLOCKABLE, blockable);
        if !blockable {
            info.overlap.set_flag(BoxFlags::BLOCKED, false);
        }
        Ok(())
    }

    /// First box whose rectangle contains the point (edges inclusive).
    /// Linear; the sector grid is the fast path at runtime.
    pub fn locate(&self, x: i32, z: i32) -> Option<BoxId> {
        self.boxes
            .iter()
            .position(|b| b.contains_inclusive(x, z))
            .map(|i| BoxId(i as u32))
    }

    /// A point half a block inside the box's minimum corner.
    pub fn inner_corner(&self, id: BoxId) -> (i32, i32) {
        let b = self.box_info(id);
        (b.top + HALF_BLOCK, b.left + HALF_BLOCK)
    }
}

/// Assembles a `BoxGraph` from rectangles and neighbor pairs.
#[derive(Clone, Debug, Default)]
pub struct BoxGraphBuilder {
    boxes: Vec<BoxInfo>,
    neighbors: Vec<SmallVec<[BoxId; 8]>>,
}

impl BoxGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box. Returns its id.
    pub fn add_box(&mut self, info: BoxInfo) -> BoxId {
        let id = BoxId(self.boxes.len() as u32);
        self.boxes.push(info);
        self.neighbors.push(SmallVec::new());
        id
    }

    /// Connect two boxes in both directions. Repeated pairs are ignored.
    pub fn connect(&mut self, a: BoxId, b: BoxId) -> &mut Self {
        if a != b {
            if !self.neighbors[a.index()].contains(&b) {
                self.neighbors[a.index()].push(b);
            }
            if !self.neighbors[b.index()].contains(&a) {
                self.neighbors[b.index()].push(a);
            }
        }
        self
    }

    /// Connect every pair of boxes whose rectangles share an edge.
    pub fn connect_touching(&mut self) -> &mut Self {
        for a in 0..self.boxes.len() {
            for b in a + 1..self.boxes.len() {
                if self.boxes[a].touches(&self.boxes[b]) {
                    self.connect(BoxId(a as u32), BoxId(b as u32));
                }
            }
        }
        self
    }

    /// Pack the neighbor lists into the flat terminated layout and validate.
    pub fn build(&self) -> Result<BoxGraph, LevelError> {
        let mut boxes = self.boxes.clone();
        let mut overlaps = Vec::new();
        for (info, neighbors) in boxes.iter_mut().zip(&self.neighbors) {
            let flags = info.flags();
            if neighbors.is_empty() {
                info.overlap = OverlapRecord::isolated(flags);
                continue;
            }
            info.overlap = OverlapRecord::new(overlaps.len() as u32, flags);
            let last = neighbors.len() - 1;
            for (i, n) in neighbors.iter().enumerate() {
                let end = if i == last { END_OF_LIST } else { 0 };
                overlaps.push(n.0 | end);
            }
        }
        BoxGraph::from_raw(boxes, overlaps)
    }
}
