// LOT ("lines of travel"): per-creature budgeted reachability search.
//
// Each active creature owns one `Lot`: a node per box of the level, a FIFO
// frontier threaded through the nodes' `next` links, and the boxes the
// behavior layer is interested in (`target_box`, `required_box`). The search
// runs *backwards*: it is seeded at the box the creature wants to reach and
// floods outward, so every stamped node's `exit_box` points one hop closer to
// the goal. Following exit boxes from wherever the creature stands walks it
// to the target (see `target::calculate_target`).
//
// The search is incremental. `search` pops at most `budget` boxes per call
// and leaves the frontier in place for the next tick, so per-tick cost is
// bounded regardless of level size.
//
// Visited state uses search stamps instead of a cleared boolean array: a
// node has been reached in the current search iff its stamp's epoch equals
// the LOT's epoch. Bit 31 of the stamp is a separate sticky "blocked" flag,
// set when the node (or a node it was reached through) is impassable for
// this creature. Blocked nodes still propagate, so the search learns that a
// region lies behind a closed door without routing through it.
//
// Expansion obeys the creature's `MoveEnvelope`. The change is measured from
// the neighbor into the popped box, because the creature will travel that
// way: `change > step` is a climb it cannot make, `change < -drop` a drop it
// will not take. Y points down, so a higher floor has a smaller height.
//
// See also: `target.rs` which seeds and consumes the search, `zone.rs` for
// the zone restriction, `slots.rs` which clears the LOT on slot
// initialisation.
//
// **Critical constraint: determinism.** Expansion order is frontier order
// then adjacency order; no randomness is involved.

use crate::boxes::BoxFlags;
use crate::level::Level;
use crate::types::{BoxId, Position, STEP_L};
use crate::zone::ZoneClass;
use serde::{Deserialize, Serialize};

/// Search stamp: 31-bit epoch plus the sticky blocked bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStamp(u32);

impl SearchStamp {
    pub const BLOCKED_BIT: u32 = 1 << 31;
    pub const EPOCH_MASK: u32 = Self::BLOCKED_BIT - 1;

    /// Never reached. Epochs start at 1, so this is stale for every search.
    pub const UNSEEN: SearchStamp = SearchStamp(0);

    pub const fn fresh(epoch: u32) -> Self {
        SearchStamp(epoch & Self::EPOCH_MASK)
    }

    pub const fn blocked(epoch: u32) -> Self {
        SearchStamp((epoch & Self::EPOCH_MASK) | Self::BLOCKED_BIT)
    }

    pub const fn epoch(self) -> u32 {
        self.0 & Self::EPOCH_MASK
    }

    pub const fn is_blocked(self) -> bool {
        self.0 & Self::BLOCKED_BIT != 0
    }
}

/// Per-box search state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotNode {
    /// Next hop toward the search origin.
    pub exit_box: Option<BoxId>,
    /// Frontier link.
    pub next: Option<BoxId>,
    pub stamp: SearchStamp,
}

/// Movement limits the search and the movement integrator enforce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEnvelope {
    /// Largest climb between boxes (magnitude).
    pub step: i32,
    /// Largest drop between boxes (magnitude).
    pub drop: i32,
    /// Vertical speed per tick; non-zero marks a flyer.
    pub fly: i32,
    /// Box flags this creature cannot pass.
    pub block_mask: BoxFlags,
}

impl Default for MoveEnvelope {
    fn default() -> Self {
        Self {
            step: STEP_L,
            drop: STEP_L,
            fly: 0,
            block_mask: BoxFlags::BLOCKED,
        }
    }
}

impl MoveEnvelope {
    pub fn is_flyer(&self) -> bool {
        self.fly > 0
    }

    pub fn zone_class(&self) -> ZoneClass {
        ZoneClass::for_envelope(self.step, self.drop, self.fly)
    }

    /// Whether moving onto a floor `change` units below the current one
    /// (negative = above) stays inside the envelope.
    pub fn allows(&self, change: i32) -> bool {
        self.is_flyer() || (change <= self.drop && change >= -self.step)
    }
}

/// Outcome of one budgeted search call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// Boxes popped this call. Never exceeds the budget.
    pub expanded: u32,
    /// The frontier ran dry within the budget.
    pub exhausted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    nodes: Vec<LotNode>,
    head: Option<BoxId>,
    tail: Option<BoxId>,
    epoch: u32,
    pub envelope: MoveEnvelope,
    /// The box the current search is seeded at.
    pub target_box: Option<BoxId>,
    /// The box the behavior layer wants; adopted by the next `update`.
    pub required_box: Option<BoxId>,
    /// Provisional goal point inside the target box.
    pub target: Position,
    /// Boxes sharing the creature's zone in either layout, for sampling.
    pub zone_boxes: Vec<BoxId>,
}

impl Lot {
    pub fn new(box_count: usize, envelope: MoveEnvelope) -> Lot {
        Lot {
            nodes: vec![LotNode::default(); box_count],
            head: None,
            tail: None,
            epoch: 0,
            envelope,
            target_box: None,
            required_box: None,
            target: Position::default(),
            zone_boxes: Vec::new(),
        }
    }

    /// Forget every stamp, the frontier and both boxes.
    pub fn clear(&mut self) {
        self.nodes.fill(LotNode::default());
        self.head = None;
        self.tail = None;
        self.epoch = 0;
        self.target_box = None;
        self.required_box = None;
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn node(&self, id: BoxId) -> &LotNode {
        &self.nodes[id.index()]
    }

    pub fn stamp(&self, id: BoxId) -> SearchStamp {
        self.nodes[id.index()].stamp
    }

    pub fn exit_box(&self, id: BoxId) -> Option<BoxId> {
        self.nodes[id.index()].exit_box
    }

    pub fn zone_class(&self) -> ZoneClass {
        self.envelope.zone_class()
    }

    /// Stamped clean in the current search.
    pub fn is_reachable(&self, id: BoxId) -> bool {
        let stamp = self.stamp(id);
        self.epoch != 0 && stamp.epoch() == self.epoch && !stamp.is_blocked()
    }

    /// Stamped blocked in the current search.
    pub fn is_blocked_stamped(&self, id: BoxId) -> bool {
        self.epoch != 0 && self.stamp(id) == SearchStamp::blocked(self.epoch)
    }

    /// Frontier contents in pop order.
    pub fn frontier(&self) -> impl Iterator<Item = BoxId> + '_ {
        std::iter::successors(self.head, |b| self.nodes[b.index()].next)
    }

    /// Adopt a new `required_box` if there is one, then search.
    pub fn update(&mut self, level: &Level, budget: u32) -> SearchReport {
        if let Some(required) = self.required_box.filter(|&r| Some(r) != self.target_box) {
            self.reseed(required);
        }
        self.search(level, budget)
    }

    /// Start a new search generation at `origin`.
    fn reseed(&mut self, origin: BoxId) {
        // Unlink the stale frontier so every queued box belongs to this epoch.
        let mut cursor = self.head;
        while let Some(b) = cursor {
            cursor = self.nodes[b.index()].next.take();
        }

        if self.epoch >= SearchStamp::EPOCH_MASK {
            for node in &mut self.nodes {
                node.stamp = SearchStamp::UNSEEN;
            }
            self.epoch = 0;
        }
        self.epoch += 1;

        self.target_box = Some(origin);
        let node = &mut self.nodes[origin.index()];
        node.stamp = SearchStamp::fresh(self.epoch);
        node.exit_box = None;
        self.head = Some(origin);
        self.tail = Some(origin);
        tracing::trace!(%origin, epoch = self.epoch, "lot reseeded");
    }

    /// Pop up to `budget` frontier boxes and stamp their neighbors.
    pub fn search(&mut self, level: &Level, budget: u32) -> SearchReport {
        let graph = level.graph();
        let class = self.zone_class();
        let mut expanded = 0;

        while expanded < budget {
            let Some(current) = self.head else {
                self.tail = None;
                return SearchReport {
                    expanded,
                    exhausted: true,
                };
            };
            let zone = level.zone(class, current);
            let height = graph.box_info(current).height;
            let popped = self.nodes[current.index()].stamp;

            for neighbor in graph.neighbors(current) {
                if level.zone(class, neighbor) != zone {
                    continue;
                }
                let change = graph.box_info(neighbor).height - height;
                if !self.envelope.is_flyer() && (change > self.envelope.step || change < -self.envelope.drop) {
                    continue;
                }

                let seen = self.nodes[neighbor.index()].stamp;
                if popped.epoch() < seen.epoch() {
                    continue;
                }
                if popped.is_blocked() {
                    if popped.epoch() == seen.epoch() {
                        continue;
                    }
                    self.nodes[neighbor.index()].stamp = popped;
                } else {
                    if popped.epoch() == seen.epoch() && !seen.is_blocked() {
                        continue;
                    }
                    let node = &mut self.nodes[neighbor.index()];
                    if graph.flags(neighbor).intersects(self.envelope.block_mask) {
                        node.stamp = SearchStamp::blocked(popped.epoch());
                    } else {
                        node.stamp = SearchStamp::fresh(popped.epoch());
                        node.exit_box = Some(current);
                    }
                }

                if self.nodes[neighbor.index()].next.is_none() && self.tail != Some(neighbor) {
                    if let Some(tail) = self.tail {
                        self.nodes[tail.index()].next = Some(neighbor);
                    }
                    self.tail = Some(neighbor);
                }
            }

            expanded += 1;
            self.head = self.nodes[current.index()].next.take();
            if self.head.is_none() {
                self.tail = None;
            }
        }

        tracing::trace!(expanded, "lot search budget spent");
        SearchReport {
            expanded,
            exhausted: false,
        }
    }
}
