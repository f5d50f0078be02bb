// Zone tables: static reachability classes over the box graph.
//
// For each movement class and each map layout, every box carries a zone id.
// Two boxes with the same id are mutually reachable for that class, ignoring
// doors and other dynamic blocking. The mood layer uses zone agreement as its
// cheap "can I get at the enemy at all" test, and the LOT search never crosses
// a zone boundary.
//
// Classes are keyed by how big a floor-height change a creature can take in
// one box transition: `Walker` one click, `Hopper` two clicks, `Climber` a
// full block. `Flyer` ignores floor heights entirely. A creature's class comes
// from its movement envelope (`ZoneClass::for_envelope`).
//
// Tables are produced either by the loader (`ZoneTables::from_raw`) or by a
// breadth-first flood fill (`compute` / `compute_with_flip`). The eight
// class/layout fills are independent and run on the rayon pool; results are
// collected in job order, so the output does not depend on scheduling.
//
// See also: `boxes.rs` for the graph being labelled, `slots.rs` for the
// per-creature zone membership list built from these tables, `lot.rs` which
// restricts expansion to the popped box's zone.
//
// **Critical constraint: determinism.** Zone ids are assigned in ascending
// box order of each component's lowest box, and the flood fill visits
// neighbors in adjacency order.

use crate::boxes::BoxGraph;
use crate::error::LevelError;
use crate::types::{BoxId, STEP_L, WALL_L, ZoneId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Movement class a creature's zone is looked up under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneClass {
    /// Steps of at most one click.
    Walker,
    /// Steps of at most two clicks.
    Hopper,
    /// Steps of at most one block.
    Climber,
    /// Ignores floor heights.
    Flyer,
}

impl ZoneClass {
    pub const ALL: [ZoneClass; 4] = [
        ZoneClass::Walker,
        ZoneClass::Hopper,
        ZoneClass::Climber,
        ZoneClass::Flyer,
    ];

    /// Largest floor-height change (either direction) one box transition may
    /// take, or `None` for flyers.
    pub const fn max_step(self) -> Option<i32> {
        match self {
            ZoneClass::Walker => Some(STEP_L),
            ZoneClass::Hopper => Some(2 * STEP_L),
            ZoneClass::Climber => Some(WALL_L),
            ZoneClass::Flyer => None,
        }
    }

    /// Class for a movement envelope. Step and drop are magnitudes; the
    /// larger of the two decides the bucket.
    pub fn for_envelope(step: i32, drop: i32, fly: i32) -> ZoneClass {
        if fly > 0 {
            return ZoneClass::Flyer;
        }
        let reach = step.max(drop);
        if reach > 2 * STEP_L {
            ZoneClass::Climber
        } else if reach > STEP_L {
            ZoneClass::Hopper
        } else {
            ZoneClass::Walker
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Which of the two level geometries is live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    #[default]
    Normal,
    Flipped,
}

impl Layout {
    pub const BOTH: [Layout; 2] = [Layout::Normal, Layout::Flipped];

    pub const fn toggled(self) -> Layout {
        match self {
            Layout::Normal => Layout::Flipped,
            Layout::Flipped => Layout::Normal,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Zone id per box, per class, per layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTables {
    box_count: usize,
    /// Indexed `[class][layout][box]`.
    tables: [[Vec<ZoneId>; 2]; 4],
}

impl ZoneTables {
    /// Flood-fill zones for a level without alternate geometry. Both layouts
    /// get the same labels.
    pub fn compute(graph: &BoxGraph) -> Result<ZoneTables, LevelError> {
        Self::fill(graph, graph)
    }

    /// Flood-fill zones where the flipped layout has its own heights and
    /// adjacency over the same box indices.
    pub fn compute_with_flip(normal: &BoxGraph, flipped: &BoxGraph) -> Result<ZoneTables, LevelError> {
        if normal.len() != flipped.len() {
            return Err(LevelError::ZoneTableLength {
                expected: normal.len(),
                actual: flipped.len(),
            });
        }
        Self::fill(normal, flipped)
    }

    fn fill(normal: &BoxGraph, flipped: &BoxGraph) -> Result<ZoneTables, LevelError> {
        let jobs: Vec<(ZoneClass, Layout)> = ZoneClass::ALL
            .iter()
            .flat_map(|&c| Layout::BOTH.iter().map(move |&l| (c, l)))
            .collect();
        let mut filled: Vec<Vec<ZoneId>> = jobs
            .par_iter()
            .map(|&(class, layout)| {
                let graph = match layout {
                    Layout::Normal => normal,
                    Layout::Flipped => flipped,
                };
                flood_fill(graph, class)
            })
            .collect::<Vec<_>>()
            .into_iter()
            // First failure in job order, not in completion order.
            .collect::<Result<_, _>>()?;

        let mut tables: [[Vec<ZoneId>; 2]; 4] = Default::default();
        // `filled` is in job order; pop from the back.
        for &(class, layout) in jobs.iter().rev() {
            tables[class.index()][layout.index()] = filled.pop().unwrap_or_default();
        }
        tracing::debug!(boxes = normal.len(), "zone tables computed");
        Ok(ZoneTables {
            box_count: normal.len(),
            tables,
        })
    }

    /// Adopt loader-produced tables, indexed `[class][layout][box]`.
    pub fn from_raw(box_count: usize, tables: [[Vec<ZoneId>; 2]; 4]) -> Result<ZoneTables, LevelError> {
        for per_class in &tables {
            for table in per_class {
                if table.len() != box_count {
                    return Err(LevelError::ZoneTableLength {
                        expected: box_count,
                        actual: table.len(),
                    });
                }
            }
        }
        Ok(ZoneTables { box_count, tables })
    }

    pub fn box_count(&self) -> usize {
        self.box_count
    }

    pub fn zone(&self, class: ZoneClass, layout: Layout, id: BoxId) -> ZoneId {
        self.tables[class.index()][layout.index()][id.index()]
    }

    pub fn table(&self, class: ZoneClass, layout: Layout) -> &[ZoneId] {
        &self.tables[class.index()][layout.index()]
    }
}

/// Breadth-first labelling of connected components under `class`. Fails
/// when the components outnumber the zone id space.
fn flood_fill(graph: &BoxGraph, class: ZoneClass) -> Result<Vec<ZoneId>, LevelError> {
    let mut labels: Vec<Option<ZoneId>> = vec![None; graph.len()];
    let mut queue = VecDeque::new();
    let mut components = 0usize;

    for seed in graph.ids() {
        if labels[seed.index()].is_some() {
            continue;
        }
        let zone = u16::try_from(components)
            .map(ZoneId)
            .map_err(|_| LevelError::TooManyZones {
                class,
                boxes: graph.len(),
            })?;
        components += 1;
        labels[seed.index()] = Some(zone);
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            let height = graph.box_info(current).height;
            for neighbor in graph.neighbors(current) {
                if labels[neighbor.index()].is_some() {
                    continue;
                }
                let change = (graph.box_info(neighbor).height - height).abs();
                if class.max_step().is_some_and(|limit| change > limit) {
                    continue;
                }
                labels[neighbor.index()] = Some(zone);
                queue.push_back(neighbor);
            }
        }
    }

    Ok(labels.into_iter().map(|z| z.unwrap_or(ZoneId(0))).collect())
}
