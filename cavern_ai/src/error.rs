// Error types for the creature AI.
//
// Only construction and API-misuse paths return errors. The per-tick
// pipeline never fails: an unreachable target degrades to a weaker
// `TargetGrade`, a refused slot leaves the creature dormant, and a vault the
// species cannot perform becomes `VaultRank::Fall`. Those are ordinary
// values, not errors.
//
// See also: `boxes.rs` and `zone.rs` which validate loader tables into
// `LevelError`, `config.rs` for `ConfigError`, `sim.rs` for `NavError`.

use crate::types::{BoxId, EntityId, SlotId};
use crate::zone::ZoneClass;
use thiserror::Error;

/// Level tables handed over by the loader are inconsistent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("box {box_id} has an inverted or sub-block rectangle")]
    BadBoxShape { box_id: BoxId },

    #[error("box {box_id} points at adjacency offset {offset}, past the end ({len})")]
    OverlapOffsetOutOfRange { box_id: BoxId, offset: usize, len: usize },

    #[error("neighbor list of box {box_id} names box {neighbor}, but only {box_count} boxes exist")]
    NeighborOutOfRange {
        box_id: BoxId,
        neighbor: u32,
        box_count: usize,
    },

    #[error("neighbor list of box {box_id} runs off the end without a terminator")]
    MissingTerminator { box_id: BoxId },

    #[error("zone table has {actual} entries, expected one per box ({expected})")]
    ZoneTableLength { expected: usize, actual: usize },

    #[error("level has {count} boxes, more than the adjacency encoding can address")]
    TooManyBoxes { count: usize },

    #[error("{class:?} flood fill over {boxes} boxes found more zones than a zone id can hold")]
    TooManyZones { class: ZoneClass, boxes: usize },
}

/// A navigation or entity request named something that does not exist or
/// cannot take the requested change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("{0} does not exist")]
    UnknownBox(BoxId),

    #[error("{0} is not blockable; only blockable boxes can be blocked")]
    NotBlockable(BoxId),

    #[error("{0} is stale or was never spawned")]
    UnknownEntity(EntityId),

    #[error("{0} has no species and cannot hold an AI slot")]
    NotACreature(EntityId),

    #[error("slot {} is outside the pool", .0.0)]
    UnknownSlot(SlotId),

    #[error("slot {} is held by another creature", .0.0)]
    SlotOccupied(SlotId),
}

/// Failure loading `AiConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("slot_count must be at least 1")]
    NoSlots,

    #[error("expansion_budget must be at least 1")]
    NoExpansionBudget,
}
