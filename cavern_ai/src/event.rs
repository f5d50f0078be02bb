// Simulation events: the narrative output of a tick.
//
// `SimState::step` and `SimState::apply_command` report what happened as
// `SimEvent`s: slot traffic, mood changes, vaults, deaths and level changes.
// Events are output only. Nothing in the sim reads them back, so a host may
// drop them, log them, or feed them to animation and audio.
//
// See also: `sim.rs` which emits these, `command.rs` for the inputs.
//
// **Critical constraint: determinism.** Events are emitted in processing
// order (commands first, then creatures in slot order), so two runs with the
// same inputs produce identical event lists.

use crate::mood::Mood;
use crate::movement::VaultRank;
use crate::types::{BoxId, EntityId, SlotId};
use crate::zone::Layout;
use serde::{Deserialize, Serialize};

/// A narrative event stamped with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEventKind {
    /// A creature took a free slot.
    AiEnabled { entity: EntityId, slot: SlotId },
    /// A creature took `evicted`'s slot.
    AiEvicted {
        entity: EntityId,
        evicted: EntityId,
        slot: SlotId,
    },
    /// No slot was free and nobody was farther away.
    AiRefused { entity: EntityId },
    AiDisabled { entity: EntityId },
    MoodChanged { entity: EntityId, from: Mood, to: Mood },
    /// A climbing creature met a ledge and must play a climb or fall.
    Vaulted { entity: EntityId, rank: VaultRank },
    /// Hit points ran out.
    CreatureDied { entity: EntityId },
    /// A land creature entered flooded geometry.
    CreatureDrowned { entity: EntityId },
    BoxBlocked { box_id: BoxId, blocked: bool },
    MapFlipped { layout: Layout },
}
