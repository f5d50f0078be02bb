// Commands that mutate simulation state from outside.
//
// Gameplay and trigger code never touches `SimState` fields directly; it
// queues `SimCommand`s, which `SimState::step` applies at the start of the
// next tick (or which the host applies at once with `apply_command`).
// Commands name entities by generational handle, so a command aimed at a
// despawned entity resolves to nothing and is ignored with a warning.
//
// Current commands:
// - `EnableAi` / `DisableAi`: request or release an AI slot.
// - `SetBoxBlocked`: a door or movable block opens or closes.
// - `SetBoxBlockable`: mark a box as one that may be blocked.
// - `Damage`: take hit points off an entity and flag it as hit this tick.
// - `FlipMap`: switch every zone lookup to the other layout.
// - `RecomputeZone`: rebuild one creature's zone membership list.
// - `Activate`: wake a dormant entity so it retries for a slot.
//
// See also: `sim.rs` for `apply_command`, `event.rs` for what each command
// reports back.
//
// **Critical constraint: determinism.** Commands are the sole external input
// to the sim apart from entity spawning.

use crate::types::{BoxId, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimCommand {
    /// Request an AI slot. `force` lets the request evict any farther
    /// holder regardless of the requester's own distance.
    EnableAi { entity: EntityId, force: bool },
    DisableAi { entity: EntityId },
    SetBoxBlocked { box_id: BoxId, blocked: bool },
    SetBoxBlockable { box_id: BoxId, blockable: bool },
    Damage { entity: EntityId, amount: i32 },
    FlipMap,
    RecomputeZone { entity: EntityId },
    Activate { entity: EntityId },
}
