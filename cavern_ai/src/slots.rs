// Creature AI slots: the bounded pool of active agents.
//
// Only `slot_count` creatures run AI at once. A creature's `Creature` record
// (mood, aim, enemy handle, LOT) lives in a slot and exists only while its
// entity holds that slot; the entity stores the slot index. Everything else
// in the level stays dormant.
//
// Assignment policy (`enable_ai`):
// 1. An entity that already holds a slot keeps it.
// 2. Otherwise it takes the lowest free slot.
// 3. Otherwise the holder farthest from the camera (squared distance, first
//    slot wins ties) is evicted, but only if it is strictly farther than the
//    candidate. A forced request counts the candidate as distance 0. The
//    evicted entity goes `Invisible` and will re-request through
//    `creature_active` on a later tick.
// 4. Otherwise the request is refused and the candidate stays dormant.
//
// Slot initialisation copies the species' movement envelope into a fresh
// LOT and builds the zone membership list: every box whose zone matches the
// creature's box in either the normal or the flipped layout. That list is
// what the mood layer samples random destinations from.
//
// See also: `entity.rs` for the status lifecycle, `lot.rs` for the search
// state a slot owns, `sim.rs` which calls `creature_active` every tick.
//
// **Critical constraint: determinism.** Slots are scanned in index order;
// eviction ties go to the lowest slot.

use crate::config::AiConfig;
use crate::entity::{EntityArena, EntityStatus};
use crate::error::NavError;
use crate::level::Level;
use crate::lot::Lot;
use crate::mood::Mood;
use crate::types::{Angle, BoxId, EntityId, Position, SlotId};
use crate::world::WorldQuery;
use crate::zone::Layout;
use serde::{Deserialize, Serialize};

/// Per-agent AI state. Owned by a slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    pub entity: EntityId,
    pub mood: Mood,
    /// Turn limit for this tick; set from the species by mood.
    pub max_turn: Angle,
    pub head: Angle,
    pub neck: Angle,
    /// Pursued entity. May go stale at any time.
    pub enemy: Option<EntityId>,
    /// Species-local attack sub-state.
    pub flags: u16,
    /// Waypoint the movement layer steers at.
    pub target: Position,
    pub lot: Lot,
}

/// Result of an activation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotOutcome {
    AlreadyActive(SlotId),
    Assigned(SlotId),
    Evicted { slot: SlotId, evicted: EntityId },
    Refused,
}

impl SlotOutcome {
    /// The slot the candidate now holds, if any.
    pub fn slot(self) -> Option<SlotId> {
        match self {
            SlotOutcome::AlreadyActive(slot) | SlotOutcome::Assigned(slot) => Some(slot),
            SlotOutcome::Evicted { slot, .. } => Some(slot),
            SlotOutcome::Refused => None,
        }
    }
}

/// Shared read-only state the per-creature operations consult.
pub struct AiContext<'a> {
    pub level: &'a Level,
    pub world: &'a dyn WorldQuery,
    pub config: &'a AiConfig,
    /// Initial enemy of every creature.
    pub player: Option<EntityId>,
    /// Eviction distances are measured from here.
    pub camera: Position,
}

/// Fixed-capacity slot arena.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPool {
    slots: Vec<Option<Creature>>,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently held.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, slot: SlotId) -> Option<&Creature> {
        self.slots.get(slot.index())?.as_ref()
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Creature> {
        self.slots.get_mut(slot.index())?.as_mut()
    }

    /// Held slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Creature)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|c| (SlotId(i as u16), c)))
    }

    /// Take a creature out for an update; pair with `put_back`.
    pub(crate) fn take(&mut self, slot: SlotId) -> Option<Creature> {
        self.slots.get_mut(slot.index())?.take()
    }

    pub(crate) fn put_back(&mut self, slot: SlotId, creature: Creature) {
        self.slots[slot.index()] = Some(creature);
    }

    /// Give `id` an AI slot, evicting a farther creature if the pool is full.
    pub fn enable_ai(
        &mut self,
        entities: &mut EntityArena,
        id: EntityId,
        force: bool,
        ctx: &AiContext<'_>,
    ) -> Result<SlotOutcome, NavError> {
        let entity = entities.get(id).ok_or(NavError::UnknownEntity(id))?;
        if !entity.is_creature() {
            return Err(NavError::NotACreature(id));
        }
        if let Some(slot) = entity.slot {
            return Ok(SlotOutcome::AlreadyActive(slot));
        }
        if !entity.is_alive() || entity.status == EntityStatus::Deactivated {
            tracing::debug!(entity = %id, "ai slot refused to a creature out of play");
            return Ok(SlotOutcome::Refused);
        }

        if let Some(free) = self.slots.iter().position(Option::is_none) {
            let slot = SlotId(free as u16);
            self.initialise_slot(entities, id, slot, ctx)?;
            tracing::debug!(entity = %id, slot = slot.0, "ai slot assigned");
            return Ok(SlotOutcome::Assigned(slot));
        }

        let candidate = if force {
            0
        } else {
            entity.pos.distance_sq(ctx.camera)
        };
        let mut worst: Option<(SlotId, EntityId)> = None;
        let mut worst_distance = candidate;
        for (slot, creature) in self.iter() {
            let Some(holder) = entities.get(creature.entity) else {
                continue;
            };
            let distance = holder.pos.distance_sq(ctx.camera);
            if distance > worst_distance {
                worst_distance = distance;
                worst = Some((slot, creature.entity));
            }
        }

        let Some((slot, evicted)) = worst else {
            tracing::debug!(entity = %id, "ai slot refused");
            return Ok(SlotOutcome::Refused);
        };
        if let Some(holder) = entities.get_mut(evicted) {
            holder.status = EntityStatus::Invisible;
        }
        self.disable_ai(entities, evicted);
        self.initialise_slot(entities, id, slot, ctx)?;
        tracing::debug!(entity = %id, evicted = %evicted, slot = slot.0, "ai slot taken by eviction");
        Ok(SlotOutcome::Evicted { slot, evicted })
    }

    /// Release `id`'s slot. Returns whether it held one.
    pub fn disable_ai(&mut self, entities: &mut EntityArena, id: EntityId) -> bool {
        let Some(entity) = entities.get_mut(id) else {
            return false;
        };
        let Some(slot) = entity.slot.take() else {
            return false;
        };
        if let Some(cell) = self.slots.get_mut(slot.index()) {
            *cell = None;
        }
        tracing::debug!(entity = %id, slot = slot.0, "ai slot released");
        true
    }

    /// Build a fresh `Creature` for `id` in `slot`. The slot must be empty or
    /// already `id`'s; any other slot `id` holds is released.
    pub fn initialise_slot(
        &mut self,
        entities: &mut EntityArena,
        id: EntityId,
        slot: SlotId,
        ctx: &AiContext<'_>,
    ) -> Result<(), NavError> {
        let occupant = self.slots.get(slot.index()).ok_or(NavError::UnknownSlot(slot))?;
        if occupant.as_ref().is_some_and(|c| c.entity != id) {
            return Err(NavError::SlotOccupied(slot));
        }
        let entity = entities.get_mut(id).ok_or(NavError::UnknownEntity(id))?;
        let species = entity.species.ok_or(NavError::NotACreature(id))?;
        if let Some(previous) = entity.slot.filter(|&held| held != slot) {
            if let Some(cell) = self.slots.get_mut(previous.index()) {
                *cell = None;
            }
            tracing::debug!(entity = %id, slot = previous.0, "ai slot released for a reassignment");
        }
        let data = ctx.config.species_data(species);

        let mut lot = Lot::new(ctx.level.graph().len(), data.envelope());
        lot.clear();
        let mut creature = Creature {
            entity: id,
            mood: Mood::Bored,
            max_turn: Angle::ZERO,
            head: Angle::ZERO,
            neck: Angle::ZERO,
            enemy: ctx.player,
            flags: 0,
            target: entity.pos,
            lot,
        };

        entity.box_id = ctx.world.sector(entity.pos, entity.room).box_id;
        entity.slot = Some(slot);
        entity.status = EntityStatus::Active;
        create_zone(&mut creature, entity.box_id, ctx.level);
        if let Some(cell) = self.slots.get_mut(slot.index()) {
            *cell = Some(creature);
        }
        Ok(())
    }

    /// Rebuild the zone membership list of `id`'s creature, e.g. after a
    /// flip-map event. No-op for entities without a slot.
    pub fn recompute_zone(&mut self, entities: &mut EntityArena, id: EntityId, ctx: &AiContext<'_>) -> Result<(), NavError> {
        let entity = entities.get_mut(id).ok_or(NavError::UnknownEntity(id))?;
        let Some(slot) = entity.slot else {
            return Ok(());
        };
        entity.box_id = ctx.world.sector(entity.pos, entity.room).box_id;
        if let Some(creature) = self.get_mut(slot) {
            create_zone(creature, entity.box_id, ctx.level);
        }
        Ok(())
    }

    /// Per-tick gate: whether `id` may run AI this tick. Dormant entities
    /// retry for a slot here.
    pub fn creature_active(&mut self, entities: &mut EntityArena, id: EntityId, ctx: &AiContext<'_>) -> bool {
        let Some(entity) = entities.get(id) else {
            return false;
        };
        if entity.status == EntityStatus::Deactivated {
            return false;
        }
        if entity.slot.is_some() {
            return true;
        }
        match self.enable_ai(entities, id, false, ctx) {
            Ok(SlotOutcome::Refused) | Err(_) => {
                if let Some(entity) = entities.get_mut(id) {
                    entity.status = EntityStatus::Invisible;
                }
                false
            }
            Ok(_) => true,
        }
    }
}

/// Collect every box sharing the creature's zone in either layout.
pub fn create_zone(creature: &mut Creature, box_id: Option<BoxId>, level: &Level) {
    creature.lot.zone_boxes.clear();
    let Some(home) = box_id else {
        return;
    };
    let class = creature.lot.zone_class();
    let zones = level.zones();
    let normal = zones.table(class, Layout::Normal);
    let flipped = zones.table(class, Layout::Flipped);
    let (home_normal, home_flipped) = (normal[home.index()], flipped[home.index()]);
    creature.lot.zone_boxes.extend(
        normal
            .iter()
            .zip(flipped)
            .enumerate()
            .filter(|(_, (n, f))| **n == home_normal || **f == home_flipped)
            .map(|(i, _)| BoxId(i as u32)),
    );
}
