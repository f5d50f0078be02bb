// Entities: the game objects creatures are attached to and hunt.
//
// An `Entity` carries pose, room, current box, floor height, speed, hit
// points and activation status. Creatures are entities with a `species`; the
// player is an entity without one. A creature's AI state (`Creature`, in
// `slots.rs`) exists only while its entity holds a slot, and the entity
// records which slot that is.
//
// `EntityArena` wraps a `SlotMap` keyed by `EntityId`. Despawning bumps the
// slot's version, so every outstanding handle to the old occupant (a
// creature's enemy handle, a queued command) resolves to nothing instead of
// to whatever reuses the slot.
//
// Status lifecycle:
// - `Active`: processed every tick; holds a slot or is retrying for one.
// - `Invisible`: dormant. Set on eviction; `creature_active` brings it back.
// - `Deactivated`: out of play (dead and finished, or AI disabled by a
//   trigger). Never processed.
//
// See also: `slots.rs` for slot assignment, `sim.rs` which owns the arena,
// `types.rs` for `EntityId`.
//
// **Critical constraint: determinism.** Iteration is in slot order and the
// slot map's free list is LIFO, so spawn order fully determines ids.

use crate::species::SpeciesData;
use crate::types::{BoxId, EntityId, Position, RoomId, Rotation, SlotId, Species};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    #[default]
    Active,
    /// Dormant: no slot, not drawn, waiting for activation.
    Invisible,
    /// Out of play.
    Deactivated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// `None` for the player and other non-creature entities.
    pub species: Option<Species>,
    pub pos: Position,
    pub rot: Rotation,
    pub room: RoomId,
    /// Box under the entity as of the last sector lookup.
    pub box_id: Option<BoxId>,
    /// Floor height under the entity as of the last movement step.
    pub floor: i32,
    /// Forward speed per tick.
    pub speed: i32,
    pub hit_points: i32,
    /// Took damage this tick. Cleared at the end of the tick.
    pub hit: bool,
    pub status: EntityStatus,
    /// Bounding height above the feet.
    pub height: i32,
    /// Bounding sphere radius for agent overlap.
    pub radius: i32,
    pub slot: Option<SlotId>,
}

impl Entity {
    /// A creature entity sized from its species row.
    pub fn creature(species: Species, data: &SpeciesData, pos: Position, room: RoomId) -> Entity {
        Entity {
            species: Some(species),
            pos,
            rot: Rotation::default(),
            room,
            box_id: None,
            floor: pos.y,
            speed: 0,
            hit_points: data.hit_points,
            hit: false,
            status: EntityStatus::Active,
            height: data.height,
            radius: data.radius,
            slot: None,
        }
    }

    /// A non-creature entity such as the player.
    pub fn actor(pos: Position, room: RoomId, height: i32, radius: i32, hit_points: i32) -> Entity {
        Entity {
            species: None,
            pos,
            rot: Rotation::default(),
            room,
            box_id: None,
            floor: pos.y,
            speed: 0,
            hit_points,
            hit: false,
            status: EntityStatus::Active,
            height,
            radius,
            slot: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points > 0
    }

    pub fn is_creature(&self) -> bool {
        self.species.is_some()
    }
}

/// Generational storage for entities.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityArena {
    entities: SlotMap<EntityId, Entity>,
}

// Two arenas are equal when they hold the same live entities under the same
// handles; vacant slots are not compared.
impl PartialEq for EntityArena {
    fn eq(&self, other: &Self) -> bool {
        self.entities.iter().eq(other.entities.iter())
    }
}

impl Eq for EntityArena {}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.entities.insert(entity)
    }

    /// Remove an entity. Every handle to it goes stale.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Live entity ids in slot order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat() -> Entity {
        Entity::creature(
            Species::Rat,
            &SpeciesData::DEFAULT,
            Position::new(512, 0, 512),
            RoomId(0),
        )
    }

    #[test]
    fn despawn_invalidates_handles() {
        let mut arena = EntityArena::new();
        let a = arena.spawn(rat());
        assert!(arena.contains(a));
        assert!(arena.despawn(a).is_some());
        assert!(!arena.contains(a));
        assert!(arena.despawn(a).is_none());

        // The slot is reused under a new version.
        let b = arena.spawn(rat());
        assert_ne!(b, a);
        assert_eq!(arena.len(), 1);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn iteration_is_in_slot_order() {
        let mut arena = EntityArena::new();
        let ids: Vec<_> = (0..4).map(|_| arena.spawn(rat())).collect();
        arena.despawn(ids[1]);
        assert_eq!(arena.ids(), vec![ids[0], ids[2], ids[3]]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn creature_takes_body_from_species() {
        let data = SpeciesData {
            radius: 123,
            height: 456,
            hit_points: 7,
            ..SpeciesData::DEFAULT
        };
        let e = Entity::creature(Species::Wolf, &data, Position::new(0, 100, 0), RoomId(2));
        assert_eq!(e.radius, 123);
        assert_eq!(e.height, 456);
        assert_eq!(e.floor, 100);
        assert!(e.is_alive() && e.is_creature());
    }
}
