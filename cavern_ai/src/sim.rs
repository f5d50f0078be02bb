// Simulation state and the fixed-rate tick loop.
//
// `SimState` owns everything the AI core mutates: the navigation `Level`
// (box flags and layout change at runtime), the entity arena, the creature
// slot pool, the PRNG, the player handle and the camera position used for
// slot eviction. World geometry is supplied by the host as any
// `WorldQuery`; the in-crate `SectorGrid` is the default.
//
// ## Tick
//
// `step(commands)` advances exactly one tick:
//
//   1. Apply the queued `SimCommand`s in order (see `command.rs`).
//   2. Activation: every creature entity that is not deactivated passes
//      through `SlotPool::creature_active`. Slot holders pass at once;
//      dormant creatures retry for a slot and go `Invisible` when refused.
//   3. Update every slot holder in slot order:
//        - dead creatures (no hit points left) are deactivated and release
//          their slot,
//        - sensing (`creature_ai_info`),
//        - mood and target (`creature_mood`),
//        - speed and turn limit by mood: walking values while bored or
//          stalking, running values while attacking or escaping,
//        - `turn` toward the target, `tilt` into the turn,
//        - `vault` for species with a climb limit, `animate` otherwise,
//        - overlap rollback: a move that brings the creature's bounding
//          sphere into another live entity's is undone for this tick,
//        - head aim toward the enemy when it is ahead.
//   4. Clear every entity's `hit` flag.
//
// Per-creature updates take the `Creature` out of its slot for the
// duration, so the creature and the arena can be borrowed independently.
//
// ## Stale handles
//
// Commands and creatures refer to entities by generational `EntityId`. A
// handle to a despawned entity resolves to nothing: commands naming one are
// ignored with a `warn!`, and a creature whose enemy vanished simply loses
// interest (sensing reports no enemy zone, mood falls back to `Bored`).
//
// See also: `command.rs`, `event.rs`, `slots.rs` for the activation policy,
// `mood.rs` and `movement.rs` for the per-creature stages.
//
// **Critical constraint: determinism.** All randomness comes from the owned
// `GameRng`. Creatures are activated in entity slot-map order and updated in
// slot order; nothing depends on wall-clock time or hash order.

use crate::command::SimCommand;
use crate::config::AiConfig;
use crate::entity::{Entity, EntityArena, EntityStatus};
use crate::event::{SimEvent, SimEventKind};
use crate::level::Level;
use crate::mood::{Mood, creature_mood};
use crate::movement::{VaultRank, animate, head, overlaps_agent, tilt, turn, vault};
use crate::sensing::creature_ai_info;
use crate::slots::{AiContext, Creature, SlotOutcome, SlotPool};
use crate::types::{Angle, EntityId, Position, SlotId};
use crate::world::{SectorGrid, WorldQuery};
use cavern_prng::GameRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The whole AI-side simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimState<W = SectorGrid> {
    /// Ticks completed.
    pub tick: u64,
    pub rng: GameRng,
    pub config: AiConfig,
    pub level: Level,
    pub world: W,
    pub entities: EntityArena,
    pub slots: SlotPool,
    /// Every creature's initial enemy.
    pub player: Option<EntityId>,
    /// Eviction distances are measured from here.
    pub camera: Position,
}

/// The result of advancing the simulation one tick.
pub struct StepResult {
    /// Narrative events emitted during this step, in processing order.
    pub events: Vec<SimEvent>,
}

/// Build the shared per-creature context from disjoint `SimState` fields.
/// A macro rather than a method so the arena, slots and PRNG stay mutably
/// borrowable alongside it.
macro_rules! ai_context {
    ($sim:expr) => {
        AiContext {
            level: &$sim.level,
            world: &$sim.world,
            config: &$sim.config,
            player: $sim.player,
            camera: $sim.camera,
        }
    };
}

impl<W: WorldQuery> SimState<W> {
    /// A sim over `level` and `world`, with a slot pool sized from `config`.
    pub fn new(level: Level, world: W, config: AiConfig, seed: u64) -> Self {
        let slots = SlotPool::new(config.slot_count);
        Self {
            tick: 0,
            rng: GameRng::new(seed),
            config,
            level,
            world,
            entities: EntityArena::new(),
            slots,
            player: None,
            camera: Position::default(),
        }
    }

    /// Add an entity. Creatures start `Active` without a slot and request
    /// one on the next tick.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        entity.box_id = self.world.sector(entity.pos, entity.room).box_id;
        entity.slot = None;
        self.entities.spawn(entity)
    }

    /// Remove an entity, releasing its slot first. Outstanding handles to it
    /// go stale.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.slots.disable_ai(&mut self.entities, id);
        if self.player == Some(id) {
            self.player = None;
        }
        self.entities.despawn(id)
    }

    /// Make `id` the enemy of every creature, present and future.
    pub fn set_player(&mut self, id: EntityId) {
        self.player = Some(id);
        let held: SmallVec<[SlotId; 8]> = self.slots.iter().map(|(slot, _)| slot).collect();
        for slot in held {
            if let Some(creature) = self.slots.get_mut(slot) {
                creature.enemy = Some(id);
            }
        }
    }

    pub fn set_camera(&mut self, pos: Position) {
        self.camera = pos;
    }

    /// The AI record of `id`, if it holds a slot.
    pub fn creature(&self, id: EntityId) -> Option<&Creature> {
        let slot = self.entities.get(id)?.slot?;
        self.slots.get(slot)
    }

    /// Apply one command, appending what it caused to `events`.
    pub fn apply_command(&mut self, cmd: &SimCommand, events: &mut Vec<SimEvent>) {
        let tick = self.tick;
        let mut emit = |kind: SimEventKind| events.push(SimEvent { tick, kind });
        match *cmd {
            SimCommand::EnableAi { entity, force } => {
                let ctx = ai_context!(self);
                match self.slots.enable_ai(&mut self.entities, entity, force, &ctx) {
                    Ok(SlotOutcome::AlreadyActive(_)) => {}
                    Ok(SlotOutcome::Assigned(slot)) => emit(SimEventKind::AiEnabled { entity, slot }),
                    Ok(SlotOutcome::Evicted { slot, evicted }) => {
                        emit(SimEventKind::AiEvicted { entity, evicted, slot })
                    }
                    Ok(SlotOutcome::Refused) => emit(SimEventKind::AiRefused { entity }),
                    Err(err) => tracing::warn!(%err, "ignored EnableAi"),
                }
            }
            SimCommand::DisableAi { entity } => {
                let Some(e) = self.entities.get_mut(entity) else {
                    tracing::warn!(%entity, "ignored DisableAi for a stale entity");
                    return;
                };
                e.status = EntityStatus::Deactivated;
                if self.slots.disable_ai(&mut self.entities, entity) {
                    emit(SimEventKind::AiDisabled { entity });
                }
            }
            SimCommand::SetBoxBlocked { box_id, blocked } => {
                match self.level.graph_mut().set_blocked(box_id, blocked) {
                    Ok(()) => emit(SimEventKind::BoxBlocked { box_id, blocked }),
                    Err(err) => tracing::warn!(%err, "ignored SetBoxBlocked"),
                }
            }
            SimCommand::SetBoxBlockable { box_id, blockable } => {
                if let Err(err) = self.level.graph_mut().set_blockable(box_id, blockable) {
                    tracing::warn!(%err, "ignored SetBoxBlockable");
                }
            }
            SimCommand::Damage { entity, amount } => {
                let Some(e) = self.entities.get_mut(entity) else {
                    tracing::warn!(%entity, "ignored Damage for a stale entity");
                    return;
                };
                e.hit_points -= amount;
                e.hit = true;
                if !e.is_alive() && e.is_creature() && e.status != EntityStatus::Deactivated {
                    e.status = EntityStatus::Deactivated;
                    self.slots.disable_ai(&mut self.entities, entity);
                    emit(SimEventKind::CreatureDied { entity });
                }
            }
            SimCommand::FlipMap => {
                self.level.flip();
                emit(SimEventKind::MapFlipped {
                    layout: self.level.layout,
                });
            }
            SimCommand::RecomputeZone { entity } => {
                let ctx = ai_context!(self);
                if let Err(err) = self.slots.recompute_zone(&mut self.entities, entity, &ctx) {
                    tracing::warn!(%err, "ignored RecomputeZone");
                }
            }
            SimCommand::Activate { entity } => match self.entities.get_mut(entity) {
                Some(e) if e.is_alive() => e.status = EntityStatus::Active,
                Some(_) => {}
                None => tracing::warn!(%entity, "ignored Activate for a stale entity"),
            },
        }
    }

    /// Apply `commands`, then advance one tick.
    pub fn step(&mut self, commands: &[SimCommand]) -> StepResult {
        self.tick += 1;
        let mut events = Vec::new();
        for cmd in commands {
            self.apply_command(cmd, &mut events);
        }

        let candidates: SmallVec<[EntityId; 16]> = self
            .entities
            .iter()
            .filter(|(_, e)| e.is_creature() && e.status != EntityStatus::Deactivated)
            .map(|(id, _)| id)
            .collect();
        for id in candidates {
            let had_slot = self.entities.get(id).and_then(|e| e.slot).is_some();
            let ctx = ai_context!(self);
            let active = self.slots.creature_active(&mut self.entities, id, &ctx);
            let slot = self.entities.get(id).and_then(|e| e.slot);
            if let Some(slot) = slot.filter(|_| active && !had_slot) {
                events.push(SimEvent {
                    tick: self.tick,
                    kind: SimEventKind::AiEnabled { entity: id, slot },
                });
            }
        }

        let active: SmallVec<[(SlotId, EntityId); 8]> = self.slots.iter().map(|(slot, c)| (slot, c.entity)).collect();
        for (slot, id) in active {
            self.update_creature(slot, id, &mut events);
        }

        for id in self.entities.ids() {
            if let Some(e) = self.entities.get_mut(id) {
                e.hit = false;
            }
        }
        StepResult { events }
    }

    /// Take a creature that was lifted out of `slot` out of play for good.
    /// The slot stays empty.
    fn retire(&mut self, slot: SlotId, creature: Creature, kind: SimEventKind, events: &mut Vec<SimEvent>) {
        let id = creature.entity;
        if let Some(e) = self.entities.get_mut(id) {
            e.status = EntityStatus::Deactivated;
            e.slot = None;
        }
        tracing::debug!(entity = %id, slot = slot.0, "ai slot released");
        events.push(SimEvent { tick: self.tick, kind });
    }

    /// One creature's tick: sense, choose, steer, move.
    fn update_creature(&mut self, slot: SlotId, id: EntityId, events: &mut Vec<SimEvent>) {
        let Some(mut creature) = self.slots.take(slot) else {
            return;
        };
        let Some(species) = self.entities.get(id).filter(|e| e.is_alive()).and_then(|e| e.species) else {
            self.retire(slot, creature, SimEventKind::CreatureDied { entity: id }, events);
            return;
        };
        let data = self.config.species_data(species).clone();

        let info = creature_ai_info(&creature, &mut self.entities, &self.level, &self.world, &self.config);
        let previous = creature.mood;
        let ctx = ai_context!(self);
        let grade = creature_mood(&mut creature, &self.entities, &ctx, &mut self.rng, &info, data.violent);
        if creature.mood != previous {
            events.push(SimEvent {
                tick: self.tick,
                kind: SimEventKind::MoodChanged {
                    entity: id,
                    from: previous,
                    to: creature.mood,
                },
            });
        }
        tracing::trace!(entity = %id, mood = ?creature.mood, ?grade, "creature think");

        let (speed, max_turn) = match creature.mood {
            Mood::Bored | Mood::Stalk => (data.walk_speed, data.walk_turn),
            Mood::Attack | Mood::Escape => (data.run_speed, data.run_turn),
        };
        creature.max_turn = max_turn;

        let was_overlapping = overlaps_agent(&self.entities, id);
        let Some(entity) = self.entities.get_mut(id) else {
            self.slots.put_back(slot, creature);
            return;
        };
        entity.speed = speed;
        let before = (entity.pos, entity.room, entity.box_id, entity.floor);

        let applied = turn(entity, &creature, max_turn, self.config.front_arc);
        tilt(entity, applied, self.config.max_tilt);
        let alive = match data.max_climb {
            Some(max_climb) => {
                let rank = vault(entity, &creature, &ctx, applied, max_climb, data.vault_shift);
                if rank != VaultRank::None {
                    events.push(SimEvent {
                        tick: self.tick,
                        kind: SimEventKind::Vaulted { entity: id, rank },
                    });
                }
                entity.status != EntityStatus::Deactivated
            }
            None => animate(entity, &creature, &ctx, applied, applied),
        };
        if !alive {
            self.retire(slot, creature, SimEventKind::CreatureDrowned { entity: id }, events);
            return;
        }

        let collided = self.config.agent_overlap_rollback && !was_overlapping && overlaps_agent(&self.entities, id);
        if let Some(entity) = self.entities.get_mut(id).filter(|_| collided) {
            (entity.pos, entity.room, entity.box_id, entity.floor) = before;
        }

        let required = if info.ahead { info.angle } else { Angle::ZERO };
        head(&mut creature, required, self.config.max_head_change, self.config.front_arc);
        self.slots.put_back(slot, creature);
    }
}
