// Movement integrator: per-tick pose update for an AI-driven creature.
//
// `animate` advances the entity along its heading by its speed, then makes
// the result legal:
//
// 1. Look-ahead: the sector at the top of the body is read. If it has no box,
//    lies in another zone than the box the creature stood in, or its floor
//    breaks the movement envelope, the position snaps back to the edge of the
//    tile it came from on each axis it crossed.
// 2. Edge nudging: within `radius` of a tile edge, the floor across that edge
//    is probed (`bad_floor`). A bad edge pushes the creature back inside. At
//    a corner where only the diagonal is bad, the facing octant decides which
//    axis yields. Any nudge also applies the caller's turn again (and tilt).
// 3. Vertical: flyers ease toward the target height by at most `fly` per
//    tick, refusing moves that would take the body through the floor or the
//    ceiling, and pitch one degree per tick toward their climb angle. Ground
//    creatures rise to the floor at once, sink toward it by `ground_settle`
//    per tick and keep zero pitch.
// 4. A creature that is not a water creature drowns when the room two clicks
//    above its feet is flooded.
//
// `vault` wraps `animate` for climbing species: it classifies the height
// change of the step into a `VaultRank`, puts the creature flush against the
// tile edge it crossed, and restores its pre-step height so the caller can
// play the matching climb or fall. `turn`, `tilt` and `head` are the small
// orientation helpers the driver calls around them.
//
// See also: `sim.rs` which sequences these per tick, `lot.rs` for
// `MoveEnvelope` and the exit boxes used as the "next" floor, `world.rs` for
// the geometry queries.
//
// **Critical constraint: determinism.** All positions stay integral; the
// only floating point is the sin/cos of the heading, rounded once per step.

use crate::entity::{Entity, EntityArena, EntityStatus};
use crate::lot::Lot;
use crate::slots::{AiContext, Creature};
use crate::types::{Angle, EntityId, Position, RoomId, STEP_L, WALL_L, WALL_SHIFT};
use crate::world::NO_HEIGHT;
use serde::{Deserialize, Serialize};

/// Outcome of a vaulting step, ordered by height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VaultRank {
    /// Ordinary step: no vault needed.
    None,
    /// Two-click climb.
    Climb2,
    Climb3,
    /// Full block.
    Climb4,
    /// Too high to climb, or a drop of more than three and a half clicks.
    Fall,
}

const TILE_MASK: i32 = WALL_L - 1;

/// Whether the floor at `probe` is off-limits to the creature owning `lot`,
/// coming from a box at `box_height` whose next box toward the goal sits at
/// `next_height`.
pub fn bad_floor(
    ctx: &AiContext<'_>,
    lot: &Lot,
    probe: Position,
    room: RoomId,
    box_height: i32,
    next_height: i32,
) -> bool {
    let sector = ctx.world.sector(probe, room);
    let Some(id) = sector.box_id else {
        return true;
    };
    let graph = ctx.level.graph();
    if graph.is_impassable(id, lot.envelope.block_mask) {
        return true;
    }
    let height = graph.box_info(id).height;
    let change = height - box_height;
    if !lot.envelope.allows(change) {
        return true;
    }
    // A drop bigger than a step is only taken when it is on the route.
    if change > lot.envelope.step && height > next_height {
        return true;
    }
    lot.envelope.is_flyer() && probe.y > height + lot.envelope.fly
}

/// Advance `entity` one tick. Returns `false` when the entity is out of play
/// afterwards (deactivated before the step, or drowned during it); the
/// caller then releases its slot.
pub fn animate(entity: &mut Entity, creature: &Creature, ctx: &AiContext<'_>, turn: Angle, tilt_angle: Angle) -> bool {
    if entity.status == EntityStatus::Deactivated {
        return false;
    }
    let level = ctx.level;
    let graph = level.graph();
    let lot = &creature.lot;
    let class = lot.zone_class();

    let old = entity.pos;
    let (body, room) = (entity.height, entity.room);
    let box_height = entity.box_id.map_or(entity.floor, |b| graph.box_info(b).height);
    let speed = f64::from(entity.speed);
    entity.pos.x += (speed * entity.rot.heading.sin()).round() as i32;
    entity.pos.z += (speed * entity.rot.heading.cos()).round() as i32;

    let heights = |pos: Position| {
        let sector = ctx.world.sector(Position::new(pos.x, pos.y - body, pos.z), room);
        let height = sector.box_id.map_or(box_height, |b| graph.box_info(b).height);
        let next = sector
            .box_id
            .and_then(|b| lot.exit_box(b))
            .map_or(height, |b| graph.box_info(b).height);
        (sector, height, next)
    };

    let (sector, mut height, mut next_height) = heights(entity.pos);
    let violation = match sector.box_id {
        None => true,
        Some(b) => {
            entity.box_id.is_some_and(|own| level.zone(class, own) != level.zone(class, b))
                || !lot.envelope.allows(graph.box_info(b).height - box_height)
        }
    };
    if violation {
        if entity.pos.tile_x() < old.tile_x() {
            entity.pos.x = old.x & !TILE_MASK;
        } else if entity.pos.tile_x() > old.tile_x() {
            entity.pos.x = old.x | TILE_MASK;
        }
        if entity.pos.tile_z() < old.tile_z() {
            entity.pos.z = old.z & !TILE_MASK;
        } else if entity.pos.tile_z() > old.tile_z() {
            entity.pos.z = old.z | TILE_MASK;
        }
        (_, height, next_height) = heights(entity.pos);
    }

    let (x, y, z) = (entity.pos.x, entity.pos.y - body, entity.pos.z);
    let (pos_x, pos_z) = (x & TILE_MASK, z & TILE_MASK);
    let radius = entity.radius;
    let heading = entity.rot.heading.0;
    let bad = |px: i32, pz: i32| bad_floor(ctx, lot, Position::new(px, y, pz), room, height, next_height);
    let mut shift_x = 0;
    let mut shift_z = 0;

    if pos_z < radius {
        if bad(x, z - radius) {
            shift_z = radius - pos_z;
        }
        if pos_x < radius {
            if bad(x - radius, z) {
                shift_x = radius - pos_x;
            } else if shift_z == 0 && bad(x - radius, z - radius) {
                if heading > -0x6000 && heading < 0x2000 {
                    shift_z = radius - pos_z;
                } else {
                    shift_x = radius - pos_x;
                }
            }
        } else if pos_x > WALL_L - radius {
            if bad(x + radius, z) {
                shift_x = WALL_L - radius - pos_x;
            } else if shift_z == 0 && bad(x + radius, z - radius) {
                if heading > -0x2000 && heading < 0x6000 {
                    shift_z = radius - pos_z;
                } else {
                    shift_x = WALL_L - radius - pos_x;
                }
            }
        }
    } else if pos_z > WALL_L - radius {
        if bad(x, z + radius) {
            shift_z = WALL_L - radius - pos_z;
        }
        if pos_x < radius {
            if bad(x - radius, z) {
                shift_x = radius - pos_x;
            } else if shift_z == 0 && bad(x - radius, z + radius) {
                if heading > -0x2000 && heading < 0x6000 {
                    shift_x = radius - pos_x;
                } else {
                    shift_z = WALL_L - radius - pos_z;
                }
            }
        } else if pos_x > WALL_L - radius {
            if bad(x + radius, z) {
                shift_x = WALL_L - radius - pos_x;
            } else if shift_z == 0 && bad(x + radius, z + radius) {
                if heading > -0x6000 && heading < 0x2000 {
                    shift_x = WALL_L - radius - pos_x;
                } else {
                    shift_z = WALL_L - radius - pos_z;
                }
            }
        }
    } else if pos_x < radius {
        if bad(x - radius, z) {
            shift_x = radius - pos_x;
        }
    } else if pos_x > WALL_L - radius && bad(x + radius, z) {
        shift_x = WALL_L - radius - pos_x;
    }

    entity.pos.x += shift_x;
    entity.pos.z += shift_z;
    if shift_x != 0 || shift_z != 0 {
        entity.rot.heading += turn;
        if tilt_angle != Angle::ZERO {
            tilt(entity, Angle(tilt_angle.0.wrapping_mul(2)), ctx.config.max_tilt);
        }
    }

    let mut sector = ctx.world.sector(entity.pos, entity.room);
    if lot.envelope.is_flyer() {
        let fly = lot.envelope.fly;
        let mut dy = (creature.target.y - entity.pos.y).clamp(-fly, fly);
        let floor = ctx.world.floor_height(&sector, entity.pos);
        if entity.pos.y + dy > floor {
            if entity.pos.y > floor {
                entity.pos.x = old.x;
                entity.pos.z = old.z;
                dy = -fly;
            } else {
                entity.pos.y = floor;
                dy = 0;
            }
        } else {
            let ceiling = ctx.world.ceiling_height(&sector, entity.pos);
            let body_top = entity.pos.y - entity.height;
            if body_top + dy < ceiling {
                if body_top < ceiling {
                    entity.pos.x = old.x;
                    entity.pos.z = old.z;
                    dy = fly;
                } else {
                    dy = 0;
                }
            }
        }
        entity.pos.y += dy;
        sector = ctx.world.sector(entity.pos, entity.room);
        entity.floor = ctx.world.floor_height(&sector, entity.pos);

        let climb = if entity.speed != 0 {
            Angle::atan2(-dy, entity.speed)
        } else {
            Angle::ZERO
        };
        let pitch = entity.rot.pitch;
        entity.rot.pitch = if climb.0 < (pitch - Angle::DEGREE).0 {
            pitch - Angle::DEGREE
        } else if climb.0 > (pitch + Angle::DEGREE).0 {
            pitch + Angle::DEGREE
        } else {
            climb
        };
    } else {
        entity.floor = ctx.world.floor_height(&sector, entity.pos);
        let settle = ctx.config.ground_settle;
        if entity.pos.y > entity.floor {
            entity.pos.y = entity.floor;
        } else if entity.floor - entity.pos.y > settle {
            entity.pos.y += settle;
        } else {
            entity.pos.y = entity.floor;
        }
        entity.rot.pitch = Angle::ZERO;
    }

    let water_creature = entity
        .species
        .is_some_and(|s| ctx.config.species_data(s).water_creature);
    if !water_creature {
        let head = Position::new(entity.pos.x, entity.pos.y - 2 * STEP_L, entity.pos.z);
        let above = ctx.world.sector(head, entity.room);
        if ctx.world.is_underwater(above.room) {
            tracing::debug!(entity = %creature.entity, room = above.room.0, "creature drowned");
            entity.hit_points = 0;
            entity.status = EntityStatus::Deactivated;
            return false;
        }
    }

    // Solid wall belongs to no room.
    if sector.room != entity.room && sector.floor != NO_HEIGHT {
        tracing::trace!(entity = %creature.entity, from = entity.room.0, to = sector.room.0, "room changed");
        entity.room = sector.room;
    }
    if sector.box_id.is_some() {
        entity.box_id = sector.box_id;
    }
    true
}

/// Turn toward `creature.target` by at most `max_turn`, halved when the
/// target is behind and closer than the turning circle. Returns the turn
/// applied.
pub fn turn(entity: &mut Entity, creature: &Creature, max_turn: Angle, front_arc: Angle) -> Angle {
    if entity.speed == 0 || max_turn == Angle::ZERO {
        return Angle::ZERO;
    }
    let dx = creature.target.x - entity.pos.x;
    let dz = creature.target.z - entity.pos.z;
    let angle = Angle::atan2(dx, dz) - entity.rot.heading;

    let mut limit = i32::from(max_turn.0).abs();
    let range = i64::from((entity.speed << 14) / limit);
    let distance = i64::from(dx) * i64::from(dx) + i64::from(dz) * i64::from(dz);
    if (angle.0 > front_arc.0 || angle.0 < -front_arc.0) && distance < range * range {
        limit >>= 1;
    }

    let applied = angle.clamp_to(Angle(limit as i16));
    entity.rot.heading += applied;
    applied
}

/// Ease the roll toward four times `angle`, by at most `max_tilt`.
pub fn tilt(entity: &mut Entity, angle: Angle, max_tilt: Angle) {
    let wanted = i32::from(angle.0) << 2;
    let limit = i32::from(max_tilt.0).abs();
    let change = (wanted - i32::from(entity.rot.roll.0)).clamp(-limit, limit);
    entity.rot.roll = Angle((i32::from(entity.rot.roll.0) + change) as i16);
}

/// Ease the head toward `required`, staying within the front arc.
pub fn head(creature: &mut Creature, required: Angle, max_change: Angle, front_arc: Angle) {
    let change = (required - creature.head).clamp_to(max_change);
    creature.head = (creature.head + change).clamp_to(front_arc);
}

/// Animate, then classify the step into a vault. Returns `VaultRank::None`
/// when the step was ordinary or did not cross a tile edge; otherwise the
/// creature is placed `edge_shift` back from the crossed edge, facing it, at
/// its pre-step height. Climbs above `max_climb` report `Fall`.
pub fn vault(
    entity: &mut Entity,
    creature: &Creature,
    ctx: &AiContext<'_>,
    turn_angle: Angle,
    max_climb: VaultRank,
    edge_shift: i32,
) -> VaultRank {
    let (old_tx, old_tz) = (entity.pos.tile_x(), entity.pos.tile_z());
    let y = entity.pos.y;
    if !animate(entity, creature, ctx, turn_angle, Angle::ZERO) {
        return VaultRank::None;
    }

    let mut rank = if entity.floor > y + STEP_L * 7 / 2 {
        VaultRank::Fall
    } else if entity.pos.y > y - STEP_L * 3 / 2 {
        return VaultRank::None;
    } else if entity.pos.y > y - STEP_L * 5 / 2 {
        VaultRank::Climb2
    } else if entity.pos.y > y - STEP_L * 7 / 2 {
        VaultRank::Climb3
    } else {
        VaultRank::Climb4
    };
    if rank != VaultRank::Fall && rank > max_climb {
        rank = VaultRank::Fall;
    }

    let (new_tx, new_tz) = (entity.pos.tile_x(), entity.pos.tile_z());
    if old_tz == new_tz {
        if old_tx == new_tx {
            return VaultRank::None;
        }
        if old_tx < new_tx {
            entity.pos.x = (new_tx << WALL_SHIFT) - edge_shift;
            entity.rot.heading = Angle::QUARTER;
        } else {
            entity.pos.x = (old_tx << WALL_SHIFT) + edge_shift;
            entity.rot.heading = -Angle::QUARTER;
        }
    } else if old_tx == new_tx {
        if old_tz < new_tz {
            entity.pos.z = (new_tz << WALL_SHIFT) - edge_shift;
            entity.rot.heading = Angle::ZERO;
        } else {
            entity.pos.z = (old_tz << WALL_SHIFT) + edge_shift;
            entity.rot.heading = Angle::HALF;
        }
    }

    entity.pos.y = y;
    entity.floor = y;
    let sector = ctx.world.sector(entity.pos, entity.room);
    if sector.box_id.is_some() {
        entity.room = sector.room;
        entity.box_id = sector.box_id;
    }
    tracing::trace!(entity = %creature.entity, ?rank, "vault");
    rank
}

/// Whether `id`'s bounding sphere overlaps any other live entity's.
pub fn overlaps_agent(entities: &EntityArena, id: EntityId) -> bool {
    let Some(me) = entities.get(id) else {
        return false;
    };
    let center = |e: &Entity| Position::new(e.pos.x, e.pos.y - e.height / 2, e.pos.z);
    entities.iter().any(|(other, e)| {
        if other == id || e.status == EntityStatus::Deactivated || !e.is_alive() {
            return false;
        }
        let reach = i64::from(me.radius + e.radius);
        center(me).distance_sq(center(e)) < reach * reach
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{BoxGraph, BoxGraphBuilder, BoxInfo};
    use crate::config::AiConfig;
    use crate::level::Level;
    use crate::mood::Mood;
    use crate::species::SpeciesData;
    use crate::types::{BoxId, Species};
    use crate::world::{Sector, SectorGrid, WorldQuery};

    struct Scene {
        level: Level,
        world: SectorGrid,
        config: AiConfig,
    }

    impl Scene {
        /// One-block boxes along Z at the given floor heights.
        fn row(heights: &[i32]) -> Scene {
            let mut b = BoxGraphBuilder::new();
            for (i, &h) in heights.iter().enumerate() {
                let i = i as i32;
                b.add_box(BoxInfo::from_tiles(0, 1, i, i + 1, h));
            }
            b.connect_touching();
            Scene::of(b.build().unwrap())
        }

        fn of(graph: BoxGraph) -> Scene {
            let world = SectorGrid::from_boxes(&graph, 4 * WALL_L);
            Scene {
                level: Level::new(graph).unwrap(),
                world,
                config: AiConfig::default(),
            }
        }

        fn ctx(&self) -> AiContext<'_> {
            AiContext {
                level: &self.level,
                world: &self.world,
                config: &self.config,
                player: None,
                camera: Position::default(),
            }
        }

        fn creature(&self, species: Species, data: &SpeciesData, pos: Position) -> (Entity, Creature) {
            let mut entity = Entity::creature(species, data, pos, RoomId(0));
            entity.box_id = self.world.sector(pos, RoomId(0)).box_id;
            entity.floor = pos.y;
            let creature = Creature {
                entity: EntityId::default(),
                mood: Mood::Bored,
                max_turn: Angle::ZERO,
                head: Angle::ZERO,
                neck: Angle::ZERO,
                enemy: None,
                flags: 0,
                target: pos,
                lot: Lot::new(self.level.graph().len(), data.envelope()),
            };
            (entity, creature)
        }
    }

    #[test]
    fn walks_forward_on_flat_ground() {
        let scene = Scene::row(&[0, 0]);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 512));
        e.speed = 50;
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.pos, Position::new(512, 0, 562));
        assert_eq!(e.floor, 0);
    }

    #[test]
    fn one_unit_over_the_step_snaps_to_the_tile_edge() {
        let scene = Scene::row(&[0, -(STEP_L + 1)]);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 1000));
        e.speed = 50;
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        // Snapped to the last unit of tile 0, then nudged a radius back.
        assert_eq!(e.pos.z, WALL_L - SpeciesData::DEFAULT.radius);
        assert_eq!(e.pos.y, 0);
        assert_eq!(e.box_id, Some(BoxId(0)));
    }

    #[test]
    fn a_full_step_is_climbed() {
        let scene = Scene::row(&[0, -STEP_L]);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 1000));
        e.speed = 50;
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.pos, Position::new(512, -STEP_L, 1050));
        assert_eq!(e.box_id, Some(BoxId(1)));
    }

    /// A standing wolf at `(pos_x, pos_z)` inside tile (1, 1), after one tick.
    fn nudged(scene: &Scene, pos_x: i32, pos_z: i32, heading: Angle, turn: Angle) -> Entity {
        let at = Position::new(WALL_L + pos_x, 0, WALL_L + pos_z);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, at);
        e.rot.heading = heading;
        assert!(animate(&mut e, &c, &scene.ctx(), turn, Angle::ZERO));
        e
    }

    #[test]
    fn walls_on_each_side_push_back_by_the_radius() {
        let mut b = BoxGraphBuilder::new();
        b.add_box(BoxInfo::from_tiles(1, 2, 1, 2, 0));
        let scene = Scene::of(b.build().unwrap());
        let r = SpeciesData::DEFAULT.radius;
        let cases = [
            ((512, 100), (512, r)),
            ((512, 950), (512, WALL_L - r)),
            ((100, 512), (r, 512)),
            ((950, 512), (WALL_L - r, 512)),
            ((100, 100), (r, r)),
            ((950, 950), (WALL_L - r, WALL_L - r)),
            ((512, 512), (512, 512)),
        ];
        for ((x, z), (want_x, want_z)) in cases {
            let e = nudged(&scene, x, z, Angle::ZERO, Angle::ZERO);
            assert_eq!(
                (e.pos.x - WALL_L, e.pos.z - WALL_L),
                (want_x, want_z),
                "started at ({x}, {z})"
            );
        }
    }

    /// Tile (1, 1) with open floor toward -X and -Z but wall diagonally.
    fn notched_corner() -> Scene {
        let mut b = BoxGraphBuilder::new();
        b.add_box(BoxInfo::from_tiles(1, 2, 1, 2, 0));
        b.add_box(BoxInfo::from_tiles(0, 1, 1, 2, 0));
        b.add_box(BoxInfo::from_tiles(1, 2, 0, 1, 0));
        b.connect_touching();
        Scene::of(b.build().unwrap())
    }

    #[test]
    fn open_edges_next_to_floor_do_not_nudge() {
        let scene = notched_corner();
        let e = nudged(&scene, 512, 100, Angle::ZERO, Angle::degrees(2));
        assert_eq!((e.pos.x, e.pos.z), (WALL_L + 512, WALL_L + 100));
        assert_eq!(e.rot.heading, Angle::ZERO);
    }

    #[test]
    fn diagonal_corner_yields_along_z_when_facing_into_the_octant() {
        let scene = notched_corner();
        let r = SpeciesData::DEFAULT.radius;
        let turn = Angle::degrees(2);
        for heading in [Angle::ZERO, Angle(-0x5000), Angle(0x1000)] {
            let e = nudged(&scene, 100, 100, heading, turn);
            assert_eq!((e.pos.x, e.pos.z), (WALL_L + 100, WALL_L + r), "heading {:#x}", heading.0);
            // A nudge applies the turn a second time.
            assert_eq!(e.rot.heading, heading + turn);
        }
    }

    #[test]
    fn diagonal_corner_yields_along_x_when_facing_away() {
        let scene = notched_corner();
        let r = SpeciesData::DEFAULT.radius;
        for heading in [Angle::QUARTER, Angle::HALF, Angle(-0x6000), Angle(0x2000)] {
            let e = nudged(&scene, 100, 100, heading, Angle::ZERO);
            assert_eq!((e.pos.x, e.pos.z), (WALL_L + r, WALL_L + 100), "heading {:#x}", heading.0);
        }
    }

    #[test]
    fn room_follows_the_floor_even_off_the_box_graph() {
        let mut scene = Scene::row(&[0, 0]);
        scene.world.set(
            0,
            1,
            Sector {
                room: RoomId(2),
                box_id: None,
                floor: 0,
                ceiling: -4 * WALL_L,
            },
        );
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 1536));
        assert_eq!(e.box_id, None);
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.room, RoomId(2));
        assert_eq!(e.box_id, None);

        // Solid wall reports room 0, which is not adopted.
        scene.world.set(0, 1, Sector::WALL);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 1536));
        e.room = RoomId(5);
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.room, RoomId(5));
    }

    #[test]
    fn ground_creature_settles_gradually() {
        let scene = Scene::row(&[0]);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, -500, 512));
        e.rot.pitch = Angle::degrees(10);
        let ctx = scene.ctx();
        assert!(animate(&mut e, &c, &ctx, Angle::ZERO, Angle::ZERO));
        assert_eq!(e.pos.y, -500 + scene.config.ground_settle);
        assert_eq!(e.rot.pitch, Angle::ZERO);
    }

    #[test]
    fn flyer_refuses_to_push_through_the_ceiling() {
        let scene = Scene::row(&[0]);
        let bat = scene.config.species_data(Species::Bat).clone();
        // Body top already above the ceiling at -4096.
        let (mut e, mut c) = scene.creature(Species::Bat, &bat, Position::new(512, -4000, 512));
        c.target.y = -5000;
        e.speed = 20;
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!((e.pos.x, e.pos.z), (512, 512));
        assert_eq!(e.pos.y, -4000 + bat.fly);
        assert_eq!(e.rot.pitch, -Angle::DEGREE);
    }

    #[test]
    fn flyer_eases_toward_target_height() {
        let scene = Scene::row(&[0]);
        let bat = scene.config.species_data(Species::Bat).clone();
        let (mut e, mut c) = scene.creature(Species::Bat, &bat, Position::new(512, -1000, 512));
        c.target.y = -1500;
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.pos.y, -1000 - bat.fly);
    }

    #[test]
    fn land_creature_drowns_and_water_creature_does_not() {
        let mut scene = Scene::row(&[0, 0]);
        scene.world.set_room(0..1, 0..2, RoomId(1));
        scene.world.set_underwater(RoomId(1), true);

        let (mut wolf, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 512));
        assert!(!animate(&mut wolf, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(wolf.status, EntityStatus::Deactivated);
        assert_eq!(wolf.hit_points, 0);

        let croc = scene.config.species_data(Species::Crocodile).clone();
        let (mut e, c) = scene.creature(Species::Crocodile, &croc, Position::new(512, 0, 512));
        assert!(animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.room, RoomId(1));
    }

    #[test]
    fn deactivated_entities_do_not_move() {
        let scene = Scene::row(&[0]);
        let (mut e, c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::new(512, 0, 512));
        e.status = EntityStatus::Deactivated;
        e.speed = 50;
        assert!(!animate(&mut e, &c, &scene.ctx(), Angle::ZERO, Angle::ZERO));
        assert_eq!(e.pos.z, 512);
    }

    #[test]
    fn turn_is_halved_inside_the_turning_circle() {
        let scene = Scene::row(&[0]);
        let max_turn = Angle::degrees(6);

        let (mut near, mut c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::default());
        near.speed = 50;
        c.target = Position::new(500, 0, -100);
        let applied = turn(&mut near, &c, max_turn, Angle::QUARTER);
        assert_eq!(applied, Angle(max_turn.0 / 2));
        assert_eq!(near.rot.heading, applied);

        let (mut far, mut c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::default());
        far.speed = 50;
        c.target = Position::new(5000, 0, -1000);
        assert_eq!(turn(&mut far, &c, max_turn, Angle::QUARTER), max_turn);
    }

    #[test]
    fn small_turns_are_not_clamped_and_still_creatures_do_not_turn() {
        let scene = Scene::row(&[0]);
        let (mut e, mut c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::default());
        c.target = Position::new(10, 0, 10_000);
        assert_eq!(turn(&mut e, &c, Angle::degrees(6), Angle::QUARTER), Angle::ZERO);
        e.speed = 50;
        let applied = turn(&mut e, &c, Angle::degrees(6), Angle::QUARTER);
        assert!(applied.0 > 0 && applied.0 < Angle::DEGREE.0);
    }

    #[test]
    fn tilt_and_head_are_rate_limited() {
        let scene = Scene::row(&[0]);
        let (mut e, mut c) = scene.creature(Species::Wolf, &SpeciesData::DEFAULT, Position::default());
        tilt(&mut e, Angle::degrees(10), Angle::degrees(3));
        assert_eq!(e.rot.roll, Angle::degrees(3));
        tilt(&mut e, Angle::ZERO, Angle::degrees(3));
        assert_eq!(e.rot.roll, Angle::ZERO);

        for _ in 0..100 {
            head(&mut c, Angle::HALF - Angle::DEGREE, Angle::degrees(5), Angle::QUARTER);
        }
        assert_eq!(c.head, Angle::QUARTER);
    }

    fn ape_scene(step_height: i32) -> (Scene, SpeciesData) {
        let scene = Scene::row(&[0, step_height]);
        let ape = scene.config.species_data(Species::Ape).clone();
        (scene, ape)
    }

    #[test]
    fn vault_classifies_a_two_click_climb() {
        let (scene, ape) = ape_scene(-600);
        let (mut e, c) = scene.creature(Species::Ape, &ape, Position::new(512, 0, 1000));
        e.speed = 60;
        let rank = vault(&mut e, &c, &scene.ctx(), Angle::ZERO, VaultRank::Climb4, ape.vault_shift);
        assert_eq!(rank, VaultRank::Climb2);
        assert_eq!(e.pos, Position::new(512, 0, WALL_L - ape.vault_shift));
        assert_eq!(e.rot.heading, Angle::ZERO);
        assert_eq!(e.floor, 0);
    }

    #[test]
    fn vault_too_high_for_the_species_falls() {
        let (scene, ape) = ape_scene(-900);
        let (mut e, c) = scene.creature(Species::Ape, &ape, Position::new(512, 0, 1000));
        e.speed = 60;
        let rank = vault(&mut e, &c, &scene.ctx(), Angle::ZERO, VaultRank::Climb2, ape.vault_shift);
        assert_eq!(rank, VaultRank::Fall);
    }

    #[test]
    fn vault_down_a_deep_drop_falls() {
        let (scene, ape) = ape_scene(1000);
        let (mut e, c) = scene.creature(Species::Ape, &ape, Position::new(512, 0, 1000));
        e.speed = 60;
        let rank = vault(&mut e, &c, &scene.ctx(), Angle::ZERO, VaultRank::Climb4, ape.vault_shift);
        assert_eq!(rank, VaultRank::Fall);
        assert_eq!(e.pos.y, 0);
    }

    #[test]
    fn vault_on_flat_ground_is_none() {
        let (scene, ape) = ape_scene(0);
        let (mut e, c) = scene.creature(Species::Ape, &ape, Position::new(512, 0, 1000));
        e.speed = 60;
        let rank = vault(&mut e, &c, &scene.ctx(), Angle::ZERO, VaultRank::Climb4, ape.vault_shift);
        assert_eq!(rank, VaultRank::None);
        assert_eq!(e.pos.z, 1060);
    }

    #[test]
    fn overlapping_spheres_are_detected() {
        let mut entities = EntityArena::new();
        let data = SpeciesData::DEFAULT;
        let a = entities.spawn(Entity::creature(Species::Wolf, &data, Position::new(0, 0, 0), RoomId(0)));
        let b = entities.spawn(Entity::creature(Species::Wolf, &data, Position::new(0, 0, 2000), RoomId(0)));
        assert!(!overlaps_agent(&entities, a));
        entities.get_mut(b).unwrap().pos.z = 500;
        assert!(overlaps_agent(&entities, a));
        entities.get_mut(b).unwrap().status = EntityStatus::Deactivated;
        assert!(!overlaps_agent(&entities, a));
    }
}
