// Sensing: what a creature knows about itself and its enemy this tick.
//
// `creature_ai_info` runs first in every creature's tick. It refreshes the
// box under the creature and under its enemy, looks both up in the zone
// table for the creature's movement class, and measures the enemy from a
// pivot point `pivot_length` ahead of the creature (the head of a long
// animal, not its hips).
//
// The enemy zone is reported as `None`, which never matches, when the enemy
// is gone (stale handle), off the box graph, standing in a box this creature
// cannot enter, or when the creature's own box is stamped blocked in its
// current search (it is cut off from wherever it was heading).
//
// See also: `mood.rs`, the consumer, `slots.rs` for the `Creature` record,
// `world.rs` for the sector lookups.
//
// **Critical constraint: determinism.** Pure function of entity and LOT
// state apart from the box refresh it writes back.

use crate::config::AiConfig;
use crate::entity::EntityArena;
use crate::level::Level;
use crate::slots::Creature;
use crate::types::{Angle, Position, STEP_L, ZoneId};
use crate::world::WorldQuery;

/// Per-tick sensing result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AiInfo {
    /// The creature's own zone; `None` off the box graph.
    pub zone: Option<ZoneId>,
    pub enemy_zone: Option<ZoneId>,
    /// Squared horizontal distance from the pivot to the enemy.
    pub distance: i64,
    /// Bearing of the enemy relative to the creature's heading.
    pub angle: Angle,
    /// Bearing of the creature relative to the enemy's heading.
    pub enemy_facing: Angle,
    /// Enemy within the front arc.
    pub ahead: bool,
    /// Ahead, alive and within a click vertically.
    pub bite: bool,
}

impl AiInfo {
    /// Nothing to sense: no enemy.
    fn alone(zone: Option<ZoneId>) -> AiInfo {
        AiInfo {
            zone,
            enemy_zone: None,
            distance: i64::MAX,
            angle: Angle::ZERO,
            enemy_facing: Angle::ZERO,
            ahead: false,
            bite: false,
        }
    }

    /// Creature and enemy are mutually reachable.
    pub fn same_zone(&self) -> bool {
        self.zone.is_some() && self.zone == self.enemy_zone
    }
}

/// Refresh boxes and measure the enemy.
pub fn creature_ai_info(
    creature: &Creature,
    entities: &mut EntityArena,
    level: &Level,
    world: &dyn WorldQuery,
    config: &AiConfig,
) -> AiInfo {
    let class = creature.lot.zone_class();
    let Some(me) = entities.get_mut(creature.entity) else {
        return AiInfo::alone(None);
    };
    me.box_id = world.sector(me.pos, me.room).box_id;
    let my_box = me.box_id;
    let zone = my_box.map(|b| level.zone(class, b));
    let my_pos = me.pos;
    let my_heading = me.rot.heading;
    let pivot = me.species.map_or(0, |s| config.species_data(s).pivot_length);

    let Some(enemy) = creature.enemy.and_then(|id| entities.get_mut(id)) else {
        return AiInfo::alone(zone);
    };
    enemy.box_id = world.sector(enemy.pos, enemy.room).box_id;

    let cut_off = my_box.is_some_and(|b| creature.lot.is_blocked_stamped(b));
    let enemy_zone = enemy
        .box_id
        .filter(|&b| !level.graph().is_impassable(b, creature.lot.envelope.block_mask) && !cut_off)
        .map(|b| level.zone(class, b));

    let from = Position::new(
        my_pos.x + (f64::from(pivot) * my_heading.sin()).round() as i32,
        my_pos.y,
        my_pos.z + (f64::from(pivot) * my_heading.cos()).round() as i32,
    );
    let dx = enemy.pos.x - from.x;
    let dz = enemy.pos.z - from.z;
    let bearing = Angle::atan2(dx, dz);
    let angle = bearing - my_heading;
    let ahead = angle.0 > -config.front_arc.0 && angle.0 < config.front_arc.0;

    AiInfo {
        zone,
        enemy_zone,
        distance: from.distance_sq_xz(enemy.pos),
        angle,
        enemy_facing: Angle::HALF + bearing - enemy.rot.heading,
        ahead,
        bite: ahead && enemy.is_alive() && (enemy.pos.y - my_pos.y).abs() <= STEP_L,
    }
}
