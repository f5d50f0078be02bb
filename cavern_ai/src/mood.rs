// Mood: the behavior selector that decides which box a creature pursues.
//
// Four moods: `Bored` (wander the own zone), `Stalk` (lurk out of the
// enemy's sight), `Attack` (go for the enemy's box) and `Escape` (get away).
// `creature_mood` runs once per tick after sensing:
//
// 1. Housekeeping on the required box: drop it when the creature's own box
//    is stamped blocked in the current search, or (outside `Attack`) when
//    the target box no longer passes `valid_box`. In the latter case a
//    creature already in the enemy's zone relaxes to `Bored`.
// 2. Transition on sensing: the violent and cautious tables below.
// 3. On any mood change, a creature leaving `Attack` re-aims inside its old
//    target box, and the required box is cleared.
// 4. Per-mood box choice, sampling `Lot::zone_boxes` at random.
// 5. If nothing has ever been targeted, target the creature's own box, then
//    resolve the steering point with `calculate_target`.
//
// Violent species (`SpeciesData::violent`) never stalk: they attack whenever
// zones agree and only escape when hit out of reach. Cautious species roll
// `AiConfig::escape_chance` when hit and `recover_chance` to stop fleeing.
//
// See also: `sensing.rs` for `AiInfo`, `target.rs` for the box predicates and
// the resolver, `sim.rs` for the per-mood speed and turn limits.
//
// **Critical constraint: determinism.** Random draws happen in a fixed order
// given the inputs: escape/recover rolls only when their guard holds, then
// at most one zone-box sample.

use crate::entity::EntityArena;
use crate::sensing::AiInfo;
use crate::slots::{AiContext, Creature};
use crate::target::{TargetGrade, calculate_target, escape_box, stalk_box, target_box, valid_box};
use crate::types::{Angle, BoxId, Position};
use cavern_prng::GameRng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Bored,
    Stalk,
    Attack,
    Escape,
}

/// The parts of the enemy the mood layer looks at.
struct EnemyView {
    pos: Position,
    heading: Angle,
    box_id: Option<BoxId>,
    alive: bool,
    /// Lift applied to the attack point for flyers: zero when the enemy is
    /// underwater.
    lift: i32,
}

/// Next mood from the current one and this tick's sensing.
fn transition(
    mood: Mood,
    info: &AiInfo,
    hit: bool,
    violent: bool,
    required: Option<BoxId>,
    ctx: &AiContext<'_>,
    rng: &mut GameRng,
) -> Mood {
    let same_zone = info.same_zone();
    if violent {
        return match mood {
            Mood::Bored | Mood::Stalk if same_zone => Mood::Attack,
            Mood::Bored | Mood::Stalk if hit => Mood::Escape,
            Mood::Attack if !same_zone => Mood::Bored,
            Mood::Escape if same_zone => Mood::Attack,
            other => other,
        };
    }

    match mood {
        Mood::Bored | Mood::Stalk => {
            if hit && (rng.random_bool(ctx.config.escape_chance) || !same_zone) {
                Mood::Escape
            } else if same_zone {
                let range = i64::from(ctx.config.attack_range);
                if info.distance < range * range || (mood == Mood::Stalk && required.is_none()) {
                    Mood::Attack
                } else {
                    Mood::Stalk
                }
            } else {
                mood
            }
        }
        Mood::Attack => {
            if hit && (rng.random_bool(ctx.config.escape_chance) || !same_zone) {
                Mood::Escape
            } else if !same_zone {
                Mood::Bored
            } else {
                Mood::Attack
            }
        }
        Mood::Escape => {
            if same_zone && rng.random_bool(ctx.config.recover_chance) {
                Mood::Stalk
            } else {
                Mood::Escape
            }
        }
    }
}

fn random_zone_box(creature: &Creature, rng: &mut GameRng) -> Option<BoxId> {
    let boxes = &creature.lot.zone_boxes;
    if boxes.is_empty() {
        return None;
    }
    Some(boxes[rng.below(boxes.len() as u32) as usize])
}

/// Run the behavior selector and resolve this tick's steering point into
/// `creature.target`.
pub fn creature_mood(
    creature: &mut Creature,
    entities: &EntityArena,
    ctx: &AiContext<'_>,
    rng: &mut GameRng,
    info: &AiInfo,
    violent: bool,
) -> TargetGrade {
    let Some(me) = entities.get(creature.entity) else {
        return TargetGrade::None;
    };
    let (pos, my_box, hit) = (me.pos, me.box_id, me.hit);
    let level = ctx.level;
    let fly_lift = ctx.config.fly_lift;

    if my_box.is_some_and(|b| creature.lot.is_blocked_stamped(b)) {
        creature.lot.required_box = None;
    }
    if creature.mood != Mood::Attack && creature.lot.required_box.is_some() {
        let aimed = creature.lot.target_box.or(creature.lot.required_box);
        let still_valid = match (info.zone, aimed) {
            (Some(zone), Some(target)) => valid_box(&creature.lot, level, pos, zone, target),
            _ => false,
        };
        if !still_valid {
            if info.same_zone() {
                creature.mood = Mood::Bored;
            }
            creature.lot.required_box = None;
        }
    }

    let enemy = creature.enemy.and_then(|id| entities.get(id)).map(|e| EnemyView {
        pos: e.pos,
        heading: e.rot.heading,
        box_id: e.box_id,
        alive: e.is_alive(),
        lift: if ctx.world.is_underwater(e.room) { 0 } else { e.height },
    });

    let previous = creature.mood;
    creature.mood = match &enemy {
        Some(e) if e.alive => transition(previous, info, hit, violent, creature.lot.required_box, ctx, rng),
        _ => Mood::Bored,
    };

    if previous != creature.mood {
        tracing::debug!(entity = %creature.entity, from = ?previous, to = ?creature.mood, "mood changed");
        if let Some(old) = creature.lot.target_box.filter(|_| previous == Mood::Attack) {
            target_box(&mut creature.lot, level, old, rng, fly_lift);
        }
        creature.lot.required_box = None;
    }

    let stalks = |e: &EnemyView, b: BoxId| {
        stalk_box(pos, e.pos, e.heading, level.graph().box_info(b), ctx.config.stalk_distance)
    };
    // A random box of the creature's zone that is worth heading for.
    let sample = |creature: &Creature, rng: &mut GameRng| {
        let zone = info.zone?;
        random_zone_box(creature, rng).filter(|&b| valid_box(&creature.lot, level, pos, zone, b))
    };

    match (creature.mood, &enemy) {
        (Mood::Attack, Some(e)) => {
            creature.lot.target = e.pos;
            creature.lot.required_box = e.box_id;
            if creature.lot.envelope.is_flyer() {
                creature.lot.target.y -= e.lift;
            }
        }
        (Mood::Bored, _) => {
            if let Some(b) = sample(&*creature, &mut *rng) {
                match &enemy {
                    Some(e) if e.alive && stalks(e, b) => {
                        target_box(&mut creature.lot, level, b, rng, fly_lift);
                        creature.mood = Mood::Stalk;
                    }
                    _ if creature.lot.required_box.is_none() => {
                        target_box(&mut creature.lot, level, b, rng, fly_lift);
                    }
                    _ => {}
                }
            }
        }
        (Mood::Stalk, Some(e)) => {
            let keep = creature.lot.required_box.is_some_and(|r| stalks(e, r));
            let choice = if keep { None } else { sample(&*creature, &mut *rng) };
            if let Some(b) = choice {
                if stalks(e, b) {
                    target_box(&mut creature.lot, level, b, rng, fly_lift);
                } else if creature.lot.required_box.is_none() {
                    target_box(&mut creature.lot, level, b, rng, fly_lift);
                    if !info.same_zone() {
                        creature.mood = Mood::Bored;
                    }
                }
            }
        }
        (Mood::Escape, Some(e)) => {
            let choice = sample(&*creature, &mut *rng).filter(|_| creature.lot.required_box.is_none());
            if let Some(b) = choice {
                if escape_box(pos, e.pos, level.graph().box_info(b), ctx.config.escape_distance) {
                    target_box(&mut creature.lot, level, b, rng, fly_lift);
                } else if info.same_zone() && stalks(e, b) && !violent {
                    target_box(&mut creature.lot, level, b, rng, fly_lift);
                    creature.mood = Mood::Stalk;
                }
            }
        }
        // Without an enemy the mood is always Bored.
        _ => {}
    }

    let idle = creature.lot.target_box.is_none() && creature.lot.required_box.is_none();
    if let Some(b) = my_box.filter(|_| idle) {
        target_box(&mut creature.lot, level, b, rng, fly_lift);
    }

    let (grade, point) = calculate_target(
        &mut creature.lot,
        level,
        pos,
        my_box,
        ctx.config.expansion_budget,
        rng,
        fly_lift,
    );
    creature.target = point;
    tracing::trace!(entity = %creature.entity, ?grade, target = %point, "target resolved");
    grade
}
