// Target resolution: turning a destination box into a point to steer at.
//
// The mood layer only ever names a *box*. `target_box` picks a random point
// inside it (half a block in from every edge) and records it as the LOT's
// `required_box`. `calculate_target` then runs the budgeted search and walks
// the exit-box chain from the creature's own box toward the target box,
// clipping the steering point against each box rectangle in turn. The
// result is graded:
//
// - `Primary`: the chain reaches the target box; the point is inside it.
// - `Secondary`: the path turns a corner on the other axis; the point is an
//   intermediate one and the caller re-resolves once closer.
// - `None`: the chain ran out (not searched that far yet, or the next hop is
//   impassable); the point is somewhere in the last box reached.
//
// The clip works in "quadrants": per box, the creature's position is tested
// against the Z edges and then the X edges. The first axis that clips
// becomes the primary clip axis and narrows the accumulated bounds on the
// other axis. A clip on any other axis after that downgrades to `Secondary`.
// The branch order here is the compatibility contract for how creatures cut
// corners; keep it exactly.
//
// Companion predicates used by the mood layer: `valid_box`, `stalk_box`,
// `escape_box`.
//
// See also: `lot.rs` for the search this consumes, `mood.rs` which picks the
// boxes, `movement.rs` which steers at the resolved point.
//
// **Critical constraint: determinism.** Randomness comes only from the
// `GameRng` passed in; the draw count per call depends only on the inputs.

use crate::boxes::BoxInfo;
use crate::level::Level;
use crate::lot::Lot;
use crate::types::{Angle, BoxId, HALF_BLOCK, Position, WALL_L, ZoneId};
use cavern_prng::GameRng;
use serde::{Deserialize, Serialize};

/// Distance target points are kept inside box edges.
const BIFF: i32 = HALF_BLOCK;

const CLIP_LEFT: u8 = 1;
const CLIP_RIGHT: u8 = 2;
const CLIP_TOP: u8 = 4;
const CLIP_BOTTOM: u8 = 8;
const ALL_CLIP: u8 = CLIP_LEFT | CLIP_RIGHT | CLIP_TOP | CLIP_BOTTOM;
const SECONDARY_CLIP: u8 = 16;

/// How far toward the target box a resolved point goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetGrade {
    None,
    Secondary,
    Primary,
}

/// Aim at a random point inside `id` and make it the required box.
pub fn target_box(lot: &mut Lot, level: &Level, id: BoxId, rng: &mut GameRng, fly_lift: i32) {
    let b = level.graph().box_info(id);
    lot.target.z = b.left + HALF_BLOCK + rng.below((b.right - b.left - WALL_L).max(0) as u32) as i32;
    lot.target.x = b.top + HALF_BLOCK + rng.below((b.bottom - b.top - WALL_L).max(0) as u32) as i32;
    lot.target.y = if lot.envelope.is_flyer() {
        b.height - fly_lift
    } else {
        b.height
    };
    lot.required_box = Some(id);
}

/// Inclusive rectangle bounds; the maximum edges are one unit inside.
#[derive(Clone, Copy)]
struct Bounds {
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
}

impl Bounds {
    fn of(b: &BoxInfo) -> Bounds {
        Bounds {
            left: b.left,
            right: b.right - 1,
            top: b.top,
            bottom: b.bottom - 1,
        }
    }

    fn contains(&self, x: i32, z: i32) -> bool {
        z >= self.left && z <= self.right && x >= self.top && x <= self.bottom
    }
}

/// A point inside `[low, high]` kept `BIFF` from both ends.
fn clamp_inside(value: i32, low: i32, high: i32) -> i32 {
    if value < low + BIFF {
        low + BIFF
    } else if value > high - BIFF {
        high - BIFF
    } else {
        value
    }
}

/// Random coordinate in a span, half a block in from each end.
fn random_inside(low: i32, high: i32, rng: &mut GameRng) -> i32 {
    let span = high - low - WALL_L;
    if span <= 0 {
        (low + high) / 2
    } else {
        low + HALF_BLOCK + rng.below(span as u32) as i32
    }
}

/// Update the LOT and resolve the point to steer at from `pos` in `box_id`.
pub fn calculate_target(
    lot: &mut Lot,
    level: &Level,
    pos: Position,
    box_id: Option<BoxId>,
    budget: u32,
    rng: &mut GameRng,
    fly_lift: i32,
) -> (TargetGrade, Position) {
    lot.update(level, budget);

    let mut target = pos;
    let Some(start) = box_id else {
        return (TargetGrade::None, target);
    };
    let graph = level.graph();
    let flyer = lot.envelope.is_flyer();

    let mut bounds = Bounds::of(graph.box_info(start));
    let mut prime_free = ALL_CLIP;
    let mut current = start;
    let mut walked = 0;

    loop {
        let b = graph.box_info(current);
        if flyer {
            target.y = target.y.min(b.height - WALL_L);
        } else {
            target.y = target.y.min(b.height);
        }

        let here = Bounds::of(b);
        if here.contains(pos.x, pos.z) {
            bounds = here;
        } else {
            let within_x = pos.x >= here.top && pos.x <= here.bottom;
            let within_z = pos.z >= here.left && pos.z <= here.right;

            if pos.z < here.left {
                if prime_free & CLIP_LEFT != 0 && within_x {
                    target.z = target.z.max(here.left + BIFF);
                    if prime_free & SECONDARY_CLIP != 0 {
                        return (TargetGrade::Secondary, target);
                    }
                    bounds.top = bounds.top.max(here.top);
                    bounds.bottom = bounds.bottom.min(here.bottom);
                    prime_free = CLIP_LEFT;
                } else if prime_free != CLIP_LEFT {
                    target.z = bounds.right - BIFF;
                    if prime_free != ALL_CLIP {
                        return (TargetGrade::Secondary, target);
                    }
                    prime_free |= SECONDARY_CLIP;
                }
            } else if pos.z > here.right {
                if prime_free & CLIP_RIGHT != 0 && within_x {
                    target.z = target.z.min(here.right - BIFF);
                    if prime_free & SECONDARY_CLIP != 0 {
                        return (TargetGrade::Secondary, target);
                    }
                    bounds.top = bounds.top.max(here.top);
                    bounds.bottom = bounds.bottom.min(here.bottom);
                    prime_free = CLIP_RIGHT;
                } else if prime_free != CLIP_RIGHT {
                    target.z = bounds.left + BIFF;
                    if prime_free != ALL_CLIP {
                        return (TargetGrade::Secondary, target);
                    }
                    prime_free |= SECONDARY_CLIP;
                }
            }

            if pos.x < here.top {
                if prime_free & CLIP_TOP != 0 && within_z {
                    target.x = target.x.max(here.top + BIFF);
                    if prime_free & SECONDARY_CLIP != 0 {
                        return (TargetGrade::Secondary, target);
                    }
                    bounds.left = bounds.left.max(here.left);
                    bounds.right = bounds.right.min(here.right);
                    prime_free = CLIP_TOP;
                } else if prime_free != CLIP_TOP {
                    target.x = bounds.bottom - BIFF;
                    if prime_free != ALL_CLIP {
                        return (TargetGrade::Secondary, target);
                    }
                    prime_free |= SECONDARY_CLIP;
                }
            } else if pos.x > here.bottom {
                if prime_free & CLIP_BOTTOM != 0 && within_z {
                    target.x = target.x.min(here.bottom - BIFF);
                    if prime_free & SECONDARY_CLIP != 0 {
                        return (TargetGrade::Secondary, target);
                    }
                    bounds.left = bounds.left.max(here.left);
                    bounds.right = bounds.right.min(here.right);
                    prime_free = CLIP_BOTTOM;
                } else if prime_free != CLIP_BOTTOM {
                    target.x = bounds.top + BIFF;
                    if prime_free != ALL_CLIP {
                        return (TargetGrade::Secondary, target);
                    }
                    prime_free |= SECONDARY_CLIP;
                }
            }
        }

        if Some(current) == lot.target_box {
            if prime_free & (CLIP_LEFT | CLIP_RIGHT) != 0 {
                target.z = lot.target.z;
            } else if prime_free & SECONDARY_CLIP == 0 {
                target.z = clamp_inside(target.z, here.left, here.right);
            }
            if prime_free & (CLIP_TOP | CLIP_BOTTOM) != 0 {
                target.x = lot.target.x;
            } else if prime_free & SECONDARY_CLIP == 0 {
                target.x = clamp_inside(target.x, here.top, here.bottom);
            }
            target.y = lot.target.y;
            tracing::trace!(%current, "target resolved primary");
            return (TargetGrade::Primary, target);
        }

        walked += 1;
        let next = lot.exit_box(current);
        let Some(next) = next else {
            break;
        };
        if graph.is_impassable(next, lot.envelope.block_mask) || walked > graph.len() {
            break;
        }
        current = next;
    }

    // The chain ran out: settle for somewhere in the last reached bounds.
    if prime_free & (CLIP_LEFT | CLIP_RIGHT) != 0 {
        target.z = random_inside(bounds.left, bounds.right, rng);
    } else if prime_free & SECONDARY_CLIP == 0 {
        target.z = clamp_inside(target.z, bounds.left, bounds.right);
    }
    if prime_free & (CLIP_TOP | CLIP_BOTTOM) != 0 {
        target.x = random_inside(bounds.top, bounds.bottom, rng);
    } else if prime_free & SECONDARY_CLIP == 0 {
        target.x = clamp_inside(target.x, bounds.top, bounds.bottom);
    }
    let floor = graph.box_info(current).height;
    target.y = if flyer { floor - fly_lift } else { floor };
    (TargetGrade::None, target)
}

/// Whether `id` is worth heading for: in `zone`, passable for this LOT, and
/// not the box the creature is already standing in.
pub fn valid_box(lot: &Lot, level: &Level, pos: Position, zone: ZoneId, id: BoxId) -> bool {
    if level.zone(lot.zone_class(), id) != zone {
        return false;
    }
    if level.graph().is_impassable(id, lot.envelope.block_mask) {
        return false;
    }
    !level.graph().box_info(id).contains(pos.x, pos.z)
}

/// Whether `b` is a good place to flee to from `enemy`: outside a square of
/// half-width `escape_distance` around it, and not on the enemy's side on
/// both axes relative to the creature.
pub fn escape_box(pos: Position, enemy: Position, b: &BoxInfo, escape_distance: i32) -> bool {
    let x = b.center_x() - enemy.x;
    let z = b.center_z() - enemy.z;
    if x > -escape_distance && x < escape_distance && z > -escape_distance && z < escape_distance {
        return false;
    }
    let z_across = (z > 0) != (pos.z > enemy.z);
    let x_across = (x > 0) != (pos.x > enemy.x);
    !(z_across && x_across)
}

/// Quadrant of an offset from the enemy, in `Angle::quadrant` numbering.
fn offset_quadrant(x: i32, z: i32) -> i32 {
    match (z > 0, x > 0) {
        (true, true) => 2,
        (true, false) => 1,
        (false, true) => 3,
        (false, false) => 0,
    }
}

/// Whether `b` is a good place to lurk near `enemy`: within stalking range
/// and outside the quadrant the enemy faces. A box straight across the enemy
/// from a creature that sits in the enemy's facing quadrant is also refused,
/// since reaching it means crossing the enemy's view.
pub fn stalk_box(pos: Position, enemy: Position, enemy_heading: Angle, b: &BoxInfo, stalk_distance: i32) -> bool {
    let x = b.center_x() - enemy.x;
    let z = b.center_z() - enemy.z;
    let x_range = stalk_distance + (b.bottom - b.top) + 3 * WALL_L;
    let z_range = stalk_distance + (b.right - b.left) + 3 * WALL_L;
    if x > x_range || x < -x_range || z > z_range || z < -z_range {
        return false;
    }

    let enemy_quad = enemy_heading.quadrant();
    let box_quad = offset_quadrant(x, z);
    if enemy_quad == box_quad {
        return false;
    }
    let creature_quad = offset_quadrant(pos.x - enemy.x, pos.z - enemy.z);
    !(enemy_quad == creature_quad && (enemy_quad - box_quad).abs() == 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::{BoxFlags, BoxGraphBuilder};
    use crate::lot::MoveEnvelope;

    fn level_of(boxes: &[BoxInfo]) -> Level {
        let mut b = BoxGraphBuilder::new();
        for info in boxes {
            b.add_box(*info);
        }
        b.connect_touching();
        Level::new(b.build().unwrap()).unwrap()
    }

    fn corridor(n: i32) -> Level {
        let boxes: Vec<_> = (0..n).map(|i| BoxInfo::from_tiles(0, 1, i, i + 1, 0)).collect();
        level_of(&boxes)
    }

    fn lot_for(level: &Level) -> Lot {
        Lot::new(level.graph().len(), MoveEnvelope::default())
    }

    /// Run the search to exhaustion.
    fn settle(lot: &mut Lot, level: &Level) {
        while !lot.update(level, 8).exhausted {}
    }

    #[test]
    fn target_box_stays_half_a_block_inside() {
        let level = level_of(&[BoxInfo::from_tiles(0, 4, 0, 3, -512)]);
        let mut lot = lot_for(&level);
        let mut rng = GameRng::new(7);
        for _ in 0..200 {
            target_box(&mut lot, &level, BoxId(0), &mut rng, 384);
            assert!((512..4096 - 512).contains(&lot.target.x));
            assert!((512..3072 - 512).contains(&lot.target.z));
            assert_eq!(lot.target.y, -512);
        }
        assert_eq!(lot.required_box, Some(BoxId(0)));

        lot.envelope.fly = 16;
        target_box(&mut lot, &level, BoxId(0), &mut rng, 384);
        assert_eq!(lot.target.y, -512 - 384);
    }

    #[test]
    fn one_block_box_targets_its_center() {
        let level = corridor(1);
        let mut lot = lot_for(&level);
        target_box(&mut lot, &level, BoxId(0), &mut GameRng::new(1), 384);
        assert_eq!((lot.target.x, lot.target.z), (512, 512));
    }

    #[test]
    fn corridor_resolves_primary_inside_target_box() {
        let level = corridor(10);
        let mut lot = lot_for(&level);
        let mut rng = GameRng::new(3);
        let pos = Position::new(512, 0, 512);
        target_box(&mut lot, &level, BoxId(9), &mut rng, 384);

        let mut grade = TargetGrade::None;
        for _ in 0..10 {
            let (g, point) = calculate_target(&mut lot, &level, pos, Some(BoxId(0)), 5, &mut rng, 384);
            grade = g;
            if g == TargetGrade::Primary {
                assert!(level.graph().box_info(BoxId(9)).contains(point.x, point.z));
                assert_eq!(point.z, lot.target.z);
                break;
            }
        }
        assert_eq!(grade, TargetGrade::Primary);
    }

    #[test]
    fn clamp_is_a_no_op_for_points_well_inside() {
        let level = level_of(&[BoxInfo::from_tiles(0, 4, 0, 4, 0)]);
        let mut lot = lot_for(&level);
        lot.required_box = Some(BoxId(0));
        lot.target = Position::new(2000, 0, 1800);
        let (grade, point) = calculate_target(
            &mut lot,
            &level,
            Position::new(600, 0, 700),
            Some(BoxId(0)),
            5,
            &mut GameRng::new(1),
            384,
        );
        assert_eq!(grade, TargetGrade::Primary);
        assert_eq!(point, lot.target);
    }

    #[test]
    fn corner_turn_on_the_other_axis_is_secondary() {
        // A -> B along Z, then C extends along X from B.
        let level = level_of(&[
            BoxInfo::from_tiles(0, 1, 0, 1, 0),
            BoxInfo::from_tiles(0, 1, 1, 2, 0),
            BoxInfo::from_tiles(1, 3, 1, 2, 0),
        ]);
        let mut lot = lot_for(&level);
        let mut rng = GameRng::new(5);
        target_box(&mut lot, &level, BoxId(2), &mut rng, 384);
        settle(&mut lot, &level);
        let (grade, point) =
            calculate_target(&mut lot, &level, Position::new(512, 0, 512), Some(BoxId(0)), 5, &mut rng, 384);
        assert_eq!(grade, TargetGrade::Secondary);
        assert_eq!(point.z, 1024 + BIFF);
        assert_eq!(point.x, 1023 - BIFF);
    }

    #[test]
    fn no_box_means_no_target() {
        let level = corridor(2);
        let mut lot = lot_for(&level);
        let pos = Position::new(100, 200, 300);
        let (grade, point) = calculate_target(&mut lot, &level, pos, None, 5, &mut GameRng::new(1), 384);
        assert_eq!(grade, TargetGrade::None);
        assert_eq!(point, pos);
    }

    #[test]
    fn blocked_hop_ends_the_chain() {
        let mut level = corridor(4);
        level.graph_mut().set_blockable(BoxId(2), true).unwrap();
        let mut lot = lot_for(&level);
        let mut rng = GameRng::new(9);
        target_box(&mut lot, &level, BoxId(3), &mut rng, 384);
        settle(&mut lot, &level);
        // The door shuts after the search routed through it.
        level.graph_mut().set_blocked(BoxId(2), true).unwrap();

        let pos = Position::new(512, 0, 512);
        let (grade, point) = calculate_target(&mut lot, &level, pos, Some(BoxId(0)), 5, &mut rng, 384);
        assert_eq!(grade, TargetGrade::None);
        // Somewhere within the reached corridor, short of the door.
        assert!(point.z < 2048);
        assert_eq!(point.y, 0);
    }

    #[test]
    fn valid_box_rejects_other_zones_blocked_and_current() {
        let mut level = level_of(&[
            BoxInfo::from_tiles(0, 1, 0, 1, 0),
            BoxInfo::from_tiles(0, 1, 1, 2, 0).with_flags(BoxFlags::BLOCKABLE),
            BoxInfo::from_tiles(0, 1, 2, 3, 0),
            BoxInfo::from_tiles(5, 6, 5, 6, 0),
        ]);
        let lot = lot_for(&level);
        let pos = Position::new(512, 0, 512);
        let zone = level.zone(lot.zone_class(), BoxId(0));
        assert!(!valid_box(&lot, &level, pos, zone, BoxId(0)));
        assert!(valid_box(&lot, &level, pos, zone, BoxId(1)));
        assert!(valid_box(&lot, &level, pos, zone, BoxId(2)));
        assert!(!valid_box(&lot, &level, pos, zone, BoxId(3)));
        level.graph_mut().set_blocked(BoxId(1), true).unwrap();
        assert!(!valid_box(&lot, &level, pos, zone, BoxId(1)));
    }

    #[test]
    fn escape_box_wants_distance_and_the_far_side() {
        let enemy = Position::new(0, 0, 0);
        let me = Position::new(2048, 0, 2048);
        let near = BoxInfo::from_tiles(1, 2, 1, 2, 0);
        assert!(!escape_box(me, enemy, &near, 5 * WALL_L));
        // Far away on the creature's side.
        let away = BoxInfo::from_tiles(8, 9, 8, 9, 0);
        assert!(escape_box(me, enemy, &away, 5 * WALL_L));
        // Far away past the enemy on both axes.
        let behind = BoxInfo::from_tiles(-9, -8, -9, -8, 0);
        assert!(!escape_box(me, enemy, &behind, 5 * WALL_L));
        // Past the enemy on one axis only.
        let flank = BoxInfo::from_tiles(8, 9, -9, -8, 0);
        assert!(escape_box(me, enemy, &flank, 5 * WALL_L));
    }

    #[test]
    fn stalk_box_avoids_the_enemy_facing_quadrant() {
        let enemy = Position::new(0, 0, 0);
        // Enemy faces +Z (quadrant 2: z > 0, x > 0 side).
        let heading = Angle(100);
        let ahead = BoxInfo::from_tiles(1, 2, 1, 2, 0);
        let behind = BoxInfo::from_tiles(-2, -1, -2, -1, 0);
        let me_behind = Position::new(-1000, 0, -1000);
        assert!(!stalk_box(me_behind, enemy, heading, &ahead, 3 * WALL_L));
        assert!(stalk_box(me_behind, enemy, heading, &behind, 3 * WALL_L));

        // Creature in the facing quadrant cannot cut across to the opposite one.
        let me_ahead = Position::new(1000, 0, 1000);
        assert!(!stalk_box(me_ahead, enemy, heading, &behind, 3 * WALL_L));
        // A side quadrant is fine.
        let side = BoxInfo::from_tiles(1, 2, -2, -1, 0);
        assert!(stalk_box(me_ahead, enemy, heading, &side, 3 * WALL_L));

        let far = BoxInfo::from_tiles(-40, -39, -40, -39, 0);
        assert!(!stalk_box(me_behind, enemy, heading, &far, 3 * WALL_L));
    }
}
