// Core types shared across the creature AI.
//
// World units, positions, binary angles and the compact integer handles used
// by the box graph, zone tables, slot pool and entity arena. Everything here
// is `Copy`, serde-derivable and free of floating point except the trig
// helpers on `Angle`, which round back to integers immediately.
//
// Coordinate conventions follow the level data:
// - X and Z are horizontal; one block (`WALL_L`) is 1024 units and one
//   click (`STEP_L`) is a quarter block.
// - Y points **down**: a larger `y` is lower. Floor heights are therefore
//   larger than ceiling heights, and "climbing" means `y` decreases.
// - Headings are 16-bit binary angles: 65536 steps per revolution, wrapping.
//   Heading 0 faces +Z and a quarter turn (`Angle::QUARTER`) faces +X.
//
// See also: `boxes.rs` for `BoxId` usage, `entity.rs` for `EntityId`,
// `species.rs` for the per-`Species` data table.
//
// **Critical constraint: determinism.** Angle trig goes through `f64` and is
// rounded to integers before it touches simulation state, so all stored
// state is integral.

use serde::{Deserialize, Serialize};
use slotmap::Key;
use std::f64::consts::TAU;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// ---------------------------------------------------------------------------
// World units
// ---------------------------------------------------------------------------

/// Log2 of the block size; shifting a coordinate right by this gives its tile.
pub const WALL_SHIFT: i32 = 10;

/// One block (tile edge) in world units.
pub const WALL_L: i32 = 1 << WALL_SHIFT;

/// One click: the smallest floor-height increment in level data.
pub const STEP_L: i32 = WALL_L / 4;

/// Half a block. Target points are kept this far inside box edges.
pub const HALF_BLOCK: i32 = WALL_L / 2;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A point in world space (Y down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Tile column along X.
    pub const fn tile_x(self) -> i32 {
        self.x >> WALL_SHIFT
    }

    /// Tile row along Z.
    pub const fn tile_z(self) -> i32 {
        self.z >> WALL_SHIFT
    }

    /// Squared 3D distance, widened so level-scale coordinates cannot overflow.
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Squared horizontal (XZ) distance.
    pub fn distance_sq_xz(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx * dx + dz * dz
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A 16-bit binary angle. Arithmetic wraps, so `Angle::HALF + Angle::HALF`
/// is `Angle::ZERO`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Angle(pub i16);

impl Angle {
    pub const ZERO: Angle = Angle(0);
    /// One degree, rounded down.
    pub const DEGREE: Angle = Angle(182);
    pub const EIGHTH: Angle = Angle(0x2000);
    pub const QUARTER: Angle = Angle(0x4000);
    pub const THREE_EIGHTHS: Angle = Angle(0x6000);
    /// Half a turn. Negating it yields itself.
    pub const HALF: Angle = Angle(i16::MIN);

    /// Build an angle from whole degrees.
    pub const fn degrees(d: i16) -> Self {
        Angle((d as i32 * 182) as i16)
    }

    /// Heading that points from the origin toward `(dx, dz)`.
    pub fn atan2(dx: i32, dz: i32) -> Self {
        if dx == 0 && dz == 0 {
            return Angle::ZERO;
        }
        Self::from_radians(f64::from(dx).atan2(f64::from(dz)))
    }

    pub fn from_radians(r: f64) -> Self {
        let steps = (r / TAU * 65536.0).round() as i64;
        Angle(steps as i16)
    }

    pub fn radians(self) -> f64 {
        f64::from(self.0) * TAU / 65536.0
    }

    pub fn sin(self) -> f64 {
        self.radians().sin()
    }

    pub fn cos(self) -> f64 {
        self.radians().cos()
    }

    /// Clamp into `[-limit, limit]`. `limit` is treated as a magnitude.
    pub fn clamp_to(self, limit: Angle) -> Angle {
        let limit = limit.0.unsigned_abs().min(i16::MAX as u16) as i16;
        Angle(self.0.clamp(-limit, limit))
    }

    /// Quadrant index 0..=3 used by the stalking predicate: facing -Z is 0,
    /// -X is 1, +Z is 2, +X is 3.
    pub const fn quadrant(self) -> i32 {
        (self.0 >> 14) as i32 + 2
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle(self.0.wrapping_neg())
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        *self = *self + rhs;
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        *self = *self - rhs;
    }
}

/// Orientation of an entity. `heading` is the yaw that movement follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    /// Nose up/down. Only flyers pitch.
    pub pitch: Angle,
    pub heading: Angle,
    /// Lean into turns.
    pub roll: Angle,
}

// ---------------------------------------------------------------------------
// Compact handles
// ---------------------------------------------------------------------------

/// Index of a navigation box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub u32);

impl BoxId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box#{}", self.0)
    }
}

/// Reachability class id. Two boxes are mutually reachable for a movement
/// class iff their zone ids match in the current layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

/// Index of a room in the world geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u16);

/// Index of a creature AI slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u16);

impl SlotId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

slotmap::new_key_type! {
    /// Generational entity handle. A handle whose slot has since been reused
    /// resolves to nothing, which is how a pursued enemy "disappears" when it
    /// is despawned.
    pub struct EntityId;
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.data().as_ffi();
        write!(f, "entity#{}v{}", raw & 0xffff_ffff, raw >> 32)
    }
}

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

/// Creature species. Behavioural differences live in `SpeciesData`, keyed by
/// this enum in `AiConfig::species`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Wolf,
    Bear,
    Rat,
    Bat,
    Ape,
    Raptor,
    Tyrannosaur,
    Crocodile,
}

impl Species {
    pub const ALL: [Species; 8] = [
        Species::Wolf,
        Species::Bear,
        Species::Rat,
        Species::Bat,
        Species::Ape,
        Species::Raptor,
        Species::Tyrannosaur,
        Species::Crocodile,
    ];
}
