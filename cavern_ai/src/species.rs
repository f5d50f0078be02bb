// Species data: data-driven creature locomotion.
//
// Every difference between creature species that the AI core cares about is
// a value in `SpeciesData`, keyed by `Species` in `AiConfig::species`. Slot
// initialisation copies the movement envelope out of this table once; the
// tick loop reads speeds, turn rates and body sizes from it. There is no
// per-species branching anywhere in the crate.
//
// See also: `config.rs` where the table lives and its default contents,
// `lot.rs` for `MoveEnvelope`, `movement.rs` for `VaultRank`, `slots.rs`
// for where the envelope is applied.
//
// **Critical constraint: determinism.** Species data is part of the config
// and feeds straight into movement and search; all values are integers.

use crate::boxes::BoxFlags;
use crate::lot::MoveEnvelope;
use crate::movement::VaultRank;
use crate::types::{Angle, STEP_L};
use serde::{Deserialize, Serialize};

/// Locomotion and body parameters for one species.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesData {
    /// Largest climb between boxes, world units.
    pub step: i32,
    /// Largest drop between boxes, world units.
    pub drop: i32,
    /// Vertical speed per tick for flyers and swimmers. Zero for walkers.
    pub fly: i32,
    /// Box flags the species cannot pass. Large creatures add `BLOCKABLE`
    /// so they avoid doorways altogether.
    pub block_mask: BoxFlags,

    /// Collision radius used when nudging away from impassable edges.
    pub radius: i32,
    /// Height of the body above the feet; the look-ahead point and the
    /// ceiling check use it.
    pub height: i32,
    /// Distance ahead of the entity origin that sensing measures from.
    pub pivot_length: i32,

    pub walk_speed: i32,
    pub run_speed: i32,
    pub walk_turn: Angle,
    pub run_turn: Angle,

    /// Highest climb the species can vault, or `None` if it never vaults.
    pub max_climb: Option<VaultRank>,
    /// How far back from a tile edge a vaulting creature is placed.
    pub vault_shift: i32,

    /// Lives in water; never drowns.
    pub water_creature: bool,
    /// Goes straight for the enemy instead of stalking it.
    pub violent: bool,
    pub hit_points: i32,
}

impl SpeciesData {
    /// Generic one-click walker, used for species missing from the table.
    pub const DEFAULT: SpeciesData = SpeciesData {
        step: STEP_L,
        drop: STEP_L,
        fly: 0,
        block_mask: BoxFlags::BLOCKED,
        radius: 300,
        height: 400,
        pivot_length: 0,
        walk_speed: 20,
        run_speed: 50,
        walk_turn: Angle::degrees(2),
        run_turn: Angle::degrees(6),
        max_climb: None,
        vault_shift: 0,
        water_creature: false,
        violent: false,
        hit_points: 10,
    };

    pub fn envelope(&self) -> MoveEnvelope {
        MoveEnvelope {
            step: self.step,
            drop: self.drop,
            fly: self.fly,
            block_mask: self.block_mask,
        }
    }
}

impl Default for SpeciesData {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneClass;

    #[test]
    fn default_envelope_is_one_click_walker() {
        let envelope = SpeciesData::default().envelope();
        assert_eq!(envelope.step, STEP_L);
        assert_eq!(envelope.drop, STEP_L);
        assert_eq!(envelope.block_mask, BoxFlags::BLOCKED);
        assert_eq!(envelope.zone_class(), ZoneClass::Walker);
    }

    #[test]
    fn flying_species_use_flyer_zones() {
        let bat = SpeciesData {
            fly: 16,
            ..SpeciesData::default()
        };
        assert_eq!(bat.envelope().zone_class(), ZoneClass::Flyer);
    }
}
