// Data-driven AI configuration.
//
// Every tunable the AI core reads lives in `AiConfig`, loaded from JSON by
// the host at startup (`AiConfig::from_json`). The sim never uses magic
// numbers for these: slot pool size, the per-tick search budget, mood
// chances, sensing distances and the small movement easing limits all come
// from here. Structural constants of the level format (block and click
// sizes) stay in `types.rs`.
//
// Species-specific locomotion (envelope, speeds, turn rates, body size)
// lives in `SpeciesData` entries keyed by `Species` in the `species` map;
// see `species.rs`.
//
// See also: `sim.rs` which owns the `AiConfig` as part of `SimState`,
// `mood.rs` for the chance and distance consumers, `movement.rs` for the
// easing limits.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation logic. Two runs only replay identically with identical configs.

use crate::boxes::BoxFlags;
use crate::error::ConfigError;
use crate::movement::VaultRank;
use crate::species::SpeciesData;
use crate::types::{Angle, STEP_L, Species, WALL_L};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static FALLBACK_SPECIES: SpeciesData = SpeciesData::DEFAULT;

/// Top-level AI configuration. Loaded once, never mutated by the tick loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Number of creatures that may run AI at once.
    pub slot_count: usize,

    /// Boxes each creature's LOT search may pop per tick.
    pub expansion_budget: u32,

    /// Chance per tick that a hit creature panics and escapes.
    pub escape_chance: f64,

    /// Chance per tick that an escaping creature calms down to stalking.
    pub recover_chance: f64,

    /// Distance within which a creature in the enemy's zone attacks instead
    /// of stalking.
    pub attack_range: i32,

    /// Band beyond a box's own size within which it counts as a stalking
    /// spot.
    pub stalk_distance: i32,

    /// Half-width of the square around the enemy an escape box must lie
    /// outside.
    pub escape_distance: i32,

    /// How far above a floor flyers aim.
    pub fly_lift: i32,

    /// How far a grounded creature settles toward the floor per tick.
    pub ground_settle: i32,

    /// Largest change in head aim per tick.
    pub max_head_change: Angle,

    /// Largest roll change per tick while turning.
    pub max_tilt: Angle,

    /// Half-angle of the cone counted as "in front".
    pub front_arc: Angle,

    /// Undo a creature's move for the tick when it would overlap another
    /// entity's bounding sphere.
    pub agent_overlap_rollback: bool,

    /// Per-species locomotion data.
    pub species: BTreeMap<Species, SpeciesData>,
}

impl Default for AiConfig {
    fn default() -> Self {
        let mut species = BTreeMap::new();
        species.insert(
            Species::Wolf,
            SpeciesData {
                radius: 340,
                height: 350,
                pivot_length: 375,
                walk_speed: 30,
                run_speed: 80,
                hit_points: 6,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Bear,
            SpeciesData {
                radius: 500,
                height: 700,
                pivot_length: 500,
                walk_speed: 25,
                run_speed: 60,
                violent: true,
                hit_points: 20,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Rat,
            SpeciesData {
                radius: 200,
                height: 150,
                pivot_length: 200,
                walk_speed: 20,
                run_speed: 40,
                hit_points: 5,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Bat,
            SpeciesData {
                step: 20 * WALL_L,
                drop: 20 * WALL_L,
                fly: STEP_L / 16,
                radius: 100,
                height: 150,
                walk_speed: 20,
                run_speed: 20,
                walk_turn: Angle::degrees(20),
                run_turn: Angle::degrees(20),
                hit_points: 1,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Ape,
            SpeciesData {
                step: WALL_L,
                drop: WALL_L,
                radius: 350,
                height: 600,
                pivot_length: 250,
                walk_speed: 20,
                run_speed: 60,
                max_climb: Some(VaultRank::Climb4),
                vault_shift: 260,
                hit_points: 22,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Raptor,
            SpeciesData {
                step: 2 * STEP_L,
                drop: 2 * STEP_L,
                radius: 400,
                height: 700,
                pivot_length: 400,
                walk_speed: 30,
                run_speed: 90,
                run_turn: Angle::degrees(8),
                violent: true,
                hit_points: 20,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Tyrannosaur,
            SpeciesData {
                block_mask: BoxFlags::BLOCKED | BoxFlags::BLOCKABLE,
                radius: 1000,
                height: 1700,
                pivot_length: 1800,
                walk_speed: 30,
                run_speed: 100,
                walk_turn: Angle::degrees(2),
                run_turn: Angle::degrees(4),
                violent: true,
                hit_points: 100,
                ..SpeciesData::DEFAULT
            },
        );
        species.insert(
            Species::Crocodile,
            SpeciesData {
                radius: 400,
                height: 200,
                pivot_length: 600,
                walk_speed: 15,
                run_speed: 40,
                water_creature: true,
                hit_points: 20,
                ..SpeciesData::DEFAULT
            },
        );

        Self {
            slot_count: 5,
            expansion_budget: 5,
            escape_chance: 2048.0 / 32768.0,
            recover_chance: 256.0 / 32768.0,
            attack_range: 3 * WALL_L,
            stalk_distance: 3 * WALL_L,
            escape_distance: 5 * WALL_L,
            fly_lift: STEP_L * 3 / 2,
            ground_settle: STEP_L / 4,
            max_head_change: Angle::degrees(5),
            max_tilt: Angle::degrees(3),
            front_arc: Angle::QUARTER,
            agent_overlap_rollback: true,
            species,
        }
    }
}

impl AiConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<AiConfig, ConfigError> {
        let config: AiConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.expansion_budget == 0 {
            return Err(ConfigError::NoExpansionBudget);
        }
        Ok(())
    }

    /// Species row, or the generic walker when the table has none.
    pub fn species_data(&self, species: Species) -> &SpeciesData {
        self.species.get(&species).unwrap_or(&FALLBACK_SPECIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AiConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = AiConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
        assert_eq!(restored.species.len(), Species::ALL.len());
        assert_eq!(
            restored.species[&Species::Tyrannosaur].block_mask,
            BoxFlags::BLOCKED | BoxFlags::BLOCKABLE
        );
    }

    #[test]
    fn config_loads_from_json_string() {
        let json = r#"{
            "slot_count": 2,
            "expansion_budget": 8,
            "escape_chance": 0.5,
            "recover_chance": 0.25,
            "attack_range": 2048,
            "stalk_distance": 3072,
            "escape_distance": 5120,
            "fly_lift": 384,
            "ground_settle": 64,
            "max_head_change": 910,
            "max_tilt": 546,
            "front_arc": 16384,
            "agent_overlap_rollback": false,
            "species": {
                "Bat": {
                    "step": 20480,
                    "drop": 20480,
                    "fly": 16,
                    "block_mask": "BLOCKED",
                    "radius": 100,
                    "height": 150,
                    "pivot_length": 0,
                    "walk_speed": 20,
                    "run_speed": 20,
                    "walk_turn": 3640,
                    "run_turn": 3640,
                    "max_climb": null,
                    "vault_shift": 0,
                    "water_creature": false,
                    "violent": false,
                    "hit_points": 1
                }
            }
        }"#;
        let config = AiConfig::from_json(json).unwrap();
        assert_eq!(config.slot_count, 2);
        assert_eq!(config.expansion_budget, 8);
        assert!(!config.agent_overlap_rollback);
        assert_eq!(config.species_data(Species::Bat).fly, 16);
        // Missing species fall back to the generic walker.
        assert_eq!(config.species_data(Species::Wolf), &SpeciesData::DEFAULT);
    }

    #[test]
    fn zero_slots_is_rejected() {
        let config = AiConfig {
            slot_count: 0,
            ..AiConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(AiConfig::from_json(&json), Err(ConfigError::NoSlots)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            AiConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn chances_are_exact_binary_fractions() {
        let config = AiConfig::default();
        assert_eq!(config.escape_chance, 0.0625);
        assert_eq!(config.recover_chance, 0.0078125);
        assert_eq!(config.fly_lift, 384);
    }
}
