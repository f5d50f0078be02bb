// cavern_ai: creature AI core for a box-partitioned 3D level.
//
// This crate contains everything a host needs to drive hostile creatures
// through a level: the navigation box graph, zone reachability tables, the
// per-creature LOT search, target resolution, sensing, mood, the movement
// integrator and the bounded pool of AI slots. It has no rendering, audio or
// frame-timing dependencies and can be tested, benchmarked, and run headless.
//
// Module overview:
// - `types.rs`:    Fixed-point positions, binary angles, box/room/zone/slot IDs, Species.
// - `error.rs`:    LevelError, NavError and ConfigError.
// - `boxes.rs`:    Box records, overlap lists, BoxGraph with door blocking.
// - `zone.rs`:     Zone tables per locomotion class and map layout, flood fill.
// - `level.rs`:    Level: box graph + zone tables + active layout.
// - `world.rs`:    WorldQuery trait (sector/floor/ceiling/water) and the SectorGrid impl.
// - `species.rs`:  SpeciesData: data-driven locomotion and mood parameters.
// - `config.rs`:   AiConfig: slot count, tuning knobs, species table.
// - `entity.rs`:   Entity and the slot-map backed EntityArena.
// - `lot.rs`:      Lot: budgeted backward reachability search over boxes.
// - `target.rs`:   calculate_target: chain walking and clip-window steering.
// - `sensing.rs`:  AiInfo: zones, distance, bearing, ahead/bite tests.
// - `mood.rs`:     Mood state machine and destination choice.
// - `movement.rs`: animate / turn / tilt / head / vault, drowning, overlap.
// - `slots.rs`:    SlotPool: enable/disable AI, eviction, Creature records.
// - `command.rs`:  SimCommand: every external mutation.
// - `event.rs`:    SimEvent: narrative output of a tick.
// - `sim.rs`:      SimState and the fixed-rate tick loop.
// - `prng`:        Re-exported from `cavern_prng`: xoshiro256++ PRNG with SplitMix64 seeding.
//
// **Critical constraint: determinism.** The simulation is a pure function:
// `(state, commands) -> (new_state, events)`. All randomness comes from a
// seeded xoshiro256++ PRNG (re-exported from `cavern_prng`). No `HashMap`, no
// system time, no OS entropy. Use `BTreeMap` for ordered collections.

pub mod boxes;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod level;
pub mod lot;
pub mod mood;
pub mod movement;
pub use cavern_prng as prng;
pub mod sensing;
pub mod sim;
pub mod slots;
pub mod species;
pub mod target;
pub mod types;
pub mod world;
pub mod zone;
