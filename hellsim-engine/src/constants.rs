//! Centralized tuning constants for the blood war simulation.
//!
//! These values define the deterministic math of a trial. Keeping them
//! together means balance can only move through reviewed code changes.

use std::time::Duration;

// Scheduling ---------------------------------------------------------------
/// Ticks between two engagements (blood wars).
pub const TICKS_PER_BLOOD_WAR: u64 = 20;
/// Wall-clock budget of one cooperative slice before the runner yields.
pub const SLICE_BUDGET: Duration = Duration::from_millis(50);
pub const PROGRESS_COMPLETE: u8 = 100;

// Trial start --------------------------------------------------------------
pub const BASE_TICK_LENGTH_MS: f64 = 250.0;
pub const INITIAL_WALLS: i64 = 100;
pub const INITIAL_EVENT_ODDS: i64 = 999;
pub const INITIAL_SIEGE_ODDS: i64 = 999;

// Engagement ---------------------------------------------------------------
pub(crate) const ENCOUNTER_ROLL: i64 = 999;
pub(crate) const DEMONS_MIN_DIVISOR: i64 = 50;
pub(crate) const DEMONS_MAX_DIVISOR: i64 = 10;
pub(crate) const DRONE_KILLS: (i64, i64) = (25, 75);
pub(crate) const ADVANCED_DRONE_KILLS: (i64, i64) = (50, 125);
pub(crate) const GEM_ODDS: i64 = 10_000;
pub(crate) const GEM_ODDS_TECHNOPHOBE: i64 = 9_000;
pub(crate) const GEM_ODDS_FLOOR: i64 = 12;
pub(crate) const BEACON_GEM_FACTOR: f64 = 0.948;
pub(crate) const BASE_AMBUSH_ODDS: i64 = 30;
pub(crate) const PITY_CAP: i64 = 10_000;
pub(crate) const SIEGE_THRESHOLD: i64 = 900;
pub(crate) const SIEGE_DEFENSE_DIVISOR: f64 = 35.0;
pub(crate) const INFLUX_THREAT_CEILING: i64 = 10_000;
pub(crate) const INFLUX_STEP: f64 = 2_500.0;
pub(crate) const INFLUX_BEACON_BONUS: f64 = 0.22;
pub(crate) const SURVEYOR_DANGER_DIVISOR: f64 = 1_000.0;
pub(crate) const SHIELD_GENERATOR_DIVISOR_BONUS: f64 = 250.0;

// Soul forge ---------------------------------------------------------------
pub(crate) const FORGE_RATING_REQUIREMENT: f64 = 650.0;
pub(crate) const FORGE_GEM_ODDS: (i64, i64) = (5_000, 4_500);
pub(crate) const GUN_GEM_ODDS: (i64, i64) = (7_500, 6_750);
pub(crate) const GATE_GEM_ODDS: (i64, i64) = (3_000, 2_700);
pub(crate) const FORGE_SOUL_CAP: f64 = 1_000_000.0;
pub(crate) const FORGE_SOUL_CAP_ABSORPTION: f64 = 750_000.0;
pub(crate) const HEATSINK_DIVISOR: f64 = 12_500.0;

// Economy ------------------------------------------------------------------
pub(crate) const WALL_REPAIR_TICKS: f64 = 200.0;
pub(crate) const SURVEYOR_REPAIR_TICKS: f64 = 180.0;
pub(crate) const REPAIR_DROID_FACTOR: f64 = 0.95;
pub(crate) const HEAL_COST: f64 = 20.0;
pub(crate) const MERC_PRICE_CAP: f64 = 25_000.0;
pub(crate) const MERC_COOLDOWN_ODDS: i64 = 3;
pub(crate) const VACUUM_DRAIN: f64 = 1_653_439.0;
pub(crate) const COMPACTOR_GEM_ENERGY: i64 = 1_000_000_000;

// Events -------------------------------------------------------------------
pub(crate) const SURGE_DEMONS: (i64, i64) = (2_500, 5_000);
pub(crate) const CURIOUS_GEM_ODDS: i64 = 25;
