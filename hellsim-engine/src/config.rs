//! Simulation configuration.
//!
//! A [`SimConfig`] is produced by the host (form, file, save import) and
//! finalized before a batch starts. Trials only ever read it.
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modifiers::TraitRank;

/// Soul forge deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForgeMode {
    #[default]
    Off,
    /// Built; staffed from the defenders whenever enough are available.
    Built,
    /// Built with a dedicated crew added on top of the configured army.
    Dedicated,
}

impl ForgeMode {
    #[must_use]
    pub const fn is_built(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Mercenary hiring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MercMode {
    #[default]
    Off,
    /// Governor task, evaluated once per engagement.
    Governor,
    /// Automation script, evaluated every tick.
    Script,
    /// Button autoclicker firing on a fixed interval.
    Autoclick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    #[default]
    Grassland,
    Oceanic,
    Forest,
    Desert,
    Volcanic,
    Tundra,
    Savanna,
    Swamp,
    Ashland,
    Taiga,
    Hellscape,
    Eden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Universe {
    #[default]
    Standard,
    Heavy,
    Antimatter,
    Evil,
    Micro,
    Magic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Government {
    Autocracy,
    Democracy,
    Republic,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Governor {
    Soldier,
    Sports,
    Media,
    Bureaucrat,
    #[default]
    #[serde(other)]
    None,
}

/// Zodiac sign in effect. `Current` is resolved to a concrete sign when the
/// configuration is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Astrology {
    Current,
    Pisces,
    Aries,
    Cancer,
    #[default]
    #[serde(alias = "other")]
    None,
}

impl Astrology {
    /// Sign with a modelled effect for the given calendar date.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        match (date.month(), date.day()) {
            (2, 19..) | (3, ..=20) => Self::Pisces,
            (3, 21..) | (4, ..=19) => Self::Aries,
            (6, 22..) | (7, ..=22) => Self::Cancer,
            _ => Self::None,
        }
    }
}

/// Species traits. `None` means the species lacks the trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Traits {
    pub hyper: Option<TraitRank>,
    pub slow: Option<TraitRank>,
    pub high_pop: Option<TraitRank>,
    pub diverse: Option<TraitRank>,
    pub beast: Option<TraitRank>,
    pub brute: Option<TraitRank>,
    pub regenerative: Option<TraitRank>,
    pub slow_regen: Option<TraitRank>,
    pub cannibal: Option<TraitRank>,
    pub revive: Option<TraitRank>,
    pub armored: Option<TraitRank>,
    pub scales: Option<TraitRank>,
    pub instincts: Option<TraitRank>,
    pub apex_predator: Option<TraitRank>,
    pub chameleon: Option<TraitRank>,
    pub elusive: Option<TraitRank>,
    pub chicken: Option<TraitRank>,
    pub cautious: Option<TraitRank>,
    pub tusk: Option<TraitRank>,
    pub puny: Option<TraitRank>,
    pub claws: Option<TraitRank>,
    pub swift: Option<TraitRank>,
    pub fiery: Option<TraitRank>,
    pub sticky: Option<TraitRank>,
    pub pathetic: Option<TraitRank>,
    pub holy: Option<TraitRank>,
    pub sniper: Option<TraitRank>,
    pub hivemind: Option<TraitRank>,
    pub ooze: Option<TraitRank>,
    pub blurry: Option<TraitRank>,
    pub ghostly: Option<TraitRank>,
    pub parasite: Option<TraitRank>,
    pub grenadier: Option<TraitRank>,
    pub elemental: Option<TraitRank>,
    pub rhino_rage: Option<TraitRank>,
    pub astrologer: Option<TraitRank>,
    pub unfavored: Option<TraitRank>,
    pub kindling: Option<TraitRank>,
    pub smoldering: Option<TraitRank>,
    pub evil: Option<TraitRank>,
    pub aquatic: Option<TraitRank>,
    pub flare: Option<TraitRank>,
    pub slaver: Option<TraitRank>,
    pub rogue: Option<TraitRank>,
    pub aggressive: Option<TraitRank>,
    pub curious: Option<TraitRank>,
    pub rage: bool,
    pub banana: bool,
}

/// Captive races held in the eldritch prisons, counted per race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Thralls {
    pub unfathomable: bool,
    pub nightmare: u32,
    pub torturers: u32,
    pub orc: u32,
    pub troll: u32,
    pub tortosian: u32,
    pub yeti: u32,
    pub wendigo: u32,
    pub mantis: u32,
    pub scorpid: u32,
    pub sharkin: u32,
    pub centaur: u32,
    pub rhinotaur: u32,
    pub antid: u32,
    pub balorg: u32,
    pub unicorn: u32,
    pub pinguicula: u32,
}

/// Which optional lines the text log of a trial receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogOptions {
    /// One line per engagement with soldiers, threat and gem odds.
    pub verbose: bool,
    pub sieges: bool,
    pub surges: bool,
    pub terrorists: bool,
    pub lost_patrols: bool,
}

/// Fully resolved configuration for a batch of trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated hours per trial.
    pub hours: f64,

    pub patrols: u32,
    pub patrol_size: u32,
    pub defenders: u32,
    pub garrison: u32,
    pub droids: u32,
    pub enhanced_droids: bool,
    pub predators: u32,
    pub advanced_drones: bool,
    pub turrets: u32,
    pub turret_tech: u8,
    pub repair_droids: u32,
    pub surveyors: u32,

    pub weapon_tech: u32,
    pub armor_tech: u32,
    pub tactical: u32,
    pub boot_camps: u32,
    pub vr_training: bool,
    pub hospitals: u32,
    pub bac_tanks: bool,
    pub fibroblast: u32,
    pub blood_lust: u32,
    pub temples: u32,
    pub zealotry: bool,
    pub bunkers: u32,
    pub spectral_training: bool,
    pub shield_generator: bool,

    pub threat: i64,
    pub beacons: u32,

    pub soul_forge: ForgeMode,
    pub guns: u32,
    pub advanced_guns: bool,
    pub gate_turrets: u32,
    pub soul_attractors: u32,
    pub soul_trap: u32,
    pub soul_bait: bool,
    pub soul_link: bool,
    pub soul_absorption: bool,
    pub what_is_best: u32,
    pub ghost_trappers: u32,
    pub dimensional_tap: bool,
    pub thermal_collectors: u32,
    pub emfield: bool,

    pub soul_compactor: bool,
    pub vacuums: u32,
    pub suction_force: bool,
    pub batteries: u32,

    pub sieges: bool,
    pub surges: bool,
    pub terrorists: bool,

    /// Money cap and income, in millions.
    pub money_cap: f64,
    pub money_income: f64,
    pub hire_mercs: MercMode,
    pub merc_buffer: u32,
    /// Percent of the money cap the governor keeps in reserve.
    pub merc_reserve: f64,
    /// Percent of the money cap above which the script always hires.
    pub script_cap_threshold: f64,
    /// Seconds of income the script is willing to pay per merc.
    pub script_income: f64,
    /// Seconds between autoclicker presses.
    pub clicker_interval: f64,

    pub biome: Biome,
    /// Days per year.
    pub orbit: u32,
    pub elliptical: bool,
    pub universe: Universe,
    pub government: Government,
    pub governor: Governor,
    pub bureaucratic_efficiency: bool,
    pub astrology: Astrology,
    pub astro_wish: bool,
    pub technophobe: u32,
    pub additional_technophobe_universes: u32,
    pub ancient_ruins: bool,
    pub authority: f64,
    pub dark_energy: f64,
    pub witch_hunter: bool,
    pub war_ritual: f64,
    pub rejuvenated: bool,
    pub lamentis: u32,
    pub artificial: bool,

    pub traits: Traits,
    pub thralls: Thralls,
    pub log: LogOptions,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hours: 100.0,
            patrols: 20,
            patrol_size: 10,
            defenders: 40,
            garrison: 100,
            droids: 5,
            enhanced_droids: false,
            predators: 10,
            advanced_drones: false,
            turrets: 50,
            turret_tech: 2,
            repair_droids: 10,
            surveyors: 10,
            weapon_tech: 5,
            armor_tech: 2,
            tactical: 3,
            boot_camps: 20,
            vr_training: false,
            hospitals: 20,
            bac_tanks: false,
            fibroblast: 0,
            blood_lust: 0,
            temples: 0,
            zealotry: false,
            bunkers: 0,
            spectral_training: false,
            shield_generator: false,
            threat: 10_000,
            beacons: 0,
            soul_forge: ForgeMode::Built,
            guns: 10,
            advanced_guns: false,
            gate_turrets: 0,
            soul_attractors: 0,
            soul_trap: 0,
            soul_bait: false,
            soul_link: false,
            soul_absorption: false,
            what_is_best: 0,
            ghost_trappers: 0,
            dimensional_tap: false,
            thermal_collectors: 0,
            emfield: false,
            soul_compactor: false,
            vacuums: 0,
            suction_force: false,
            batteries: 0,
            sieges: true,
            surges: true,
            terrorists: true,
            money_cap: 500.0,
            money_income: 2.0,
            hire_mercs: MercMode::Off,
            merc_buffer: 5,
            merc_reserve: 0.0,
            script_cap_threshold: 90.0,
            script_income: 0.5,
            clicker_interval: 10.0,
            biome: Biome::Grassland,
            orbit: 365,
            elliptical: false,
            universe: Universe::Standard,
            government: Government::Other,
            governor: Governor::None,
            bureaucratic_efficiency: false,
            astrology: Astrology::None,
            astro_wish: false,
            technophobe: 0,
            additional_technophobe_universes: 0,
            ancient_ruins: false,
            authority: 100.0,
            dark_energy: 0.0,
            witch_hunter: false,
            war_ritual: 0.0,
            rejuvenated: false,
            lamentis: 0,
            artificial: false,
            traits: Traits::default(),
            thralls: Thralls::default(),
            log: LogOptions::default(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration from JSON; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` when the document is not valid JSON for
    /// this schema.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Resolve date- and tier-dependent settings and normalize conflicting
    /// values. Must run before the first trial. A finalized configuration
    /// passes through unchanged, so hosts and [`crate::Batch::start`] may both
    /// call it.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation found by [`SimConfig::validate`].
    pub fn finalize(mut self) -> Result<Self, ConfigError> {
        self.validate()?;

        if self.astrology == Astrology::Current {
            self.astrology = Astrology::for_date(Local::now().date_naive());
            log::debug!("resolved current astrology to {:?}", self.astrology);
        }

        // Only tiers above 5 carry extra universes; the rank itself never
        // matters past 5, so a split value splits to itself.
        let tier = self.technophobe;
        if tier >= 100 {
            self.technophobe = (tier % 100).min(5);
            self.additional_technophobe_universes = tier / 100;
        } else if tier > 5 {
            self.technophobe = 5;
            self.additional_technophobe_universes = tier - 5;
        }

        if self.orbit == 0 {
            log::warn!("orbit of 0 days normalized to 1");
            self.orbit = 1;
        }
        if self.hire_mercs == MercMode::Autoclick && self.clicker_interval <= 0.0 {
            log::warn!("autoclicker interval {} normalized to 0", self.clicker_interval);
            self.clicker_interval = 0.0;
        }
        if self.patrols == 0 && self.droids > 0 {
            log::debug!("{} droids will reinforce the fortress (no patrols)", self.droids);
        }

        Ok(self)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates its documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hours.is_finite() || self.hours <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "hours",
                min: 0.0,
                value: self.hours,
            });
        }
        if self.patrols > 0 && self.patrol_size == 0 {
            return Err(ConfigError::EmptyPatrols {
                patrols: self.patrols,
            });
        }
        if self.turret_tech > 2 {
            return Err(ConfigError::RangeViolation {
                field: "turret_tech",
                min: 0.0,
                max: 2.0,
                value: f64::from(self.turret_tech),
            });
        }
        if self.threat < 0 {
            return Err(ConfigError::MinViolation {
                field: "threat",
                min: 0.0,
                value: crate::numbers::i64_to_f64(self.threat),
            });
        }
        for (field, value) in [
            ("money_cap", self.money_cap),
            ("money_income", self.money_income),
            ("authority", self.authority),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if !(0.0..=100.0).contains(&self.merc_reserve) {
            return Err(ConfigError::RangeViolation {
                field: "merc_reserve",
                min: 0.0,
                max: 100.0,
                value: self.merc_reserve,
            });
        }
        Ok(())
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("configuration could not be parsed: {0}")]
    Parse(String),
    #[error("{field} must be above {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{patrols} patrols configured with a patrol size of 0")]
    EmptyPatrols { patrols: u32 },
}
