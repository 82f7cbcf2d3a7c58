//! Mutable state of a single trial.
use crate::config::{ForgeMode, SimConfig};
use crate::constants::{INITIAL_EVENT_ODDS, INITIAL_SIEGE_ODDS, INITIAL_WALLS};
use crate::events::EventKind;
use crate::modifiers::droid_size;
use crate::numbers::{count_to_i64, round_f64_to_i64, u64_to_f64};
use crate::ratings::{army_rating, forge_soldiers, tick_length, training_rate};
use crate::rng::TrialRng;
use crate::weather::Sky;

/// Everything a trial mutates while it runs. Owned by exactly one runner.
#[derive(Debug, Clone)]
pub struct TrialState {
    pub trial_id: u64,
    pub tick: u64,
    /// Tick count at which the trial is survived.
    pub ticks: u64,
    /// Milliseconds of game time per tick.
    pub tick_length: f64,
    pub threat: i64,
    pub patrols: i64,
    pub soldiers: i64,
    pub max_soldiers: i64,
    /// Soldiers on the front line: patrols plus fortress defenders.
    pub hell_soldiers: i64,
    pub max_hell_soldiers: i64,
    pub patrol_rating: f64,
    pub patrol_rating_droids: f64,
    pub wounded: i64,
    pub training_progress: f64,
    pub training_rate: f64,
    /// Defenders the soul forge needs to run.
    pub forge_crew: i64,
    pub surveyors: i64,
    pub surveyor_repair: i64,
    pub siege_odds: i64,
    pub walls: i64,
    pub wall_repair: i64,
    pub pity: i64,
    pub event_odds: i64,
    pub last_event: Option<EventKind>,
    pub forge_souls: i64,
    pub compactor_energy: i64,
    /// Treasury in millions.
    pub money: f64,
    pub merc_counter: i64,
    pub clicker_counter: i64,
    pub day: i64,
    /// 0 cold, 1 mild, 2 hot.
    pub temperature: u8,
    pub weather: Sky,
    /// Last progress percentage reported to the host.
    pub progress: u8,
    pub rng: TrialRng,
}

impl TrialState {
    /// Fresh trial state at tick 0, drawing its start day from `seed`'s stream.
    #[must_use]
    pub fn new(config: &SimConfig, trial_id: u64, seed: u64) -> Self {
        let mut rng = TrialRng::from_seed(seed);
        let tick_length = tick_length(config);
        let target = round_f64_to_i64(config.hours * 3_600.0 * 1_000.0 / tick_length);
        let patrol_size = count_to_i64(config.patrol_size);
        let patrol_strength = count_to_i64(config.patrols) * patrol_size;
        let forge_crew = forge_soldiers(config);
        let dedicated = if config.soul_forge == ForgeMode::Dedicated {
            forge_crew
        } else {
            0
        };
        let soldiers = patrol_strength
            + count_to_i64(config.garrison)
            + count_to_i64(config.defenders)
            + dedicated;
        let hell_soldiers = patrol_strength + count_to_i64(config.defenders) + dedicated;
        let day = rng.draw(0, count_to_i64(config.orbit));

        Self {
            trial_id,
            tick: 0,
            ticks: u64::try_from(target).unwrap_or(0),
            tick_length,
            threat: config.threat,
            patrols: count_to_i64(config.patrols),
            soldiers,
            max_soldiers: soldiers,
            hell_soldiers,
            max_hell_soldiers: hell_soldiers,
            patrol_rating: army_rating(config, None, patrol_size, None),
            patrol_rating_droids: army_rating(
                config,
                None,
                patrol_size + i64::from(droid_size(config)),
                None,
            ),
            wounded: 0,
            training_progress: 0.0,
            training_rate: training_rate(config),
            forge_crew,
            surveyors: count_to_i64(config.surveyors),
            surveyor_repair: 0,
            siege_odds: INITIAL_SIEGE_ODDS,
            walls: INITIAL_WALLS,
            wall_repair: 0,
            pity: 0,
            event_odds: INITIAL_EVENT_ODDS,
            last_event: None,
            forge_souls: 0,
            compactor_energy: 0,
            money: config.money_cap,
            merc_counter: 0,
            clicker_counter: 0,
            day,
            temperature: 1,
            weather: Sky::default(),
            progress: 0,
            rng,
        }
    }

    /// Soldiers committed to patrols.
    #[must_use]
    pub fn patrol_strength(&self, config: &SimConfig) -> i64 {
        self.patrols * count_to_i64(config.patrol_size)
    }

    /// Front-line soldiers not assigned to a patrol.
    #[must_use]
    pub fn defenders(&self, config: &SimConfig) -> i64 {
        self.hell_soldiers - self.patrol_strength(config)
    }

    /// Soldiers held back from the front.
    #[must_use]
    pub const fn garrison(&self) -> i64 {
        self.soldiers - self.hell_soldiers
    }

    /// Soldiers not committed to patrols.
    #[must_use]
    pub fn reserves(&self, config: &SimConfig) -> i64 {
        self.soldiers - self.patrol_strength(config)
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.tick >= self.ticks
    }

    /// Elapsed game time as `HHH:MM:SS`.
    #[must_use]
    pub fn time_str(&self) -> String {
        let total = round_f64_to_i64(u64_to_f64(self.tick) * self.tick_length / 1_000.0);
        let seconds = total % 60;
        let minutes = (total / 60) % 60;
        let hours = total / 3_600;
        format!("{hours:03}:{minutes:02}:{seconds:02}")
    }
}
