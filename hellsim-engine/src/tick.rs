//! Single-tick state transition.
use serde::{Deserialize, Serialize};

use crate::config::{MercMode, SimConfig};
use crate::constants::TICKS_PER_BLOOD_WAR;
use crate::economy::{
    collect_income, decay_merc_counter, heal_soldiers, hire_mercs, repair_surveyors,
    repair_walls, run_vacuums, train_soldiers,
};
use crate::engagement::blood_war;
use crate::events::resolve_event;
use crate::numbers::u64_to_f64;
use crate::state::TrialState;
use crate::stats::TrialStats;
use crate::weather::update_weather;

/// What a tick did to the trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    Continue,
    /// The walls fell during a siege. The trial is over.
    WallsFell,
    /// The last configured patrol was lost. The trial is over.
    PatrolsLost,
}

impl TickOutcome {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

#[must_use]
pub const fn is_engagement_tick(tick: u64) -> bool {
    tick % TICKS_PER_BLOOD_WAR == 0
}

/// Advance the trial by one tick. A terminal outcome leaves the tick counter
/// on the tick the trial ended at.
pub fn advance(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) -> TickOutcome {
    if is_engagement_tick(state.tick) {
        let outcome = engagement_phase(config, state, stats);
        if outcome.is_terminal() {
            return outcome;
        }
    }

    train_soldiers(state, stats);
    collect_income(config, state);
    if matches!(config.hire_mercs, MercMode::Script | MercMode::Autoclick) {
        hire_mercs(config, state, stats);
    }
    stats.total_garrison += state.garrison();
    repair_surveyors(config, state, stats);
    repair_walls(config, state);
    run_vacuums(config, state, stats);

    state.tick += 1;
    stats.ticks += 1;
    TickOutcome::Continue
}

fn engagement_phase(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
) -> TickOutcome {
    let traits = &config.traits;
    if traits.cautious.is_some() || traits.tusk.is_some() {
        update_weather(config, state, stats);
    }

    blood_war(config, state, stats);

    if state.walls == 0 {
        stats.wall_fails += 1;
        stats.wall_fail_ticks += i64::try_from(state.tick).unwrap_or(i64::MAX);
        log::debug!(
            "trial {} walls fell after {:.1} hours",
            state.trial_id,
            u64_to_f64(state.tick) * state.tick_length / 3_600_000.0
        );
        return TickOutcome::WallsFell;
    }
    if state.patrols == 0 && config.patrols != 0 {
        stats.patrol_fails += 1;
        stats.patrol_fail_ticks += i64::try_from(state.tick).unwrap_or(i64::MAX);
        log::debug!("trial {} lost all patrols at tick {}", state.trial_id, state.tick);
        return TickOutcome::PatrolsLost;
    }

    if state.wounded > 0 {
        heal_soldiers(config, state);
    }
    if config.hire_mercs == MercMode::Governor {
        hire_mercs(config, state, stats);
    }
    resolve_event(config, state, stats);
    if state.merc_counter > 0 {
        decay_merc_counter(config, state);
    }
    TickOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgeMode;

    #[test]
    fn engagement_runs_every_twentieth_tick() {
        assert!(is_engagement_tick(0));
        assert!(!is_engagement_tick(19));
        assert!(is_engagement_tick(20));
    }

    #[test]
    fn quiet_ticks_advance_counters() {
        let config = SimConfig {
            patrols: 0,
            threat: 0,
            sieges: false,
            soul_forge: ForgeMode::Off,
            ..SimConfig::default()
        };
        let mut state = TrialState::new(&config, 1, 12);
        let mut stats = TrialStats::seeded(&config);
        for _ in 0..40 {
            assert_eq!(advance(&config, &mut state, &mut stats), TickOutcome::Continue);
        }
        assert_eq!(state.tick, 40);
        assert_eq!(stats.ticks, 40);
        assert_eq!(stats.blood_wars, 2);
        assert_eq!(stats.total_garrison, 40 * 100);
    }

    #[test]
    fn fallen_walls_end_the_trial_without_advancing() {
        let config = SimConfig {
            sieges: false,
            ..SimConfig::default()
        };
        let mut state = TrialState::new(&config, 1, 12);
        let mut stats = TrialStats::seeded(&config);
        state.tick = 40;
        state.walls = 0;
        assert_eq!(advance(&config, &mut state, &mut stats), TickOutcome::WallsFell);
        assert_eq!(state.tick, 40);
        assert_eq!(stats.wall_fails, 1);
        assert_eq!(stats.wall_fail_ticks, 40);
        assert_eq!(stats.ticks, 0);
    }

    #[test]
    fn losing_every_patrol_ends_the_trial() {
        let config = SimConfig {
            sieges: false,
            ..SimConfig::default()
        };
        let mut state = TrialState::new(&config, 1, 12);
        let mut stats = TrialStats::seeded(&config);
        state.patrols = 0;
        assert_eq!(advance(&config, &mut state, &mut stats), TickOutcome::PatrolsLost);
        assert_eq!(stats.patrol_fails, 1);
        assert_eq!(stats.patrol_fail_ticks, 0);
    }
}
