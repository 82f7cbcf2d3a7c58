//! Between-fight upkeep: training, healing, mercenaries, repairs and the
//! soul compactor.
use crate::config::{Astrology, Governor, MercMode, SimConfig};
use crate::constants::{
    COMPACTOR_GEM_ENERGY, HEAL_COST, MERC_COOLDOWN_ODDS, REPAIR_DROID_FACTOR,
    SURVEYOR_REPAIR_TICKS, VACUUM_DRAIN, WALL_REPAIR_TICKS,
};
use crate::modifiers::{astro_mod, fathom, pop_factor, ranked};
use crate::numbers::{floor_f64_to_i64, i64_to_f64, round_f64_to_i64};
use crate::ratings::merc_price;
use crate::state::TrialState;
use crate::stats::TrialStats;

const HIGH_POP_UPKEEP: [f64; 7] = [1.2, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5];

/// Add a tick of training progress; whole soldiers join the army and,
/// while there is room, the front line.
pub fn train_soldiers(state: &mut TrialState, stats: &mut TrialStats) {
    if state.soldiers >= state.max_soldiers {
        return;
    }
    state.training_progress += state.training_rate;
    if state.training_progress >= 100.0 {
        let trained = floor_f64_to_i64(state.training_progress / 100.0);
        state.soldiers += trained;
        stats.soldiers_trained += trained;
        state.training_progress -= i64_to_f64(trained) * 100.0;
        state.hell_soldiers = (state.hell_soldiers + trained).min(state.max_hell_soldiers);
    }
}

/// Add a tick of income, capped at the treasury limit.
pub fn collect_income(config: &SimConfig, state: &mut TrialState) {
    state.money += config.money_income * (state.tick_length / 1_000.0);
    if state.money > config.money_cap {
        state.money = config.money_cap;
    }
}

/// Healing credits available per engagement.
#[must_use]
pub fn heal_credits(config: &SimConfig) -> f64 {
    let traits = &config.traits;
    let thralls = &config.thralls;
    let mut credits = if config.artificial {
        f64::from(config.boot_camps)
    } else {
        f64::from(config.hospitals)
    };
    if config.rejuvenated && config.lamentis > 0 {
        credits += f64::from(config.lamentis);
    }
    if config.astrology == Astrology::Cancer {
        let bonus = if config.astro_wish { 8.0 } else { 5.0 };
        credits = (credits + i64_to_f64(round_f64_to_i64(bonus * astro_mod(config)))).max(0.0);
    }
    if config.bac_tanks {
        credits *= 2.0;
    }
    credits += f64::from(config.fibroblast) * 2.0;
    if let Some(rank) = traits.cannibal {
        if credits >= 20.0 {
            credits *= rank.select([1.06, 1.08, 1.1, 1.15, 1.2, 1.22, 1.24]);
        } else {
            credits += rank.select([1.2, 1.6, 2.0, 3.0, 4.0, 4.4, 4.8_f64]).floor();
        }
        credits += 3.0;
    }
    if thralls.mantis > 0 {
        let strength = fathom(thralls, thralls.mantis);
        if credits >= 20.0 {
            credits *= 0.15_f64.mul_add(strength, 1.0);
        } else {
            credits += (3.0 * strength).floor();
        }
    }
    credits *= ranked(traits.high_pop, HIGH_POP_UPKEEP, 1.0);
    if config.governor == Governor::Sports {
        credits *= 1.5;
    }
    if thralls.troll > 0 {
        credits += i64_to_f64(round_f64_to_i64(80.0 * fathom(thralls, thralls.troll)));
    }
    i64_to_f64(round_f64_to_i64(credits))
}

/// Heal wounded soldiers once per engagement.
pub fn heal_soldiers(config: &SimConfig, state: &mut TrialState) {
    if state.wounded <= 0 {
        return;
    }
    let traits = &config.traits;
    let mut healed = ranked(traits.regenerative, [1, 2, 3, 4, 5, 6, 7], 1);
    let credits = heal_credits(config);
    let cost = HEAL_COST * ranked(traits.slow_regen, [1.45, 1.4, 1.35, 1.25, 1.2, 1.15, 1.12], 1.0);

    healed += floor_f64_to_i64(credits / cost);
    let remainder = credits % cost;
    if i64_to_f64(state.rng.draw_frac(0, cost)) < remainder {
        healed += 1;
    }
    state.wounded = (state.wounded - healed).max(0);
}

/// Whether the policy allows buying an affordable merc at `price` right now.
/// The autoclicker buys on every press it can afford.
fn policy_allows(config: &SimConfig, state: &TrialState, price: f64) -> bool {
    match config.hire_mercs {
        MercMode::Governor => {
            let reserve = config.money_cap * (config.merc_reserve / 100.0);
            !(state.money + config.money_income < reserve && price > config.money_income)
        }
        MercMode::Script => {
            let money_threshold = config.money_cap * (config.script_cap_threshold / 100.0);
            let income_threshold = config.money_income * config.script_income;
            state.money > money_threshold || price <= income_threshold
        }
        MercMode::Autoclick => true,
        MercMode::Off => false,
    }
}

/// Try to hire one mercenary. Returns whether one was hired.
pub fn try_buy_merc(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) -> bool {
    let buffer = i64::from(config.merc_buffer);
    match config.hire_mercs {
        MercMode::Off => return false,
        MercMode::Governor | MercMode::Script => {
            if state.soldiers + buffer >= state.max_soldiers {
                return false;
            }
        }
        MercMode::Autoclick => {
            state.clicker_counter += 1;
            let waited = i64_to_f64(state.clicker_counter) * state.tick_length / 1_000.0;
            if waited < config.clicker_interval {
                return false;
            }
            state.clicker_counter = 0;
            if state.soldiers >= state.max_soldiers {
                return false;
            }
        }
    }

    let price = merc_price(config, state);
    if price > state.money || !policy_allows(config, state, price) {
        return false;
    }

    state.money -= price;
    state.soldiers += 1;
    if state.hell_soldiers < state.max_hell_soldiers {
        state.hell_soldiers += 1;
    }
    state.merc_counter += 1;
    stats.merc_costs += price;
    stats.mercs_hired += 1;
    stats.max_merc_price = stats.max_merc_price.max(price);
    true
}

/// Hire mercenaries until the policy refuses, then record the treasury low.
pub fn hire_mercs(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    while try_buy_merc(config, state, stats) {}
    stats.record_money(state.money);
}

/// The merc price counter cools down with `pop_factor` one-in-three rolls.
pub fn decay_merc_counter(config: &SimConfig, state: &mut TrialState) {
    for _ in 0..pop_factor(config) {
        if state.merc_counter <= 0 {
            break;
        }
        if state.rng.one_in(MERC_COOLDOWN_ODDS) {
            state.merc_counter -= 1;
        }
    }
}

fn repair_droid_scale(config: &SimConfig) -> f64 {
    REPAIR_DROID_FACTOR.powf(f64::from(config.repair_droids))
}

/// Record surveyor stats and rebuild one lost surveyor car when its repair
/// counter completes.
pub fn repair_surveyors(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    stats.record_surveyors(state.surveyors);
    if state.surveyors >= i64::from(config.surveyors) {
        return;
    }
    let mut ticks = SURVEYOR_REPAIR_TICKS * repair_droid_scale(config);
    ticks /= ranked(config.traits.high_pop, HIGH_POP_UPKEEP, 1.0);
    let ticks = round_f64_to_i64(ticks);

    state.surveyor_repair += 1;
    if state.surveyor_repair >= ticks {
        state.surveyor_repair = 0;
        state.surveyors += 1;
    }
}

/// Rebuild one wall point when the repair counter completes.
pub fn repair_walls(config: &SimConfig, state: &mut TrialState) {
    if state.walls >= 100 {
        return;
    }
    let ticks = round_f64_to_i64(WALL_REPAIR_TICKS * repair_droid_scale(config));
    state.wall_repair += 1;
    if state.wall_repair >= ticks {
        state.wall_repair = 0;
        state.walls += 1;
    }
}

/// Spirit vacuums charge the soul compactor; a full charge is a gem.
pub fn run_vacuums(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    if !config.soul_compactor || config.vacuums == 0 {
        return;
    }
    let mut drain = VACUUM_DRAIN * f64::from(config.vacuums);
    if config.suction_force && config.batteries > 0 {
        drain *= f64::from(config.batteries).mul_add(0.08, 1.0);
    }
    state.compactor_energy += round_f64_to_i64(drain / 2.0);
    if state.compactor_energy >= COMPACTOR_GEM_ENERGY {
        state.compactor_energy -= COMPACTOR_GEM_ENERGY;
        stats.compactor_gems += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::TraitRank;

    fn setup(config: &SimConfig) -> (TrialState, TrialStats) {
        (TrialState::new(config, 1, 17), TrialStats::seeded(config))
    }

    #[test]
    fn training_fills_missing_soldiers() {
        let config = SimConfig::default();
        let (mut state, mut stats) = setup(&config);
        state.soldiers -= 3;
        state.hell_soldiers -= 3;
        state.training_rate = 50.0;
        train_soldiers(&mut state, &mut stats);
        assert_eq!(stats.soldiers_trained, 0);
        train_soldiers(&mut state, &mut stats);
        assert_eq!(stats.soldiers_trained, 1);
        assert_eq!(state.soldiers, state.max_soldiers - 2);
        assert_eq!(state.hell_soldiers, state.max_hell_soldiers - 2);
        assert!(state.training_progress.abs() < f64::EPSILON);
    }

    #[test]
    fn training_stops_at_full_strength() {
        let config = SimConfig::default();
        let (mut state, mut stats) = setup(&config);
        state.training_rate = 500.0;
        train_soldiers(&mut state, &mut stats);
        assert_eq!(state.soldiers, state.max_soldiers);
        assert_eq!(stats.soldiers_trained, 0);
    }

    #[test]
    fn income_is_capped() {
        let config = SimConfig {
            money_cap: 10.0,
            money_income: 8.0,
            ..SimConfig::default()
        };
        let (mut state, _) = setup(&config);
        state.money = 0.0;
        collect_income(&config, &mut state);
        assert!((state.money - 2.0).abs() < 1e-9);
        state.money = 9.5;
        collect_income(&config, &mut state);
        assert!((state.money - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn heal_credits_stack() {
        let config = SimConfig {
            hospitals: 10,
            bac_tanks: true,
            fibroblast: 3,
            ..SimConfig::default()
        };
        assert!((heal_credits(&config) - 26.0).abs() < f64::EPSILON);
        let mut sporty = config.clone();
        sporty.governor = Governor::Sports;
        assert!((heal_credits(&sporty) - 39.0).abs() < f64::EPSILON);
        let mut artificial = config;
        artificial.artificial = true;
        artificial.boot_camps = 0;
        assert!((heal_credits(&artificial) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn healing_never_goes_negative() {
        let config = SimConfig {
            hospitals: 200,
            ..SimConfig::default()
        };
        let (mut state, _) = setup(&config);
        state.wounded = 3;
        heal_soldiers(&config, &mut state);
        assert_eq!(state.wounded, 0);
    }

    #[test]
    fn regenerative_heals_more_per_engagement() {
        let mut config = SimConfig {
            hospitals: 0,
            ..SimConfig::default()
        };
        config.traits.regenerative = Some(TraitRank::Four);
        let (mut state, _) = setup(&config);
        state.wounded = 20;
        heal_soldiers(&config, &mut state);
        assert_eq!(state.wounded, 13);
    }

    #[test]
    fn governor_hires_until_buffer() {
        let config = SimConfig {
            hire_mercs: MercMode::Governor,
            merc_buffer: 2,
            garrison: 0,
            money_cap: 1_000.0,
            ..SimConfig::default()
        };
        let (mut state, mut stats) = setup(&config);
        state.soldiers -= 10;
        state.hell_soldiers -= 10;
        hire_mercs(&config, &mut state, &mut stats);
        assert_eq!(stats.mercs_hired, 8);
        assert_eq!(state.soldiers, state.max_soldiers - 2);
        assert_eq!(state.merc_counter, 8);
        assert!(stats.min_money < config.money_cap);
        assert!(stats.max_merc_price > 0.0);
    }

    #[test]
    fn autoclicker_waits_for_its_interval() {
        let config = SimConfig {
            hire_mercs: MercMode::Autoclick,
            clicker_interval: 1.0,
            ..SimConfig::default()
        };
        let (mut state, mut stats) = setup(&config);
        state.soldiers -= 1;
        for _ in 0..3 {
            assert!(!try_buy_merc(&config, &mut state, &mut stats));
        }
        assert_eq!(state.clicker_counter, 3);
        assert!(try_buy_merc(&config, &mut state, &mut stats));
        assert_eq!(state.clicker_counter, 0);
        assert_eq!(state.soldiers, state.max_soldiers);
        assert_eq!(stats.mercs_hired, 1);
    }

    #[test]
    fn merc_counter_cools_down() {
        let config = SimConfig::default();
        let (mut state, _) = setup(&config);
        state.merc_counter = 5;
        for _ in 0..200 {
            decay_merc_counter(&config, &mut state);
        }
        assert_eq!(state.merc_counter, 0);
    }

    #[test]
    fn wall_repair_needs_two_hundred_ticks_without_droids() {
        let config = SimConfig {
            repair_droids: 0,
            ..SimConfig::default()
        };
        let (mut state, _) = setup(&config);
        state.walls = 99;
        for _ in 0..199 {
            repair_walls(&config, &mut state);
        }
        assert_eq!(state.walls, 99);
        repair_walls(&config, &mut state);
        assert_eq!(state.walls, 100);
        repair_walls(&config, &mut state);
        assert_eq!(state.wall_repair, 0);
    }

    #[test]
    fn surveyors_rebuild_and_record() {
        let config = SimConfig {
            surveyors: 2,
            repair_droids: 0,
            ..SimConfig::default()
        };
        let (mut state, mut stats) = setup(&config);
        state.surveyors = 1;
        for _ in 0..180 {
            repair_surveyors(&config, &mut state, &mut stats);
        }
        assert_eq!(state.surveyors, 2);
        assert_eq!(stats.min_surveyors, 1);
        assert_eq!(stats.total_surveyors, 180);
    }

    #[test]
    fn vacuums_charge_compactor() {
        let config = SimConfig {
            soul_compactor: true,
            vacuums: 1_000,
            ..SimConfig::default()
        };
        let (mut state, mut stats) = setup(&config);
        // 826_719_500 energy per tick
        run_vacuums(&config, &mut state, &mut stats);
        assert_eq!(stats.compactor_gems, 0);
        run_vacuums(&config, &mut state, &mut stats);
        assert_eq!(stats.compactor_gems, 1);
        assert_eq!(state.compactor_energy, 653_439_000);
    }
}
