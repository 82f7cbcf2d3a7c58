//! Combat ratings and derived per-trial rates.
//!
//! Every function here is pure: it reads the configuration and, when a trial
//! is running, a snapshot of its state. Without a state the ratings describe
//! the configured army at full health, which is what the info query reports.
use crate::config::{Astrology, Biome, Government, Governor, SimConfig, Universe};
use crate::constants::{BASE_TICK_LENGTH_MS, FORGE_RATING_REQUIREMENT, MERC_PRICE_CAP};
use crate::modifiers::{TraitRank, astro_mod, droid_size, fathom, pop_factor, ranked};
use crate::numbers::{ceil_f64_to_i64, count_to_i64, i64_to_f64, round_f64_to_i64};
use crate::state::TrialState;
use crate::weather::Sky;

const FORGE_SEARCH_LIMIT: i64 = 100_000;

fn scale(rank: Option<TraitRank>, table: [f64; 7]) -> f64 {
    ranked(rank, table, 1.0)
}

fn thrall_bonus(config: &SimConfig, captives: u32, weight: f64) -> f64 {
    if captives == 0 {
        1.0
    } else {
        weight.mul_add(fathom(&config.thralls, captives), 1.0)
    }
}

fn soldier_governor_bonus(config: &SimConfig) -> f64 {
    if config.bureaucratic_efficiency { 1.3 } else { 1.25 }
}

/// Effective weapon tech after sniper and centaur scaling. The base level
/// and the cyborg upgrade (tech 10+) are not scaled.
fn effective_weapon_tech(config: &SimConfig) -> f64 {
    let tech = f64::from(config.weapon_tech);
    if config.weapon_tech <= 1 {
        return tech;
    }
    let unscaled = if config.weapon_tech >= 10 { 2.0 } else { 1.0 };
    let mut scaled = tech - unscaled;
    if let Some(rank) = config.traits.sniper {
        scaled *= scaled.mul_add(rank.select([0.03, 0.04, 0.06, 0.08, 0.09, 0.1, 0.11]), 1.0);
    }
    if config.thralls.centaur > 0 {
        scaled *= (scaled * 0.08).mul_add(fathom(&config.thralls, config.thralls.centaur), 1.0);
    }
    scaled + unscaled
}

fn tusk_moisture(config: &SimConfig, state: Option<&TrialState>) -> f64 {
    let mut moisture = match config.biome {
        Biome::Oceanic | Biome::Swamp => 30.0,
        Biome::Eden | Biome::Forest | Biome::Grassland | Biome::Savanna => 20.0,
        Biome::Tundra | Biome::Taiga => 10.0,
        _ => 0.0,
    };
    if let Some(state) = state
        && state.weather == Sky::Rain
        && state.temperature > 0
    {
        moisture += 10.0;
    }
    moisture
}

fn evil_universe_factor(config: &SimConfig) -> f64 {
    if config.authority > 100.0 {
        let mut boost = (config.authority - 100.0) / config.authority * 0.75;
        boost *= 1.0 + ((10.0 + config.dark_energy).log2() - std::f64::consts::LOG2_10) / 10.0;
        1.0 + boost
    } else {
        config.authority / 100.0
    }
}

/// Combat rating of `size` soldiers.
///
/// `wounded` overrides the number of wounded in the group; otherwise, with a
/// running trial, soldiers beyond the healthy pool count as wounded.
#[must_use]
pub fn army_rating(
    config: &SimConfig,
    state: Option<&TrialState>,
    size: i64,
    wounded: Option<i64>,
) -> f64 {
    let traits = &config.traits;
    let thralls = &config.thralls;
    let size_f = i64_to_f64(size);
    let mut rating = size_f;

    let wounded = wounded.unwrap_or_else(|| {
        state.map_or(0, |state| {
            let healthy = state.soldiers - state.wounded;
            (size - healthy).max(0)
        })
    });
    let wounded_f = i64_to_f64(wounded);

    let rhinotaurs = thralls.unfathomable && thralls.rhinotaur > 0;
    if traits.rhino_rage.is_some() || rhinotaurs {
        if let Some(rank) = traits.rhino_rage {
            rating += wounded_f * rank.select([0.1, 0.2, 0.3, 0.5, 0.6, 0.65, 0.7]);
        }
        if thralls.rhinotaur > 0 {
            rating += wounded_f * 0.5 * fathom(thralls, thralls.rhinotaur);
        }
    } else {
        rating -= wounded_f / 2.0;
    }

    rating *= effective_weapon_tech(config);
    rating *= f64::from(config.tactical).mul_add(0.05, 1.0);
    if config.zealotry {
        rating *= f64::from(config.temples).mul_add(0.01, 1.0);
    }
    if let Some(state) = state {
        let current_wounded = i64_to_f64(state.wounded);
        if let Some(rank) = traits.rhino_rage {
            let rage: f64 = rank.select([0.002, 0.0025, 0.005, 0.01, 0.0125, 0.014, 0.015]);
            rating *= rage.mul_add(current_wounded, 1.0);
        }
        if thralls.rhinotaur > 0 {
            rating *= (0.01 * fathom(thralls, thralls.rhinotaur)).mul_add(current_wounded, 1.0);
        }
    }
    rating *= scale(traits.puny, [0.8, 0.82, 0.85, 0.9, 0.94, 0.96, 0.97]);
    rating *= scale(traits.claws, [1.05, 1.08, 1.12, 1.25, 1.32, 1.35, 1.38]);
    rating *= thrall_bonus(config, thralls.scorpid, 0.25);
    rating *= scale(traits.chameleon, [1.03, 1.05, 1.1, 1.2, 1.25, 1.3, 1.35]);
    if let Some(state) = state
        && state.weather == Sky::Rain
    {
        rating *= scale(traits.cautious, [0.84, 0.86, 0.88, 0.9, 0.92, 0.94, 0.96]);
    }
    rating *= scale(traits.apex_predator, [1.1, 1.15, 1.2, 1.3, 1.4, 1.45, 1.5]);
    rating *= thrall_bonus(config, thralls.sharkin, 0.3);
    rating *= scale(traits.swift, [1.2, 1.35, 1.55, 1.75, 1.85, 1.9, 1.92]);
    rating *= scale(traits.fiery, [1.2, 1.3, 1.4, 1.65, 1.7, 1.72, 1.74]);
    rating *= thrall_bonus(config, thralls.balorg, 0.65);
    rating *= scale(traits.sticky, [1.03, 1.05, 1.08, 1.15, 1.18, 1.2, 1.22]);
    rating *= thrall_bonus(config, thralls.pinguicula, 0.15);
    rating *= scale(traits.pathetic, [0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.88]);
    rating *= scale(traits.holy, [1.2, 1.25, 1.3, 1.5, 1.6, 1.65, 1.7]);
    rating *= thrall_bonus(config, thralls.unicorn, 0.5);
    if traits.banana {
        rating *= 0.8;
    }
    if config.astrology == Astrology::Aries {
        let bonus = if config.astro_wish { 12.0 } else { 10.0 };
        rating *= 1.0 + i64_to_f64(round_f64_to_i64(bonus * astro_mod(config))) / 100.0;
    }
    if config.governor == Governor::Soldier {
        rating *= soldier_governor_bonus(config);
    }
    if traits.rage {
        rating *= 1.05;
    }
    rating *= scale(traits.elemental, [1.01, 1.02, 1.04, 1.06, 1.08, 1.1, 1.2]);
    if let Some(rank) = traits.tusk {
        let moisture = tusk_moisture(config, state);
        let weight = rank.select([0.4, 0.5, 0.75, 1.0, 1.2, 1.4, 1.6]);
        rating *= 1.0 + i64_to_f64(round_f64_to_i64(moisture * weight)) / 100.0 / 2.0;
    }
    rating *= scale(traits.grenadier, [2.0, 2.1, 2.25, 2.5, 2.75, 3.0, 3.25]);
    if config.rejuvenated {
        rating *= 1.05;
    }
    if config.government == Government::Autocracy {
        let bureaucrat = config.governor == Governor::Bureaucrat;
        let mut bonus = if bureaucrat { 40.0 } else { 35.0 };
        if config.bureaucratic_efficiency {
            bonus += if bureaucrat { 10.0 } else { 5.0 };
        }
        rating *= 1.0 + bonus / 100.0;
    }
    if config.universe == Universe::Evil {
        rating *= evil_universe_factor(config);
    }

    rating = rating.floor();
    rating *= racial_modifier(config, size, size_f);

    if traits.parasite.is_some() {
        match size {
            1 => rating += 2.0,
            s if s > 1 => rating += 4.0,
            _ => {}
        }
    }

    if rating <= 0.0 && size > 0 {
        rating = 0.01;
    }
    rating
}

fn racial_modifier(config: &SimConfig, size: i64, size_f: f64) -> f64 {
    let traits = &config.traits;
    let thralls = &config.thralls;
    let mut modifier = 1.0;
    if let Some(rank) = traits.hivemind {
        let breakpoint = rank.select([13, 12, 11, 10, 8, 7, 6]);
        let breakpoint_f = i64_to_f64(breakpoint);
        if size <= breakpoint {
            modifier *= size_f.mul_add(0.05, 1.0 - breakpoint_f * 0.05);
        } else {
            modifier *= 1.0 + (1.0 - 0.99_f64.powf(size_f - breakpoint_f));
        }
    }
    if thralls.antid > 0 {
        let exponent = size_f * fathom(thralls, thralls.antid) / 4.0;
        modifier *= 1.0 + (1.0 - 0.99_f64.powf(exponent)) / 2.0;
    }
    modifier *= scale(traits.cannibal, [1.06, 1.08, 1.1, 1.15, 1.2, 1.22, 1.24]);
    modifier *= thrall_bonus(config, thralls.mantis, 0.15);
    modifier *= scale(traits.ooze, [0.75, 0.8, 0.85, 0.88, 0.9, 0.92, 0.94]);
    if config.government == Government::Democracy {
        let malus = if config.governor == Governor::Bureaucrat { 1.0 } else { 5.0 };
        modifier *= 1.0 - malus / 100.0;
    }
    if config.universe == Universe::Magic {
        modifier *= 0.75;
        if config.witch_hunter {
            modifier *= 0.75;
        }
        if config.war_ritual > 0.0 {
            let mut boost = config.war_ritual / (config.war_ritual + 75.0);
            if config.witch_hunter {
                boost *= 2.5;
            }
            modifier *= 1.0 + boost;
        }
    }
    modifier *= scale(traits.high_pop, [0.5, 0.5, 0.34, 0.26, 0.212, 0.18, 0.158]);
    modifier
}

/// Rating per turret for the researched turret tech.
#[must_use]
pub const fn turret_rating(turret_tech: u8) -> f64 {
    match turret_tech {
        0 => 35.0,
        1 => 50.0,
        _ => 70.0,
    }
}

/// Rating of the fortress: defenders not staffing the forge, droids without
/// a patrol, and turrets.
#[must_use]
pub fn fortress_rating(config: &SimConfig, state: Option<&TrialState>) -> f64 {
    let (patrols, mut defenders, wounded) = match state {
        Some(state) => {
            let patrols = state.patrols;
            let mut defenders = state.defenders(config);
            if config.soul_forge.is_built() && defenders >= state.forge_crew {
                defenders -= state.forge_crew;
            }
            let garrison = state.garrison();
            let wounded = (state.wounded - garrison).clamp(0, defenders.max(0));
            (patrols, defenders, wounded)
        }
        None => (
            count_to_i64(config.patrols),
            count_to_i64(config.defenders),
            0,
        ),
    };

    let droids = count_to_i64(config.droids);
    if droids > patrols {
        defenders += (droids - patrols) * i64::from(droid_size(config));
    }

    army_rating(config, state, defenders, Some(wounded))
        + f64::from(config.turrets) * turret_rating(config.turret_tech)
}

/// Soldiers needed at the fortress for the soul forge to run.
#[must_use]
pub fn forge_soldiers(config: &SimConfig) -> i64 {
    let pop = f64::from(pop_factor(config));
    let mut rating = army_rating(config, None, 1, None).max(pop);
    let mut soldiers = ceil_f64_to_i64(FORGE_RATING_REQUIREMENT / rating);

    let gun_factor = if config.advanced_guns { 2 } else { 1 };
    let gun_savings = i64::from(config.guns) * i64::from(pop_factor(config)) * gun_factor;
    soldiers = (soldiers - gun_savings).max(0);

    if config.traits.hivemind.is_some() && soldiers > 0 {
        soldiers = 1;
        while i64_to_f64(soldiers + gun_savings) * rating < FORGE_RATING_REQUIREMENT
            && soldiers < FORGE_SEARCH_LIMIT
        {
            soldiers += 1;
            rating = army_rating(config, None, soldiers, None).max(pop) / i64_to_f64(soldiers);
        }
    }
    soldiers
}

/// Per-camp training bonus, before the boot camp count is applied.
fn training_bonus(config: &SimConfig, base: f64) -> f64 {
    let mut value = f64::from(config.blood_lust).mul_add(0.002, base);
    if config.governor == Governor::Soldier {
        value *= soldier_governor_bonus(config);
    }
    value
}

/// Training progress, in percent of a soldier, gained per tick.
#[must_use]
pub fn training_rate(config: &SimConfig) -> f64 {
    let traits = &config.traits;
    let mut rate = 2.5;
    rate *= scale(traits.high_pop, [1.2, 1.5, 2.5, 3.5, 4.5, 5.5, 6.5]);
    rate /= scale(traits.diverse, [1.4, 1.35, 1.3, 1.25, 1.2, 1.15, 1.12]);
    if config.boot_camps > 0 {
        let base = if config.vr_training { 0.08 } else { 0.05 };
        rate *= f64::from(config.boot_camps).mul_add(training_bonus(config, base), 1.0);
    }
    if config.bunkers > 0 && config.spectral_training {
        rate *= f64::from(config.bunkers).mul_add(training_bonus(config, 0.1), 1.0);
    }
    rate *= scale(traits.beast, [1.03, 1.04, 1.05, 1.1, 1.15, 1.2, 1.25]);
    rate += ranked(traits.brute, [1.0, 1.25, 1.5, 2.5, 3.0, 3.5, 3.75], 0.0);
    if config.thralls.orc > 0 {
        rate += 2.5 * fathom(&config.thralls, config.thralls.orc);
    }
    rate * 0.25
}

/// Milliseconds of game time per tick.
#[must_use]
pub fn tick_length(config: &SimConfig) -> f64 {
    let traits = &config.traits;
    BASE_TICK_LENGTH_MS
        * scale(traits.hyper, [0.99, 0.98, 0.97, 0.95, 0.94, 0.93, 0.92])
        * scale(traits.slow, [1.14, 1.13, 1.12, 1.1, 1.08, 1.06, 1.05])
}

/// Price of the next mercenary, in millions.
#[must_use]
pub fn merc_price(config: &SimConfig, state: &TrialState) -> f64 {
    let traits = &config.traits;
    let garrison = i64_to_f64(state.garrison());
    let mut price = (i64_to_f64(round_f64_to_i64(1.24_f64.powf(garrison) * 75.0)) - 50.0)
        .min(MERC_PRICE_CAP);
    if state.merc_counter > 0 {
        price *= 1.1_f64.powf(i64_to_f64(state.merc_counter));
    }
    price *= scale(traits.brute, [0.85, 0.8, 0.75, 0.5, 0.4, 0.35, 0.3]);
    if config.thralls.orc > 0 {
        price *= 0.5 * fathom(&config.thralls, config.thralls.orc);
    }
    price *= scale(traits.high_pop, [0.5, 0.5, 0.34, 0.26, 0.212, 0.18, 0.158]);
    price / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> SimConfig {
        SimConfig {
            weapon_tech: 1,
            tactical: 0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn bare_army_rates_one_per_soldier() {
        let config = plain();
        assert!((army_rating(&config, None, 10, None) - 10.0).abs() < f64::EPSILON);
        assert!((army_rating(&config, None, 10, Some(4)) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_army_rates_zero_and_tiny_armies_floor_at_a_hundredth() {
        let config = plain();
        assert!(army_rating(&config, None, 0, None).abs() < f64::EPSILON);
        assert!((army_rating(&config, None, 1, Some(4)) - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn weapon_and_tactics_multiply() {
        let config = SimConfig {
            weapon_tech: 5,
            tactical: 4,
            ..SimConfig::default()
        };
        // 10 * 5 * 1.2
        assert!((army_rating(&config, None, 10, None) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn rain_slows_cautious_species() {
        let mut config = plain();
        config.traits.cautious = Some(TraitRank::One);
        let mut state = TrialState::new(&config, 1, 5);
        state.weather = Sky::Clear;
        let dry = army_rating(&config, Some(&state), 10, Some(0));
        state.weather = Sky::Rain;
        let wet = army_rating(&config, Some(&state), 10, Some(0));
        assert!((dry - 10.0).abs() < 1e-9);
        assert!((wet - 9.0).abs() < 1e-9);
    }

    #[test]
    fn rhino_rage_feeds_on_the_wounded() {
        let mut config = plain();
        config.traits.rhino_rage = Some(TraitRank::One);
        let mut state = TrialState::new(&config, 1, 5);
        state.wounded = 0;
        let calm = army_rating(&config, Some(&state), 10, Some(0));
        state.wounded = 50;
        let enraged = army_rating(&config, Some(&state), 10, Some(0));
        assert!((calm - 10.0).abs() < 1e-9);
        assert!((enraged - 15.0).abs() < 1e-9);
    }

    #[test]
    fn fortress_counts_turrets_and_spare_droids() {
        let config = SimConfig {
            weapon_tech: 1,
            tactical: 0,
            patrols: 2,
            droids: 5,
            defenders: 10,
            turrets: 3,
            turret_tech: 1,
            ..SimConfig::default()
        };
        // 10 defenders + 3 idle droids, plus 3 turrets at 50
        assert!((fortress_rating(&config, None) - 163.0).abs() < 1e-9);
    }

    #[test]
    fn forge_needs_fewer_soldiers_with_guns() {
        let config = SimConfig {
            guns: 0,
            ..plain()
        };
        assert_eq!(forge_soldiers(&config), 650);
        let config = SimConfig { guns: 50, ..config };
        assert_eq!(forge_soldiers(&config), 600);
        let config = SimConfig {
            guns: 700,
            ..config
        };
        assert_eq!(forge_soldiers(&config), 0);
    }

    #[test]
    fn tick_length_follows_speed_traits() {
        let mut config = SimConfig::default();
        assert!((tick_length(&config) - 250.0).abs() < f64::EPSILON);
        config.traits.hyper = Some(TraitRank::One);
        assert!((tick_length(&config) - 237.5).abs() < 1e-9);
    }

    #[test]
    fn training_rate_without_camps() {
        let config = SimConfig {
            boot_camps: 0,
            ..SimConfig::default()
        };
        assert!((training_rate(&config) - 0.625).abs() < 1e-9);
    }

    #[test]
    fn merc_price_grows_with_garrison() {
        let config = SimConfig::default();
        let mut state = TrialState::new(&config, 1, 1);
        let base = merc_price(&config, &state);
        state.merc_counter = 2;
        let cooled = merc_price(&config, &state);
        assert!(cooled > base);
        assert!((cooled / base - 1.21).abs() < 1e-9);
    }
}
