//! Blood war resolution: one engagement between the army and the demons.
//!
//! An engagement runs in a fixed order: statistics, drone strikes, patrol
//! fights, revival and front-line settlement, siege, demon influx, surveyor
//! losses and finds, pity, and finally the soul forge generators.
use crate::config::{Governor, SimConfig, Universe};
use crate::constants::{
    ADVANCED_DRONE_KILLS, BASE_AMBUSH_ODDS, BEACON_GEM_FACTOR, DEMONS_MAX_DIVISOR,
    DEMONS_MIN_DIVISOR, DRONE_KILLS, FORGE_GEM_ODDS, FORGE_SOUL_CAP, FORGE_SOUL_CAP_ABSORPTION,
    GATE_GEM_ODDS, GEM_ODDS, GEM_ODDS_FLOOR, GEM_ODDS_TECHNOPHOBE, GUN_GEM_ODDS,
    HEATSINK_DIVISOR, INFLUX_BEACON_BONUS, INFLUX_STEP, INFLUX_THREAT_CEILING,
    INITIAL_SIEGE_ODDS, PITY_CAP, SHIELD_GENERATOR_DIVISOR_BONUS, SIEGE_DEFENSE_DIVISOR,
    SIEGE_THRESHOLD, SURVEYOR_DANGER_DIVISOR,
};
use crate::modifiers::{droid_size, fathom, pop_factor, ranked};
use crate::numbers::{count_to_i64, floor_f64_to_i64, i64_to_f64, ratio, round_f64_to_i64};
use crate::ratings::{army_rating, fortress_rating};
use crate::state::TrialState;
use crate::stats::TrialStats;

/// Scratch values that live for a single engagement.
#[derive(Debug, Clone, Default)]
struct Skirmish {
    forge_operating: bool,
    forge_souls: i64,
    drone_kills: i64,
    soldiers_killed: i64,
    found_gem: bool,
    gem_odds: i64,
}

impl Skirmish {
    fn harvest(&mut self, souls: i64) {
        if self.forge_operating {
            self.forge_souls += souls;
        }
    }
}

/// Pick between the standard and the technophobe-tier value of a pair.
const fn technophobe_pick(config: &SimConfig, pair: (i64, i64)) -> i64 {
    if config.technophobe >= 5 { pair.1 } else { pair.0 }
}

/// Demons a patrol or drone runs into at the current threat.
fn demon_group(state: &mut TrialState) -> i64 {
    let min = state.threat / DEMONS_MIN_DIVISOR;
    let max = state.threat / DEMONS_MAX_DIVISOR;
    state.rng.draw(min, max)
}

/// Odds (one in N) of finding a soul gem per chance this engagement.
#[must_use]
pub fn gem_odds(config: &SimConfig, pity: i64) -> i64 {
    let mut odds = i64_to_f64(technophobe_pick(config, (GEM_ODDS, GEM_ODDS_TECHNOPHOBE)) - pity);
    odds = i64_to_f64(round_f64_to_i64(
        odds * BEACON_GEM_FACTOR.powf(f64::from(config.beacons)),
    ));
    if let Some(rank) = config.traits.ghostly {
        let factor = rank.select([0.98, 0.95, 0.9, 0.85, 0.8, 0.78, 0.77]);
        odds = i64_to_f64(round_f64_to_i64(odds * factor));
    }
    let thralls = &config.thralls;
    if thralls.wendigo > 0 {
        let factor = 0.01 * 10.0_f64.mul_add(-fathom(thralls, thralls.wendigo), 100.0);
        odds = i64_to_f64(round_f64_to_i64(odds * factor));
    }
    round_f64_to_i64(odds).max(GEM_ODDS_FLOOR)
}

/// Odds (one in N) that an encounter turns into an ambush.
#[must_use]
pub fn ambush_odds(config: &SimConfig) -> i64 {
    let traits = &config.traits;
    let stealth = [5, 10, 15, 20, 25, 30, 35];
    let evasion = ranked(traits.elusive, stealth, 0).max(ranked(traits.chameleon, stealth, 0));
    let cowardice = ranked(traits.chicken, [22, 20, 15, 10, 8, 6, 4], 0);
    BASE_AMBUSH_ODDS + evasion - cowardice
}

/// Resolve one engagement.
pub fn blood_war(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    stats.blood_wars += 1;
    stats.record_pre_fight_threat(state.threat);
    stats.record_wounded(state.wounded);
    stats.record_pity(state.pity);
    if config.log.verbose {
        stats.append_log(&format!(
            "{} - T {} ; soldiers {} ; hell soldiers {} ; threat {}",
            state.time_str(),
            state.tick,
            state.soldiers,
            state.hell_soldiers,
            state.threat
        ));
    }

    let mut skirmish = Skirmish {
        forge_operating: config.soul_forge.is_built() && state.defenders(config) >= state.forge_crew,
        ..Skirmish::default()
    };
    if skirmish.forge_operating {
        stats.forge_on += 1;
    }

    drone_strikes(config, state, stats, &mut skirmish);
    skirmish.gem_odds = gem_odds(config, state.pity);
    patrol_fights(config, state, stats, &mut skirmish);
    revive(config, state, stats, &skirmish);
    settle_front_line(config, state, stats);

    stats.record_post_fight_threat(state.threat);
    log::trace!(
        "trial {} tick {}: threat {}, dead {}, gem odds {}",
        state.trial_id,
        state.tick,
        state.threat,
        skirmish.soldiers_killed,
        skirmish.gem_odds
    );
    if config.log.verbose {
        stats.append_log(&format!(
            " ; post threat {} ; dead {} ; gem odds {}\n",
            state.threat, skirmish.soldiers_killed, skirmish.gem_odds
        ));
    }

    if config.sieges {
        siege(config, state, stats, &mut skirmish);
    }
    stats.record_walls(state.walls);

    demon_influx(config, state);
    surveyor_losses(config, state);
    surveyor_finds(config, state, stats, &mut skirmish);

    if !skirmish.found_gem && state.pity < PITY_CAP {
        state.pity += 1;
    }

    if skirmish.forge_operating {
        soul_generators(config, state, stats, &mut skirmish);
        soul_forge(config, state, stats, &mut skirmish);
    }
}

fn drone_strikes(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
    skirmish: &mut Skirmish,
) {
    let (low, high) = if config.advanced_drones {
        ADVANCED_DRONE_KILLS
    } else {
        DRONE_KILLS
    };
    for _ in 0..config.predators {
        if !state.rng.encounter(state.threat) {
            continue;
        }
        let demons = demon_group(state);
        let kills = state.rng.draw(low, high).min(demons);
        state.threat -= kills;
        skirmish.harvest(kills);
        skirmish.drone_kills += kills;
        stats.kills += kills;
        stats.drone_kills += kills;
    }
}

fn patrol_fights(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
    skirmish: &mut Skirmish,
) {
    let patrol_size = count_to_i64(config.patrol_size);
    let droid_slots = i64::from(droid_size(config));
    let traits = &config.traits;
    if traits.cautious.is_some() || traits.tusk.is_some() {
        state.patrol_rating = army_rating(config, Some(&*state), patrol_size, None);
        state.patrol_rating_droids =
            army_rating(config, Some(&*state), patrol_size + droid_slots, None);
    }

    let (per_patrol_wounds, extra_wounds) = if state.wounded > 0 && state.patrols > 0 {
        let spread = state.wounded - state.garrison() - state.defenders(config);
        if spread > 0 {
            (spread / state.patrols, spread % state.patrols)
        } else {
            (0, 0)
        }
    } else {
        (0, 0)
    };

    let ambush_odds = ambush_odds(config);
    let mut droids = count_to_i64(config.droids);
    for patrol in 0..state.patrols {
        let wounded = per_patrol_wounds + i64::from(patrol < extra_wounds);
        if !state.rng.encounter(state.threat) {
            stats.skipped_encounters += 1;
            continue;
        }
        stats.patrol_encounters += 1;

        let has_droid = droids > 0;
        if has_droid {
            droids -= 1;
        }
        let rating = if wounded == 0 {
            if has_droid {
                state.patrol_rating_droids
            } else {
                state.patrol_rating
            }
        } else {
            let size = patrol_size + if has_droid { droid_slots } else { 0 };
            army_rating(config, Some(&*state), size, Some(wounded))
        };

        let demons = demon_group(state);
        if state.rng.one_in(ambush_odds) {
            stats.ambushes += 1;
            skirmish.soldiers_killed += patrol_casualties(config, state, stats, demons, true);
            let kills = round_f64_to_i64(rating / 2.0).min(demons);
            state.threat -= kills;
            skirmish.harvest(kills);
            stats.kills += kills;
        } else {
            let mut kills = floor_f64_to_i64(rating);
            if kills < demons {
                skirmish.soldiers_killed +=
                    patrol_casualties(config, state, stats, demons - kills, false);
            } else {
                kills = demons;
            }
            state.threat -= kills;
            skirmish.harvest(kills);
            stats.patrol_kills += kills;
            stats.kills += kills;

            if kills > 0 {
                let per_chance = (35 - i64::from(config.beacons / 3)).max(5);
                let chances = round_f64_to_i64(ratio(i64_to_f64(kills), i64_to_f64(per_chance)));
                roll_gems(state, stats, skirmish, chances, GemSource::Patrol);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GemSource {
    Patrol,
    Surveyor,
}

fn roll_gems(
    state: &mut TrialState,
    stats: &mut TrialStats,
    skirmish: &mut Skirmish,
    chances: i64,
    source: GemSource,
) {
    for _ in 0..chances {
        if state.rng.one_in(skirmish.gem_odds) {
            match source {
                GemSource::Patrol => stats.patrol_gems += 1,
                GemSource::Surveyor => stats.surveyor_gems += 1,
            }
            stats.total_pity_per_gem += state.pity;
            state.pity = 0;
            skirmish.found_gem = true;
        }
    }
}

/// Patrol armor for a normal encounter.
#[must_use]
pub fn patrol_armor(config: &SimConfig) -> i64 {
    let traits = &config.traits;
    let mut armor = if traits.apex_predator.is_some() {
        0
    } else {
        i64::from(config.armor_tech)
    };
    armor += ranked(traits.armored, [0, 1, 1, 2, 2, 2, 2], 0);
    if config.thralls.tortosian > 0 {
        armor += floor_f64_to_i64(2.0 * fathom(&config.thralls, config.thralls.tortosian));
    }
    armor += ranked(traits.scales, [0, 1, 1, 1, 1, 2, 2], 0);
    armor
}

/// Apply casualties of a patrol facing `demons` it could not kill. Returns
/// the number of dead.
fn patrol_casualties(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
    demons: i64,
    ambush: bool,
) -> i64 {
    let patrol_size = count_to_i64(config.patrol_size);
    let (armor, demons) = if ambush {
        let fury = state.rng.unit().mul_add(3.0, 1.0);
        (0, round_f64_to_i64(i64_to_f64(demons) * fury))
    } else {
        (patrol_armor(config), demons)
    };

    let pressure = ratio(i64_to_f64(demons), i64_to_f64(patrol_size)) / i64_to_f64(armor.max(1));
    let mut casualties = if pressure > 0.0 {
        round_f64_to_i64(pressure.log2())
    } else {
        0
    };
    casualties = casualties.saturating_sub(state.rng.draw(0, armor));
    if casualties <= 0 {
        return 0;
    }

    casualties = casualties.min(patrol_size);
    let casualties = state.rng.draw(i64::from(ambush), casualties + 1);
    let mut dead = state.rng.draw(0, casualties + 1);
    let mut wounded = casualties - dead;
    if let Some(rank) = config.traits.instincts {
        let share = rank.select([0.1, 0.15, 0.25, 0.5, 0.6, 0.65, 0.7]);
        let spared = floor_f64_to_i64(i64_to_f64(dead) * share);
        dead -= spared;
        wounded += spared;
    }
    state.wounded += wounded;
    state.soldiers -= dead;
    stats.soldiers_killed += dead;
    if ambush {
        stats.ambush_deaths += dead;
    }
    dead
}

/// Revival draws against a non-integer bound, so the top value is rarely
/// reached.
fn revive(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats, skirmish: &Skirmish) {
    let Some(rank) = config.traits.revive else {
        return;
    };
    let divisor = rank.select([4.0, 4.0, 4.0, 3.0, 2.0, 2.0, 2.0]);
    let bound = i64_to_f64(skirmish.soldiers_killed) / divisor + 0.25;
    let revived = state.rng.draw_frac(0, bound);
    state.soldiers += revived;
    stats.soldiers_revived += revived;
}

/// Clamp wounded and front line to the surviving army and drop patrols that
/// can no longer be staffed. Patrol losses are permanent.
fn settle_front_line(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    state.wounded = state.wounded.min(state.soldiers);
    state.hell_soldiers = state.hell_soldiers.min(state.soldiers);

    if state.hell_soldiers < state.patrol_strength(config) {
        state.patrols = state.hell_soldiers / count_to_i64(config.patrol_size).max(1);
        if config.log.lost_patrols {
            stats.append_log(&format!(
                "{} - Lost patrol. {} remaining.  Threat: {}\n",
                state.time_str(),
                state.patrols,
                state.threat
            ));
        }
        if state.patrols == 0 {
            stats.append_log(&format!("!!! Lost all patrols at {} !!!\n\n", state.time_str()));
        }
    }
    stats.record_reserves(state.reserves(config));
}

fn siege(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats, skirmish: &mut Skirmish) {
    state.siege_odds -= 1;
    if state.siege_odds > SIEGE_THRESHOLD || !state.rng.one_in(state.siege_odds) {
        return;
    }
    stats.sieges += 1;

    let mut demons = round_f64_to_i64(i64_to_f64(state.threat) / 2.0);
    let rating = fortress_rating(config, Some(&*state));
    if config.log.sieges {
        stats.append_log(&format!(
            "{} - Siege -- Demons {demons},  Fortress rating {rating:.0}",
            state.time_str()
        ));
    }
    let defense = (rating / SIEGE_DEFENSE_DIVISOR).max(1.0);

    let mut total_kills = 0;
    while demons > 0 && state.walls > 0 {
        // The whole roll leaves the threat pool, even past the last demon.
        let roll = state.rng.draw_frac(1, defense + 1.0);
        let kills = roll.min(demons);
        total_kills += kills;
        demons -= kills;
        state.threat -= roll.min(state.threat);
        if demons > 0 {
            state.walls -= 1;
        }
    }
    skirmish.harvest(total_kills);
    stats.kills += total_kills;
    if config.log.sieges {
        stats.append_log(&format!(",  Walls {}\n", state.walls));
    }

    if state.walls == 0 {
        state.soldiers -= state.hell_soldiers;
        state.wounded = state.wounded.min(state.soldiers);
        state.patrols = 0;
        state.hell_soldiers = 0;
        state.max_hell_soldiers = 0;
        stats.append_log(&format!("!!! Walls fell at {} !!!\n\n", state.time_str()));
    }
    state.siege_odds = INITIAL_SIEGE_ODDS;
}

/// New demons arriving when the threat runs low.
fn demon_influx(config: &SimConfig, state: &mut TrialState) {
    if state.threat >= INFLUX_THREAT_CEILING {
        return;
    }
    let mut influx = i64_to_f64(INFLUX_THREAT_CEILING - state.threat) / INFLUX_STEP + 1.0;
    influx *= f64::from(config.beacons).mul_add(INFLUX_BEACON_BONUS, 1.0);
    influx *= ranked(config.traits.chicken, [2.1, 2.0, 1.75, 1.5, 1.4, 1.3, 1.2], 1.0);
    if config.universe == Universe::Evil {
        influx *= 1.1;
    }
    let influx = round_f64_to_i64(influx);
    state.threat += state.rng.draw(influx * 10, influx * 50);
}

fn surveyor_losses(config: &SimConfig, state: &mut TrialState) {
    if state.surveyors <= 0 {
        return;
    }
    let traits = &config.traits;
    let mut divisor = SURVEYOR_DANGER_DIVISOR;
    if config.governor == Governor::Sports {
        divisor *= if config.bureaucratic_efficiency { 1.2 } else { 1.1 };
    }
    divisor *= ranked(traits.blurry, [1.05, 1.1, 1.15, 1.25, 1.35, 1.4, 1.45], 1.0);
    if config.thralls.yeti > 0 {
        divisor *= 0.25_f64.mul_add(fathom(&config.thralls, config.thralls.yeti), 1.0);
    }
    divisor *= ranked(traits.instincts, [1.02, 1.03, 1.05, 1.1, 1.15, 1.2, 1.25], 1.0);
    if config.shield_generator {
        divisor += SHIELD_GENERATOR_DIVISOR_BONUS;
    }

    let pop = i64::from(pop_factor(config));
    let danger = i64_to_f64(pop) * (i64_to_f64(state.threat) / divisor);
    let max_risk = pop * 10;
    let exposure = max_risk.min(state.surveyors);
    let risk = max_risk - state.rng.draw(0, exposure + 1);
    if danger > i64_to_f64(risk) {
        let cap = round_f64_to_i64(danger);
        let dead = state.rng.draw(0, cap + 1);
        state.surveyors -= dead.min(state.surveyors);
    }
}

/// Surveyors search the remains of drone kills for soul gems.
fn surveyor_finds(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
    skirmish: &mut Skirmish,
) {
    if state.surveyors <= 0 || skirmish.drone_kills <= 0 {
        return;
    }
    let share = i64_to_f64(skirmish.drone_kills) / i64_to_f64(state.surveyors);
    let low = round_f64_to_i64(share / 2.0);
    let high = round_f64_to_i64(share);
    let per_chance = (25 - i64::from(config.beacons / 5)).max(5);
    for _ in 0..state.surveyors {
        let searched = state.rng.draw(low, high).min(100);
        let chances = round_f64_to_i64(ratio(i64_to_f64(searched), i64_to_f64(per_chance)));
        roll_gems(state, stats, skirmish, chances, GemSource::Surveyor);
    }
}

/// Soul attractors, ghost trappers, gun emplacements and gate turrets. Only
/// called while the forge is staffed.
fn soul_generators(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
    skirmish: &mut Skirmish,
) {
    let trap_bonus = i64::from(config.soul_trap) * 5;

    if config.soul_attractors > 0 {
        let bonus = if config.soul_bait { trap_bonus * 2 } else { trap_bonus };
        skirmish.forge_souls += i64::from(config.soul_attractors) * (bonus + state.rng.draw(40, 120));
    }

    if config.ghost_trappers > 0 {
        let mut souls = i64_to_f64(
            i64::from(config.ghost_trappers) * (trap_bonus + state.rng.draw(150, 250)),
        );
        if config.dimensional_tap {
            souls *= 1.0 + heatsink(config) / HEATSINK_DIVISOR;
        }
        skirmish.forge_souls += floor_f64_to_i64(souls);
    }

    if config.guns > 0 {
        let mut odds = technophobe_pick(config, GUN_GEM_ODDS);
        if config.soul_link {
            odds = round_f64_to_i64(
                i64_to_f64(odds) * 0.94_f64.powf(f64::from(config.soul_attractors)),
            );
        }
        let per_gun = if config.advanced_guns {
            state.rng.draw(35, 75)
        } else {
            state.rng.draw(20, 40)
        };
        let kills = i64::from(config.guns) * per_gun;
        skirmish.forge_souls += kills;
        stats.kills += kills;
        for _ in 0..config.guns {
            if state.rng.one_in(odds) {
                stats.gun_gems += 1;
            }
        }
    }

    if config.gate_turrets > 0 {
        let odds = technophobe_pick(config, GATE_GEM_ODDS);
        let per_turret = if config.advanced_guns {
            state.rng.draw(65, 100)
        } else {
            state.rng.draw(40, 60)
        };
        let kills = i64::from(config.gate_turrets) * per_turret;
        skirmish.forge_souls += kills;
        stats.kills += kills;
        for _ in 0..config.gate_turrets {
            if state.rng.one_in(odds) {
                stats.gate_gems += 1;
            }
        }
    }
}

/// Thermal collector surplus feeding the dimensional tap.
#[must_use]
pub fn heatsink(config: &SimConfig) -> f64 {
    let mut heatsink = 100.0;
    if config.technophobe >= 2 {
        heatsink += if config.technophobe >= 4 { 25.0 } else { 10.0 };
        heatsink += 5.0 * f64::from(config.additional_technophobe_universes);
    }
    let drain = if config.emfield { 15_000.0 } else { 10_000.0 };
    heatsink.mul_add(f64::from(config.thermal_collectors), -drain).max(0.0)
}

/// Souls needed per forge gem.
#[must_use]
pub fn forge_soul_cap(config: &SimConfig) -> i64 {
    let mut cap = if config.soul_absorption {
        FORGE_SOUL_CAP_ABSORPTION
    } else {
        FORGE_SOUL_CAP
    };
    if config.soul_link {
        let base: f64 = if config.what_is_best >= 3 { 0.96 } else { 0.97 };
        cap = i64_to_f64(round_f64_to_i64(cap * base.powf(f64::from(config.soul_attractors))));
    }
    round_f64_to_i64(cap).max(1)
}

fn soul_forge(
    config: &SimConfig,
    state: &mut TrialState,
    stats: &mut TrialStats,
    skirmish: &mut Skirmish,
) {
    let odds = technophobe_pick(config, FORGE_GEM_ODDS);
    let kills = state.rng.draw(25, 150);
    skirmish.forge_souls += kills;
    stats.kills += kills;
    if state.rng.one_in(odds) {
        stats.forge_gems += 1;
    }

    stats.forge_souls += skirmish.forge_souls;
    state.forge_souls += skirmish.forge_souls;

    let cap = forge_soul_cap(config);
    if state.forge_souls >= cap {
        let gems = state.forge_souls / cap;
        state.forge_souls -= cap * gems;
        stats.forge_gems += gems;
    }
}
