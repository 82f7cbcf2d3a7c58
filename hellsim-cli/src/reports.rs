use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use hellsim_engine::numbers::{i64_to_f64, ratio, u64_to_f64};
use hellsim_engine::ratings::tick_length;
use hellsim_engine::{ArmyInfo, BatchSummary, MercMode, SimConfig, TrialStats};

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FailureRate {
    pub count: i64,
    /// Share of merged trials, in percent.
    pub percent: f64,
    /// Average simulated hours survived before the failure.
    pub avg_hours: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GemRates {
    pub patrols: f64,
    pub surveyors: f64,
    pub guns: f64,
    pub forge: f64,
    pub gate_turrets: f64,
    pub compactor: f64,
    pub curious: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Spread {
    pub avg: f64,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MercReport {
    pub hired_per_hour: f64,
    pub avg_cost: f64,
    pub max_cost: f64,
    pub min_money: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExtendedReport {
    pub blood_wars: i64,
    pub ambushes: i64,
    pub ambushes_per_hour: f64,
    pub ambushes_per_encounter: f64,
    pub surges_per_hour: f64,
    pub sieges_per_hour: f64,
    pub soldiers_trained_per_hour: f64,
    pub avg_wounded: f64,
    pub max_wounded: i64,
    pub avg_pity: f64,
    pub max_pity: i64,
    pub pity_per_gem: f64,
    pub kills_per_hour: f64,
    pub forge_uptime_percent: f64,
    pub forge_souls_per_hour: f64,
    pub rainy_percent: f64,
    pub wet_percent: f64,
    pub ticks_per_second: f64,
}

/// Figures derived from a batch aggregate, in the units players read them.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub trials_requested: u64,
    pub trials_completed: u64,
    pub trials_stopped: u64,
    pub cancelled: bool,
    pub seed: u64,
    pub elapsed_secs: f64,
    pub simulated_hours: f64,
    pub army: ArmyInfo,
    pub wall_failures: FailureRate,
    pub patrol_failures: FailureRate,
    pub gems_per_hour: GemRates,
    pub encounters: i64,
    pub encounters_per_hour: f64,
    pub encounters_per_blood_war: f64,
    pub skipped_encounter_percent: f64,
    pub patrol_kills_per_gem: f64,
    pub drone_kills_per_gem: f64,
    pub pre_fight_threat: Spread,
    pub post_fight_threat: Spread,
    pub soldiers_killed_per_hour: f64,
    pub soldiers_lost_after_revives_per_hour: f64,
    pub soldiers_killed_per_blood_war: f64,
    pub ambush_death_percent: f64,
    pub mercs: Option<MercReport>,
    pub patrols_survived: Spread,
    pub avg_surveyors: f64,
    pub min_surveyors: i64,
    pub avg_garrison: f64,
    pub min_reserves: i64,
    pub avg_walls: f64,
    pub min_walls: i64,
    pub extended: ExtendedReport,
}

fn failure_rate(count: i64, fail_ticks: i64, trials: u64, tick_ms: f64) -> FailureRate {
    let avg_hours = (count > 0)
        .then(|| i64_to_f64(fail_ticks) * tick_ms / MS_PER_HOUR / i64_to_f64(count));
    FailureRate {
        count,
        percent: ratio(i64_to_f64(count) * 100.0, u64_to_f64(trials)),
        avg_hours,
    }
}

impl BatchReport {
    #[must_use]
    pub fn new(config: &SimConfig, summary: &BatchSummary) -> Self {
        let stats = &summary.stats;
        let tick_ms = tick_length(config);
        let hours = i64_to_f64(stats.ticks) * tick_ms / MS_PER_HOUR;
        let ticks = i64_to_f64(stats.ticks);
        let wars = i64_to_f64(stats.blood_wars);
        let per_hour = |value: i64| ratio(i64_to_f64(value), hours);
        let per_war = |value: i64| ratio(i64_to_f64(value), wars);
        let trials = summary.trials_merged();
        let elapsed_secs = summary.elapsed.as_secs_f64();

        let mercs = (config.hire_mercs != MercMode::Off).then(|| MercReport {
            hired_per_hour: per_hour(stats.mercs_hired),
            avg_cost: ratio(stats.merc_costs, i64_to_f64(stats.mercs_hired)),
            max_cost: stats.max_merc_price,
            min_money: stats.min_money,
        });

        Self {
            trials_requested: summary.trials_requested,
            trials_completed: summary.trials_completed,
            trials_stopped: summary.trials_stopped,
            cancelled: summary.cancelled,
            seed: summary.seed,
            elapsed_secs,
            simulated_hours: hours,
            army: ArmyInfo::from_config(config),
            wall_failures: failure_rate(stats.wall_fails, stats.wall_fail_ticks, trials, tick_ms),
            patrol_failures: failure_rate(
                stats.patrol_fails,
                stats.patrol_fail_ticks,
                trials,
                tick_ms,
            ),
            gems_per_hour: GemRates {
                patrols: per_hour(stats.patrol_gems),
                surveyors: per_hour(stats.surveyor_gems),
                guns: per_hour(stats.gun_gems),
                forge: per_hour(stats.forge_gems),
                gate_turrets: per_hour(stats.gate_gems),
                compactor: per_hour(stats.compactor_gems),
                curious: per_hour(stats.curious_gems),
                total: per_hour(stats.total_gems()),
            },
            encounters: stats.patrol_encounters,
            encounters_per_hour: per_hour(stats.patrol_encounters),
            encounters_per_blood_war: per_war(stats.patrol_encounters),
            skipped_encounter_percent: ratio(
                i64_to_f64(stats.skipped_encounters) * 100.0,
                i64_to_f64(stats.skipped_encounters + stats.patrol_encounters),
            ),
            patrol_kills_per_gem: ratio(
                i64_to_f64(stats.patrol_kills),
                i64_to_f64(stats.patrol_gems),
            ),
            drone_kills_per_gem: ratio(
                i64_to_f64(stats.drone_kills),
                i64_to_f64(stats.surveyor_gems),
            ),
            pre_fight_threat: Spread {
                avg: per_war(stats.total_pre_fight_threat),
                min: stats.min_pre_fight_threat,
                max: stats.max_pre_fight_threat,
            },
            post_fight_threat: Spread {
                avg: per_war(stats.total_post_fight_threat),
                min: stats.min_post_fight_threat,
                max: stats.max_post_fight_threat,
            },
            soldiers_killed_per_hour: per_hour(stats.soldiers_killed),
            soldiers_lost_after_revives_per_hour: per_hour(
                stats.soldiers_killed - stats.soldiers_revived,
            ),
            soldiers_killed_per_blood_war: per_war(stats.soldiers_killed),
            ambush_death_percent: ratio(
                i64_to_f64(stats.ambush_deaths) * 100.0,
                i64_to_f64(stats.soldiers_killed),
            ),
            mercs,
            patrols_survived: Spread {
                avg: ratio(i64_to_f64(stats.total_patrols_survived), u64_to_f64(trials)),
                min: stats.min_patrols_survived,
                max: stats.max_patrols_survived,
            },
            avg_surveyors: ratio(i64_to_f64(stats.total_surveyors), ticks),
            min_surveyors: stats.min_surveyors,
            avg_garrison: ratio(i64_to_f64(stats.total_garrison), ticks),
            min_reserves: stats.min_reserves,
            avg_walls: per_war(stats.total_walls),
            min_walls: stats.min_walls,
            extended: extended_report(stats, hours, elapsed_secs),
        }
    }
}

fn extended_report(stats: &TrialStats, hours: f64, elapsed_secs: f64) -> ExtendedReport {
    let wars = i64_to_f64(stats.blood_wars);
    let per_hour = |value: i64| ratio(i64_to_f64(value), hours);
    ExtendedReport {
        blood_wars: stats.blood_wars,
        ambushes: stats.ambushes,
        ambushes_per_hour: per_hour(stats.ambushes),
        ambushes_per_encounter: ratio(
            i64_to_f64(stats.ambushes),
            i64_to_f64(stats.patrol_encounters),
        ),
        surges_per_hour: per_hour(stats.surges),
        sieges_per_hour: per_hour(stats.sieges),
        soldiers_trained_per_hour: per_hour(stats.soldiers_trained),
        avg_wounded: ratio(i64_to_f64(stats.total_wounded), wars),
        max_wounded: stats.max_wounded,
        avg_pity: ratio(i64_to_f64(stats.total_pity), wars),
        max_pity: stats.max_pity,
        pity_per_gem: ratio(
            i64_to_f64(stats.total_pity_per_gem),
            i64_to_f64(stats.patrol_gems + stats.surveyor_gems),
        ),
        kills_per_hour: per_hour(stats.kills),
        forge_uptime_percent: ratio(i64_to_f64(stats.forge_on) * 100.0, wars),
        forge_souls_per_hour: per_hour(stats.forge_souls),
        rainy_percent: ratio(i64_to_f64(stats.rainy) * 100.0, wars),
        wet_percent: ratio(i64_to_f64(stats.wet) * 100.0, wars),
        ticks_per_second: ratio(i64_to_f64(stats.ticks), elapsed_secs),
    }
}

fn failure_line(label: &str, failure: &FailureRate) -> String {
    let count = if failure.count > 0 {
        failure.count.to_string().red().to_string()
    } else {
        failure.count.to_string().green().to_string()
    };
    match failure.avg_hours {
        Some(hours) => format!("{label}: {count} ({:.1}%, avg {hours:.1} hrs)", failure.percent),
        None => format!("{label}: {count}"),
    }
}

/// Human-readable results block.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_console_report(
    out: &mut dyn Write,
    config: &SimConfig,
    report: &BatchReport,
    extended: bool,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", " -- Results --".bright_cyan().bold())?;
    let status = if report.cancelled {
        "stopped early".yellow()
    } else {
        "complete".green()
    };
    writeln!(
        out,
        "Sims: {} of {} ({status}),  {},  {}",
        report.trials_completed,
        report.trials_requested,
        failure_line("wall failures", &report.wall_failures),
        failure_line("patrol failures", &report.patrol_failures)
    )?;

    let gems = &report.gems_per_hour;
    let mut gem_line = format!(
        "Soul gems per hour - Patrols: {:.2},  Surveyors: {:.2},  Guns: {:.2},  Forge: {:.2},  Gate Turrets: {:.2}",
        gems.patrols, gems.surveyors, gems.guns, gems.forge, gems.gate_turrets
    );
    if config.soul_compactor {
        gem_line.push_str(&format!(",  Compactor: {:.2}", gems.compactor));
    }
    if config.traits.curious.is_some() {
        gem_line.push_str(&format!(",  Curious: {:.2}", gems.curious));
    }
    writeln!(out, "{gem_line},  Total: {}", format!("{:.2}", gems.total).bold())?;

    writeln!(
        out,
        "Encounters: {},  per hour: {:.1},  per bloodwar: {:.3},  skipped: {:.2}%",
        report.encounters,
        report.encounters_per_hour,
        report.encounters_per_blood_war,
        report.skipped_encounter_percent
    )?;
    writeln!(
        out,
        "Patrol kills per gem: {:.2},  Drone kills per gem: {:.2}",
        report.patrol_kills_per_gem, report.drone_kills_per_gem
    )?;
    for (label, spread) in [
        ("Pre-fight Threat  ", &report.pre_fight_threat),
        ("Post-fight Threat ", &report.post_fight_threat),
    ] {
        writeln!(
            out,
            "{label} Avg: {:.0},  min: {},  max: {}",
            spread.avg, spread.min, spread.max
        )?;
    }

    let mut killed = format!(
        "Soldiers killed per hour: {:.1}",
        report.soldiers_killed_per_hour
    );
    if config.traits.revive.is_some() {
        killed.push_str(&format!(
            ",  after revives: {:.1}",
            report.soldiers_lost_after_revives_per_hour
        ));
    }
    writeln!(
        out,
        "{killed},  per bloodwar: {:.3},  in ambushes: {:.1}%",
        report.soldiers_killed_per_blood_war, report.ambush_death_percent
    )?;

    if let Some(mercs) = &report.mercs {
        writeln!(
            out,
            "Mercs hired per hour: {:.1},  avg cost: {:.3},  max cost: {:.3},  min money: {:.2}",
            mercs.hired_per_hour, mercs.avg_cost, mercs.max_cost, mercs.min_money
        )?;
    }
    writeln!(
        out,
        "Patrols survived (of {})  avg: {:.1},  min: {},  max: {}",
        config.patrols,
        report.patrols_survived.avg,
        report.patrols_survived.min,
        report.patrols_survived.max
    )?;
    writeln!(
        out,
        "Surveyors avg: {:.1} ({:.1}%),  min {} of {}",
        report.avg_surveyors,
        ratio(report.avg_surveyors * 100.0, f64::from(config.surveyors)),
        report.min_surveyors,
        config.surveyors
    )?;
    writeln!(
        out,
        "Hunting Garrison avg: {:.1} of {} ({:.1}%)",
        report.avg_garrison,
        config.garrison,
        ratio(report.avg_garrison * 100.0, f64::from(config.garrison))
    )?;
    writeln!(
        out,
        "Reserves min: {} of {}",
        report.min_reserves,
        config.garrison + config.defenders
    )?;
    writeln!(
        out,
        "Walls avg: {:.1},  min {}",
        report.avg_walls, report.min_walls
    )?;

    if extended {
        write_extended(out, config, report)?;
    }
    Ok(())
}

fn write_extended(out: &mut dyn Write, config: &SimConfig, report: &BatchReport) -> Result<()> {
    let ext = &report.extended;
    writeln!(out, "{}", " -- Details --".bright_yellow().bold())?;
    writeln!(out, "Blood wars:  {}", ext.blood_wars)?;
    writeln!(
        out,
        "Ambushes:    {},  per hour: {:.1},  per encounter: {:.3}",
        ext.ambushes, ext.ambushes_per_hour, ext.ambushes_per_encounter
    )?;
    writeln!(out, "Surges per hour: {:.3}", ext.surges_per_hour)?;
    writeln!(out, "Sieges per hour: {:.3}", ext.sieges_per_hour)?;
    writeln!(
        out,
        "Soldiers trained per hour: {:.1}",
        ext.soldiers_trained_per_hour
    )?;
    writeln!(
        out,
        "Wounded avg: {:.1},  max {}",
        ext.avg_wounded, ext.max_wounded
    )?;
    writeln!(
        out,
        "Pity avg:    {:.0},  max: {},  avg per gem: {:.0}",
        ext.avg_pity, ext.max_pity, ext.pity_per_gem
    )?;
    writeln!(out, "Demon kills per hour: {:.0}", ext.kills_per_hour)?;
    writeln!(
        out,
        "Soul Forge on-time: {:.1}%,  souls per hour: {:.0}",
        ext.forge_uptime_percent, ext.forge_souls_per_hour
    )?;
    if config.traits.cautious.is_some() {
        writeln!(out, "Cautious weather penalty time: {:.1}%", ext.rainy_percent)?;
    }
    if config.traits.tusk.is_some() {
        writeln!(out, "Tusked weather bonus time: {:.1}%", ext.wet_percent)?;
    }
    writeln!(
        out,
        "Total sim time: {:.1} seconds.  Sim ticks per second: {:.1}k",
        report.elapsed_secs,
        ext.ticks_per_second / 1_000.0
    )?;
    Ok(())
}

/// Pretty JSON with the derived figures and, optionally, the raw aggregate.
///
/// # Errors
///
/// Propagates serialization and write failures.
pub fn write_json_report(
    out: &mut dyn Write,
    report: &BatchReport,
    stats: Option<&TrialStats>,
) -> Result<()> {
    let value = match stats {
        Some(stats) => serde_json::json!({ "report": report, "stats": stats }),
        None => serde_json::json!({ "report": report }),
    };
    serde_json::to_writer_pretty(&mut *out, &value)?;
    writeln!(out)?;
    Ok(())
}

/// Army figures for `--info`.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_info(out: &mut dyn Write, info: &ArmyInfo) -> Result<()> {
    writeln!(out, "{}", "Army ratings".bright_cyan().bold())?;
    writeln!(out, "Fortress rating:       {:.1}", info.fortress_rating)?;
    writeln!(out, "Patrol rating:         {:.1}", info.patrol_rating)?;
    writeln!(out, "Patrol rating (droid): {:.1}", info.patrol_rating_droids)?;
    writeln!(out, "Tick length:           {:.1} ms", info.tick_length)?;
    writeln!(out, "Training rate:         {:.4}", info.training_rate)?;
    writeln!(out, "Soul forge crew:       {}", info.forge_soldiers)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn summary(stats: TrialStats, trials: u64) -> BatchSummary {
        BatchSummary {
            stats,
            trials_requested: trials,
            trials_completed: trials,
            trials_stopped: 0,
            cancelled: false,
            elapsed: Duration::from_secs(2),
            seed: 7,
        }
    }

    #[test]
    fn empty_aggregate_has_no_nan() {
        let config = SimConfig::default();
        let report = BatchReport::new(&config, &summary(TrialStats::seeded(&config), 1));
        let value = serde_json::to_value(&report).unwrap();
        assert!((report.gems_per_hour.total).abs() < f64::EPSILON);
        assert!(report.wall_failures.avg_hours.is_none());
        assert!(value["encounters_per_hour"].is_number());
    }

    #[test]
    fn failure_hours_use_tick_length() {
        let config = SimConfig::default();
        let mut stats = TrialStats::seeded(&config);
        stats.ticks = 14_400 * 4;
        stats.wall_fails = 2;
        stats.wall_fail_ticks = 14_400 * 3;
        let report = BatchReport::new(&config, &summary(stats, 4));
        assert!((report.wall_failures.percent - 50.0).abs() < 1e-9);
        let hours = report.wall_failures.avg_hours.unwrap();
        assert!((hours - 1.5).abs() < 1e-9);
        assert!((report.simulated_hours - 4.0).abs() < 1e-9);
    }

    #[test]
    fn console_report_mentions_each_section() {
        colored::control::set_override(false);
        let config = SimConfig {
            hire_mercs: MercMode::Governor,
            ..SimConfig::default()
        };
        let mut stats = TrialStats::seeded(&config);
        stats.ticks = 14_400;
        stats.blood_wars = 720;
        stats.patrol_gems = 3;
        let report = BatchReport::new(&config, &summary(stats, 1));
        let mut out = Vec::new();
        write_console_report(&mut out, &config, &report, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(" -- Results --"));
        assert!(text.contains("Soul gems per hour - Patrols: 3.00"));
        assert!(text.contains("Mercs hired per hour"));
        assert!(text.contains("Blood wars:  720"));
        assert!(text.contains("Reserves min: 140 of 140"));
        assert!(!text.contains("Curious"));
    }

    #[test]
    fn json_report_can_carry_raw_stats() {
        let config = SimConfig::default();
        let report = BatchReport::new(&config, &summary(TrialStats::seeded(&config), 1));
        let mut out = Vec::new();
        write_json_report(&mut out, &report, Some(&TrialStats::seeded(&config))).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["report"]["seed"], 7);
        assert_eq!(value["stats"]["min_walls"], 100);
        assert_eq!(value["report"]["min_reserves"], 140);
    }
}
