use std::sync::Arc;

use hellsim_engine::constants::TICKS_PER_BLOOD_WAR;
use hellsim_engine::tick::is_engagement_tick;
use hellsim_engine::{
    ForgeMode, SimConfig, TickOutcome, TrialEnding, TrialRunner, TrialState, TrialStats,
    TrialTicket, advance,
};

fn finalized(config: SimConfig) -> Arc<SimConfig> {
    Arc::new(config.finalize().expect("valid config"))
}

fn fortressless() -> SimConfig {
    SimConfig {
        patrols: 0,
        defenders: 0,
        droids: 0,
        turrets: 0,
        predators: 0,
        soul_forge: ForgeMode::Off,
        ..SimConfig::default()
    }
}

#[test]
fn quiet_front_survives_one_engagement_period() {
    let config = finalized(SimConfig {
        patrols: 0,
        threat: 0,
        hours: 20.0 * 0.25 / 3_600.0,
        ..SimConfig::default()
    });
    let mut runner = TrialRunner::new(config, TrialTicket { trial_id: 1, seed: 77 }, 1);
    let mut progress = 0_u32;
    let ending = runner.run_to_end(&mut |inc: u8| progress += u32::from(inc));

    assert_eq!(ending, TrialEnding::Survived);
    assert_eq!(progress, 100);
    let stats = runner.stats();
    assert_eq!(stats.ticks, i64::try_from(TICKS_PER_BLOOD_WAR).unwrap());
    assert_eq!(stats.patrol_encounters, 0);
    assert_eq!(stats.wall_fails + stats.patrol_fails, 0);
    assert!(stats.log.contains("Survived!"));
}

#[test]
fn forced_siege_on_an_empty_fortress_ends_at_that_tick() {
    let config = finalized(fortressless());
    let mut state = TrialState::new(&config, 1, 5);
    let mut stats = TrialStats::seeded(&config);
    state.tick = 40;
    state.siege_odds = 1;

    let outcome = advance(&config, &mut state, &mut stats);
    assert_eq!(outcome, TickOutcome::WallsFell);
    assert_eq!(state.walls, 0);
    assert_eq!(state.tick, 40);
    assert_eq!(stats.sieges, 1);
    assert_eq!(stats.wall_fails, 1);
    assert_eq!(stats.wall_fail_ticks, 40);
    assert!(stats.log.contains("Walls fell"));
}

#[test]
fn empty_fortress_eventually_loses_its_walls() {
    // siege odds reach zero after 999 engagements, well inside two hours
    let config = finalized(SimConfig {
        hours: 2.0,
        ..fortressless()
    });
    let mut runner = TrialRunner::new(config, TrialTicket { trial_id: 1, seed: 9 }, 1);
    let mut progress = 0_u32;
    let ending = runner.run_to_end(&mut |inc: u8| progress += u32::from(inc));

    assert_eq!(ending, TrialEnding::WallsFell);
    assert_eq!(progress, 100);
    let fell_at = runner.state().tick;
    assert!(is_engagement_tick(fell_at));
    assert_eq!(runner.stats().wall_fails, 1);
    assert_eq!(runner.stats().wall_fail_ticks, i64::try_from(fell_at).unwrap());
}

#[test]
fn army_invariants_hold_after_every_engagement() {
    let config = finalized(SimConfig {
        hours: 3.0,
        threat: 40_000,
        patrol_size: 4,
        ..SimConfig::default()
    });
    for seed in 0..6 {
        let mut state = TrialState::new(&config, seed + 1, seed);
        let mut stats = TrialStats::seeded(&config);
        while !state.is_complete() {
            let engagement = is_engagement_tick(state.tick);
            let outcome = advance(&config, &mut state, &mut stats);
            if engagement {
                assert!(state.wounded <= state.soldiers, "seed {seed}");
                assert!(state.hell_soldiers <= state.soldiers, "seed {seed}");
                assert!((0..=100).contains(&state.walls), "seed {seed}");
                assert!(state.patrols >= 0, "seed {seed}");
            }
            if outcome.is_terminal() {
                assert_eq!(stats.wall_fails + stats.patrol_fails, 1, "seed {seed}");
                break;
            }
        }
    }
}

#[test]
fn same_ticket_replays_the_same_trial() {
    let config = finalized(SimConfig {
        hours: 1.0,
        ..SimConfig::default()
    });
    let ticket = TrialTicket { trial_id: 3, seed: 1234 };
    let mut first = TrialRunner::new(Arc::clone(&config), ticket, 10);
    let mut second = TrialRunner::new(config, ticket, 10);
    first.run_to_end(&mut |_: u8| {});
    second.run_to_end(&mut |_: u8| {});

    let first = serde_json::to_value(first.into_stats()).unwrap();
    let second = serde_json::to_value(second.into_stats()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn merged_trials_add_up() {
    let config = finalized(SimConfig {
        hours: 0.5,
        ..SimConfig::default()
    });
    let mut total = TrialStats::seeded(&config);
    let mut ticks = 0;
    let mut logs = String::new();
    for trial_id in 1..=3 {
        let mut runner =
            TrialRunner::new(Arc::clone(&config), TrialTicket { trial_id, seed: trial_id }, 3);
        runner.run_to_end(&mut |_: u8| {});
        let stats = runner.into_stats();
        ticks += stats.ticks;
        logs.push_str(&stats.log);
        total.merge(stats);
    }
    assert_eq!(total.ticks, ticks);
    assert_eq!(total.log, logs);
    assert!(total.log.starts_with(" -- Sim 1 --"));
}
