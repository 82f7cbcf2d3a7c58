//! Random civic events rolled once per engagement.
//!
//! Most events have no effect on the war; they are still drawn so the
//! surge and terrorist rates match the candidate pool of the species.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::{Astrology, Government, Governor, SimConfig};
use crate::constants::{CURIOUS_GEM_ODDS, INITIAL_EVENT_ODDS, SURGE_DEMONS};
use crate::modifiers::astro_mod;
use crate::numbers::{i64_to_f64, round_f64_to_i64};
use crate::state::TrialState;
use crate::stats::TrialStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Inspiration,
    Motivation,
    Surge,
    Terrorist,
    Fire,
    Flare,
    Ruins,
    SlaveDeath,
    SlaveEscape,
    SlaveUprising,
    Protest,
    Scandal,
    Klepto,
    ChickenFeast,
    Brawl,
    Curious,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inspiration => "inspiration",
            Self::Motivation => "motivation",
            Self::Surge => "surge",
            Self::Terrorist => "terrorist",
            Self::Fire => "fire",
            Self::Flare => "flare",
            Self::Ruins => "ruins",
            Self::SlaveDeath => "slave_death",
            Self::SlaveEscape => "slave_escape",
            Self::SlaveUprising => "slave_uprising",
            Self::Protest => "protest",
            Self::Scandal => "scandal",
            Self::Klepto => "klepto",
            Self::ChickenFeast => "chicken_feast",
            Self::Brawl => "brawl",
            Self::Curious => "curious",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type EventPool = SmallVec<[EventKind; 16]>;

/// Events this configuration can roll, in a stable order.
#[must_use]
pub fn candidates(config: &SimConfig) -> EventPool {
    let traits = &config.traits;
    let mut pool: EventPool = SmallVec::new();
    pool.extend([
        EventKind::Inspiration,
        EventKind::Motivation,
        EventKind::Surge,
        EventKind::Terrorist,
    ]);
    let fireproof = traits.kindling.is_some()
        || traits.smoldering.is_some()
        || traits.evil.is_some()
        || traits.aquatic.is_some();
    if !fireproof {
        pool.push(EventKind::Fire);
    }
    if traits.flare.is_some() {
        pool.push(EventKind::Flare);
    }
    if config.ancient_ruins {
        pool.push(EventKind::Ruins);
    }
    if traits.slaver.is_some() {
        pool.extend([
            EventKind::SlaveDeath,
            EventKind::SlaveEscape,
            EventKind::SlaveUprising,
        ]);
    }
    if config.government == Government::Republic {
        pool.push(EventKind::Protest);
    }
    if config.governor == Governor::Media {
        pool.push(EventKind::Scandal);
    }
    if traits.rogue.is_some() {
        pool.push(EventKind::Klepto);
    }
    if traits.chicken.is_some() {
        pool.push(EventKind::ChickenFeast);
    }
    if traits.aggressive.is_some() {
        pool.push(EventKind::Brawl);
    }
    if traits.curious.is_some() {
        pool.push(EventKind::Curious);
    }
    pool
}

/// Event odds after an event fired.
#[must_use]
pub fn reset_odds(config: &SimConfig) -> i64 {
    let mut odds = INITIAL_EVENT_ODDS;
    if config.astrology == Astrology::Pisces {
        let bonus = if config.astro_wish { 79.0 } else { 49.0 };
        odds -= round_f64_to_i64(bonus * astro_mod(config));
    }
    odds
}

/// Roll the declining-odds event timer and apply the event that fires.
pub fn resolve_event(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    if !state.rng.one_in(state.event_odds) {
        state.event_odds -= 1;
        return;
    }

    let mut pool = candidates(config);
    if let Some(last) = state.last_event {
        pool.retain(|event| *event != last);
    }
    let len = i64::try_from(pool.len()).unwrap_or(0);
    let index = usize::try_from(state.rng.draw(0, len)).unwrap_or(0);
    let Some(&event) = pool.get(index) else {
        return;
    };

    match event {
        EventKind::Surge if config.surges => demon_surge(config, state, stats),
        EventKind::Terrorist if config.terrorists => terrorist_attack(config, state, stats),
        EventKind::Curious => {
            if state.rng.one_in(CURIOUS_GEM_ODDS) {
                stats.curious_gems += 1;
            }
        }
        _ => {}
    }
    log::trace!("trial {} event {event} at tick {}", state.trial_id, state.tick);

    state.last_event = Some(event);
    state.event_odds = reset_odds(config);
}

fn demon_surge(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    let surge = state.rng.draw(SURGE_DEMONS.0, SURGE_DEMONS.1);
    state.threat += surge;
    stats.surges += 1;
    if config.log.surges {
        stats.append_log(&format!(
            "{} - Demon Surge Event!  {surge} new demons, new threat total {}\n",
            state.time_str(),
            state.threat
        ));
    }
}

fn terrorist_attack(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    let mut killed = state.rng.draw(0, state.wounded);
    let mut wounded = state.rng.draw(0, state.soldiers - state.wounded);
    if config.traits.instincts.is_some() {
        killed = round_f64_to_i64(i64_to_f64(killed) / 2.0);
        wounded = round_f64_to_i64(i64_to_f64(wounded) / 2.0);
    }

    state.soldiers -= killed;
    stats.soldiers_killed += killed;
    state.wounded = (state.wounded + wounded).min(state.soldiers);
    if config.log.terrorists {
        stats.append_log(&format!(
            "{} - Terrorist attack: {wounded} wounded, {killed} killed.\n",
            state.time_str()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::TraitRank;

    #[test]
    fn base_pool_has_fire_unless_fireproof() {
        let mut config = SimConfig::default();
        assert_eq!(
            candidates(&config).as_slice(),
            &[
                EventKind::Inspiration,
                EventKind::Motivation,
                EventKind::Surge,
                EventKind::Terrorist,
                EventKind::Fire,
            ]
        );
        config.traits.aquatic = Some(TraitRank::One);
        config.traits.slaver = Some(TraitRank::One);
        config.governor = Governor::Media;
        let pool = candidates(&config);
        assert!(!pool.contains(&EventKind::Fire));
        assert!(pool.contains(&EventKind::SlaveUprising));
        assert!(pool.contains(&EventKind::Scandal));
        assert_eq!(pool.len(), 8);
    }

    #[test]
    fn pisces_shortens_event_timer() {
        let mut config = SimConfig::default();
        assert_eq!(reset_odds(&config), 999);
        config.astrology = Astrology::Pisces;
        assert_eq!(reset_odds(&config), 950);
        config.astro_wish = true;
        assert_eq!(reset_odds(&config), 920);
    }

    #[test]
    fn odds_decline_until_an_event_fires() {
        let config = SimConfig::default();
        let mut state = TrialState::new(&config, 1, 4);
        let mut stats = TrialStats::seeded(&config);
        let mut rolls = 0;
        while state.last_event.is_none() {
            assert_eq!(state.event_odds, 999 - rolls);
            resolve_event(&config, &mut state, &mut stats);
            rolls += 1;
        }
        assert_eq!(state.event_odds, 999);
    }

    #[test]
    fn same_event_never_repeats_back_to_back() {
        let config = SimConfig {
            surges: false,
            terrorists: false,
            ..SimConfig::default()
        };
        let mut state = TrialState::new(&config, 1, 8);
        let mut stats = TrialStats::seeded(&config);
        let mut previous = None;
        for _ in 0..500 {
            state.event_odds = 1;
            resolve_event(&config, &mut state, &mut stats);
            assert!(state.last_event.is_some());
            assert_ne!(state.last_event, previous);
            previous = state.last_event;
        }
        assert_eq!(stats.surges, 0);
    }

    #[test]
    fn terrorists_keep_wounded_within_soldiers() {
        let config = SimConfig::default();
        let mut state = TrialState::new(&config, 1, 2);
        let mut stats = TrialStats::seeded(&config);
        state.wounded = 50;
        for _ in 0..50 {
            terrorist_attack(&config, &mut state, &mut stats);
            assert!(state.wounded <= state.soldiers);
            assert!(state.soldiers >= 0);
        }
    }
}
