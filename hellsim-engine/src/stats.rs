//! Statistics accumulator shared by trials and the batch aggregate.
//!
//! Every numeric field is either a sum, a running minimum or a running
//! maximum; [`TrialStats::merge`] combines two accumulators accordingly, so
//! merging is commutative and associative on all numbers. The text log is
//! concatenated in merge order.
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::constants::INITIAL_WALLS;
use crate::numbers::count_to_i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrialStats {
    // sums
    pub ticks: i64,
    pub blood_wars: i64,
    pub patrol_gems: i64,
    pub surveyor_gems: i64,
    pub forge_gems: i64,
    pub gun_gems: i64,
    pub gate_gems: i64,
    pub compactor_gems: i64,
    pub curious_gems: i64,
    pub kills: i64,
    pub patrol_kills: i64,
    pub drone_kills: i64,
    pub total_pre_fight_threat: i64,
    pub total_post_fight_threat: i64,
    pub patrol_encounters: i64,
    pub skipped_encounters: i64,
    pub ambushes: i64,
    pub soldiers_trained: i64,
    pub soldiers_killed: i64,
    pub soldiers_revived: i64,
    pub total_wounded: i64,
    pub ambush_deaths: i64,
    pub surges: i64,
    pub sieges: i64,
    pub total_walls: i64,
    pub total_surveyors: i64,
    pub wall_fails: i64,
    pub wall_fail_ticks: i64,
    pub patrol_fails: i64,
    pub patrol_fail_ticks: i64,
    pub total_patrols_survived: i64,
    pub total_pity: i64,
    pub total_pity_per_gem: i64,
    pub total_garrison: i64,
    pub forge_on: i64,
    pub forge_souls: i64,
    /// Millions spent on mercenaries.
    pub merc_costs: f64,
    pub mercs_hired: i64,
    pub rainy: i64,
    pub wet: i64,

    // running minimums
    pub min_pre_fight_threat: i64,
    pub min_post_fight_threat: i64,
    pub min_walls: i64,
    pub min_surveyors: i64,
    pub min_patrols_survived: i64,
    /// Fewest soldiers held back from patrols (garrison plus defenders).
    pub min_reserves: i64,
    pub min_money: f64,

    // running maximums
    pub max_pre_fight_threat: i64,
    pub max_post_fight_threat: i64,
    pub max_wounded: i64,
    pub max_patrols_survived: i64,
    pub max_pity: i64,
    pub max_merc_price: f64,

    pub log: String,
}

macro_rules! merge_fields {
    ($into:ident, $from:ident; sum: $($sum:ident),*; min: $($min:ident),*; max: $($max:ident),*) => {
        $( $into.$sum += $from.$sum; )*
        $( $into.$min = $into.$min.min($from.$min); )*
        $( $into.$max = $into.$max.max($from.$max); )*
    };
}

impl TrialStats {
    /// Accumulator seeded from the configuration: minimums start at the
    /// configured ceiling, maximums at the starting value or zero.
    #[must_use]
    pub fn seeded(config: &SimConfig) -> Self {
        Self {
            min_pre_fight_threat: config.threat,
            max_pre_fight_threat: config.threat,
            min_post_fight_threat: config.threat,
            max_post_fight_threat: config.threat,
            min_walls: INITIAL_WALLS,
            min_surveyors: count_to_i64(config.surveyors),
            min_patrols_survived: count_to_i64(config.patrols),
            min_reserves: count_to_i64(config.garrison) + count_to_i64(config.defenders),
            min_money: config.money_cap,
            ..Self::default()
        }
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        merge_fields!(self, other;
            sum: ticks, blood_wars, patrol_gems, surveyor_gems, forge_gems, gun_gems,
                gate_gems, compactor_gems, curious_gems, kills, patrol_kills, drone_kills,
                total_pre_fight_threat, total_post_fight_threat, patrol_encounters,
                skipped_encounters, ambushes, soldiers_trained, soldiers_killed,
                soldiers_revived, total_wounded, ambush_deaths, surges, sieges, total_walls,
                total_surveyors, wall_fails, wall_fail_ticks, patrol_fails, patrol_fail_ticks,
                total_patrols_survived, total_pity, total_pity_per_gem, total_garrison,
                forge_on, forge_souls, merc_costs, mercs_hired, rainy, wet;
            min: min_pre_fight_threat, min_post_fight_threat, min_walls, min_surveyors,
                min_patrols_survived, min_reserves, min_money;
            max: max_pre_fight_threat, max_post_fight_threat, max_wounded,
                max_patrols_survived, max_pity, max_merc_price
        );
        self.log.push_str(&other.log);
    }

    pub fn append_log(&mut self, text: &str) {
        self.log.push_str(text);
    }

    pub fn record_pre_fight_threat(&mut self, threat: i64) {
        self.total_pre_fight_threat += threat;
        self.min_pre_fight_threat = self.min_pre_fight_threat.min(threat);
        self.max_pre_fight_threat = self.max_pre_fight_threat.max(threat);
    }

    pub fn record_post_fight_threat(&mut self, threat: i64) {
        self.total_post_fight_threat += threat;
        self.min_post_fight_threat = self.min_post_fight_threat.min(threat);
        self.max_post_fight_threat = self.max_post_fight_threat.max(threat);
    }

    pub fn record_patrols_survived(&mut self, patrols: i64) {
        self.total_patrols_survived += patrols;
        self.min_patrols_survived = self.min_patrols_survived.min(patrols);
        self.max_patrols_survived = self.max_patrols_survived.max(patrols);
    }

    pub fn record_wounded(&mut self, wounded: i64) {
        self.total_wounded += wounded;
        self.max_wounded = self.max_wounded.max(wounded);
    }

    pub fn record_pity(&mut self, pity: i64) {
        self.total_pity += pity;
        self.max_pity = self.max_pity.max(pity);
    }

    pub fn record_walls(&mut self, walls: i64) {
        self.total_walls += walls;
        self.min_walls = self.min_walls.min(walls);
    }

    pub fn record_surveyors(&mut self, surveyors: i64) {
        self.total_surveyors += surveyors;
        self.min_surveyors = self.min_surveyors.min(surveyors);
    }

    pub fn record_reserves(&mut self, reserves: i64) {
        self.min_reserves = self.min_reserves.min(reserves);
    }

    pub fn record_money(&mut self, money: f64) {
        self.min_money = self.min_money.min(money);
    }

    /// Gems found across every source.
    #[must_use]
    pub const fn total_gems(&self) -> i64 {
        self.patrol_gems
            + self.surveyor_gems
            + self.forge_gems
            + self.gun_gems
            + self.gate_gems
            + self.compactor_gems
            + self.curious_gems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(threat: i64, walls: i64, kills: i64, log: &str) -> TrialStats {
        let config = SimConfig {
            threat,
            ..SimConfig::default()
        };
        let mut stats = TrialStats::seeded(&config);
        stats.kills = kills;
        stats.blood_wars = 3;
        stats.record_pre_fight_threat(threat + 10);
        stats.record_walls(walls);
        stats.record_patrols_survived(walls / 10);
        stats.append_log(log);
        stats
    }

    fn numbers_only(mut stats: TrialStats) -> TrialStats {
        stats.log.clear();
        stats
    }

    #[test]
    fn seeding_uses_config_ceilings() {
        let config = SimConfig {
            threat: 777,
            surveyors: 4,
            patrols: 9,
            money_cap: 12.5,
            garrison: 30,
            defenders: 12,
            ..SimConfig::default()
        };
        let stats = TrialStats::seeded(&config);
        assert_eq!(stats.min_reserves, 42);
        assert_eq!(stats.min_pre_fight_threat, 777);
        assert_eq!(stats.max_post_fight_threat, 777);
        assert_eq!(stats.min_walls, 100);
        assert_eq!(stats.min_surveyors, 4);
        assert_eq!(stats.min_patrols_survived, 9);
        assert_eq!(stats.max_patrols_survived, 0);
        assert!((stats.min_money - 12.5).abs() < f64::EPSILON);
        assert_eq!(stats.ticks, 0);
        assert!(stats.log.is_empty());
    }

    #[test]
    fn merge_sums_and_keeps_extremes() {
        let mut total = sample(100, 80, 5, "a");
        total.merge(sample(5_000, 30, 7, "b"));
        assert_eq!(total.kills, 12);
        assert_eq!(total.blood_wars, 6);
        assert_eq!(total.min_walls, 30);
        assert_eq!(total.total_walls, 110);
        assert_eq!(total.min_pre_fight_threat, 100);
        assert_eq!(total.max_pre_fight_threat, 5_010);
        assert_eq!(total.max_patrols_survived, 8);
        assert_eq!(total.log, "ab");
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let (a, b, c) = (
            sample(100, 80, 5, "a"),
            sample(9_000, 20, 1, "b"),
            sample(4_000, 55, 40, "c"),
        );

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b.clone();
        ba.merge(a.clone());
        assert_eq!(numbers_only(ab.clone()), numbers_only(ba));

        let mut ab_c = ab;
        ab_c.merge(c.clone());
        let mut bc = b;
        bc.merge(c);
        let mut a_bc = a;
        a_bc.merge(bc);
        assert_eq!(ab_c, a_bc);
    }

    #[test]
    fn total_gems_adds_every_source() {
        let stats = TrialStats {
            patrol_gems: 1,
            forge_gems: 2,
            compactor_gems: 3,
            curious_gems: 4,
            ..TrialStats::default()
        };
        assert_eq!(stats.total_gems(), 10);
    }
}
