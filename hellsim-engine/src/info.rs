//! Static army figures derived from a configuration, without running a trial.
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::modifiers::droid_size;
use crate::numbers::count_to_i64;
use crate::ratings::{army_rating, forge_soldiers, fortress_rating, tick_length, training_rate};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmyInfo {
    pub fortress_rating: f64,
    pub patrol_rating: f64,
    /// Rating of a patrol escorted by a war droid.
    pub patrol_rating_droids: f64,
    /// Milliseconds of game time per tick.
    pub tick_length: f64,
    pub training_rate: f64,
    /// Defenders the soul forge needs to run.
    pub forge_soldiers: i64,
}

impl ArmyInfo {
    #[must_use]
    pub fn from_config(config: &SimConfig) -> Self {
        let patrol_size = count_to_i64(config.patrol_size);
        Self {
            fortress_rating: fortress_rating(config, None),
            patrol_rating: army_rating(config, None, patrol_size, None),
            patrol_rating_droids: army_rating(
                config,
                None,
                patrol_size + i64::from(droid_size(config)),
                None,
            ),
            tick_length: tick_length(config),
            training_rate: training_rate(config),
            forge_soldiers: forge_soldiers(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TrialState;

    #[test]
    fn matches_a_fresh_trial() {
        let config = SimConfig::default();
        let info = ArmyInfo::from_config(&config);
        let state = TrialState::new(&config, 1, 5);
        assert!((info.patrol_rating - state.patrol_rating).abs() < f64::EPSILON);
        assert!((info.patrol_rating_droids - state.patrol_rating_droids).abs() < f64::EPSILON);
        assert!((info.tick_length - state.tick_length).abs() < f64::EPSILON);
        assert!((info.training_rate - state.training_rate).abs() < f64::EPSILON);
        assert_eq!(info.forge_soldiers, state.forge_crew);
    }

    #[test]
    fn droids_never_weaken_a_patrol() {
        let info = ArmyInfo::from_config(&SimConfig::default());
        assert!(info.patrol_rating_droids >= info.patrol_rating);
        assert!(info.fortress_rating > 0.0);
    }

    #[test]
    fn serializes_every_figure() {
        let info = ArmyInfo::from_config(&SimConfig::default());
        let value = serde_json::to_value(info).unwrap();
        for key in [
            "fortress_rating",
            "patrol_rating",
            "patrol_rating_droids",
            "tick_length",
            "training_rate",
            "forge_soldiers",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
