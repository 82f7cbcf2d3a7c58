//! Seasonal weather model.
//!
//! Only two outcomes matter to combat: whether it rains (cautious species
//! fight worse) and whether the rain is warm enough to be wet (tusked
//! species fight better). Wind and darkness are not modelled.
use serde::{Deserialize, Serialize};

use crate::config::{Biome, SimConfig};
use crate::numbers::{count_to_i64, i64_to_f64, round_f64_to_i64};
use crate::state::TrialState;
use crate::stats::TrialStats;

/// Sky condition rolled by the weather update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Sky {
    #[default]
    Rain,
    Clouds,
    Clear,
}

impl Sky {
    #[must_use]
    pub const fn from_roll(sky: i64) -> Self {
        match sky {
            0 => Self::Rain,
            1 | 2 => Self::Clouds,
            _ => Self::Clear,
        }
    }
}

/// Season index for the current day. Non-elliptical orbits can produce a
/// fifth season (index 4) on the last days of the year.
#[must_use]
pub fn season(config: &SimConfig, day: i64) -> i64 {
    let orbit = i64_to_f64(count_to_i64(config.orbit));
    if config.elliptical {
        let length = round_f64_to_i64(orbit / 6.0).max(1);
        let raw = i64_to_f64(day / length);
        round_f64_to_i64(raw * 4.0 / 6.0).min(3)
    } else {
        let length = round_f64_to_i64(orbit / 4.0).max(1);
        day / length
    }
}

/// Advance the calendar one day and maybe roll new weather; counts rainy
/// and wet engagements.
pub fn update_weather(config: &SimConfig, state: &mut TrialState, stats: &mut TrialStats) {
    state.day += 1;
    if state.day >= count_to_i64(config.orbit) {
        state.day = 0;
    }

    if state.rng.one_in(5) {
        roll_weather(config, state);
    }

    if state.weather == Sky::Rain {
        stats.rainy += 1;
        if state.temperature > 0 {
            stats.wet += 1;
        }
    }
}

fn roll_weather(config: &SimConfig, state: &mut TrialState) {
    let season = season(config, state.day);
    let rng = &mut state.rng;
    let mut temp = rng.draw(0, 3);
    let mut sky = rng.draw(0, 5);

    match config.biome {
        Biome::Oceanic | Biome::Swamp => {
            if sky > 0 && rng.one_in(3) {
                sky -= 1;
            }
        }
        Biome::Tundra | Biome::Taiga => {
            if season == 3 {
                temp = 0;
            } else if temp > 0 && rng.one_in(2) {
                temp -= 1;
            }
        }
        Biome::Desert => {
            if sky < 4 && rng.one_in(2) {
                sky += 1;
            }
        }
        Biome::Ashland | Biome::Volcanic => {
            if config.biome == Biome::Ashland && rng.one_in(2) {
                if sky < 1 {
                    sky += 1;
                } else if sky > 2 {
                    sky -= 1;
                }
            }
            if season == 1 {
                temp = 2;
            } else if temp < 2 && rng.one_in(2) {
                temp += 1;
            }
        }
        _ => {}
    }

    match season {
        0 => {
            if sky > 0 && rng.one_in(3) {
                sky -= 1;
            }
        }
        1 => {
            if temp < 2 && rng.one_in(3) {
                temp += 1;
            }
        }
        3 => {
            if temp > 0 && rng.one_in(3) {
                temp -= 1;
            }
        }
        _ => {}
    }

    state.weather = Sky::from_roll(sky);

    if temp == 0 {
        let warm_floor = season == 1
            || config.biome == Biome::Hellscape
            || (config.biome == Biome::Eden && season != 3);
        let floor = u8::from(warm_floor);
        state.temperature = state.temperature.saturating_sub(1).max(floor);
    } else if temp == 2 {
        let cool_ceiling = season == 3 || (config.biome == Biome::Eden && season != 1);
        let ceiling = if cool_ceiling { 1 } else { 2 };
        state.temperature = (state.temperature + 1).min(ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_rolls_map_to_conditions() {
        assert_eq!(Sky::from_roll(0), Sky::Rain);
        assert_eq!(Sky::from_roll(2), Sky::Clouds);
        assert_eq!(Sky::from_roll(4), Sky::Clear);
    }

    #[test]
    fn seasons_split_the_orbit() {
        let config = SimConfig {
            orbit: 400,
            ..SimConfig::default()
        };
        assert_eq!(season(&config, 0), 0);
        assert_eq!(season(&config, 150), 1);
        assert_eq!(season(&config, 399), 3);

        let elliptical = SimConfig {
            elliptical: true,
            ..config
        };
        // six slices of 67 days squeezed into four seasons
        assert_eq!(season(&elliptical, 0), 0);
        assert_eq!(season(&elliptical, 140), 1);
        assert_eq!(season(&elliptical, 399), 3);
    }

    #[test]
    fn day_wraps_at_orbit() {
        let config = SimConfig {
            orbit: 10,
            ..SimConfig::default()
        };
        let mut state = TrialState::new(&config, 1, 3);
        let mut stats = TrialStats::seeded(&config);
        state.day = 9;
        update_weather(&config, &mut state, &mut stats);
        assert_eq!(state.day, 0);
    }

    #[test]
    fn hellscape_never_freezes() {
        let config = SimConfig {
            biome: Biome::Hellscape,
            ..SimConfig::default()
        };
        let mut state = TrialState::new(&config, 1, 21);
        let mut stats = TrialStats::seeded(&config);
        for _ in 0..2_000 {
            update_weather(&config, &mut state, &mut stats);
            assert!((1..=2).contains(&state.temperature));
        }
        assert!(stats.rainy >= stats.wet);
        assert_eq!(stats.rainy, stats.wet);
    }
}
