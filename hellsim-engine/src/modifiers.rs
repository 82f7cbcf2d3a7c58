//! Rule-table primitives: trait ranks, thrall strength and population scaling.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Astrology, SimConfig, Thralls};

/// Rank of a species trait. Every ranked modifier picks one of seven values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum TraitRank {
    Tenth,
    Quarter,
    Half,
    One,
    Two,
    Three,
    Four,
}

impl TraitRank {
    /// Pick the value for this rank from a `[0.1, 0.25, 0.5, 1, 2, 3, 4]` table.
    #[must_use]
    pub const fn select<T: Copy>(self, table: [T; 7]) -> T {
        match self {
            Self::Tenth => table[0],
            Self::Quarter => table[1],
            Self::Half => table[2],
            Self::One => table[3],
            Self::Two => table[4],
            Self::Three => table[5],
            Self::Four => table[6],
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.select([0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 4.0])
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("trait rank must be one of 0.1, 0.25, 0.5, 1, 2, 3, 4 (got {0})")]
pub struct InvalidTraitRank(pub f64);

impl TryFrom<f64> for TraitRank {
    type Error = InvalidTraitRank;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        const RANKS: [(f64, TraitRank); 7] = [
            (0.1, TraitRank::Tenth),
            (0.25, TraitRank::Quarter),
            (0.5, TraitRank::Half),
            (1.0, TraitRank::One),
            (2.0, TraitRank::Two),
            (3.0, TraitRank::Three),
            (4.0, TraitRank::Four),
        ];
        RANKS
            .iter()
            .find(|(rank, _)| (rank - value).abs() < 1e-9)
            .map(|(_, rank)| *rank)
            .ok_or(InvalidTraitRank(value))
    }
}

impl From<TraitRank> for f64 {
    fn from(rank: TraitRank) -> Self {
        rank.value()
    }
}

/// Apply a ranked trait: the table value when the trait is present, `absent` otherwise.
#[must_use]
pub fn ranked<T: Copy>(rank: Option<TraitRank>, table: [T; 7], absent: T) -> T {
    rank.map_or(absent, |rank| rank.select(table))
}

/// Effective strength of a captive race, scaled by the nightmare level.
///
/// At most 100 captives count; captives beyond the torturer count lose a
/// third of their excess.
#[must_use]
pub fn fathom(thralls: &Thralls, captives: u32) -> f64 {
    let mut active = captives.min(100);
    if thralls.torturers > 0 && active > thralls.torturers {
        active -= (active - thralls.torturers).div_ceil(3);
    }
    (f64::from(active) / 100.0) * (f64::from(thralls.nightmare) / 5.0)
}

/// Astrologer/unfavored scaling applied to every zodiac bonus.
#[must_use]
pub fn astro_mod(config: &SimConfig) -> f64 {
    let traits = &config.traits;
    let mut modifier = 1.0;
    if let Some(rank) = traits.astrologer {
        let bonus = rank.select([0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        if traits.unfavored.is_some() {
            modifier -= bonus;
        } else {
            modifier += bonus;
        }
    }
    if let Some(rank) = traits.unfavored {
        modifier *= rank.select([-1.75, -1.5, -1.25, -1.0, -0.75, -0.5, -0.25]);
    }
    modifier
}

/// Citizens represented by one soldier slot (high population species).
#[must_use]
pub fn pop_factor(config: &SimConfig) -> u32 {
    ranked(config.traits.high_pop, [2, 2, 3, 4, 5, 6, 7], 1)
}

/// Soldier slots contributed by one war droid.
#[must_use]
pub fn droid_size(config: &SimConfig) -> u32 {
    pop_factor(config) * if config.enhanced_droids { 2 } else { 1 }
}

/// Whether the active zodiac sign is `sign`.
#[must_use]
pub fn is_sign(config: &SimConfig, sign: Astrology) -> bool {
    config.astrology == sign
}
