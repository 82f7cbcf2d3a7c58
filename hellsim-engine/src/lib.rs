//! Hellsim Engine
//!
//! Monte Carlo simulator for the hell blood war: a per-trial tick state
//! machine (patrols, drones, sieges, soul forge, random events, mercenary
//! economy) and a tokio worker pool that runs batches of seeded trials and
//! folds their statistics into one aggregate.
//!
//! ```no_run
//! use hellsim_engine::{Batch, BatchOptions, SimConfig};
//!
//! # async fn demo() -> Result<(), hellsim_engine::BatchError> {
//! let handle = Batch::start(SimConfig::default(), 100, BatchOptions::default())?;
//! let summary = handle.wait().await?;
//! println!("{} wall failures", summary.stats.wall_fails);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod economy;
pub mod engagement;
pub mod events;
pub mod info;
pub mod modifiers;
pub mod numbers;
pub mod orchestrator;
pub mod ratings;
pub mod rng;
pub mod runner;
pub mod state;
pub mod stats;
pub mod tick;
pub mod weather;

// Re-export commonly used types
pub use config::{
    Astrology, Biome, ConfigError, ForgeMode, Government, Governor, LogOptions, MercMode,
    SimConfig, Thralls, Traits, Universe,
};
pub use events::EventKind;
pub use info::ArmyInfo;
pub use modifiers::{InvalidTraitRank, TraitRank};
pub use orchestrator::{
    Batch, BatchError, BatchEvent, BatchHandle, BatchOptions, BatchSummary, CancelToken,
};
pub use rng::{TrialRng, derive_trial_seed, entropy_seed};
pub use runner::{ProgressSink, SliceOutcome, TrialEnding, TrialRunner, TrialTicket};
pub use state::TrialState;
pub use stats::TrialStats;
pub use tick::{TickOutcome, advance};
pub use weather::Sky;
