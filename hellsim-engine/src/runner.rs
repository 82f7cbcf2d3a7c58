//! Trial runner: drives one trial to completion in cooperative slices.
//!
//! A slice runs ticks until the trial ends, the stop flag is raised or the
//! wall-clock budget is spent. The budget is only checked at engagement
//! boundaries, so a slice always ends on a whole engagement period.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::constants::PROGRESS_COMPLETE;
use crate::numbers::u64_to_f64;
use crate::state::TrialState;
use crate::stats::TrialStats;
use crate::tick::{TickOutcome, advance, is_engagement_tick};

/// Receives progress increments, in whole percent of one trial.
pub trait ProgressSink {
    fn progress(&mut self, increment: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8),
{
    fn progress(&mut self, increment: u8) {
        (*self)(increment);
    }
}

/// Identity and seed of one trial in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialTicket {
    pub trial_id: u64,
    pub seed: u64,
}

/// How a finished trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialEnding {
    Survived,
    WallsFell,
    PatrolsLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Budget spent; call `run_slice` again to continue.
    Yielded,
    Finished(TrialEnding),
    /// The stop flag was seen; the statistics are partial.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct TrialRunner {
    config: Arc<SimConfig>,
    state: TrialState,
    stats: TrialStats,
    ending: Option<TrialEnding>,
}

/// Digits needed to print every trial number of a batch.
fn id_width(batch_size: u64) -> usize {
    usize::try_from(batch_size.max(1).ilog10()).unwrap_or(0) + 1
}

impl TrialRunner {
    /// Set up a trial with a configuration-seeded accumulator and log its
    /// header.
    #[must_use]
    pub fn new(config: Arc<SimConfig>, ticket: TrialTicket, batch_size: u64) -> Self {
        let state = TrialState::new(&config, ticket.trial_id, ticket.seed);
        let mut stats = TrialStats::seeded(&config);
        let width = id_width(batch_size);
        stats.append_log(&format!(" -- Sim {:0width$} --\n", ticket.trial_id));
        log::trace!(
            "trial {} starts: {} ticks of {:.1} ms",
            ticket.trial_id,
            state.ticks,
            state.tick_length
        );
        Self {
            config,
            state,
            stats,
            ending: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &TrialState {
        &self.state
    }

    #[must_use]
    pub const fn stats(&self) -> &TrialStats {
        &self.stats
    }

    #[must_use]
    pub const fn ending(&self) -> Option<TrialEnding> {
        self.ending
    }

    /// Hand back the accumulator, complete or partial.
    #[must_use]
    pub fn into_stats(self) -> TrialStats {
        self.stats
    }

    /// Run ticks until the trial ends, `stop` is raised, or `budget` elapses.
    pub fn run_slice(
        &mut self,
        budget: Duration,
        stop: &AtomicBool,
        sink: &mut dyn ProgressSink,
    ) -> SliceOutcome {
        if let Some(ending) = self.ending {
            return SliceOutcome::Finished(ending);
        }
        if stop.load(Ordering::Acquire) {
            return SliceOutcome::Stopped;
        }

        let started = Instant::now();
        while !self.state.is_complete() {
            let outcome = advance(&self.config, &mut self.state, &mut self.stats);
            match outcome {
                TickOutcome::Continue => {}
                TickOutcome::WallsFell => return self.finish(TrialEnding::WallsFell, sink),
                TickOutcome::PatrolsLost => return self.finish(TrialEnding::PatrolsLost, sink),
            }

            if is_engagement_tick(self.state.tick) {
                self.report_progress(sink);
                if started.elapsed() > budget {
                    return SliceOutcome::Yielded;
                }
            }
            if stop.load(Ordering::Acquire) {
                return SliceOutcome::Stopped;
            }
        }
        self.finish(TrialEnding::Survived, sink)
    }

    /// Drive slices back to back until the trial ends.
    pub fn run_to_end(&mut self, sink: &mut dyn ProgressSink) -> TrialEnding {
        let never = AtomicBool::new(false);
        loop {
            if let SliceOutcome::Finished(ending) = self.run_slice(Duration::MAX, &never, sink) {
                return ending;
            }
        }
    }

    fn report_progress(&mut self, sink: &mut dyn ProgressSink) {
        let ticks = self.state.ticks.max(1);
        let percent = (100 * self.state.tick / ticks).min(u64::from(PROGRESS_COMPLETE));
        let percent = u8::try_from(percent).unwrap_or(PROGRESS_COMPLETE);
        let increment = percent.saturating_sub(self.state.progress);
        if increment >= 1 {
            sink.progress(increment);
            self.state.progress = percent;
        }
    }

    fn finish(&mut self, ending: TrialEnding, sink: &mut dyn ProgressSink) -> SliceOutcome {
        let state = &self.state;
        if ending == TrialEnding::Survived {
            self.stats.append_log(&format!(
                "Survived!\nDefenders: {},  Garrison: {},  Walls: {}\nPatrols remaining: {} out of {}\n\n",
                state.defenders(&self.config),
                state.garrison(),
                state.walls,
                state.patrols,
                self.config.patrols
            ));
        }
        if state.progress < PROGRESS_COMPLETE {
            sink.progress(PROGRESS_COMPLETE - state.progress);
            self.state.progress = PROGRESS_COMPLETE;
        }
        self.stats.record_patrols_survived(self.state.patrols);
        log::trace!(
            "trial {} ended {ending:?} after {:.1} hours",
            self.state.trial_id,
            u64_to_f64(self.state.tick) * self.state.tick_length / 3_600_000.0
        );
        self.ending = Some(ending);
        SliceOutcome::Finished(ending)
    }
}
