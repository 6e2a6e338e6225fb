//! Wall-clock timing of integration phases.
//!
//! Phases are recorded by name:
//!
//! | Phase | Covers |
//! |-------|--------|
//! | `candidates` | Candidate generation and assignment for a batch |
//! | `integrate` | Parallel surface pass |
//! | `integrate/clear` | Parallel clearing pass |
//! | `inserting_missed_blocks` | Fold-back of staged blocks |
//! | `merge` | Merge sweep over the ledger |
//!
//! ## Usage
//!
//! ```rust,ignore
//! let start = std::time::Instant::now();
//! // ... run the pass ...
//! timer.record("integrate", start.elapsed());
//!
//! for phase in timer.stats() {
//!     println!("{}", phase.summary());
//! }
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Timing statistics for one phase.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Phase name.
    pub name: String,

    /// Number of recorded runs.
    pub count: usize,

    /// Total time spent (milliseconds).
    pub total_ms: f32,

    /// Mean duration (milliseconds).
    pub mean_ms: f32,

    /// Minimum duration (milliseconds).
    pub min_ms: f32,

    /// Maximum duration (milliseconds).
    pub max_ms: f32,
}

impl PhaseTiming {
    /// Format as a single line.
    pub fn summary(&self) -> String {
        format!(
            "{}: {:.3} ms mean (min: {:.3}, max: {:.3}, n={})",
            self.name, self.mean_ms, self.min_ms, self.max_ms, self.count
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Accumulator {
    count: usize,
    total: Duration,
    min: Duration,
    max: Duration,
}

impl Accumulator {
    fn new(first: Duration) -> Self {
        Self {
            count: 1,
            total: first,
            min: first,
            max: first,
        }
    }

    fn add(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
    }
}

/// Running per-phase timing.
#[derive(Clone, Debug, Default)]
pub struct PhaseTimer {
    phases: BTreeMap<&'static str, Accumulator>,
}

impl PhaseTimer {
    /// Empty timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one run of `phase`.
    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        self.phases
            .entry(phase)
            .and_modify(|acc| acc.add(elapsed))
            .or_insert_with(|| Accumulator::new(elapsed));
    }

    /// Run `f` and record its duration under `phase`.
    pub fn time<T>(&mut self, phase: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(phase, start.elapsed());
        out
    }

    /// Statistics for one phase.
    pub fn get(&self, phase: &str) -> Option<PhaseTiming> {
        self.phases.get(phase).map(|acc| to_timing(phase, acc))
    }

    /// Statistics for every recorded phase, by name.
    pub fn stats(&self) -> Vec<PhaseTiming> {
        self.phases
            .iter()
            .map(|(name, acc)| to_timing(name, acc))
            .collect()
    }

    /// Forget all recordings.
    pub fn reset(&mut self) {
        self.phases.clear();
    }
}

fn to_timing(name: &str, acc: &Accumulator) -> PhaseTiming {
    let total_ms = acc.total.as_secs_f32() * 1000.0;
    PhaseTiming {
        name: name.to_string(),
        count: acc.count,
        total_ms,
        mean_ms: total_ms / acc.count as f32,
        min_ms: acc.min.as_secs_f32() * 1000.0,
        max_ms: acc.max.as_secs_f32() * 1000.0,
    }
}
