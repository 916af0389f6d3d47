//! Progress accounting and quiescence detection
//!
//! The coordinator cannot tell that a crawl is over just by looking at an
//! empty queue: a worker in the middle of a fetch may still discover another
//! page. Instead it counts monitoring ticks in which nothing happened and
//! only stops after enough of them in a row.

/// Counters owned and updated by the coordinator's monitoring loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    /// Listing pages queued so far, seed included; never decreases
    pub pages_discovered: u64,

    /// Detail records forwarded to the sink
    pub records_processed: u64,

    /// Consecutive monitoring ticks without progress
    pub idle_ticks: u32,

    /// `TaskDone` markers received
    pub tasks_completed: u64,

    /// Records the sink failed to store
    pub sink_failures: u64,

    /// Workers replaced after dying unexpectedly
    pub worker_restarts: u64,

    /// Tasks put back on the queue after their worker crashed
    pub tasks_redelivered: u64,

    /// Pages reported after stop and therefore never queued
    pub late_pages_dropped: u64,

    /// Crashed tasks dropped after reaching the redelivery limit
    pub tasks_abandoned: u64,
}

/// What the coordinator saw during one monitoring tick
#[derive(Debug, Clone, Copy)]
pub struct TickObservation {
    pub pages_discovered: u64,
    pub records_processed: u64,
    /// Messages of any kind drained this tick
    pub drained: usize,
    pub queue_empty: bool,
    /// Workers currently holding a task
    pub in_flight: usize,
}

/// Outcome of feeding one tick to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickVerdict {
    /// Something happened or work is still queued
    Busy,

    /// Nothing happened; not yet enough idle ticks to stop
    Idle { idle_ticks: u32 },

    /// Quiescent, but fewer pages than expected were found; waiting longer
    Extended { pages_short: u64, extensions: u32 },

    /// Quiescent; the crawl should stop
    Quiescent,

    /// Still short of the expected page count after every allowed extension
    ShortfallCeiling { pages_short: u64 },
}

impl TickVerdict {
    /// Returns true if the coordinator should raise the stop signal
    pub fn should_stop(&self) -> bool {
        matches!(self, Self::Quiescent | Self::ShortfallCeiling { .. })
    }
}

/// Idle-tick based quiescence detector
#[derive(Debug, Clone)]
pub struct QuiescenceDetector {
    threshold: u32,
    expected_pages: Option<u64>,
    max_extensions: u32,
    idle_ticks: u32,
    extensions: u32,
    last_pages: u64,
    last_records: u64,
}

impl QuiescenceDetector {
    /// Creates a detector that stops after `threshold` consecutive idle ticks
    ///
    /// When `expected_pages` is set and the crawl goes quiet short of it, the
    /// idle count is halved instead of stopping, at most `max_extensions` times.
    pub fn new(threshold: u32, expected_pages: Option<u64>, max_extensions: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            expected_pages,
            max_extensions,
            idle_ticks: 0,
            extensions: 0,
            last_pages: 0,
            last_records: 0,
        }
    }

    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    pub fn extensions(&self) -> u32 {
        self.extensions
    }

    /// Feeds one monitoring tick and decides whether to keep going
    pub fn observe(&mut self, tick: TickObservation) -> TickVerdict {
        let progressed =
            tick.pages_discovered > self.last_pages || tick.records_processed > self.last_records;
        self.last_pages = self.last_pages.max(tick.pages_discovered);
        self.last_records = self.last_records.max(tick.records_processed);

        if progressed || tick.drained > 0 || !tick.queue_empty {
            self.idle_ticks = 0;
            return TickVerdict::Busy;
        }

        self.idle_ticks = self.idle_ticks.saturating_add(1);

        // A busy worker holds the count at the threshold until it reports back
        if tick.in_flight > 0 {
            self.idle_ticks = self.idle_ticks.min(self.threshold);
        }

        if tick.in_flight > 0 || self.idle_ticks < self.threshold {
            return TickVerdict::Idle {
                idle_ticks: self.idle_ticks,
            };
        }

        let pages_short = self
            .expected_pages
            .map_or(0, |expected| expected.saturating_sub(tick.pages_discovered));

        if pages_short == 0 {
            return TickVerdict::Quiescent;
        }

        if self.extensions >= self.max_extensions {
            return TickVerdict::ShortfallCeiling { pages_short };
        }

        self.extensions += 1;
        self.idle_ticks = self.threshold / 2;
        TickVerdict::Extended {
            pages_short,
            extensions: self.extensions,
        }
    }
}
