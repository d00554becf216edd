use std::time::{Duration, Instant};

/// Fixed-timestep accumulator.
///
/// Each call to [`FixedStep::advance_to`] adds the time elapsed since the previous
/// call to a "running behind" budget and drains it in whole ticks of `step`.
/// The remainder carries over to the next call.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: Duration,
    last: Instant,
    behind: Duration,
    tick_count: u64,
}

impl FixedStep {
    /// Creates a scheduler running `updates_per_sec` ticks per second.
    ///
    /// # Panics
    /// Panics if `updates_per_sec` is not a positive finite number.
    pub fn new(updates_per_sec: f64) -> Self {
        Self::starting_at(updates_per_sec, Instant::now())
    }

    /// Like [`FixedStep::new`] with an explicit baseline.
    pub fn starting_at(updates_per_sec: f64, start: Instant) -> Self {
        assert!(
            updates_per_sec.is_finite() && updates_per_sec > 0.0,
            "updates_per_sec must be positive, got {updates_per_sec}"
        );
        Self {
            step: Duration::from_secs_f64(1.0 / updates_per_sec),
            last: start,
            behind: Duration::ZERO,
            tick_count: 0,
        }
    }

    /// Length of one logical tick.
    #[inline]
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Total ticks produced so far.
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Restarts the baseline and discards any accumulated lag.
    pub fn reset(&mut self, now: Instant) {
        self.last = now;
        self.behind = Duration::ZERO;
    }

    /// Advances to the current time; see [`FixedStep::advance_to`].
    pub fn advance(&mut self) -> u32 {
        self.advance_to(Instant::now())
    }

    /// Advances the clock to `now` and returns how many ticks are due.
    ///
    /// A `now` earlier than the previous call counts as zero elapsed time.
    pub fn advance_to(&mut self, now: Instant) -> u32 {
        self.behind += now.saturating_duration_since(self.last);
        self.last = now;

        let mut due = 0u32;
        while self.behind >= self.step {
            self.behind -= self.step;
            due = due.saturating_add(1);
        }

        self.tick_count = self.tick_count.wrapping_add(u64::from(due));
        due
    }
}
