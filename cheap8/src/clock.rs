//! Scheduler clocks.
//!
//! A `Clock` tracks a fixed-period deadline against the monotonic host
//! clock. Deadlines advance by whole periods from the previous deadline,
//! never from the current time, so an oversleeping cycle shortens the
//! next wait instead of dragging the overall rate. Under test the host
//! clock is a fake that only moves when advanced, which keeps scheduler
//! behavior testable against simulated time.
use std::time::Duration;

#[cfg(test)]
use fake_clock::FakeClock as Instant;
#[cfg(not(test))]
use std::time::Instant;

#[cfg(not(test))]
use spin_sleep::sleep;
#[cfg(test)]
fn sleep(duration: Duration) {
    fake_clock::FakeClock::advance_time(duration.as_millis() as u64);
}

pub(crate) struct Clock {
    epoch: Instant,
    /// Offset of the most recently fired deadline from `epoch`.
    fired: Duration,
    period: Duration,
}

impl Clock {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            fired: Duration::ZERO,
            period,
        }
    }

    /// Restart the deadline schedule from the current time.
    pub(crate) fn reset(&mut self) {
        self.epoch = Instant::now();
        self.fired = Duration::ZERO;
    }

    /// Idle until the next deadline, then advance it by one period.
    pub(crate) fn wait(&mut self) {
        let next = self.fired + self.period;
        let elapsed = self.epoch.elapsed();
        if elapsed < next {
            sleep(next - elapsed);
        }
        self.fired = next;
    }

    /// Fire at most once per call when a full period has elapsed since
    /// the previous deadline.
    ///
    /// A backlog of missed periods is dropped: a clock stalled by a
    /// debugger pause resumes at its usual rate rather than replaying
    /// the ticks it missed.
    pub(crate) fn tick(&mut self) -> bool {
        let elapsed = self.epoch.elapsed();
        if elapsed < self.fired + self.period {
            return false;
        }

        self.fired += self.period;
        if elapsed >= self.fired + self.period {
            self.fired = elapsed;
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fake_clock::FakeClock;

    const TIMER_PERIOD: Duration = Duration::from_nanos(16_666_666);

    /// A 60 Hz clock fires exactly 60 times over one simulated second.
    #[test]
    fn test_sixty_ticks_per_second() {
        let mut clock = Clock::new(TIMER_PERIOD);

        let mut fires = 0;
        for _ in 0..1000 {
            FakeClock::advance_time(1);
            if clock.tick() {
                fires += 1;
            }
        }

        assert_eq!(fires, 60);
    }

    /// A long stall produces a single tick, not a burst.
    #[test]
    fn test_backlog_dropped() {
        let mut clock = Clock::new(TIMER_PERIOD);

        FakeClock::advance_time(500);
        assert!(clock.tick());
        assert!(!clock.tick());

        // The schedule resumes at the usual rate.
        FakeClock::advance_time(17);
        assert!(clock.tick());
        assert!(!clock.tick());
    }

    /// Waiting advances simulated time to each successive deadline.
    #[test]
    fn test_wait_advances_deadlines() {
        let mut clock = Clock::new(Duration::from_millis(10));
        let start = Instant::now();

        clock.wait();
        clock.wait();
        clock.wait();

        assert_eq!(start.elapsed(), Duration::from_millis(30));
    }

    /// An oversleeping cycle shortens the next wait instead of pushing
    /// every later deadline back.
    #[test]
    fn test_deadline_arithmetic() {
        let mut clock = Clock::new(Duration::from_millis(10));
        let start = Instant::now();

        // Half a period late; the next deadline is still at 20ms.
        FakeClock::advance_time(15);
        clock.wait();
        clock.wait();

        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }
}
