use std::time::Duration;

/// Fixed-rate step accumulator. Feeds real elapsed time in and hands back how
/// many whole steps have passed, so a game can run at its own rate regardless
/// of the host tick.
#[derive(Clone, Debug)]
pub struct Interval {
    period: Duration,
    acc: Duration,
    max_catch_up: Option<u32>,
}

impl Interval {
    /// Simulation steps. A long stall (terminal suspended, debugger) replays
    /// at most a few steps instead of minutes of simulation.
    pub fn new(period: Duration) -> Self {
        const MAX_CATCH_UP: u32 = 8;
        Self {
            period,
            acc: Duration::ZERO,
            max_catch_up: Some(MAX_CATCH_UP),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Wall-clock counter: every elapsed period is reported, however long
    /// the stall.
    pub fn clock(period: Duration) -> Self {
        Self {
            max_catch_up: None,
            ..Self::new(period)
        }
    }

    /// Returns the number of steps that elapsed.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        self.acc += dt;
        let due = (self.acc.as_nanos() / self.period.as_nanos().max(1)) as u32;
        match self.max_catch_up {
            Some(cap) if due > cap => {
                self.acc = Duration::ZERO;
                cap
            }
            _ => {
                self.acc -= self.period * due;
                due
            }
        }
    }

    pub fn reset(&mut self) {
        self.acc = Duration::ZERO;
    }

    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Single-shot deferred callback. Fires exactly once after `start`, unless
/// cancelled first.
#[derive(Clone, Debug, Default)]
pub struct Delay {
    remaining: Option<Duration>,
}

impl Delay {
    pub fn start(&mut self, after: Duration) {
        self.remaining = Some(after);
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }

    /// Fires on the tick the delay expires, handing back the part of `dt`
    /// left over past the deadline so a follow-up delay can be chained
    /// without drift. `None` before, after, and while idle.
    pub fn advance(&mut self, dt: Duration) -> Option<Duration> {
        match self.remaining {
            Some(left) if left <= dt => {
                self.remaining = None;
                Some(dt - left)
            }
            Some(left) => {
                self.remaining = Some(left - dt);
                None
            }
            None => None,
        }
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_counts_whole_steps_and_keeps_remainder() {
        let mut iv = Interval::from_millis(110);
        assert_eq!(iv.advance(ms(100)), 0);
        assert_eq!(iv.advance(ms(20)), 1);
        assert_eq!(iv.advance(ms(210)), 2);
    }

    #[test]
    fn interval_caps_catch_up() {
        let mut iv = Interval::from_millis(10);
        assert_eq!(iv.advance(Duration::from_secs(60)), 8);
        assert_eq!(iv.advance(ms(5)), 0);
    }

    #[test]
    fn clock_counts_every_period_after_a_stall() {
        let mut clock = Interval::clock(ms(1000));
        assert_eq!(clock.advance(ms(600)), 0);
        assert_eq!(clock.advance(Duration::from_secs(30)), 30);
        assert_eq!(clock.advance(ms(400)), 1);
    }

    #[test]
    fn delay_fires_once() {
        let mut d = Delay::default();
        d.start(ms(900));
        assert_eq!(d.advance(ms(500)), None);
        assert!(d.is_pending());
        assert_eq!(d.advance(ms(400)), Some(Duration::ZERO));
        assert!(!d.is_pending());
        assert_eq!(d.advance(ms(1000)), None);
    }

    #[test]
    fn delay_hands_back_the_overshoot() {
        let mut d = Delay::default();
        d.start(ms(100));
        assert_eq!(d.advance(ms(130)), Some(ms(30)));
    }

    #[test]
    fn cancelled_delay_never_fires() {
        let mut d = Delay::default();
        d.start(ms(100));
        d.cancel();
        assert_eq!(d.advance(ms(1000)), None);
    }
}
