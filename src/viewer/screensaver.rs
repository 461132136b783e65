//! Idle detection and screensaver auto-advance timing.
//!
//! After `idle_delay` without interaction the screensaver activates, then
//! jumps to a random other image every `interval` until the next interaction.

use crate::config::ViewerConfig;
use rand::Rng;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreensaverConfig {
    pub idle_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ScreensaverConfig {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for ScreensaverConfig {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            idle_delay: config.idle_delay,
            interval: config.interval,
            max_attempts: config.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreensaverTick {
    Activated,
    Advance(usize),
}

/// Idle detection and auto-advance timing.
///
/// Two deadlines, never both set: `idle_deadline` while browsing,
/// `advance_deadline` while active. [`reset`](Self::reset) replaces both in
/// one step.
#[derive(Debug, Clone)]
pub struct Screensaver {
    config: ScreensaverConfig,
    total: usize,
    active: bool,
    idle_deadline: Option<Instant>,
    advance_deadline: Option<Instant>,
}

impl Screensaver {
    pub fn new(config: ScreensaverConfig, total: usize, now: Instant) -> Self {
        let mut screensaver = Self {
            config,
            total,
            active: false,
            idle_deadline: None,
            advance_deadline: None,
        };
        screensaver.reset(now);
        screensaver
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// An interaction happened: deactivate, drop any pending advance and
    /// restart the idle countdown from `now`.
    pub fn reset(&mut self, now: Instant) {
        self.active = false;
        self.advance_deadline = None;
        self.idle_deadline = (self.total > 1).then(|| now + self.config.idle_delay);
    }

    /// Cancel both timers for good.
    pub fn stop(&mut self) {
        self.active = false;
        self.idle_deadline = None;
        self.advance_deadline = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.idle_deadline.or(self.advance_deadline)
    }

    pub fn poll<R: Rng>(
        &mut self,
        now: Instant,
        current: usize,
        rng: &mut R,
    ) -> Option<ScreensaverTick> {
        if let Some(deadline) = self.idle_deadline.filter(|&d| now >= d) {
            self.active = true;
            self.idle_deadline = None;
            self.advance_deadline = Some(self.after(deadline, now));
            return Some(ScreensaverTick::Activated);
        }
        if let Some(deadline) = self.advance_deadline.filter(|&d| now >= d) {
            self.advance_deadline = Some(self.after(deadline, now));
            let next = pick_index(current, self.total, self.config.max_attempts, rng);
            return Some(ScreensaverTick::Advance(next));
        }
        None
    }

    /// One interval after `deadline`, or after `now` if that is already past.
    fn after(&self, deadline: Instant, now: Instant) -> Instant {
        let next = deadline + self.config.interval;
        if next > now {
            next
        } else {
            now + self.config.interval
        }
    }
}

/// Random index different from `current`, giving up after `max_attempts` draws.
pub fn pick_index<R: Rng>(
    current: usize,
    total: usize,
    max_attempts: u32,
    rng: &mut R,
) -> usize {
    if total <= 1 {
        return current;
    }
    let mut candidate = current;
    let mut attempts = 0;
    while candidate == current && attempts < max_attempts {
        candidate = rng.random_range(0..total);
        attempts += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const S: Duration = Duration::from_secs(1);

    #[test]
    fn activates_after_idle_delay() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut ss = Screensaver::new(ScreensaverConfig::default(), 3, t0);
        assert_eq!(ss.next_deadline(), Some(t0 + 25 * S));
        assert_eq!(ss.poll(t0 + 24 * S, 0, &mut rng), None);
        assert_eq!(
            ss.poll(t0 + 25 * S, 0, &mut rng),
            Some(ScreensaverTick::Activated)
        );
        assert!(ss.is_active());
        assert_eq!(ss.next_deadline(), Some(t0 + 31 * S));
    }

    #[test]
    fn advances_on_interval_to_a_different_image() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(7);
        let mut ss = Screensaver::new(ScreensaverConfig::default(), 5, t0);
        ss.poll(t0 + 25 * S, 2, &mut rng);
        match ss.poll(t0 + 31 * S, 2, &mut rng) {
            Some(ScreensaverTick::Advance(next)) => {
                assert_ne!(next, 2);
                assert!(next < 5);
            }
            other => panic!("expected advance, got {other:?}"),
        }
        assert_eq!(ss.next_deadline(), Some(t0 + 37 * S));
    }

    #[test]
    fn reset_clears_both_timers() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(3);
        let mut ss = Screensaver::new(ScreensaverConfig::default(), 3, t0);
        ss.poll(t0 + 25 * S, 0, &mut rng);

        ss.reset(t0 + 26 * S);
        assert!(!ss.is_active());
        assert_eq!(ss.next_deadline(), Some(t0 + 51 * S));
        // the old advance deadline no longer fires
        assert_eq!(ss.poll(t0 + 31 * S, 0, &mut rng), None);
    }

    #[test]
    fn single_image_never_activates() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(3);
        let mut ss = Screensaver::new(ScreensaverConfig::default(), 1, t0);
        assert_eq!(ss.next_deadline(), None);
        assert_eq!(ss.poll(t0 + 1000 * S, 0, &mut rng), None);
    }

    #[test]
    fn stop_is_final_until_reset() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(3);
        let mut ss = Screensaver::new(ScreensaverConfig::default(), 3, t0);
        ss.stop();
        assert_eq!(ss.next_deadline(), None);
        assert_eq!(ss.poll(t0 + 100 * S, 0, &mut rng), None);
    }

    #[test]
    fn late_poll_does_not_burst() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(3);
        let mut ss = Screensaver::new(ScreensaverConfig::default(), 3, t0);
        ss.poll(t0 + 25 * S, 0, &mut rng);
        ss.poll(t0 + 100 * S, 0, &mut rng);
        assert_eq!(ss.next_deadline(), Some(t0 + 106 * S));
    }

    #[test]
    fn pick_avoids_current_with_enough_attempts() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let next = pick_index(1, 4, 100, &mut rng);
            assert_ne!(next, 1);
        }
    }

    #[test]
    fn pick_is_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        // zero attempts never draws
        assert_eq!(pick_index(1, 4, 0, &mut rng), 1);
        assert_eq!(pick_index(0, 1, 10, &mut rng), 0);
        assert!(pick_index(0, 2, 1, &mut rng) < 2);
    }
}
