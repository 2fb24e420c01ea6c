/// Per-character step limiter. A character that walked slower than the
/// interval banks the surplus of its last three steps and may spend it on
/// a short burst.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepThrottle {
    reserves: [i64; 3],
    next_step_at: i64,
    last_surplus: i64,
}

impl StepThrottle {
    pub fn try_step(&mut self, now_ms: i64, interval_ms: i64) -> bool {
        let diff = now_ms - self.next_step_at;
        let banked: i64 = self.reserves.iter().sum();
        if diff + banked < 0 {
            return false;
        }
        let surplus = diff.max(0);
        self.reserves = [surplus, self.reserves[0], self.reserves[1]];
        self.last_surplus = surplus;
        self.next_step_at = now_ms + interval_ms;
        true
    }

    pub fn next_step_at(&self) -> i64 {
        self.next_step_at
    }

    pub fn banked(&self) -> i64 {
        self.reserves.iter().sum()
    }

    pub fn last_surplus(&self) -> i64 {
        self.last_surplus
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_walking_is_allowed_at_the_interval() {
        let mut throttle = StepThrottle::default();
        assert!(throttle.try_step(0, 180));
        assert!(!throttle.try_step(100, 180));
        assert!(throttle.try_step(180, 180));
        assert!(throttle.try_step(360, 180));
        assert_eq!(throttle.next_step_at(), 540);
    }

    #[test]
    fn banked_surplus_allows_a_short_burst() {
        let mut throttle = StepThrottle::default();
        assert!(throttle.try_step(0, 180));
        assert!(throttle.try_step(500, 180));
        assert_eq!(throttle.banked(), 320);
        assert_eq!(throttle.last_surplus(), 320);
        assert!(throttle.try_step(600, 180));
        assert!(throttle.try_step(610, 180));
        assert!(throttle.try_step(620, 180));
        assert_eq!(throttle.banked(), 0);
        assert!(!throttle.try_step(630, 180));
    }

    #[test]
    fn denied_steps_do_not_change_state() {
        let mut throttle = StepThrottle::default();
        assert!(throttle.try_step(0, 90));
        let before = throttle.clone();
        assert!(!throttle.try_step(10, 90));
        assert_eq!(throttle, before);
        throttle.reset();
        assert!(throttle.try_step(10, 90));
    }
}
