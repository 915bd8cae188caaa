//! The Monotonic Clock.

/// Minimum increment enforced when the underlying time source stalls or
/// regresses.
const EPSILON: f64 = 1e-4;

/// A host-supplied time source, wrapped to guarantee strictly increasing
/// readings.
///
/// `now()` returns a value strictly greater than any previous return. If
/// the underlying source returns a value `<= previous`, the clock
/// returns `previous + EPSILON` instead. There are no failure modes.
pub struct MonotonicClock<F: FnMut() -> f64> {
    source: F,
    previous: Option<f64>,
}

impl<F: FnMut() -> f64> MonotonicClock<F> {
    /// Wraps `source` in a strictly-increasing clock.
    pub fn new(source: F) -> Self {
        Self {
            source,
            previous: None,
        }
    }

    /// Returns a value strictly greater than any previous return.
    pub fn now(&mut self) -> f64 {
        let raw = (self.source)();
        let next = match self.previous {
            Some(previous) if raw <= previous => previous + EPSILON,
            _ => raw,
        };
        self.previous = Some(next);
        next
    }

    /// The last value returned by `now()`, if any.
    pub fn last(&self) -> Option<f64> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_strictly_increasing_source() {
        let mut values = vec![1.0, 2.0, 3.0].into_iter();
        let mut clock = MonotonicClock::new(move || values.next().unwrap());
        assert_eq!(clock.now(), 1.0);
        assert_eq!(clock.now(), 2.0);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn bumps_epsilon_when_source_stalls() {
        let mut clock = MonotonicClock::new(|| 5.0);
        assert_eq!(clock.now(), 5.0);
        assert_eq!(clock.now(), 5.0 + EPSILON);
        assert_eq!(clock.now(), 5.0 + 2.0 * EPSILON);
    }

    #[test]
    fn bumps_epsilon_when_source_regresses() {
        let mut values = vec![10.0, 3.0].into_iter();
        let mut clock = MonotonicClock::new(move || values.next().unwrap());
        assert_eq!(clock.now(), 10.0);
        assert_eq!(clock.now(), 10.0 + EPSILON);
    }

    proptest::proptest! {
        #[test]
        fn always_strictly_increasing(raws in proptest::collection::vec(-1e6f64..1e6, 1..50)) {
            let count = raws.len();
            let mut iter = raws.into_iter();
            let mut clock = MonotonicClock::new(move || iter.next().unwrap());
            let mut previous: Option<f64> = None;
            for _ in 0..count {
                let v = clock.now();
                if let Some(p) = previous {
                    prop_assert!(v > p);
                }
                previous = Some(v);
            }
        }
    }
}
