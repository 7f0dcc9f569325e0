// src/services/offset.rs

use std::sync::Mutex;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of the per-assignment idle window, in hours.
pub trait OffsetSource: Send + Sync {
    /// Returns a value in `[min_hours, max_hours]`.
    fn draw_hours(&self, min_hours: i64, max_hours: i64) -> i64;
}

/// Uniform draw over the configured window.
pub struct RandomOffset {
    rng: Mutex<StdRng>,
}

impl RandomOffset {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of draws.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl OffsetSource for RandomOffset {
    fn draw_hours(&self, min_hours: i64, max_hours: i64) -> i64 {
        if max_hours <= min_hours {
            return min_hours;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(min_hours..=max_hours)
    }
}

/// Always the same offset, clamped into the window.
pub struct FixedOffset(pub i64);

impl OffsetSource for FixedOffset {
    fn draw_hours(&self, min_hours: i64, max_hours: i64) -> i64 {
        self.0.clamp(min_hours, max_hours.max(min_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_offset_stays_in_window() {
        let source = RandomOffset::seeded(7);
        for _ in 0..200 {
            let h = source.draw_hours(2, 6);
            assert!((2..=6).contains(&h));
        }
    }

    #[test]
    fn test_seeded_offsets_repeat() {
        let a = RandomOffset::seeded(42);
        let b = RandomOffset::seeded(42);
        let draws_a: Vec<i64> = (0..10).map(|_| a.draw_hours(0, 48)).collect();
        let draws_b: Vec<i64> = (0..10).map(|_| b.draw_hours(0, 48)).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_degenerate_window() {
        assert_eq!(RandomOffset::seeded(1).draw_hours(3, 3), 3);
        assert_eq!(FixedOffset(10).draw_hours(0, 4), 4);
        assert_eq!(FixedOffset(-1).draw_hours(0, 4), 0);
    }
}
