use rand::Rng;

use crate::config::DurationRange;

/// Draws from an exponential distribution with rate `lambda`
/// (inverse transform of a uniform draw in (0, 1]).
pub fn rand_exponential<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> f64 {
    // gen::<f64>() is in [0, 1); flip it so ln never sees zero.
    let u: f64 = 1.0 - rng.gen::<f64>();
    -u.ln() / lambda
}

/// Draws a duration (ms) from an exponential distribution with mean
/// `range.expectation`, redrawing until it falls within `[min, max]`.
///
/// The loop is unbounded, but for the ranges used in practice (bounds around
/// the expectation) it almost always finishes in a couple of draws.
pub fn sample<R: Rng + ?Sized>(rng: &mut R, range: &DurationRange) -> f64 {
    loop {
        let value = rand_exponential(rng, 1.0) * range.expectation;
        if value >= range.min && value <= range.max {
            return value;
        }
    }
}

/// In-place Fisher-Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let ranges = [
            DurationRange::new(80.0, 60.0, 160.0),
            DurationRange::new(120.0, 80.0, 300.0),
            DurationRange::new(10.0, 0.0, 5.0),
        ];
        for range in &ranges {
            for _ in 0..10_000 {
                let value = sample(&mut rng, range);
                assert!(value >= range.min && value <= range.max, "{} out of {:?}", value, range);
            }
        }
    }

    #[test]
    fn unbounded_range_keeps_the_exponential_mean() {
        let mut rng = StdRng::seed_from_u64(3);
        let range = DurationRange::new(100.0, 0.0, f64::MAX);
        let mean = (0..20_000).map(|_| sample(&mut rng, &range)).sum::<f64>() / 20_000.0;
        assert!((mean - 100.0).abs() < 5.0, "mean was {}", mean);
    }

    #[test]
    fn exponential_draws_are_positive() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            assert!(rand_exponential(&mut rng, 2.0) >= 0.0);
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut items: Vec<usize> = (0..12).collect();
        shuffle(&mut rng, &mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_visits_every_position() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut first_positions = [0usize; 4];
        for _ in 0..400 {
            let mut items = [0, 1, 2, 3];
            shuffle(&mut rng, &mut items);
            first_positions[items[0]] += 1;
        }
        assert!(first_positions.iter().all(|&count| count > 50));
    }
}
