use rand::Rng;

use crate::RetryPolicy;

/// Computes the wait before the attempt following `attempt`.
///
/// The un-jittered delay is `base_backoff_ms * 2^(attempt - 1)`, capped at
/// `backoff_cap_ms`. A positive `hint_ms` (usually from `Retry-After`) raises
/// the delay but never beyond the cap. The result is then scaled by a
/// multiplier drawn from `[jitter_min, jitter_max)` and is always at least
/// 1 ms.
///
/// `attempt == 0` is treated as the first attempt. With a seeded `rng` the
/// function is deterministic.
pub fn compute_delay<R>(
    attempt: u32,
    hint_ms: Option<u64>,
    policy: &RetryPolicy,
    rng: &mut R,
) -> u64
where
    R: Rng,
{
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let cap = policy.backoff_cap_ms as f64;

    // In f64, large exponents saturate to infinity instead of overflowing.
    let mut capped = (policy.base_backoff_ms as f64 * 2f64.powi(exponent)).min(cap);
    if let Some(hint) = hint_ms.filter(|hint| *hint > 0) {
        capped = capped.max(hint as f64).min(cap);
    }

    let jitter = if policy.jitter_max > policy.jitter_min {
        rng.gen_range(policy.jitter_min..policy.jitter_max)
    } else {
        policy.jitter_min
    };

    let delay = (capped * jitter).floor();
    if delay.is_nan() || delay < 1.0 {
        1
    } else {
        // Float-to-int casts saturate.
        delay as u64
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::compute_delay;
    use crate::RetryPolicy;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_base_backoff_ms(100)
            .with_backoff_cap_ms(5_000)
            .with_jitter(0.5, 1.5)
    }

    fn upper_bound(policy: &RetryPolicy) -> u64 {
        (policy.backoff_cap_ms as f64 * policy.jitter_max) as u64
    }

    #[test]
    fn delay_without_hint_stays_within_bounds() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=64 {
            for _ in 0..50 {
                let delay = compute_delay(attempt, None, &policy, &mut rng);
                assert!(delay >= 1, "attempt {attempt}: {delay}");
                assert!(delay <= upper_bound(&policy), "attempt {attempt}: {delay}");
            }
        }
    }

    #[test]
    fn oversized_hint_is_capped() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(11);
        for attempt in 1..=8 {
            let delay = compute_delay(attempt, Some(600_000), &policy, &mut rng);
            assert!(delay <= upper_bound(&policy), "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn hint_raises_delay_above_backoff() {
        let policy = policy().with_jitter(1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(compute_delay(1, None, &policy, &mut rng), 100);
        assert_eq!(compute_delay(1, Some(2_000), &policy, &mut rng), 2_000);
        // A hint shorter than the backoff does not lower it.
        assert_eq!(compute_delay(3, Some(10), &policy, &mut rng), 400);
        // Zero is not a hint.
        assert_eq!(compute_delay(2, Some(0), &policy, &mut rng), 200);
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let policy = policy().with_jitter(1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let delays: Vec<u64> = (1..=8)
            .map(|attempt| compute_delay(attempt, None, &policy, &mut rng))
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_600, 3_200, 5_000, 5_000]);
    }

    #[test]
    fn attempt_zero_behaves_like_first_attempt() {
        let policy = policy().with_jitter(1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            compute_delay(0, None, &policy, &mut rng),
            compute_delay(1, None, &policy, &mut rng)
        );
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(5);
        let delay = compute_delay(u32::MAX, None, &policy, &mut rng);
        assert!(delay >= 2_500 && delay <= upper_bound(&policy));
    }

    #[test]
    fn result_is_never_zero() {
        let policy = RetryPolicy::default()
            .with_base_backoff_ms(1)
            .with_backoff_cap_ms(1)
            .with_jitter(0.01, 0.02);
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(compute_delay(1, None, &policy, &mut rng), 1);
    }

    #[test]
    fn seeded_jitter_is_deterministic() {
        let policy = policy();
        let first: Vec<u64> = {
            let mut rng = StdRng::seed_from_u64(42);
            (1..=10)
                .map(|attempt| compute_delay(attempt, Some(300), &policy, &mut rng))
                .collect()
        };
        let second: Vec<u64> = {
            let mut rng = StdRng::seed_from_u64(42);
            (1..=10)
                .map(|attempt| compute_delay(attempt, Some(300), &policy, &mut rng))
                .collect()
        };
        assert_eq!(first, second);
    }
}
