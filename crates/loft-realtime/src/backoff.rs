use std::time::Duration;

use rand::Rng;

/// Reconnect/backoff configuration for the connection actor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BackoffConfig {
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) factor: f64,
    pub(crate) jitter: f64,
}

impl BackoffConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.initial_delay.is_zero() {
            return Err("Initial reconnect delay must be > 0".to_string());
        }
        if self.max_delay.is_zero() {
            return Err("Max reconnect delay must be > 0".to_string());
        }
        if self.max_delay < self.initial_delay {
            return Err("Max reconnect delay must be >= initial reconnect delay".to_string());
        }
        if self.factor < 1.0 || !self.factor.is_finite() {
            return Err("Backoff factor must be >= 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) || !self.jitter.is_finite() {
            return Err("Jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

/// Delay before reconnect attempt `attempt + 1` (the argument is the number
/// of attempts already failed, so the first retry passes 0 and waits the
/// initial delay).
pub(crate) fn calculate_backoff(config: BackoffConfig, attempt: u32) -> Duration {
    let initial = config.initial_delay.as_secs_f64();
    let max = config.max_delay.as_secs_f64();
    let exponent = config.factor.powf(f64::from(attempt));
    let base = (initial * exponent).min(max);

    if config.jitter == 0.0 {
        return Duration::from_secs_f64(base);
    }

    let mut rng = rand::rng();
    let randomized = rng.random_range(0.0..=base);
    let blended = base * (1.0 - config.jitter) + randomized * config.jitter;
    Duration::from_secs_f64(blended)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            factor: 2.0,
            jitter: 0.0,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = test_config();

        // delay(n) = initial * factor^(n - 1) for the nth attempt.
        assert_eq!(calculate_backoff(config, 0), Duration::from_secs(1));
        assert_eq!(calculate_backoff(config, 1), Duration::from_secs(2));
        assert_eq!(calculate_backoff(config, 2), Duration::from_secs(4));
        assert_eq!(calculate_backoff(config, 3), Duration::from_secs(8));
        assert_eq!(calculate_backoff(config, 4), Duration::from_secs(16));
    }

    #[test]
    fn backoff_respects_max_delay() {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            factor: 2.0,
            jitter: 0.0,
        };

        assert_eq!(calculate_backoff(config, 4), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(config, 10), Duration::from_millis(1000));
    }

    #[test]
    fn backoff_with_jitter_stays_bounded() {
        let config = BackoffConfig {
            jitter: 0.5,
            ..test_config()
        };

        for attempt in 0..5 {
            let base = calculate_backoff(
                BackoffConfig {
                    jitter: 0.0,
                    ..config
                },
                attempt,
            );
            let jittered = calculate_backoff(config, attempt);
            assert!(jittered <= base);
            assert!(jittered >= base / 2);
        }
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = test_config();
        config.initial_delay = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.jitter = 1.5;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.max_delay = Duration::from_millis(1);
        assert!(config.validate().is_err());

        assert!(test_config().validate().is_ok());
    }
}
