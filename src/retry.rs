//! Caller-side retry for a busy clipboard.
//!
//! The backends never retry. [`RetryPolicy`] re-runs an operation only
//! while it fails with a transient error, doubling the delay each time up
//! to `max_delay`.

use std::time::Duration;

use crate::ClipboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub retries: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Upper bound for the doubled delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// Sleep before each retry: non-decreasing, never above `max_delay`.
    fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        let max = self.max_delay;
        std::iter::successors(Some(self.delay.min(max)), move |delay| {
            Some(delay.saturating_mul(2).min(max))
        })
        .take(self.retries as usize)
    }

    /// Run `op`, retrying while it returns a transient error.
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> Result<T, ClipboardError>,
    ) -> Result<T, ClipboardError> {
        let mut delays = self.backoff().enumerate();
        loop {
            match op() {
                Err(e) if e.is_transient() => {
                    let Some((attempt, delay)) = delays.next() else {
                        return Err(e);
                    };
                    tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "clipboard busy, retrying"
                    );
                    std::thread::sleep(delay);
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::clipboard::NativeError;

    fn quick(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn busy() -> ClipboardError {
        ClipboardError::ResourceBusy(NativeError::new("OpenClipboard", 5))
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = quick(3).run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err(busy()) } else { Ok(42) }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_retries() {
        let calls = Cell::new(0);
        let result: Result<(), _> = quick(2).run(|| {
            calls.set(calls.get() + 1);
            Err(busy())
        });
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = quick(5).run(|| {
            calls.set(calls.get() + 1);
            Err(ClipboardError::UnsupportedType("x/y".into()))
        });
        assert!(matches!(result, Err(ClipboardError::UnsupportedType(_))));
        assert_eq!(calls.get(), 1);
    }

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn default_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy {
            retries: 6,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.backoff().collect::<Vec<_>>(),
            ms(&[20, 40, 80, 160, 320, 500])
        );
    }

    #[test]
    fn initial_delay_is_clamped_to_cap() {
        let policy = RetryPolicy {
            retries: 3,
            delay: Duration::from_secs(10),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff().collect::<Vec<_>>(), ms(&[500, 500, 500]));
    }

    #[test]
    fn huge_delays_saturate_instead_of_overflowing() {
        let policy = RetryPolicy {
            retries: 3,
            delay: Duration::MAX,
            max_delay: Duration::MAX,
        };
        assert_eq!(policy.backoff().collect::<Vec<_>>(), vec![Duration::MAX; 3]);
    }

    #[test]
    fn none_runs_once() {
        let calls = Cell::new(0);
        let _ = RetryPolicy::none().run(|| -> Result<(), _> {
            calls.set(calls.get() + 1);
            Err(busy())
        });
        assert_eq!(calls.get(), 1);
    }
}
