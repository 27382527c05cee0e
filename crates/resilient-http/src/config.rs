use crate::error::ConfigurationError;
use crate::metrics::{cached_provider, MetricsProvider, NoopMetrics};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Retry tuning, mirroring component E's defaults.
#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub enabled: bool,
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
    pub retryable_status: HashSet<u16>,
    pub respect_retry_after: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 1,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter: 0.2,
            retryable_status: [408, 429, 500, 502, 503, 504].into_iter().collect(),
            respect_retry_after: true,
        }
    }
}

/// Breaker tuning, mirroring component D's defaults.
#[derive(Clone, Debug)]
pub struct BreakerSettings {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout: Duration,
    pub failure_status: HashSet<u16>,
}

impl BreakerSettings {
    fn is_failure_status(status: u16) -> bool {
        status >= 500 || status == 429
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(60),
            failure_status: (500..600).chain([429]).collect(),
        }
    }
}

/// Limiter tuning, mirroring component B.
#[derive(Clone, Debug)]
pub struct LimiterSettings {
    pub enabled: bool,
    pub requests_per_second: f64,
    pub burst: f64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 50.0,
            burst: 10.0,
        }
    }
}

/// Immutable client configuration, validated at [`crate::Client::new`].
#[derive(Clone)]
pub struct ClientConfig {
    pub overall_timeout: Duration,
    pub per_attempt_timeout: Duration,
    pub retry: RetrySettings,
    pub breaker: BreakerSettings,
    pub limiter: LimiterSettings,
    pub tracing_enabled: bool,
    pub metrics_enabled: bool,
    pub(crate) metrics_provider: Option<Arc<dyn MetricsProvider>>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("overall_timeout", &self.overall_timeout)
            .field("per_attempt_timeout", &self.per_attempt_timeout)
            .field("retry", &self.retry)
            .field("breaker", &self.breaker)
            .field("limiter", &self.limiter)
            .field("tracing_enabled", &self.tracing_enabled)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("metrics_provider", &self.metrics_provider.is_some())
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(5),
            per_attempt_timeout: Duration::from_secs(2),
            retry: RetrySettings::default(),
            breaker: BreakerSettings::default(),
            limiter: LimiterSettings::default(),
            tracing_enabled: false,
            metrics_enabled: false,
            metrics_provider: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Preset favoring fast failure over patience: short timeouts, a breaker
    /// that opens quickly, and a handful of fast retries.
    pub fn aggressive() -> Self {
        ClientConfigBuilder::default()
            .overall_timeout(Duration::from_secs(2))
            .per_attempt_timeout(Duration::from_millis(500))
            .retry(RetrySettings {
                enabled: true,
                max_attempts: 5,
                base_delay: Duration::from_millis(50),
                max_delay: Duration::from_secs(1),
                ..RetrySettings::default()
            })
            .breaker(BreakerSettings {
                enabled: true,
                failure_threshold: 3,
                success_threshold: 2,
                open_timeout: Duration::from_secs(15),
                ..BreakerSettings::default()
            })
            .build()
            .expect("aggressive preset is always valid")
    }

    /// Preset favoring patience over fast failure: long timeouts, a slow
    /// breaker, and few, widely spaced retries.
    pub fn conservative() -> Self {
        ClientConfigBuilder::default()
            .overall_timeout(Duration::from_secs(30))
            .per_attempt_timeout(Duration::from_secs(10))
            .retry(RetrySettings {
                enabled: true,
                max_attempts: 2,
                base_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(10),
                ..RetrySettings::default()
            })
            .breaker(BreakerSettings {
                enabled: true,
                failure_threshold: 10,
                success_threshold: 5,
                open_timeout: Duration::from_secs(120),
                ..BreakerSettings::default()
            })
            .build()
            .expect("conservative preset is always valid")
    }

    pub(crate) fn is_failure_status(&self, status: u16) -> bool {
        self.breaker.failure_status.contains(&status) || BreakerSettings::is_failure_status(status)
    }

    pub(crate) fn metrics_provider(&self, client_name: &str) -> Arc<dyn MetricsProvider> {
        if !self.metrics_enabled {
            return Arc::new(NoopMetrics);
        }
        match &self.metrics_provider {
            Some(p) => cached_provider(client_name, {
                let p = Arc::clone(p);
                move || p
            }),
            None => Arc::new(NoopMetrics),
        }
    }
}

#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn overall_timeout(mut self, d: Duration) -> Self {
        self.config.overall_timeout = d;
        self
    }

    pub fn per_attempt_timeout(mut self, d: Duration) -> Self {
        self.config.per_attempt_timeout = d;
        self
    }

    pub fn retry(mut self, settings: RetrySettings) -> Self {
        self.config.retry = settings;
        self
    }

    pub fn breaker(mut self, settings: BreakerSettings) -> Self {
        self.config.breaker = settings;
        self
    }

    pub fn limiter(mut self, settings: LimiterSettings) -> Self {
        self.config.limiter = settings;
        self
    }

    pub fn tracing(mut self, enabled: bool) -> Self {
        self.config.tracing_enabled = enabled;
        self
    }

    pub fn metrics_provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.config.metrics_enabled = true;
        self.config.metrics_provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigurationError> {
        let c = &self.config;
        if c.overall_timeout.is_zero() {
            return Err(ConfigurationError {
                field: "overall_timeout",
                value: "0".into(),
                message: "must be greater than zero".into(),
            });
        }
        if c.per_attempt_timeout.is_zero() {
            return Err(ConfigurationError {
                field: "per_attempt_timeout",
                value: "0".into(),
                message: "must be greater than zero".into(),
            });
        }
        if c.per_attempt_timeout > c.overall_timeout {
            return Err(ConfigurationError {
                field: "per_attempt_timeout",
                value: format!("{:?}", c.per_attempt_timeout),
                message: "must not exceed overall_timeout".into(),
            });
        }
        if c.retry.enabled && c.retry.max_attempts == 0 {
            return Err(ConfigurationError {
                field: "retry.max_attempts",
                value: "0".into(),
                message: "must be at least 1 when retries are enabled".into(),
            });
        }
        if !(0.0..=1.0).contains(&c.retry.jitter) {
            return Err(ConfigurationError {
                field: "retry.jitter",
                value: c.retry.jitter.to_string(),
                message: "must be within [0, 1]".into(),
            });
        }
        if c.breaker.enabled && c.breaker.failure_threshold == 0 {
            return Err(ConfigurationError {
                field: "breaker.failure_threshold",
                value: "0".into(),
                message: "must be at least 1 when the breaker is enabled".into(),
            });
        }
        if c.breaker.enabled && c.breaker.success_threshold == 0 {
            return Err(ConfigurationError {
                field: "breaker.success_threshold",
                value: "0".into(),
                message: "must be at least 1 when the breaker is enabled".into(),
            });
        }
        if c.limiter.enabled && c.limiter.requests_per_second <= 0.0 {
            return Err(ConfigurationError {
                field: "limiter.requests_per_second",
                value: c.limiter.requests_per_second.to_string(),
                message: "must be greater than zero when the limiter is enabled".into(),
            });
        }
        if c.limiter.enabled && c.limiter.burst <= 0.0 {
            return Err(ConfigurationError {
                field: "limiter.burst",
                value: c.limiter.burst.to_string(),
                message: "must be greater than zero when the limiter is enabled".into(),
            });
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_normative_table() {
        let c = ClientConfig::default();
        assert_eq!(c.overall_timeout, Duration::from_secs(5));
        assert_eq!(c.per_attempt_timeout, Duration::from_secs(2));
        assert!(!c.retry.enabled);
        assert_eq!(c.retry.max_attempts, 1);
        assert_eq!(c.retry.base_delay, Duration::from_millis(100));
        assert_eq!(c.retry.max_delay, Duration::from_secs(5));
        assert_eq!(c.retry.jitter, 0.2);
        assert_eq!(c.breaker.failure_threshold, 5);
        assert_eq!(c.breaker.success_threshold, 3);
        assert_eq!(c.breaker.open_timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_per_attempt_timeout_exceeding_overall() {
        let err = ClientConfig::builder()
            .overall_timeout(Duration::from_secs(1))
            .per_attempt_timeout(Duration::from_secs(2))
            .build()
            .unwrap_err();
        assert_eq!(err.field, "per_attempt_timeout");
    }

    #[test]
    fn rejects_invalid_jitter() {
        let err = ClientConfig::builder()
            .retry(RetrySettings {
                jitter: 1.5,
                ..RetrySettings::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err.field, "retry.jitter");
    }

    #[test]
    fn presets_are_valid() {
        let _ = ClientConfig::aggressive();
        let _ = ClientConfig::conservative();
    }
}
