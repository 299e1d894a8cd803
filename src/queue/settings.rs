//! Queue settings, loadable from the `[queue]` configuration table

use crate::core::retry::RetryPolicy;
use crate::queue::error::{QueueError, QueueResult};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_QUEUE_NAME: &str = "background_queue";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Hook segment and storage key prefix
    pub name: String,
    /// Seconds a drain pass may run before handing over to a new pass
    #[serde(with = "seconds")]
    pub time_limit: Duration,
    /// Items per pass; unlimited when absent
    pub max_items_per_pass: Option<usize>,
    /// Processed items between durable checkpoints
    pub checkpoint_interval: usize,
    #[serde(with = "seconds")]
    pub lock_ttl: Duration,
    #[serde(with = "seconds")]
    pub healthcheck_interval: Duration,
    pub save_retry: RetryPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
            time_limit: Duration::from_secs(20),
            max_items_per_pass: None,
            checkpoint_interval: 1,
            lock_ttl: Duration::from_secs(60),
            healthcheck_interval: Duration::from_secs(300),
            save_retry: RetryPolicy::default(),
        }
    }
}

impl QueueSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Reject settings under which two passes could hold the queue at once
    pub fn validate(&self) -> QueueResult<()> {
        if self.lock_ttl <= self.time_limit {
            return Err(QueueError::InvalidSettings {
                message: format!(
                    "lock_ttl ({}s) must be longer than time_limit ({}s)",
                    self.lock_ttl.as_secs(),
                    self.time_limit.as_secs()
                ),
            });
        }
        if self.name.trim().is_empty() {
            return Err(QueueError::InvalidSettings {
                message: "queue name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Budget for one drain pass without an environment ceiling probe
    pub fn budget(&self) -> DrainBudget {
        DrainBudget {
            time_limit: self.time_limit,
            max_items: self.max_items_per_pass,
            ceiling: None,
        }
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Probe supplied by the execution environment; true once a resource
/// ceiling (memory, request deadline) has been reached
pub type CeilingProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// Cooperative budget checked between items
#[derive(Clone)]
pub struct DrainBudget {
    pub time_limit: Duration,
    pub max_items: Option<usize>,
    pub ceiling: Option<CeilingProbe>,
}

impl DrainBudget {
    pub fn unlimited() -> Self {
        Self {
            time_limit: Duration::MAX,
            max_items: None,
            ceiling: None,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_ceiling(mut self, probe: CeilingProbe) -> Self {
        self.ceiling = Some(probe);
        self
    }

    pub(crate) fn is_exhausted(&self, started: Instant, attempted: usize) -> bool {
        started.elapsed() >= self.time_limit
            || self.max_items.is_some_and(|max| attempted >= max)
            || self.ceiling.as_ref().is_some_and(|probe| probe())
    }
}

impl fmt::Debug for DrainBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainBudget")
            .field("time_limit", &self.time_limit)
            .field("max_items", &self.max_items)
            .field("ceiling", &self.ceiling.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = QueueSettings::default();
        assert_eq!(settings.name, "background_queue");
        assert_eq!(settings.checkpoint_interval, 1);
        assert_eq!(settings.time_limit, Duration::from_secs(20));
        assert_eq!(settings.max_items_per_pass, None);
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let settings: QueueSettings = toml::from_str(
            r#"
            time_limit = 5
            max_items_per_pass = 50
            [save_retry]
            max_attempts = 2
            "#,
        )
        .unwrap();
        assert_eq!(settings.time_limit, Duration::from_secs(5));
        assert_eq!(settings.max_items_per_pass, Some(50));
        assert_eq!(settings.save_retry.max_attempts, 2);
        assert_eq!(settings.lock_ttl, Duration::from_secs(60));
        assert_eq!(settings.name, "background_queue");
    }

    #[test]
    fn test_lock_ttl_must_outlast_time_limit() {
        assert!(QueueSettings::default().validate().is_ok());

        let equal = QueueSettings {
            time_limit: Duration::from_secs(60),
            ..QueueSettings::default()
        };
        assert!(matches!(
            equal.validate(),
            Err(QueueError::InvalidSettings { .. })
        ));

        let shorter: QueueSettings = toml::from_str("time_limit = 30\nlock_ttl = 10").unwrap();
        assert!(shorter.validate().is_err());
    }

    #[test]
    fn test_budget_limits() {
        let started = Instant::now();
        let budget = DrainBudget::unlimited().with_max_items(2);
        assert!(!budget.is_exhausted(started, 1));
        assert!(budget.is_exhausted(started, 2));

        let probed = DrainBudget::unlimited().with_ceiling(Arc::new(|| true));
        assert!(probed.is_exhausted(started, 0));

        let timed = QueueSettings {
            time_limit: Duration::ZERO,
            ..QueueSettings::default()
        }
        .budget();
        assert!(timed.is_exhausted(started, 0));
    }
}
