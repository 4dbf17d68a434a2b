//! Waiting for asynchronous remote operations to settle.
//!
//! Cluster creation, resizing and deletion return immediately while the
//! control plane works in the background. [`StatusPoller`] re-fetches the
//! status until it reaches a target, fails on any status it does not
//! expect, and gives up at a deadline. The remote operation itself is never
//! cancelled.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::PollConfig;
use crate::error::{ProviderError, ProviderResult};

/// What the poller waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTarget {
    /// Any of these statuses.
    Status(Vec<String>),
    /// The resource no longer exists.
    Absent,
}

impl fmt::Display for PollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(statuses) => write!(f, "{}", statuses.join(" or ")),
            Self::Absent => write!(f, "deleted"),
        }
    }
}

/// Which statuses mean "keep waiting".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// Only these statuses.
    Of(Vec<String>),
    /// Any status, as long as the resource still exists.
    AnyPresent,
}

impl Pending {
    fn contains(&self, status: &str) -> bool {
        match self {
            Self::Of(statuses) => statuses.iter().any(|s| s == status),
            Self::AnyPresent => true,
        }
    }
}

/// A status poll: pending set, target, initial delay, interval and deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPoller {
    pending: Pending,
    target: PollTarget,
    delay: Duration,
    interval: Duration,
    timeout: Duration,
}

impl StatusPoller {
    /// Wait until the status is one of `target`.
    pub fn until_status(target: &[&str]) -> Self {
        Self {
            pending: Pending::Of(Vec::new()),
            target: PollTarget::Status(target.iter().map(|s| s.to_string()).collect()),
            delay: Duration::ZERO,
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }

    /// Wait until the resource is gone.
    pub fn until_absent() -> Self {
        Self {
            target: PollTarget::Absent,
            ..Self::until_status(&[])
        }
    }

    /// Statuses that mean the operation is still in progress.
    pub fn pending(mut self, pending: &[&str]) -> Self {
        self.pending = Pending::Of(pending.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Treat every status as in progress while the resource exists.
    pub fn pending_while_present(mut self) -> Self {
        self.pending = Pending::AnyPresent;
        self
    }

    /// Wait this long before the first status check.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wait this long between status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Give up after this long, counted from the start of the wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply provider-wide delay and interval overrides.
    pub fn with_overrides(mut self, overrides: &PollConfig) -> Self {
        if let Some(delay) = overrides.delay() {
            self.delay = delay;
        }
        if let Some(interval) = overrides.interval() {
            self.interval = interval;
        }
        self
    }

    /// The configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured target.
    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    /// Poll `refresh` until the target is reached.
    ///
    /// `refresh` returns the current status, or `None` when the resource does
    /// not exist. Errors from `refresh` end the wait immediately.
    pub async fn wait<F, Fut>(&self, id: &str, mut refresh: F) -> ProviderResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<Option<String>>>,
    {
        let run = async {
            tokio::time::sleep(self.delay).await;
            let mut attempts: u32 = 0;
            loop {
                attempts += 1;
                let status = refresh().await?;
                match (&self.target, status) {
                    (PollTarget::Absent, None) => {
                        info!(id, attempts, "resource is gone");
                        return Ok(());
                    },
                    (PollTarget::Status(_), None) => {
                        return Err(ProviderError::NotFound(format!(
                            "{} disappeared while waiting for it to become {}",
                            id, self.target
                        )));
                    },
                    (PollTarget::Status(targets), Some(status))
                        if targets.iter().any(|t| *t == status) =>
                    {
                        info!(id, attempts, status = %status, "resource reached target status");
                        return Ok(());
                    },
                    (_, Some(status)) if self.pending.contains(&status) => {
                        debug!(id, attempts, status = %status, "still pending");
                        tokio::time::sleep(self.interval).await;
                    },
                    (_, Some(status)) => {
                        return Err(ProviderError::UnexpectedState(format!(
                            "{} reported status '{}' while waiting for it to become {}",
                            id, status, self.target
                        )));
                    },
                }
            }
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::DeadlineExceeded(format!(
                "gave up after {}s waiting for {} to become {}",
                self.timeout.as_secs(),
                id,
                self.target
            ))),
        }
    }
}
