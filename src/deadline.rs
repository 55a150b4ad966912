//! Overall deadline for one publish invocation.
//!
//! Individual HTTP calls carry their own timeout inside the store client.
//! The deadline bounds the whole sequence: it is checked before each stage
//! and before every block upload, so a slow upload aborts between blocks
//! rather than running on indefinitely.

use std::fmt;
use std::time::{Duration, Instant};

/// Raised when the deadline has passed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("publish deadline of {budget:?} exceeded before {operation}")]
pub struct DeadlineExceeded {
    /// The total time budget that was configured.
    pub budget: Duration,
    /// The operation that was about to start.
    pub operation: String,
}

/// A point in time after which no further publish work is started.
///
/// # Examples
///
/// ```
/// use boxpub::deadline::Deadline;
/// use std::time::Duration;
///
/// let deadline = Deadline::after(Duration::from_secs(60));
/// assert!(deadline.check("upload").is_ok());
///
/// let unbounded = Deadline::none();
/// assert!(unbounded.check("upload").is_ok());
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    limit: Option<(Instant, Duration)>,
}

impl Deadline {
    /// A deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self::starting_at(Instant::now(), budget)
    }

    /// A deadline `budget` after `start`.
    #[must_use]
    pub fn starting_at(start: Instant, budget: Duration) -> Self {
        let limit = start.checked_add(budget).map(|at| (at, budget));
        Self { limit }
    }

    /// No deadline: every check passes.
    #[must_use]
    pub const fn none() -> Self {
        Self { limit: None }
    }

    /// Build from an optional budget, treating `None` as unbounded.
    #[must_use]
    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map_or_else(Self::none, Self::after)
    }

    /// Return an error if the deadline has already passed.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineExceeded`] naming `operation` once the deadline is
    /// reached.
    pub fn check(&self, operation: &str) -> Result<(), DeadlineExceeded> {
        self.check_at(Instant::now(), operation)
    }

    fn check_at(&self, now: Instant, operation: &str) -> Result<(), DeadlineExceeded> {
        match self.limit {
            Some((at, budget)) if now >= at => Err(DeadlineExceeded {
                budget,
                operation: operation.to_owned(),
            }),
            _ => Ok(()),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some((_, budget)) => write!(f, "Deadline({budget:?})"),
            None => f.write_str("Deadline(none)"),
        }
    }
}
