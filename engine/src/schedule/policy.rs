//! Next-run policies

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Delay applied when no other rule matches
pub const DEFAULT_DELAY_HOURS: i64 = 24;

/// Computes when a recurring workflow runs next
pub trait NextRunPolicy: Send + Sync {
    /// Next run after an execution that finished at `now`
    fn next_run(&self, expression: &str, now: DateTime<Utc>) -> DateTime<Utc>;
}

/// Always `now + delay`, ignoring the expression
#[derive(Debug, Clone)]
pub struct FixedDelayPolicy {
    delay: Duration,
}

impl FixedDelayPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelayPolicy {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_DELAY_HOURS))
    }
}

impl NextRunPolicy for FixedDelayPolicy {
    fn next_run(&self, _expression: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.delay
    }
}

/// Reads `+<n><unit>` offsets with unit `s`, `m`, `h` or `d`.
/// Anything else falls back to the default delay.
#[derive(Debug, Clone, Default)]
pub struct OffsetExpressionPolicy {
    fallback: FixedDelayPolicy,
}

impl OffsetExpressionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an offset expression such as `+30m`
    pub fn parse_offset(expression: &str) -> Option<Duration> {
        let body = expression.trim().strip_prefix('+')?;
        if body.len() < 2 {
            return None;
        }

        let (amount, unit) = body.split_at(body.len() - 1);
        let amount: i64 = amount.parse().ok().filter(|n| *n > 0)?;

        match unit {
            "s" => Duration::try_seconds(amount),
            "m" => Duration::try_minutes(amount),
            "h" => Duration::try_hours(amount),
            "d" => Duration::try_days(amount),
            _ => None,
        }
    }
}

impl NextRunPolicy for OffsetExpressionPolicy {
    fn next_run(&self, expression: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        match Self::parse_offset(expression) {
            Some(offset) => now + offset,
            None => {
                warn!(
                    "Unrecognized schedule expression '{}', using default delay",
                    expression
                );
                self.fallback.next_run(expression, now)
            }
        }
    }
}

/// Policy selected in the settings file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    FixedDelay,
    OffsetExpression,
}

impl PolicyKind {
    pub fn build(&self) -> Box<dyn NextRunPolicy> {
        match self {
            PolicyKind::FixedDelay => Box::new(FixedDelayPolicy::default()),
            PolicyKind::OffsetExpression => Box::new(OffsetExpressionPolicy::new()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::FixedDelay => write!(f, "fixed_delay"),
            PolicyKind::OffsetExpression => write!(f, "offset_expression"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed_delay" => Ok(PolicyKind::FixedDelay),
            "offset_expression" => Ok(PolicyKind::OffsetExpression),
            _ => Err(format!("Invalid next run policy: {}", s)),
        }
    }
}
