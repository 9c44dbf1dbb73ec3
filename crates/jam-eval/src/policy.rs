//! Evaluation policies and evaluator configuration.
//!
//! The binding policy governs how `let`/`letrec` right-hand sides and call
//! arguments are bound; the cons policy governs the head and tail of each pair
//! built by `cons`. The two are independent, giving nine evaluators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When a deferred expression is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Evaluate immediately.
    #[default]
    Value,
    /// Evaluate on every access.
    Name,
    /// Evaluate on first access and remember the result.
    Need,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Value, Policy::Name, Policy::Need];

    pub fn name(self) -> &'static str {
        match self {
            Policy::Value => "value",
            Policy::Name => "name",
            Policy::Need => "need",
        }
    }

    pub fn is_lazy(self) -> bool {
        self != Policy::Value
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown evaluation policy '{0}' (expected value, name or need)")]
pub struct UnknownPolicy(pub String);

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "value" | "eager" => Ok(Policy::Value),
            "name" => Ok(Policy::Name),
            "need" | "lazy" => Ok(Policy::Need),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Default limit on nested closure calls and suspension forces.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Evaluator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub binding: Policy,
    pub cons: Policy,
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            binding: Policy::Value,
            cons: Policy::Value,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EvalConfig {
    pub fn new(binding: Policy, cons: Policy) -> Self {
        Self {
            binding,
            cons,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Every `(binding, cons)` combination with default limits.
    pub fn all() -> impl Iterator<Item = EvalConfig> {
        Policy::ALL
            .into_iter()
            .flat_map(|b| Policy::ALL.into_iter().map(move |c| EvalConfig::new(b, c)))
    }
}

impl fmt::Display for EvalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding={} cons={}", self.binding, self.cons)
    }
}
