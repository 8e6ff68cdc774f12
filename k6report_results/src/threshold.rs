//! Threshold rules and their verdicts
//!
//! k6 declares thresholds inside the results stream itself: a `Metric`
//! record may carry rule strings such as `p(95)<500` or `rate<0.01`. Rules
//! are collected into [`Thresholds`] while sources are aggregated and turned
//! into [`Verdict`]s once every source has been read.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::stats;

/// Rule strings discovered per metric name.
///
/// The first registration for a metric wins, later ones are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thresholds {
    rules: FxHashMap<String, Vec<String>>,
}

impl Thresholds {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rules` for `metric`. Returns `false`, leaving the registry
    /// unchanged, when `metric` already has rules.
    pub fn register(&mut self, metric: &str, rules: Vec<String>) -> bool {
        if self.rules.contains_key(metric) {
            return false;
        }
        self.rules.insert(metric.to_string(), rules);
        true
    }

    /// The rules registered for `metric`, empty if none were.
    #[must_use]
    pub fn rules(&self, metric: &str) -> &[String] {
        self.rules.get(metric).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of metrics with registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no metric has registered rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

static P95_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"p\(95\)\s*<\s*([0-9]+)").expect("Invalid regex pattern provided")
});
static RATE_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"rate\s*<\s*([0-9]*\.?[0-9]+)").expect("Invalid regex pattern provided")
});

fn first_match(rules: &[String], pattern: &Regex) -> Option<f64> {
    rules.iter().find_map(|rule| {
        pattern
            .captures(rule)
            .and_then(|captures| captures[1].parse::<f64>().ok())
    })
}

/// Upper bound on the 95th percentile request duration, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationBound(pub f64);

impl DurationBound {
    /// The bound set by the first `p(95)<N` rule in `rules`.
    #[must_use]
    pub fn find(rules: &[String]) -> Option<Self> {
        first_match(rules, &P95_RULE).map(Self)
    }

    /// Display label naming the goal.
    #[must_use]
    pub fn label(self) -> String {
        format!("95th Percentile Duration (Goal: < {}ms)", self.0)
    }
}

/// Upper bound on the fraction of failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FailureRateBound(pub f64);

impl FailureRateBound {
    /// The bound set by the first `rate<F` rule in `rules`.
    #[must_use]
    pub fn find(rules: &[String]) -> Option<Self> {
        first_match(rules, &RATE_RULE).map(Self)
    }

    /// Display label naming the goal.
    #[must_use]
    pub fn label(self) -> String {
        format!("HTTP Failure Rate (Goal: < {:.2}%)", self.0 * 100.0)
    }
}

const DURATION_UNCONFIGURED: &str = "95th Percentile Duration (No threshold defined)";
const FAILURE_RATE_UNCONFIGURED: &str = "HTTP Failure Rate (No threshold defined)";

/// Outcome of one threshold check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Whether the check passed.
    pub passed: bool,
    /// Human readable name of the goal.
    pub label: String,
    /// The bound checked against, `None` when no rule was declared.
    pub bound: Option<f64>,
}

impl Verdict {
    /// Whether a rule was declared for this check.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.bound.is_some()
    }

    /// `Passed` or `Failed`.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.passed { "Passed" } else { "Failed" }
    }
}

/// Check every source's 95th percentile duration against `bound`.
///
/// A single source over the bound fails the check, and so does a source
/// with no duration observations at all. Without a bound the check passes.
pub fn evaluate_duration<'a, I>(bound: Option<DurationBound>, sources: I) -> Verdict
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let Some(bound) = bound else {
        return Verdict {
            passed: true,
            label: DURATION_UNCONFIGURED.to_string(),
            bound: None,
        };
    };

    let passed = sources
        .into_iter()
        .all(|durations| stats::p95(durations).is_some_and(|p95| p95 <= bound.0));

    Verdict {
        passed,
        label: bound.label(),
        bound: Some(bound.0),
    }
}

/// Check the global failure rate against `bound`, passing only when it is
/// strictly below. Without a bound the check fails.
#[must_use]
pub fn evaluate_failure_rate(bound: Option<FailureRateBound>, rate: f64) -> Verdict {
    match bound {
        Some(bound) => Verdict {
            passed: rate < bound.0,
            label: bound.label(),
            bound: Some(bound.0),
        },
        None => Verdict {
            passed: false,
            label: FAILURE_RATE_UNCONFIGURED.to_string(),
            bound: None,
        },
    }
}
