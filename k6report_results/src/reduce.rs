//! Reduction of per-source summaries into a [`Report`]
//!
//! The reduction is commutative: totals are sums and maxima and durations
//! are concatenated, so the order sources were read in does not matter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    aggregate::SourceSummary,
    record::MetricKind,
    stats,
    threshold::{self, DurationBound, FailureRateBound, Thresholds, Verdict},
};

const MIB: f64 = 1024.0 * 1024.0;

/// Per-source summaries keyed by display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Sources {
    inner: BTreeMap<String, SourceSummary>,
}

impl Sources {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `summary` under `name`, returning the summary it displaced if
    /// `name` was already taken.
    pub fn insert(&mut self, name: String, summary: SourceSummary) -> Option<SourceSummary> {
        self.inner.insert(name, summary)
    }

    /// The summary stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SourceSummary> {
        self.inner.get(name)
    }

    /// Summaries in display name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceSummary)> {
        self.inner.iter().map(|(name, summary)| (name.as_str(), summary))
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether there are no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Totals across every source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalSummary {
    /// Sum of requests.
    pub requests: u64,
    /// Sum of failed requests.
    pub failures: u64,
    /// Every request duration of every source.
    pub durations: Vec<f64>,
    /// Highest peak of virtual users of any source.
    pub peak_vus: f64,
    /// Sum of bytes sent.
    pub data_sent: f64,
    /// Sum of bytes received.
    pub data_received: f64,
    /// Mean of `durations`, zero when there are none.
    pub average_duration: f64,
    /// 95th percentile of `durations`, zero when there are none.
    pub p95_duration: f64,
}

impl GlobalSummary {
    /// Fold every source into global totals.
    #[must_use]
    pub fn from_sources(sources: &Sources) -> Self {
        let mut global = Self::default();
        for (_, summary) in sources.iter() {
            global.requests += summary.requests;
            global.failures += summary.failures;
            global.durations.extend_from_slice(&summary.durations);
            global.peak_vus = global.peak_vus.max(summary.peak_vus);
            global.data_sent += summary.data_sent;
            global.data_received += summary.data_received;
        }
        global.average_duration = stats::mean(&global.durations).unwrap_or(0.0);
        global.p95_duration = stats::p95(&global.durations).unwrap_or(0.0);
        global
    }

    /// Requests that did not fail.
    #[must_use]
    pub fn passed_requests(&self) -> u64 {
        self.requests.saturating_sub(self.failures)
    }

    /// Fraction of requests that failed, zero when there were none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }

    /// Bytes sent, in MiB.
    #[must_use]
    pub fn data_sent_mib(&self) -> f64 {
        self.data_sent / MIB
    }

    /// Bytes received, in MiB.
    #[must_use]
    pub fn data_received_mib(&self) -> f64 {
        self.data_received / MIB
    }
}

/// Verdicts of the two threshold checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdVerdicts {
    /// 95th percentile request duration, checked per source.
    pub duration: Verdict,
    /// Global request failure rate.
    pub failure_rate: Verdict,
}

/// The computed result of a run, consumed read-only by rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Per-source summaries.
    pub sources: Sources,
    /// Totals across all sources.
    pub global: GlobalSummary,
    /// Threshold verdicts.
    pub thresholds: ThresholdVerdicts,
}

impl Report {
    /// Reduce `sources` and evaluate the rules in `thresholds`.
    #[must_use]
    pub fn build(sources: Sources, thresholds: &Thresholds) -> Self {
        let global = GlobalSummary::from_sources(&sources);

        let duration_bound =
            DurationBound::find(thresholds.rules(MetricKind::HttpReqDuration.as_str()));
        let failure_bound =
            FailureRateBound::find(thresholds.rules(MetricKind::HttpReqFailed.as_str()));

        let duration = threshold::evaluate_duration(
            duration_bound,
            sources.iter().map(|(_, summary)| summary.durations.as_slice()),
        );
        let failure_rate = threshold::evaluate_failure_rate(failure_bound, global.failure_rate());

        Self {
            sources,
            global,
            thresholds: ThresholdVerdicts {
                duration,
                failure_rate,
            },
        }
    }
}
