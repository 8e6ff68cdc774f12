//! Per-source aggregation
//!
//! A [`SourceSummary`] is built by folding every [`Record`] of one results
//! file into running totals. Once the stream is exhausted the summary is
//! finalized, computing group averages, and is read-only from then on.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    record::{MetricData, MetricKind, PointData, Record},
    stats, stream,
    threshold::Thresholds,
};

/// Separator between the levels of a hierarchical group name.
pub const GROUP_SEPARATOR: &str = "::";

/// Durations recorded for one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupStats {
    /// Every `group_duration` observation, in stream order.
    pub durations: Vec<f64>,
    /// Mean of `durations`, zero until finalized or when there are none.
    pub average: f64,
}

/// Totals for one results file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    /// Number of issued requests.
    pub requests: u64,
    /// Number of failed requests.
    pub failures: u64,
    /// Every request duration, in stream order.
    pub durations: Vec<f64>,
    /// Group durations keyed by group name.
    pub groups: BTreeMap<String, GroupStats>,
    /// Failed requests keyed by group name.
    pub group_failures: FxHashMap<String, u64>,
    /// Highest number of concurrent virtual users observed.
    pub peak_vus: f64,
    /// Total bytes sent.
    pub data_sent: f64,
    /// Total bytes received.
    pub data_received: f64,
}

/// One renderable row of per-endpoint detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointRow<'a> {
    /// Full group name.
    pub group: &'a str,
    /// Last level of the group name.
    pub endpoint: &'a str,
    /// Mean group duration in milliseconds.
    pub average: f64,
    /// Failed requests in this group.
    pub failures: u64,
}

impl EndpointRow<'_> {
    /// A group passes when none of its requests failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

impl SourceSummary {
    /// Create an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into this summary.
    ///
    /// `Metric` records with a non-empty thresholds list are registered in
    /// `thresholds`; the first registration per metric wins. k6 writes
    /// `"thresholds":[]` for metrics without rules, which registers nothing.
    /// Anything not consumed is ignored.
    pub fn fold(&mut self, record: &Record, thresholds: &mut Thresholds) {
        match record {
            Record::Point { metric, data } => match metric.parse::<MetricKind>() {
                Ok(kind) => self.fold_point(kind, data),
                Err(_) => debug!("ignoring point for {metric}"),
            },
            Record::Metric {
                metric,
                data: MetricData {
                    thresholds: Some(rules),
                },
            } if !rules.is_empty() => {
                if !thresholds.register(metric, rules.clone()) {
                    debug!("thresholds for {metric} already registered, ignoring");
                }
            }
            Record::Metric { .. } | Record::Other => {}
        }
    }

    #[allow(clippy::float_cmp)]
    fn fold_point(&mut self, kind: MetricKind, data: &PointData) {
        let Some(value) = data.value else {
            return;
        };
        match kind {
            MetricKind::HttpReqs => {
                if value == 1.0 {
                    self.requests += 1;
                }
            }
            MetricKind::HttpReqFailed => {
                if value == 1.0 {
                    self.failures += 1;
                    if let Some(group) = data.group() {
                        *self.group_failures.entry(group.to_string()).or_default() += 1;
                    }
                }
            }
            MetricKind::HttpReqDuration => self.durations.push(value),
            MetricKind::GroupDuration => {
                if let Some(group) = data.group() {
                    self.groups
                        .entry(group.to_string())
                        .or_default()
                        .durations
                        .push(value);
                }
            }
            MetricKind::Vus => self.peak_vus = self.peak_vus.max(value),
            MetricKind::DataSent => self.data_sent += value,
            MetricKind::DataReceived => self.data_received += value,
        }
    }

    /// Compute the average duration of every group and cap failures at the
    /// request count.
    pub fn finalize(&mut self) {
        if self.failures > self.requests {
            debug!(
                requests = self.requests,
                failures = self.failures,
                "more failures than requests, clamping failures"
            );
            self.failures = self.requests;
        }
        for stats in self.groups.values_mut() {
            stats.average = stats::mean(&stats.durations).unwrap_or(0.0);
        }
    }

    /// Requests that did not fail.
    #[must_use]
    pub fn passed_requests(&self) -> u64 {
        self.requests.saturating_sub(self.failures)
    }

    /// Failures recorded for `group`.
    #[must_use]
    pub fn failures_for(&self, group: &str) -> u64 {
        self.group_failures.get(group).copied().unwrap_or(0)
    }

    /// Rows for per-endpoint detail: only groups whose name is
    /// hierarchical, in group name order.
    pub fn endpoint_rows(&self) -> impl Iterator<Item = EndpointRow<'_>> {
        self.groups.iter().filter_map(|(group, stats)| {
            let (_, endpoint) = group.rsplit_once(GROUP_SEPARATOR)?;
            Some(EndpointRow {
                group,
                endpoint: endpoint.trim(),
                average: stats.average,
                failures: self.failures_for(group),
            })
        })
    }
}

/// Aggregate the full text of one results file.
///
/// # Errors
///
/// Returns the [`stream::Error`] when `text` is not a readable record
/// stream. Nothing is registered in `thresholds` in that case.
pub fn aggregate(text: &str, thresholds: &mut Thresholds) -> Result<SourceSummary, stream::Error> {
    let records = stream::read_records(text)?;
    let mut summary = SourceSummary::new();
    for record in &records {
        summary.fold(record, thresholds);
    }
    summary.finalize();
    debug!(
        records = records.len(),
        requests = summary.requests,
        failures = summary.failures,
        "aggregated source"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::{DurationBound, evaluate_duration};
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::fmt::Write;

    fn point(metric: &str, value: f64) -> String {
        format!(r#"{{"type":"Point","metric":"{metric}","data":{{"value":{value}}}}}"#)
    }

    fn grouped_point(metric: &str, value: f64, group: &str) -> String {
        format!(
            r#"{{"type":"Point","metric":"{metric}","data":{{"value":{value},"tags":{{"group":"{group}"}}}}}}"#
        )
    }

    fn metric(metric: &str, rules: &str) -> String {
        format!(r#"{{"type":"Metric","metric":"{metric}","data":{{"thresholds":[{rules}]}}}}"#)
    }

    #[test]
    fn counts_requests_and_failures() {
        let text = [
            point("http_reqs", 1.0),
            point("http_reqs", 1.0),
            point("http_reqs", 0.0),
            grouped_point("http_req_failed", 1.0, "::auth::login"),
            point("http_req_failed", 0.0),
        ]
        .concat();
        let mut thresholds = Thresholds::new();
        let summary = aggregate(&text, &mut thresholds).expect("valid stream");
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.passed_requests(), 1);
        assert_eq!(summary.failures_for("::auth::login"), 1);
        assert_eq!(summary.failures_for("::auth::logout"), 0);
    }

    #[test]
    fn accumulates_gauges_and_bytes() {
        let text = [
            point("vus", 3.0),
            point("vus", 10.0),
            point("vus", 7.0),
            point("data_sent", 100.0),
            point("data_sent", 50.0),
            point("data_received", 2048.0),
            point("http_req_duration", 12.5),
            point("http_req_duration", 7.5),
        ]
        .concat();
        let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
        assert_relative_eq!(summary.peak_vus, 10.0);
        assert_relative_eq!(summary.data_sent, 150.0);
        assert_relative_eq!(summary.data_received, 2048.0);
        assert_eq!(summary.durations, vec![12.5, 7.5]);
    }

    #[test]
    fn averages_groups() {
        let text = [
            grouped_point("group_duration", 100.0, "::users::list"),
            grouped_point("group_duration", 300.0, "::users::list"),
            grouped_point("group_duration", 40.0, "setup"),
            point("group_duration", 999.0),
        ]
        .concat();
        let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
        assert_eq!(summary.groups.len(), 2);
        assert_relative_eq!(summary.groups["::users::list"].average, 200.0);
        assert_relative_eq!(summary.groups["setup"].average, 40.0);
    }

    #[test]
    fn endpoint_rows_skip_flat_groups() {
        let text = [
            grouped_point("group_duration", 100.0, "::users:: list "),
            grouped_point("group_duration", 40.0, "setup"),
            grouped_point("http_req_failed", 1.0, "setup"),
            grouped_point("http_req_failed", 1.0, "::users:: list "),
        ]
        .concat();
        let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
        let rows: Vec<_> = summary.endpoint_rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].endpoint, "list");
        assert_eq!(rows[0].failures, 1);
        assert!(!rows[0].passed());
        // flat groups still keep their bookkeeping
        assert_eq!(summary.failures_for("setup"), 1);
        assert_relative_eq!(summary.groups["setup"].average, 40.0);
    }

    #[test]
    fn registers_first_thresholds_only() {
        let text = [
            metric("http_req_duration", r#""p(95)<500""#),
            metric("http_req_duration", r#""p(95)<100""#),
            metric("http_req_failed", r#""rate<0.01""#),
        ]
        .concat();
        let mut thresholds = Thresholds::new();
        aggregate(&text, &mut thresholds).expect("valid stream");
        assert_eq!(thresholds.rules("http_req_duration"), ["p(95)<500"]);
        assert_eq!(thresholds.rules("http_req_failed"), ["rate<0.01"]);
    }

    #[test]
    fn metric_without_thresholds_registers_nothing() {
        let text = r#"{"type":"Metric","metric":"http_req_duration","data":{"type":"trend"}}"#;
        let mut thresholds = Thresholds::new();
        aggregate(text, &mut thresholds).expect("valid stream");
        assert!(thresholds.is_empty());
    }

    #[test]
    fn empty_thresholds_leave_the_slot_open() {
        let mut thresholds = Thresholds::new();
        let first = [
            metric("http_req_duration", ""),
            metric("http_req_failed", ""),
        ]
        .concat();
        aggregate(&first, &mut thresholds).expect("valid stream");
        assert!(thresholds.is_empty());

        let second = [
            metric("http_req_duration", r#""p(95)<50""#),
            point("http_req_duration", 100.0),
        ]
        .concat();
        let summary = aggregate(&second, &mut thresholds).expect("valid stream");
        assert_eq!(thresholds.rules("http_req_duration"), ["p(95)<50"]);

        let bound = DurationBound::find(thresholds.rules("http_req_duration"));
        assert_eq!(bound, Some(DurationBound(50.0)));
        let verdict = evaluate_duration(bound, [summary.durations.as_slice()]);
        assert!(!verdict.passed);
        assert!(verdict.is_configured());
    }

    #[test]
    fn failures_are_capped_at_requests() {
        let text = [
            point("http_reqs", 1.0),
            grouped_point("http_req_failed", 1.0, "::auth::login"),
            grouped_point("http_req_failed", 1.0, "::auth::login"),
        ]
        .concat();
        let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.passed_requests(), 0);
        assert_eq!(summary.failures_for("::auth::login"), 2);
    }

    #[test]
    fn ignores_unknown_and_malformed_records() {
        let text = [
            point("iterations", 1.0),
            r#"{"type":"Point","metric":"http_reqs","data":{"value":"1"}}"#.to_string(),
            r#"{"type":"Point","metric":"http_reqs","data":{}}"#.to_string(),
            r#"{"type":"Summary"}"#.to_string(),
            point("http_reqs", 1.0),
        ]
        .concat();
        let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
        assert_eq!(summary.requests, 1);
    }

    #[test]
    fn broken_stream_registers_nothing() {
        let text = format!("{}{{", metric("http_req_duration", r#""p(95)<500""#));
        let mut thresholds = Thresholds::new();
        assert!(aggregate(&text, &mut thresholds).is_err());
        assert!(thresholds.is_empty());
    }

    proptest! {
        #[test]
        fn failures_never_exceed_requests(
            requests in 0usize..30,
            failed in prop::collection::vec(any::<bool>(), 0..60),
        ) {
            let mut text = String::new();
            for _ in 0..requests {
                text.push_str(&point("http_reqs", 1.0));
            }
            for failure in &failed {
                text.push_str(&point("http_req_failed", if *failure { 1.0 } else { 0.0 }));
            }
            let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
            prop_assert!(summary.requests >= summary.failures);
            prop_assert_eq!(summary.requests, requests as u64);
        }

        #[test]
        fn failures_never_exceed_requests_without_failure_records(
            requests in 0usize..50,
            durations in prop::collection::vec(0.0f64..10_000.0, 0..50),
        ) {
            let mut text = String::new();
            for _ in 0..requests {
                text.push_str(&point("http_reqs", 1.0));
            }
            for duration in &durations {
                write!(text, "{}", point("http_req_duration", *duration)).expect("write to string");
            }
            text.push_str(&point("vus", 1.0));
            let summary = aggregate(&text, &mut Thresholds::new()).expect("valid stream");
            prop_assert_eq!(summary.failures, 0);
            prop_assert_eq!(summary.requests, requests as u64);
            prop_assert_eq!(summary.durations.len(), durations.len());
        }
    }
}
