//! Canonical representation of a k6 result record
//!
//! Each object in a results file is either a `Point`, a single observation
//! of a metric, or a `Metric`, the definition of a metric which may carry
//! threshold rules. Records are transient: they are folded into a
//! [`crate::aggregate::SourceSummary`] and dropped.

use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Tag holding the hierarchical group label of an observation.
pub const GROUP_TAG: &str = "group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The metrics this crate folds into summaries.
pub enum MetricKind {
    /// `http_reqs`, one point per issued request.
    HttpReqs,
    /// `http_req_failed`, value 1 for a failed request.
    HttpReqFailed,
    /// `http_req_duration`, request duration in milliseconds.
    HttpReqDuration,
    /// `group_duration`, duration of one iteration through a group.
    GroupDuration,
    /// `vus`, active virtual users at a point in time.
    Vus,
    /// `data_sent`, bytes written.
    DataSent,
    /// `data_received`, bytes read.
    DataReceived,
}

impl MetricKind {
    /// The metric name as it appears on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HttpReqs => "http_reqs",
            Self::HttpReqFailed => "http_req_failed",
            Self::HttpReqDuration => "http_req_duration",
            Self::GroupDuration => "group_duration",
            Self::Vus => "vus",
            Self::DataSent => "data_sent",
            Self::DataReceived => "data_received",
        }
    }
}

/// Error for a metric name this crate does not fold.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http_reqs" => Ok(Self::HttpReqs),
            "http_req_failed" => Ok(Self::HttpReqFailed),
            "http_req_duration" => Ok(Self::HttpReqDuration),
            "group_duration" => Ok(Self::GroupDuration),
            "vus" => Ok(Self::Vus),
            "data_sent" => Ok(Self::DataSent),
            "data_received" => Ok(Self::DataReceived),
            _ => Err(UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
/// The `data` payload of a [`Record::Point`].
pub struct PointData {
    /// The observed value. Absent values are tolerated and ignored.
    #[serde(default)]
    pub value: Option<f64>,
    /// Tags attached to the observation.
    #[serde(default)]
    pub tags: Option<FxHashMap<String, String>>,
}

impl PointData {
    /// The `group` tag of this observation, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.tags
            .as_ref()
            .and_then(|tags| tags.get(GROUP_TAG))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
/// The `data` payload of a [`Record::Metric`].
pub struct MetricData {
    /// Threshold rule strings declared for the metric, e.g. `p(95)<500`.
    #[serde(default)]
    pub thresholds: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
/// A single record of a results file.
pub enum Record {
    /// One observation of a metric.
    Point {
        /// Metric name.
        metric: String,
        /// Observation payload.
        #[serde(default)]
        data: PointData,
    },
    /// The declaration of a metric.
    Metric {
        /// Metric name.
        metric: String,
        /// Declaration payload.
        #[serde(default)]
        data: MetricData,
    },
    /// Any record type this crate does not consume.
    #[serde(other)]
    Other,
}

impl Record {
    /// Decode a record from an already parsed JSON value.
    ///
    /// Returns `None` when the value does not look like a record, for
    /// instance a `Point` without a `metric` or with a non-numeric
    /// `value`. Such records are not fatal; callers skip them.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// The metric name of this record, if it has one.
    #[must_use]
    pub fn metric(&self) -> Option<&str> {
        match self {
            Self::Point { metric, .. } | Self::Metric { metric, .. } => Some(metric),
            Self::Other => None,
        }
    }
}
