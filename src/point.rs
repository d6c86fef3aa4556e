//! Owned data point values.

use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::codec::format_point;
use crate::types::Tags;

/// A single time-series sample.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Metric name.
    pub metric: String,
    /// Unix timestamp in seconds. Truncated to an integer on the wire.
    pub timestamp: f64,
    /// Value in its natural string form.
    pub value: String,
    /// Tags, rendered in ascending key order.
    pub tags: Tags,
}

impl DataPoint {
    /// Create a point with no tags.
    pub fn new(metric: impl Into<String>, timestamp: f64, value: impl Display) -> Self {
        Self {
            metric: metric.into(),
            timestamp,
            value: value.to_string(),
            tags: Tags::new(),
        }
    }

    /// Create a point builder.
    ///
    /// The timestamp defaults to the current wall-clock time.
    pub fn builder(metric: impl Into<String>, value: impl Display) -> PointBuilder {
        PointBuilder::new(metric, value)
    }

    /// Render the point as a `put` line.
    pub fn to_line(&self) -> String {
        format_point(&self.metric, self.timestamp, &self.value, Some(&self.tags))
    }

    /// Render the point as a queue frame.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_line())
    }
}

/// Builder for [`DataPoint`].
#[derive(Debug, Clone)]
pub struct PointBuilder {
    metric: String,
    timestamp: Option<f64>,
    value: String,
    tags: Tags,
}

impl PointBuilder {
    /// Create a new point builder.
    pub fn new(metric: impl Into<String>, value: impl Display) -> Self {
        Self {
            metric: metric.into(),
            timestamp: None,
            value: value.to_string(),
            tags: Tags::new(),
        }
    }

    /// Set the timestamp in (possibly fractional) unix seconds.
    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the timestamp from a [`SystemTime`].
    pub fn time(mut self, time: SystemTime) -> Self {
        self.timestamp = Some(unix_seconds(time));
        self
    }

    /// Add a tag. A repeated key replaces the previous value.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add several tags at once.
    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build the point.
    pub fn build(self) -> DataPoint {
        DataPoint {
            metric: self.metric,
            timestamp: self
                .timestamp
                .unwrap_or_else(|| unix_seconds(SystemTime::now())),
            value: self.value,
            tags: self.tags,
        }
    }
}

fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_point_to_line() {
        let point = DataPoint::builder("testmetric", 555)
            .timestamp(5.0)
            .tag("foo", "bar")
            .build();
        assert_eq!(point.to_line(), "put testmetric 5 555 foo=bar \n");
        assert_eq!(point.to_bytes().as_ref(), b"put testmetric 5 555 foo=bar \n");
    }

    #[test]
    fn test_builder_tags_replace() {
        let point = DataPoint::builder("m", 1.5)
            .timestamp(0.0)
            .tags([("host", "a"), ("dc", "x")])
            .tag("host", "b")
            .build();
        assert_eq!(point.tags.len(), 2);
        assert_eq!(point.to_line(), "put m 0 1.5 dc=x host=b \n");
    }

    #[test]
    fn test_builder_time() {
        let time = UNIX_EPOCH + Duration::from_millis(42_750);
        let point = DataPoint::builder("m", 1).time(time).build();
        assert_eq!(point.timestamp, 42.75);
        assert_eq!(point.to_line(), "put m 42 1 \n");
    }

    #[test]
    fn test_builder_defaults_to_now() {
        let point = DataPoint::builder("m", 1).build();
        assert!(point.timestamp > 1_600_000_000.0);
    }

    #[test]
    fn test_new_has_no_tags() {
        let point = DataPoint::new("m", 3.0, "x");
        assert!(point.tags.is_empty());
        assert_eq!(point.to_line(), "put m 3 x \n");
    }
}
