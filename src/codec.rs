//! `put` line protocol encoding.
//!
//! Every data point is rendered as a single newline-terminated line:
//!
//! ```text
//! put <metric> <unix-seconds> <value> [<key>=<value> ]*\n
//! ```
//!
//! No escaping is applied. Metric names, tag keys and tag values containing
//! spaces or `=` produce a line the server will reject.

use std::fmt::{Display, Write};

use bytes::Bytes;

use crate::types::Tags;

/// Command keyword that starts every line.
pub const PUT_COMMAND: &str = "put";

/// Truncate a caller-supplied timestamp to whole seconds.
///
/// The fractional part is dropped (rounded toward zero). Non-finite input
/// saturates the way `as` casts do: NaN becomes 0.
pub fn truncate_timestamp(timestamp: f64) -> i64 {
    timestamp as i64
}

/// Render a data point as a `put` line.
///
/// # Example
///
/// ```
/// use simpletsdb::{codec::format_point, Tags};
///
/// let mut tags = Tags::new();
/// tags.insert("foo".to_string(), "bar".to_string());
///
/// let line = format_point("testmetric", 5.0, 555, Some(&tags));
/// assert_eq!(line, "put testmetric 5 555 foo=bar \n");
/// ```
pub fn format_point<V: Display>(
    metric: &str,
    timestamp: f64,
    value: V,
    tags: Option<&Tags>,
) -> String {
    let mut line = String::with_capacity(32 + metric.len());
    // Writing into a String cannot fail.
    let _ = write!(
        line,
        "{PUT_COMMAND} {metric} {} {value} ",
        truncate_timestamp(timestamp)
    );
    if let Some(tags) = tags {
        for (key, value) in tags {
            let _ = write!(line, "{key}={value} ");
        }
    }
    line.push('\n');
    line
}

/// Render a data point straight into a [`Bytes`] frame for the pending queue.
pub fn encode_point<V: Display>(
    metric: &str,
    timestamp: f64,
    value: V,
    tags: Option<&Tags>,
) -> Bytes {
    Bytes::from(format_point(metric, timestamp, value, tags))
}
