//! Metric keys used by the steward.

/// Counter for successful key rotations since process start.
pub const METRICS_KEY_ROTATION_SUCCESS: &str = "rotation.success";
/// Counter for failed key reload attempts.
pub const METRICS_KEY_ROTATION_FAILURE: &str = "rotation.failure";

/// Describe all metrics used by the service.
///
/// This calls the `describe_*` functions from the `metrics` crate to set
/// metadata on the different metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_KEY_ROTATION_SUCCESS,
        metrics::Unit::Count,
        "Number of successful key rotations"
    );
    metrics::describe_counter!(
        METRICS_KEY_ROTATION_FAILURE,
        metrics::Unit::Count,
        "Number of failed key reload attempts"
    );
}
