//! Run counters.
//!
//! The binary installs a Prometheus recorder for the lifetime of the run and
//! logs the rendered counters when it ends. Nothing is served over HTTP.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, warn};

/// Install the global recorder. Returns `None` when one is already installed.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("metrics recorder not installed: {e}");
            None
        }
    }
}

/// Sample lines of the rendered exposition, without comments.
pub fn counter_lines(handle: &PrometheusHandle) -> Vec<String> {
    handle
        .render()
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn log_counters(handle: &PrometheusHandle) {
    for line in counter_lines(handle) {
        debug!("metric {line}");
    }
}
