use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Build a recorder without installing it globally. Used by tests that need
/// a handle to render.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn register_metrics() {
    // Pre-register counters so they appear even before the first increment.
    counter!("blocks_processed_total").absolute(0);
    counter!("logs_fetched_total").absolute(0);
    counter!("trades_decoded_total").absolute(0);
    counter!("duplicate_trades_total").absolute(0);
    counter!("cluster_signals_total").absolute(0);
    counter!("whale_alerts_total").absolute(0);
    counter!("smart_trades_total").absolute(0);
    counter!("tick_failures_total").absolute(0);
    counter!("notifications_failed_total").absolute(0);
    for kind in ["truncated", "degenerate_fill", "overflow", "malformed_address"] {
        counter!("decode_errors_total", "kind" => kind).absolute(0);
    }

    gauge!("chain_cursor_block").set(0.0);
    gauge!("tracked_wallets").set(0.0);
    gauge!("open_windows").set(0.0);
    gauge!("paper_open_positions").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("tick_duration_seconds").record(0.0);
}
