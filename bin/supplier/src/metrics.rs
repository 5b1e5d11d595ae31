//! Prometheus metrics for the supplier.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Aggregated metrics for supply actions.
///
/// Metric descriptions are registered with the global registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        describe_counter!(
            "supplier_supplies_total",
            "Total number of confirmed supplies by authorization method"
        );
        describe_counter!(
            "supplier_approvals_total",
            "Total number of supplies that needed an on-chain approval"
        );
        describe_counter!(
            "supplier_bridges_total",
            "Total number of supplies that bridged a shortfall"
        );
        describe_counter!(
            "supplier_failures_total",
            "Total number of failed supplies by reason"
        );
        describe_histogram!(
            "supplier_supply_duration_seconds",
            "Duration of a supply from request to confirmation"
        );
        describe_gauge!(
            "supplier_balance",
            "Last refreshed market-chain balance by symbol, in whole tokens"
        );
    }

    /// Record a confirmed supply.
    pub fn record_supply(&self, method: &str, approved: bool, bridged: bool, duration: Duration) {
        counter!("supplier_supplies_total", "method" => method.to_string()).increment(1);
        histogram!("supplier_supply_duration_seconds").record(duration.as_secs_f64());

        if approved {
            counter!("supplier_approvals_total").increment(1);
        }
        if bridged {
            counter!("supplier_bridges_total").increment(1);
        }
    }

    /// Record a failed supply.
    pub fn record_failure(&self, reason: &str, duration: Duration) {
        counter!("supplier_failures_total", "reason" => reason.to_string()).increment(1);
        histogram!("supplier_supply_duration_seconds").record(duration.as_secs_f64());
    }

    /// Set the last refreshed balance of `symbol`.
    pub fn set_balance(&self, symbol: &str, amount: f64) {
        gauge!("supplier_balance", "symbol" => symbol.to_string()).set(amount);
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
