use std::net::SocketAddr;

use crate::sql::Command;

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: booking requests by result. Labels: outcome.
pub const BOOKINGS_TOTAL: &str = "campusflow_bookings_total";

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "campusflow_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "campusflow_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "campusflow_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "campusflow_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "campusflow_connections_rejected_total";

/// Counter: commands refused because the session role lacks the capability.
pub const AUTH_FAILURES_TOTAL: &str = "campusflow_auth_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertBooking { .. } => "insert_booking",
        Command::SelectBookings { .. } => "select_bookings",
        Command::SelectUsage => "select_usage",
        Command::SelectResources => "select_resources",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_without_port_is_noop() {
        assert!(init(None).is_ok());
    }

    #[test]
    fn command_labels_are_distinct() {
        let labels = [
            command_label(&Command::InsertBooking {
                event_name: "a".into(),
                resource_id: "R101".into(),
                start: 1,
                end: 2,
            }),
            command_label(&Command::SelectBookings { resource_id: None }),
            command_label(&Command::SelectUsage),
            command_label(&Command::SelectResources),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
