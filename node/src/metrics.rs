// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped at `/metrics` on the
//! metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the `token`
//! namespace so they never collide with the default global registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use token_ledger::{LedgerError, Outcome};

/// Metric handles for the node.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Registry that owns every metric below.
    registry: Registry,
    /// Calls that committed, by operation.
    pub operations_applied_total: IntCounterVec,
    /// Calls refused by a business rule, by operation and reason.
    pub operations_rejected_total: IntCounterVec,
    /// Calls that aborted with a fault, by operation.
    pub operations_failed_total: IntCounterVec,
    /// Number of account records in the store.
    pub accounts: IntGauge,
    /// Time spent inside the ledger per call, by operation.
    pub operation_latency_seconds: HistogramVec,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("token".into()), None)
            .expect("failed to create prometheus registry");

        let operations_applied_total = IntCounterVec::new(
            Opts::new(
                "operations_applied_total",
                "Ledger calls whose writes were committed",
            ),
            &["operation"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(operations_applied_total.clone()))
            .expect("metric registration");

        let operations_rejected_total = IntCounterVec::new(
            Opts::new(
                "operations_rejected_total",
                "Ledger calls refused by a business rule",
            ),
            &["operation", "reason"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(operations_rejected_total.clone()))
            .expect("metric registration");

        let operations_failed_total = IntCounterVec::new(
            Opts::new(
                "operations_failed_total",
                "Ledger calls aborted by a fault (no caller, uninitialized, storage)",
            ),
            &["operation"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(operations_failed_total.clone()))
            .expect("metric registration");

        let accounts = IntGauge::new("accounts", "Number of account records in the ledger")
            .expect("metric creation");
        registry
            .register(Box::new(accounts.clone()))
            .expect("metric registration");

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Time spent inside the ledger per call",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["operation"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            operations_applied_total,
            operations_rejected_total,
            operations_failed_total,
            accounts,
            operation_latency_seconds,
        }
    }

    /// Record the result of one mutating call.
    pub fn observe(
        &self,
        operation: &str,
        result: Result<&Outcome, &LedgerError>,
        elapsed: Duration,
    ) {
        self.operation_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());

        match result {
            Ok(Outcome::Applied) => self
                .operations_applied_total
                .with_label_values(&[operation])
                .inc(),
            Ok(Outcome::Rejected(reason)) => self
                .operations_rejected_total
                .with_label_values(&[operation, reason.code()])
                .inc(),
            Err(_) => self
                .operations_failed_total
                .with_label_values(&[operation])
                .inc(),
        }
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
