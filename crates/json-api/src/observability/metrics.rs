//! Prometheus metrics collection and exposition endpoint.

use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, core::Collector,
};
use replygate_app::rate_limits::RateLimitDecision;
use salvo::{
    Request, Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tracing::error;

#[derive(Debug)]
struct GatewayMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    requests_in_flight: IntGauge,
    auth_failures_total: IntCounterVec,
    rate_limit_decisions_total: IntCounterVec,
    rate_limiter_fail_open_total: IntCounter,
}

static GATEWAY_METRICS: OnceLock<Option<GatewayMetrics>> = OnceLock::new();

#[derive(Debug)]
pub(super) struct InFlightRequestGuard {
    tracked: bool,
}

impl InFlightRequestGuard {
    pub(super) fn track() -> Self {
        if let Some(metrics) = metrics() {
            metrics.requests_in_flight.inc();
            return Self { tracked: true };
        }

        Self { tracked: false }
    }
}

impl Drop for InFlightRequestGuard {
    fn drop(&mut self) {
        if self.tracked
            && let Some(metrics) = metrics()
        {
            metrics.requests_in_flight.dec();
        }
    }
}

pub(super) fn observe_request(method: &str, route: &str, status_code: u16, duration_seconds: f64) {
    let Some(metrics) = metrics() else {
        return;
    };

    let status_class = status_class(status_code);
    let status_code = status_code.to_string();

    metrics
        .requests_total
        .with_label_values(&[method, route, status_class, status_code.as_str()])
        .inc();

    metrics
        .request_duration_seconds
        .with_label_values(&[method, route])
        .observe(duration_seconds);
}

/// Count a rejected credential by its internal reason label.
pub(crate) fn observe_auth_failure(reason: &str) {
    if let Some(metrics) = metrics() {
        metrics
            .auth_failures_total
            .with_label_values(&[reason])
            .inc();
    }
}

pub(crate) fn observe_rate_limit(decision: &RateLimitDecision) {
    let Some(metrics) = metrics() else {
        return;
    };

    let outcome = match (decision.allowed, decision.degraded) {
        (true, false) => "allowed",
        (true, true) => "degraded",
        (false, _) => "denied",
    };

    metrics
        .rate_limit_decisions_total
        .with_label_values(&[outcome])
        .inc();

    if decision.degraded {
        metrics.rate_limiter_fail_open_total.inc();
    }
}

#[handler]
pub(crate) async fn metrics_handler(_req: &mut Request, res: &mut Response) {
    let Some(metrics) = metrics() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };

    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();

    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metric_families, &mut encoded) {
        error!("failed to encode metrics response: {source}");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

        return;
    }

    let content_type = match HeaderValue::from_str(encoder.format_type()) {
        Ok(value) => value,
        Err(source) => {
            error!("failed to encode metrics content type header: {source}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

            return;
        }
    };

    res.headers_mut().insert(CONTENT_TYPE, content_type);
    res.render(String::from_utf8_lossy(&encoded).into_owned());
}

fn metrics() -> Option<&'static GatewayMetrics> {
    GATEWAY_METRICS.get_or_init(build_metrics).as_ref()
}

fn register<M>(registry: &Registry, name: &str, metric: Result<M, prometheus::Error>) -> Option<M>
where
    M: Collector + Clone + 'static,
{
    let metric = match metric {
        Ok(metric) => metric,
        Err(source) => {
            error!("failed to create {name} metric: {source}");
            return None;
        }
    };

    if let Err(source) = registry.register(Box::new(metric.clone())) {
        error!("failed to register {name} metric: {source}");
        return None;
    }

    Some(metric)
}

fn build_metrics() -> Option<GatewayMetrics> {
    let registry = Registry::new();

    let requests_total = register(
        &registry,
        "requests_total",
        IntCounterVec::new(
            Opts::new(
                "replygate_json_http_requests_total",
                "Total HTTP requests partitioned by method, route, status class, and status code.",
            ),
            &["method", "route", "status_class", "status_code"],
        ),
    )?;

    let request_duration_seconds = register(
        &registry,
        "request_duration",
        HistogramVec::new(
            HistogramOpts::new(
                "replygate_json_http_request_duration_seconds",
                "HTTP request duration in seconds partitioned by method and route.",
            )
            .buckets(vec![
                0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "route"],
        ),
    )?;

    let requests_in_flight = register(
        &registry,
        "in_flight",
        IntGauge::with_opts(Opts::new(
            "replygate_json_http_requests_in_flight",
            "Current number of in-flight HTTP requests.",
        )),
    )?;

    let auth_failures_total = register(
        &registry,
        "auth_failures",
        IntCounterVec::new(
            Opts::new(
                "replygate_json_auth_failures_total",
                "Rejected credentials partitioned by reason.",
            ),
            &["reason"],
        ),
    )?;

    let rate_limit_decisions_total = register(
        &registry,
        "rate_limit_decisions",
        IntCounterVec::new(
            Opts::new(
                "replygate_json_rate_limit_decisions_total",
                "Rate limiter decisions partitioned by outcome.",
            ),
            &["outcome"],
        ),
    )?;

    let rate_limiter_fail_open_total = register(
        &registry,
        "rate_limiter_fail_open",
        IntCounter::new(
            "replygate_json_rate_limiter_fail_open_total",
            "Requests let through because the rate limit store was unavailable.",
        ),
    )?;

    Some(GatewayMetrics {
        registry,
        requests_total,
        request_duration_seconds,
        requests_in_flight,
        auth_failures_total,
        rate_limit_decisions_total,
        rate_limiter_fail_open_total,
    })
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use replygate_app::rate_limits::RateLimitPolicy;
    use salvo::{
        Router, Service,
        test::{ResponseExt, TestClient},
    };

    use super::*;

    #[tokio::test]
    async fn metrics_endpoint_exposes_gateway_metrics() {
        let policy = RateLimitPolicy::new(1, 1_000);

        observe_request("GET", "/extension/me", 200, 0.042);
        observe_auth_failure("credential_expired");
        observe_rate_limit(&RateLimitDecision::fail_open(policy));
        observe_rate_limit(&RateLimitDecision::deny(policy, 10));

        let service =
            Service::new(Router::new().push(Router::with_path("metrics").get(metrics_handler)));

        let response = TestClient::get("http://example.com/metrics")
            .send(&service)
            .await
            .take_string()
            .await
            .unwrap_or_default();

        for name in [
            "replygate_json_http_requests_total",
            "replygate_json_http_request_duration_seconds",
            "replygate_json_http_requests_in_flight",
            "replygate_json_auth_failures_total{reason=\"credential_expired\"}",
            "replygate_json_rate_limit_decisions_total{outcome=\"denied\"}",
            "replygate_json_rate_limiter_fail_open_total",
        ] {
            assert!(response.contains(name), "expected {name} in metrics response");
        }
    }

    #[test]
    fn status_codes_are_bucketed_by_class() {
        assert_eq!(status_class(204), "2xx");
        assert_eq!(status_class(429), "4xx");
        assert_eq!(status_class(503), "5xx");
        assert_eq!(status_class(42), "other");
    }
}
