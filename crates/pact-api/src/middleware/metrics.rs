//! # Request Metrics
//!
//! Prometheus registry holding HTTP request counters and a latency
//! histogram, recorded by [`metrics_middleware`] and encoded in text
//! exposition format at `/metrics`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create the collectors and register them with a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("pact_http_requests_total", "HTTP requests served"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pact_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("pact_http_errors_total", "HTTP responses with a 4xx or 5xx status"),
            &["method", "path", "status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
            }),
        })
    }

    /// Requests recorded, summed across labels.
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// 4xx and 5xx responses recorded, summed across labels.
    pub fn errors(&self) -> u64 {
        sum_counters(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: StatusCode, duration_secs: f64) {
        let status = status.as_u16().to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status.starts_with('4') || status.starts_with('5') {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status])
                .inc();
        }
    }

    /// Gather every registered family and encode it as exposition text.
    pub fn gather_and_encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Replace UUID path segments with `{id}` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::try_parse(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records request count, latency and errors.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(&method, &path, response.status(), start.elapsed().as_secs_f64());
    }

    response
}

/// GET /metrics
pub async fn metrics_handler(Extension(metrics): Extension<ApiMetrics>) -> Response {
    match metrics.gather_and_encode() {
        Ok(text) => (
            [(
                axum::http::header::CONTENT_TYPE,
                TextEncoder::new().format_type().to_string(),
            )],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_only_4xx_and_5xx() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/v1/contracts", StatusCode::OK, 0.01);
        m.record_request("POST", "/v1/contracts", StatusCode::CONFLICT, 0.01);
        m.record_request("GET", "/v1/contracts", StatusCode::INTERNAL_SERVER_ERROR, 0.2);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn encoded_text_carries_labels_and_types() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("POST", "/v1/contracts", StatusCode::CONFLICT, 0.01);
        let text = m.gather_and_encode().unwrap();

        assert!(text.contains("# TYPE pact_http_requests_total counter"), "{text}");
        assert!(text.contains("# TYPE pact_http_request_duration_seconds histogram"), "{text}");
        let errors = text
            .lines()
            .find(|l| l.starts_with("pact_http_errors_total{"))
            .unwrap();
        assert!(errors.contains(r#"method="POST""#), "{errors}");
        assert!(errors.contains(r#"status="409""#), "{errors}");
        assert!(errors.ends_with(" 1"), "{errors}");
    }

    #[test]
    fn clones_share_the_registry() {
        let m = ApiMetrics::new().unwrap();
        let c = m.clone();
        c.record_request("GET", "/health/liveness", StatusCode::OK, 0.0);
        assert_eq!(m.requests(), 1);
    }

    #[test]
    fn registries_are_independent() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.record_request("GET", "/", StatusCode::OK, 0.0);
        assert_eq!(b.requests(), 0);
    }

    #[test]
    fn uuid_segments_are_normalized() {
        assert_eq!(
            normalize_path("/v1/proposals/67e55044-10b1-426f-9247-bb680e5fe0c8/accept"),
            "/v1/proposals/{id}/accept"
        );
        assert_eq!(normalize_path("/v1/contracts"), "/v1/contracts");
    }
}
