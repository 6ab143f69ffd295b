use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Generative AI Metrics
    pub static ref AI_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ai_requests_total",
        "Total number of generative AI calls",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref AI_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ai_request_duration_seconds",
        "Generative AI call duration in seconds",
        &["operation"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap();

    // Video lookup Metrics
    pub static ref VIDEO_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "video_lookups_total",
        "Total number of video lookup calls",
        &["status"]
    )
    .unwrap();

    // Business Metrics
    pub static ref COURSES_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "courses_created_total",
        "Total number of courses created",
        &["category"]
    )
    .unwrap();

    pub static ref ENROLLMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "enrollments_total",
        "Total number of enrollment actions",
        &["action"]
    )
    .unwrap();

    pub static ref TOPICS_COMPLETED_TOTAL: IntCounter = register_int_counter!(
        "topics_completed_total",
        "Total number of topics marked completed"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a generative AI call with metrics
pub async fn track_ai_operation<F, T>(operation: &str, future: F) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    AI_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    AI_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .inc();
        AI_REQUESTS_TOTAL
            .with_label_values(&["generate_layout", "success"])
            .inc();
        TOPICS_COMPLETED_TOTAL.inc();

        let rendered = render_metrics().unwrap();
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("ai_requests_total"));
        assert!(rendered.contains("topics_completed_total"));
    }
}
