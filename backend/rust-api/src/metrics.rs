use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP metrics
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

    // Business metrics
    pub static ref QUIZ_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_total",
        "Total number of quiz attempts",
        &["status"]
    )
    .unwrap();

    pub static ref ANSWERS_SCORED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_scored_total",
        "Total number of answers scored",
        &["correct"]
    )
    .unwrap();

    pub static ref AI_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ai_requests_total",
        "Total number of AI feedback requests",
        &["operation", "source"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format.
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_render_in_text_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
    }

    #[test]
    fn business_counters_are_registered() {
        QUIZ_ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();
        ANSWERS_SCORED_TOTAL.with_label_values(&["true"]).inc();
        AI_REQUESTS_TOTAL
            .with_label_values(&["summarize", "local"])
            .inc();

        let output = render_metrics().unwrap();
        assert!(output.contains("quiz_attempts_total"));
        assert!(output.contains("answers_scored_total"));
        assert!(output.contains("ai_requests_total"));
    }
}
