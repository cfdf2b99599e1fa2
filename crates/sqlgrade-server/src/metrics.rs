//! Prometheus metrics for query execution and grading

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use sqlgrade_core::Outcome;

/// Query latency buckets (seconds), 1ms to 10s
const QUERY_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Metrics owned by one server instance, on their own registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    /// Labels: status (ok, error)
    queries_total: IntCounterVec,

    /// Labels: outcome (match, mismatch, error)
    verdicts_total: IntCounterVec,

    query_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let queries_total = IntCounterVec::new(
            Opts::new("sqlgrade_queries_total", "Total learner queries executed"),
            &["status"],
        )?;
        let verdicts_total = IntCounterVec::new(
            Opts::new("sqlgrade_verdicts_total", "Total graded attempts by outcome"),
            &["outcome"],
        )?;
        let query_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sqlgrade_query_duration_seconds",
                "Execute and decode time in seconds",
            )
            .buckets(QUERY_LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(queries_total.clone()))?;
        registry.register(Box::new(verdicts_total.clone()))?;
        registry.register(Box::new(query_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            queries_total,
            verdicts_total,
            query_duration_seconds,
        })
    }

    pub fn record_query(&self, elapsed: Duration) {
        self.queries_total.with_label_values(&["ok"]).inc();
        self.query_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_query_error(&self) {
        self.queries_total.with_label_values(&["error"]).inc();
    }

    pub fn record_verdict(&self, outcome: Outcome) {
        let label = match outcome {
            Outcome::Match => "match",
            Outcome::Mismatch => "mismatch",
            Outcome::Error => "error",
        };
        self.verdicts_total.with_label_values(&[label]).inc();
    }

    /// Text exposition format, with its content type.
    pub fn encode(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_exposition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_query(Duration::from_millis(12));
        metrics.record_query_error();
        metrics.record_verdict(Outcome::Match);
        metrics.record_verdict(Outcome::Mismatch);
        metrics.record_verdict(Outcome::Mismatch);

        let (content_type, body) = metrics.encode().unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains(r#"sqlgrade_queries_total{status="ok"} 1"#));
        assert!(text.contains(r#"sqlgrade_queries_total{status="error"} 1"#));
        assert!(text.contains(r#"sqlgrade_verdicts_total{outcome="mismatch"} 2"#));
        assert!(text.contains("sqlgrade_query_duration_seconds_count 1"));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_query_error();

        let (_, body) = b.encode().unwrap();
        assert!(!String::from_utf8(body).unwrap().contains("status=\"error\""));
    }
}
