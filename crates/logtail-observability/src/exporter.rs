use prometheus::{Encoder, TextEncoder};

use crate::metrics::REGISTRY;

/// Content type of `render()` output
pub fn content_type() -> &'static str {
    "text/plain; version=0.0.4"
}

/// Render the registry in the Prometheus text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics are not utf-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;

    #[test]
    fn test_render_includes_registered_metrics() {
        metrics::init();
        metrics::TAIL_RECORDS_ENCODED_TOTAL.inc();

        let text = render().unwrap();
        assert!(text.contains("logtail_tail_records_encoded_total"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(), TextEncoder::new().format_type());
    }
}
