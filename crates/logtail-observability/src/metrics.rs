use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Encode Metrics
    // ============================================================================

    /// Tail records serialized
    pub static ref TAIL_RECORDS_ENCODED_TOTAL: IntCounter = IntCounter::new(
        "logtail_tail_records_encoded_total",
        "Total tail records encoded"
    ).expect("metric can be created");

    /// Encode failures
    pub static ref TAIL_RECORD_ENCODE_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("logtail_tail_record_encode_errors_total", "Total tail record encode errors"),
        &["reason"]
    ).expect("metric can be created");

    /// Payload size of encoded tail records
    pub static ref TAIL_RECORD_PAYLOAD_BYTES: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "logtail_tail_record_payload_bytes",
            "Payload size of encoded tail records"
        )
        .buckets(vec![0.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0])
    ).expect("metric can be created");

    // ============================================================================
    // Decode Metrics
    // ============================================================================

    /// Tail records decoded, by payload path
    pub static ref TAIL_RECORDS_DECODED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("logtail_tail_records_decoded_total", "Total tail records decoded"),
        &["path"] // none, flat, zero_copy
    ).expect("metric can be created");

    /// Decode failures
    pub static ref TAIL_RECORD_DECODE_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("logtail_tail_record_decode_errors_total", "Total tail record decode errors"),
        &["reason"]
    ).expect("metric can be created");

    /// Bytes skipped from newer protocol versions
    pub static ref TAIL_RECORD_TRAILING_BYTES_SKIPPED_TOTAL: IntCounter = IntCounter::new(
        "logtail_tail_record_trailing_bytes_skipped_total",
        "Total trailing bytes skipped for forward compatibility"
    ).expect("metric can be created");

    // ============================================================================
    // Zero-Copy Metrics
    // ============================================================================

    /// Zero-copy requested outside a worker, served as a copy
    pub static ref ZERO_COPY_FALLBACKS_TOTAL: IntCounter = IntCounter::new(
        "logtail_zero_copy_fallbacks_total",
        "Total zero-copy decodes that fell back to an owned copy"
    ).expect("metric can be created");

    /// Buffers waiting in disposal queues
    pub static ref ZERO_COPY_BUFFERS_PENDING: IntGauge = IntGauge::new(
        "logtail_zero_copy_buffers_pending",
        "Zero-copy buffers waiting for disposal"
    ).expect("metric can be created");

    /// Buffers released by disposal queues
    pub static ref ZERO_COPY_BUFFERS_DISPOSED_TOTAL: IntCounter = IntCounter::new(
        "logtail_zero_copy_buffers_disposed_total",
        "Total zero-copy buffers released"
    ).expect("metric can be created");
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn init() {
    INIT.call_once(|| {
        // Encode metrics
        REGISTRY
            .register(Box::new(TAIL_RECORDS_ENCODED_TOTAL.clone()))
            .expect("tail_records_encoded_total can be registered");
        REGISTRY
            .register(Box::new(TAIL_RECORD_ENCODE_ERRORS_TOTAL.clone()))
            .expect("tail_record_encode_errors_total can be registered");
        REGISTRY
            .register(Box::new(TAIL_RECORD_PAYLOAD_BYTES.clone()))
            .expect("tail_record_payload_bytes can be registered");

        // Decode metrics
        REGISTRY
            .register(Box::new(TAIL_RECORDS_DECODED_TOTAL.clone()))
            .expect("tail_records_decoded_total can be registered");
        REGISTRY
            .register(Box::new(TAIL_RECORD_DECODE_ERRORS_TOTAL.clone()))
            .expect("tail_record_decode_errors_total can be registered");
        REGISTRY
            .register(Box::new(TAIL_RECORD_TRAILING_BYTES_SKIPPED_TOTAL.clone()))
            .expect("tail_record_trailing_bytes_skipped_total can be registered");

        // Zero-copy metrics
        REGISTRY
            .register(Box::new(ZERO_COPY_FALLBACKS_TOTAL.clone()))
            .expect("zero_copy_fallbacks_total can be registered");
        REGISTRY
            .register(Box::new(ZERO_COPY_BUFFERS_PENDING.clone()))
            .expect("zero_copy_buffers_pending can be registered");
        REGISTRY
            .register(Box::new(ZERO_COPY_BUFFERS_DISPOSED_TOTAL.clone()))
            .expect("zero_copy_buffers_disposed_total can be registered");

        tracing::debug!(metrics = REGISTRY.gather().len(), "registered tail record metrics");
    });
}
