use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let vec = IntCounterVec::new(Opts::new(name, help), labels)
        .expect("metric options are static and valid");
    if let Err(e) = prometheus::default_registry().register(Box::new(vec.clone())) {
        tracing::warn!(metric = name, error = %e, "failed to register metric");
    }
    vec
}

fn counter(name: &str, help: &str) -> IntCounter {
    let c = IntCounter::new(name, help).expect("metric options are static and valid");
    if let Err(e) = prometheus::default_registry().register(Box::new(c.clone())) {
        tracing::warn!(metric = name, error = %e, "failed to register metric");
    }
    c
}

/// Follow graph changes, labelled by `action` (follow / unfollow)
pub static FOLLOW_TOGGLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "reel_follow_toggles_total",
        "Follow graph toggles by resulting action",
        &["action"],
    )
});

pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("reel_messages_sent_total", "Direct messages stored"));

/// Post counter increments, labelled by `kind` (like / view)
pub static COUNTER_INCREMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "reel_counter_increments_total",
        "Like and view increments applied to posts",
        &["kind"],
    )
});

/// One-time code checks, labelled by `outcome`
pub static OTP_VERIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "reel_otp_verifications_total",
        "One-time code verification attempts by outcome",
        &["outcome"],
    )
});
