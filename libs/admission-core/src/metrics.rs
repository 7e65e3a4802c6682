// [libs/admission-core/src/metrics.rs]
//! Metricas Prometheus del webhook: decisiones por kind/operation, latencia
//! de la cadena de validadores, aciertos de la cache de admision y errores
//! por validador.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Registry, TextEncoder,
};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "chutes_admission_decisions_total",
        "Admission decisions partitioned by decision only",
        &["decision"]
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration must not collide");
    counter
});

pub static INFO: Lazy<IntGaugeVec> = Lazy::new(|| {
    let gauge = register_int_gauge_vec!(
        "chutes_admission_info",
        "Constant-1 gauge carrying build/version labels",
        &["version"]
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("metric registration must not collide");
    gauge.with_label_values(&[env!("CARGO_PKG_VERSION")]).set(1);
    gauge
});

pub static DECISIONS_BY_KIND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "chutes_admission_decisions_by_kind_total",
        "Admission decisions partitioned by resource kind and decision",
        &["kind", "decision"]
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration must not collide");
    counter
});

pub static DECISIONS_BY_OPERATION_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "chutes_admission_decisions_by_operation_total",
        "Admission decisions partitioned by operation and decision",
        &["operation", "decision"]
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration must not collide");
    counter
});

pub static VALIDATOR_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = register_int_counter_vec!(
        "chutes_admission_validator_errors_total",
        "Internal validator errors, partitioned by validator name",
        &["validator"]
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration must not collide");
    counter
});

pub static CACHE_HITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = register_int_counter!(
        "chutes_admission_result_cache_hits_total",
        "Admission result cache hits"
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration must not collide");
    counter
});

pub static CACHE_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = register_int_counter!(
        "chutes_admission_result_cache_misses_total",
        "Admission result cache misses"
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registration must not collide");
    counter
});

pub static VALIDATION_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let histogram = register_histogram!(
        "chutes_admission_validation_duration_seconds",
        "Wall time spent fanning out to all validators for one request"
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric registration must not collide");
    histogram
});

pub static UPTIME_SECONDS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = register_int_gauge!(
        "chutes_admission_uptime_seconds",
        "Seconds since the webhook process started"
    )
    .expect("metric registration must not collide");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("metric registration must not collide");
    gauge
});

static PROCESS_STARTED_AT: Lazy<std::time::Instant> = Lazy::new(std::time::Instant::now);

pub fn record_decision(kind: &str, operation: &str, allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    DECISIONS_TOTAL.with_label_values(&[decision]).inc();
    DECISIONS_BY_KIND_TOTAL.with_label_values(&[kind, decision]).inc();
    DECISIONS_BY_OPERATION_TOTAL
        .with_label_values(&[operation, decision])
        .inc();
}

pub fn record_validator_error(validator_name: &str) {
    VALIDATOR_ERRORS_TOTAL.with_label_values(&[validator_name]).inc();
}

/// Renderiza todas las metricas registradas en formato de texto Prometheus.
pub fn encode_text() -> String {
    // Un gauge/contador Lazy que nunca se toca no llega a registrarse; estos
    // dos solo se leen en la ruta de metricas, asi que se fuerzan aqui.
    Lazy::force(&INFO);
    UPTIME_SECONDS.set(PROCESS_STARTED_AT.elapsed().as_secs() as i64);

    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("prometheus text encoding is infallible for well-formed metrics");
    String::from_utf8(buffer).expect("prometheus text encoder emits valid utf-8")
}
