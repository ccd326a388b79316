use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub orders_in_queue: IntGauge,
    pub assignment_latency_seconds: HistogramVec,
    pub stage_rejections_total: IntCounterVec,
    pub routing_fallbacks_total: IntCounter,
    pub workload_drift_couriers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment runs by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let orders_in_queue = IntGauge::new("orders_in_queue", "Orders waiting for assignment")
            .expect("valid orders_in_queue metric");

        let assignment_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of one assignment run in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let stage_rejections_total = IntCounterVec::new(
            Opts::new(
                "stage_rejections_total",
                "Candidates removed by each eligibility stage",
            ),
            &["stage"],
        )
        .expect("valid stage_rejections_total metric");

        let routing_fallbacks_total = IntCounter::new(
            "routing_fallbacks_total",
            "Candidates ranked with the straight-line estimate",
        )
        .expect("valid routing_fallbacks_total metric");

        let workload_drift_couriers = IntGauge::new(
            "workload_drift_couriers",
            "Couriers whose stored workload disagrees with their orders",
        )
        .expect("valid workload_drift_couriers metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(orders_in_queue.clone()))
            .expect("register orders_in_queue");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(stage_rejections_total.clone()))
            .expect("register stage_rejections_total");
        registry
            .register(Box::new(routing_fallbacks_total.clone()))
            .expect("register routing_fallbacks_total");
        registry
            .register(Box::new(workload_drift_couriers.clone()))
            .expect("register workload_drift_couriers");

        Self {
            registry,
            assignments_total,
            orders_in_queue,
            assignment_latency_seconds,
            stage_rejections_total,
            routing_fallbacks_total,
            workload_drift_couriers,
        }
    }

    pub fn observe_assignment(&self, outcome: &str, elapsed_seconds: f64) {
        self.assignment_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_seconds);
        self.assignments_total.with_label_values(&[outcome]).inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
