//! Reconcile counters rendered in Prometheus text exposition format.
//!
//! The metric set is fixed at construction, so recording never takes a lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

pub const RECONCILES_TOTAL: &str = "bigip_ipam_reconciles_total";
pub const RECONCILE_ERRORS_TOTAL: &str = "bigip_ipam_reconcile_errors_total";
pub const RECORDS_CREATED_TOTAL: &str = "bigip_ipam_records_created_total";
pub const RECORDS_UPDATED_TOTAL: &str = "bigip_ipam_records_updated_total";
pub const RECORDS_DELETED_TOTAL: &str = "bigip_ipam_records_deleted_total";
pub const MALFORMED_RECORDS_TOTAL: &str = "bigip_ipam_malformed_records_total";
pub const VIPS_ACTIVATED_TOTAL: &str = "bigip_ipam_vips_activated_total";
pub const QUEUE_DEPTH: &str = "bigip_ipam_queue_depth";
pub const WORKERS_BUSY: &str = "bigip_ipam_workers_busy";

const COUNTERS: &[(&str, &str)] = &[
    (RECONCILES_TOTAL, "Reconcile passes started"),
    (RECONCILE_ERRORS_TOTAL, "Reconcile passes that returned an error"),
    (RECORDS_CREATED_TOTAL, "Virtual-server records created"),
    (RECORDS_UPDATED_TOTAL, "Virtual-server records updated"),
    (RECORDS_DELETED_TOTAL, "Virtual-server records deleted"),
    (MALFORMED_RECORDS_TOTAL, "Records skipped because their name did not parse"),
    (VIPS_ACTIVATED_TOTAL, "Services whose active VIP was promoted"),
];

const GAUGES: &[(&str, &str)] = &[
    (QUEUE_DEPTH, "Keys waiting in the work queue"),
    (WORKERS_BUSY, "Workers currently reconciling"),
];

/// Monotonically increasing counter.
struct Counter {
    value: AtomicU64,
    help: &'static str,
}

/// Value that can go up or down.
struct Gauge {
    value: AtomicI64,
    help: &'static str,
}

pub struct MetricsRegistry {
    counters: BTreeMap<&'static str, Counter>,
    gauges: BTreeMap<&'static str, Gauge>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let counters = COUNTERS
            .iter()
            .map(|&(name, help)| {
                (
                    name,
                    Counter {
                        value: AtomicU64::new(0),
                        help,
                    },
                )
            })
            .collect();
        let gauges = GAUGES
            .iter()
            .map(|&(name, help)| {
                (
                    name,
                    Gauge {
                        value: AtomicI64::new(0),
                        help,
                    },
                )
            })
            .collect();
        Self { counters, gauges }
    }

    /// Increment a counter by 1. Unknown names are ignored.
    pub fn counter_inc(&self, name: &str) {
        self.counter_add(name, 1);
    }

    pub fn counter_add(&self, name: &str, val: u64) {
        if let Some(c) = self.counters.get(name) {
            c.value.fetch_add(val, Ordering::Relaxed);
        }
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.value.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn gauge_set(&self, name: &str, val: i64) {
        if let Some(g) = self.gauges.get(name) {
            g.value.store(val, Ordering::Relaxed);
        }
    }

    pub fn gauge_inc(&self, name: &str) {
        if let Some(g) = self.gauges.get(name) {
            g.value.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn gauge_dec(&self, name: &str) {
        if let Some(g) = self.gauges.get(name) {
            g.value.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn gauge(&self, name: &str) -> i64 {
        self.gauges
            .get(name)
            .map(|g| g.value.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut output = String::new();

        for (name, counter) in &self.counters {
            output.push_str(&format!("# HELP {} {}\n", name, counter.help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!(
                "{} {}\n",
                name,
                counter.value.load(Ordering::Relaxed)
            ));
        }

        for (name, gauge) in &self.gauges {
            output.push_str(&format!("# HELP {} {}\n", name, gauge.help));
            output.push_str(&format!("# TYPE {} gauge\n", name));
            output.push_str(&format!(
                "{} {}\n",
                name,
                gauge.value.load(Ordering::Relaxed)
            ));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
