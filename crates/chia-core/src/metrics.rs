//! In-process counters for managed resources and reconcile outcomes.
//!
//! Values are also forwarded to the `metrics` facade so an installed
//! recorder sees them; [`render_prometheus`] serves the local snapshot.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Mutex;

use serde::Serialize;

/// Gauge name for the number of tracked resources of `kind`.
pub fn tracked_metric_name(kind: &str) -> String {
    format!("chia_operator_{}_total", kind.to_ascii_lowercase())
}

const RECONCILES_TOTAL: &str = "chia_operator_reconciles_total";
const RECONCILE_ERRORS_TOTAL: &str = "chia_operator_reconcile_errors_total";
const STATUS_CONFLICTS_TOTAL: &str = "chia_operator_status_conflicts_total";

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct KindSummary {
    pub tracked: i64,
    pub reconciles: u64,
    pub errors: u64,
    pub status_conflicts: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MetricsSummary {
    pub kinds: BTreeMap<String, KindSummary>,
}

#[derive(Default)]
pub struct OperatorMetrics {
    kinds: Mutex<BTreeMap<String, KindSummary>>,
}

impl OperatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_kind<R>(&self, kind: &str, f: impl FnOnce(&mut KindSummary) -> R) -> R {
        let mut kinds = self.kinds.lock().unwrap_or_else(|e| e.into_inner());
        f(kinds.entry(kind.to_string()).or_default())
    }

    /// Make `kind` visible in snapshots before its first reconcile.
    pub fn register_kind(&self, kind: &str) {
        self.with_kind(kind, |_| ());
    }

    pub fn tracked_increment(&self, kind: &str) {
        self.with_kind(kind, |k| k.tracked += 1);
        metrics::gauge!(tracked_metric_name(kind)).increment(1.0);
    }

    pub fn tracked_decrement(&self, kind: &str) {
        self.with_kind(kind, |k| k.tracked -= 1);
        metrics::gauge!(tracked_metric_name(kind)).decrement(1.0);
    }

    pub fn tracked(&self, kind: &str) -> i64 {
        self.with_kind(kind, |k| k.tracked)
    }

    pub fn record_reconcile(&self, kind: &str) {
        self.with_kind(kind, |k| k.reconciles = k.reconciles.saturating_add(1));
        metrics::counter!(RECONCILES_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    pub fn record_error(&self, kind: &str) {
        self.with_kind(kind, |k| k.errors = k.errors.saturating_add(1));
        metrics::counter!(RECONCILE_ERRORS_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    pub fn record_status_conflict(&self, kind: &str) {
        self.with_kind(kind, |k| {
            k.status_conflicts = k.status_conflicts.saturating_add(1)
        });
        metrics::counter!(STATUS_CONFLICTS_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSummary {
        let kinds = self.kinds.lock().unwrap_or_else(|e| e.into_inner());
        MetricsSummary {
            kinds: kinds.clone(),
        }
    }
}

fn sanitize_label(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            '"' => '\'',
            _ => c,
        })
        .collect()
}

fn write_metric_line(
    out: &mut String,
    name: &str,
    labels: &[(&str, String)],
    value: impl std::fmt::Display,
) {
    if labels.is_empty() {
        let _ = writeln!(out, "{} {}", name, value);
    } else {
        let rendered: Vec<String> = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, sanitize_label(v)))
            .collect();
        let _ = writeln!(out, "{}{{{}}} {}", name, rendered.join(","), value);
    }
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}\n# TYPE {name} {kind}");
}

/// Prometheus text exposition of a snapshot.
pub fn render_prometheus(summary: &MetricsSummary) -> String {
    let mut out = String::new();
    for (kind, stats) in &summary.kinds {
        let name = tracked_metric_name(kind);
        write_header(
            &mut out,
            &name,
            &format!("{kind} resources currently managed"),
            "gauge",
        );
        write_metric_line(&mut out, &name, &[], stats.tracked);
    }
    let counters: [(&str, &str, fn(&KindSummary) -> u64); 3] = [
        (RECONCILES_TOTAL, "Reconcile passes by kind", |k| k.reconciles),
        (RECONCILE_ERRORS_TOTAL, "Failed reconcile passes by kind", |k| k.errors),
        (
            STATUS_CONFLICTS_TOTAL,
            "Status writes rejected for a stale resourceVersion",
            |k| k.status_conflicts,
        ),
    ];
    for (name, help, value) in counters {
        write_header(&mut out, name, help, "counter");
        for (kind, stats) in &summary.kinds {
            write_metric_line(&mut out, name, &[("kind", kind.clone())], value(stats));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_name_is_lowercased_kind() {
        assert_eq!(tracked_metric_name("ChiaNode"), "chia_operator_chianode_total");
    }

    #[test]
    fn render_includes_registered_kinds_at_zero() {
        let metrics = OperatorMetrics::new();
        metrics.register_kind("ChiaSeeder");
        let text = render_prometheus(&metrics.snapshot());
        assert!(text.contains("# TYPE chia_operator_chiaseeder_total gauge"));
        assert!(text.contains("chia_operator_chiaseeder_total 0\n"));
        assert!(text.contains("chia_operator_reconcile_errors_total{kind=\"ChiaSeeder\"} 0\n"));
    }

    #[test]
    fn counters_accumulate_per_kind() {
        let metrics = OperatorMetrics::new();
        metrics.record_reconcile("ChiaNode");
        metrics.record_reconcile("ChiaNode");
        metrics.record_error("ChiaNode");
        metrics.record_status_conflict("ChiaFarmer");
        let snap = metrics.snapshot();
        assert_eq!(snap.kinds["ChiaNode"].reconciles, 2);
        assert_eq!(snap.kinds["ChiaNode"].errors, 1);
        assert_eq!(snap.kinds["ChiaFarmer"].status_conflicts, 1);
        let text = render_prometheus(&snap);
        assert!(text.contains("chia_operator_reconciles_total{kind=\"ChiaNode\"} 2\n"));
    }

    #[test]
    fn labels_are_sanitized() {
        let mut out = String::new();
        write_metric_line(&mut out, "m", &[("kind", "a\"b\nc".into())], 1);
        assert_eq!(out, "m{kind=\"a'b c\"} 1\n");
    }
}
