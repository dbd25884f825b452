use crate::config::ConfigError;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the WARNING zone above each threshold, in absolute percentage
/// points. Anything at or beyond `threshold + WARNING_BAND_POINTS` is CRITICAL.
pub const WARNING_BAND_POINTS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
}

impl Metric {
    pub const EVALUATION_ORDER: [Metric; 3] = [Metric::Cpu, Metric::Memory, Metric::Disk];

    fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "Memory",
            Metric::Disk => "Disk",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "MEMORY",
            Metric::Disk => "DISK",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warning,
    Critical,
}

impl From<Severity> for Status {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Warning => Status::Warning,
            Severity::Critical => Status::Critical,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    cpu: f64,
    memory: f64,
    disk: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            cpu: 85.0,
            memory: 85.0,
            disk: 90.0,
        }
    }
}

impl ThresholdPolicy {
    pub fn new(cpu: f64, memory: f64, disk: f64) -> Result<Self, ConfigError> {
        for (name, value) in [("cpu", cpu), ("memory", memory), ("disk", disk)] {
            if !(value.is_finite() && value > 0.0 && value <= 100.0) {
                return Err(ConfigError::Validation(format!(
                    "{name} threshold must be in (0, 100], got {value}"
                )));
            }
        }
        Ok(Self { cpu, memory, disk })
    }

    pub fn threshold(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpu => self.cpu,
            Metric::Memory => self.memory,
            Metric::Disk => self.disk,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    pub metric: Metric,
    pub severity: Severity,
    pub observed_value: f64,
    pub threshold: f64,
}

impl Alert {
    pub fn message(&self) -> String {
        format!(
            "{} usage {:.1}% exceeds {:.1}% threshold",
            self.metric.label(),
            self.observed_value,
            self.threshold
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HealthVerdict {
    alerts: Vec<Alert>,
}

impl HealthVerdict {
    pub fn status(&self) -> Status {
        self.alerts
            .iter()
            .map(|a| Status::from(a.severity))
            .max()
            .unwrap_or(Status::Ok)
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }
}

pub fn classify(observed: f64, threshold: f64) -> Option<Severity> {
    if observed < threshold {
        None
    } else if observed < threshold + WARNING_BAND_POINTS {
        Some(Severity::Warning)
    } else {
        Some(Severity::Critical)
    }
}

pub fn evaluate(snapshot: &Snapshot, policy: &ThresholdPolicy) -> HealthVerdict {
    let alerts = Metric::EVALUATION_ORDER
        .iter()
        .filter_map(|&metric| {
            let observed_value = observed(snapshot, metric);
            let threshold = policy.threshold(metric);
            classify(observed_value, threshold).map(|severity| Alert {
                metric,
                severity,
                observed_value,
                threshold,
            })
        })
        .collect();
    HealthVerdict { alerts }
}

fn observed(snapshot: &Snapshot, metric: Metric) -> f64 {
    match metric {
        Metric::Cpu => snapshot.cpu.percent_overall,
        Metric::Memory => snapshot.memory.ram.percent,
        Metric::Disk => snapshot.disk.percent,
    }
}
