use crate::error::MonitorError;
use crate::health::{HealthVerdict, Metric, Severity, Status};
use crate::snapshot::{NetworkStats, ProcessStats, Snapshot};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

pub const REPORT_WIDTH: usize = 60;

const TITLE: &str = "SysWatch";
const OK_LINE: &str = "  ✓  All metrics within normal thresholds.";

pub fn render_text(snapshot: &Snapshot, verdict: &HealthVerdict, hostname: &str) -> String {
    let heavy = "═".repeat(REPORT_WIDTH);
    let light = "─".repeat(REPORT_WIDTH);
    let cpu = &snapshot.cpu;
    let ram = &snapshot.memory.ram;
    let disk = &snapshot.disk;

    let mut lines = vec![
        heavy.clone(),
        format!(
            "  {TITLE}  │  {hostname}  │  {}",
            format_timestamp(snapshot.timestamp)
        ),
        heavy.clone(),
        format!("  Status   : {}", verdict.status()),
        format!("  Uptime   : {}", format_uptime(snapshot.uptime_seconds)),
        format!(
            "  OS       : {} {} ({})",
            snapshot.os_name, snapshot.os_version, snapshot.architecture
        ),
        light.clone(),
    ];

    lines.push(match cpu.load_avg_1_5_15 {
        Some([one, five, fifteen]) => format!(
            "  CPU      : {:.1}%   load avg {one:.2} / {five:.2} / {fifteen:.2}",
            cpu.percent_overall
        ),
        None => format!("  CPU      : {:.1}%", cpu.percent_overall),
    });
    lines.push(format!(
        "  Memory   : {:.1}%   {:.2} GB / {:.2} GB used",
        ram.percent,
        bytes_to_gb(ram.used_bytes),
        bytes_to_gb(ram.total_bytes)
    ));
    lines.push(format!(
        "  Disk ({}) : {:.1}%   {:.2} GB / {:.2} GB used",
        disk.path,
        disk.percent,
        bytes_to_gb(disk.used_bytes),
        bytes_to_gb(disk.total_bytes)
    ));
    lines.push(light);

    if verdict.alerts().is_empty() {
        lines.push(OK_LINE.to_string());
    } else {
        lines.push("  ⚠  ALERTS:".to_string());
        for alert in verdict.alerts() {
            lines.push(format!("     [{}] {}", alert.severity, alert.message()));
        }
    }
    lines.push(heavy);

    lines.join("\n") + "\n"
}

/// Structured, newline-delimited record for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub timestamp: String,
    pub hostname: String,
    pub status: Status,
    pub system: SystemRecord,
    pub cpu: CpuRecord,
    pub memory: MemoryRecord,
    pub disk: DiskRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_processes: Vec<ProcessRecord>,
    pub alerts: Vec<AlertRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    pub uptime_seconds: u64,
    pub uptime_human: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuRecord {
    pub percent_overall: f64,
    pub percent_per_core: Vec<f64>,
    pub core_count_logical: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_count_physical: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_avg_1_5_15: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub ram: RamRecord,
    pub swap: SwapRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamRecord {
    pub percent: f64,
    pub used_gb: f64,
    pub total_gb: f64,
    pub available_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub percent: f64,
    pub used_gb: f64,
    pub total_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub path: String,
    pub percent: f64,
    pub used_gb: f64,
    pub total_gb: f64,
    pub free_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub metric: Metric,
    pub severity: Severity,
    pub observed_value: f64,
    pub threshold: f64,
    pub message: String,
}

impl JsonReport {
    pub fn to_json_line(&self) -> Result<String, MonitorError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn render_json(snapshot: &Snapshot, verdict: &HealthVerdict, hostname: &str) -> JsonReport {
    let cpu = &snapshot.cpu;
    let mem = &snapshot.memory;
    let disk = &snapshot.disk;

    JsonReport {
        timestamp: format_timestamp(snapshot.timestamp),
        hostname: hostname.to_string(),
        status: verdict.status(),
        system: SystemRecord {
            os: snapshot.os_name.clone(),
            os_version: snapshot.os_version.clone(),
            arch: snapshot.architecture.clone(),
            kernel_version: snapshot.kernel_version.clone(),
            uptime_seconds: snapshot.uptime_seconds,
            uptime_human: format_uptime(snapshot.uptime_seconds),
        },
        cpu: CpuRecord {
            percent_overall: round_to(cpu.percent_overall, 1),
            percent_per_core: cpu.percent_per_core.iter().map(|v| round_to(*v, 1)).collect(),
            core_count_logical: cpu.core_count_logical(),
            core_count_physical: cpu.core_count_physical,
            load_avg_1_5_15: cpu.load_avg_1_5_15.map(|l| l.map(|v| round_to(v, 2))),
        },
        memory: MemoryRecord {
            ram: RamRecord {
                percent: round_to(mem.ram.percent, 1),
                used_gb: gb(mem.ram.used_bytes),
                total_gb: gb(mem.ram.total_bytes),
                available_gb: gb(mem.ram_available_bytes),
            },
            swap: SwapRecord {
                percent: round_to(mem.swap.percent, 1),
                used_gb: gb(mem.swap.used_bytes),
                total_gb: gb(mem.swap.total_bytes),
            },
        },
        disk: DiskRecord {
            path: disk.path.clone(),
            percent: round_to(disk.percent, 1),
            used_gb: gb(disk.used_bytes),
            total_gb: gb(disk.total_bytes),
            free_gb: gb(disk.free_bytes()),
        },
        network: snapshot.network.as_ref().map(network_record),
        top_processes: snapshot.top_processes.iter().map(process_record).collect(),
        alerts: verdict
            .alerts()
            .iter()
            .map(|a| AlertRecord {
                metric: a.metric,
                severity: a.severity,
                observed_value: round_to(a.observed_value, 1),
                threshold: a.threshold,
                message: a.message(),
            })
            .collect(),
    }
}

fn network_record(n: &NetworkStats) -> NetworkRecord {
    NetworkRecord {
        bytes_sent: n.bytes_sent,
        bytes_received: n.bytes_received,
        packets_sent: n.packets_sent,
        packets_received: n.packets_received,
        errors_in: n.errors_in,
        errors_out: n.errors_out,
    }
}

fn process_record(p: &ProcessStats) -> ProcessRecord {
    ProcessRecord {
        pid: p.pid,
        name: p.name.clone(),
        cpu_percent: round_to(p.cpu_percent, 1),
        memory_percent: round_to(p.memory_percent, 2),
        status: p.status.clone(),
    }
}

/// Whole days, hours and minutes; leftover seconds are dropped.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let mins = (seconds % 3600) / 60;
    format!("{days}d {hours}h {mins}m")
}

pub fn format_timestamp(ts: SystemTime) -> String {
    humantime::format_rfc3339_seconds(ts).to_string()
}

fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / 1e9
}

fn gb(bytes: u64) -> f64 {
    round_to(bytes_to_gb(bytes), 2)
}

fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (v * factor).round() / factor
}
